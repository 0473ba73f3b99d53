//! The `examforge init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("examforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("catalog").context("failed to create catalog directory")?;
    write_if_missing(Path::new("catalog/sample.toml"), SAMPLE_CATALOG)?;

    println!("\nNext steps:");
    println!("  1. Run: examforge validate");
    println!("  2. Run: examforge list-tests");
    println!("  3. Run: examforge take --student <you> --test sample-1");
    println!("  4. Run: examforge report --student <you>");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examforge configuration

# Catalog file or directory of *.toml catalog files
catalog = "./catalog"

# Where submitted results are stored, one JSON file per (student, test)
results_dir = "./examforge-results"

# Topic accuracy thresholds (percent) for strengths and weaknesses
strong_threshold = 70
weak_threshold = 50
"#;

const SAMPLE_CATALOG: &str = r#"# Options are numbered from 0.

[[questions]]
id = "phy-units-001"
type = "single"
prompt = "What is the SI unit of force?"
options = ["joule", "newton", "pascal", "watt"]
correct = 1
marks = 4
penalty = 1
subject = "Physics"
topic = "Mechanics"
subtopic = "Units"

[[questions]]
id = "phy-kin-001"
type = "numeric"
prompt = "A car accelerates from rest at 2 m/s^2 for 5 s. What is its final speed in m/s?"
correct = 10
marks = 4
subject = "Physics"
topic = "Mechanics"
subtopic = "Kinematics"

[[questions]]
id = "chem-gas-001"
type = "multiple"
prompt = "Which of these are noble gases?"
options = ["neon", "nitrogen", "argon", "chlorine"]
correct = [0, 2]
marks = 4
penalty = 2
subject = "Chemistry"
topic = "Periodic table"

[[questions]]
id = "math-alg-001"
type = "single"
prompt = "Solve for x: 3x + 4 = 19"
options = ["3", "5", "7", "15"]
correct = 1
marks = 4
penalty = 1
subject = "Mathematics"
topic = "Algebra"

[[tests]]
id = "sample-1"
title = "Sample mixed test"
duration_minutes = 10

[[tests.sections]]
id = "science"
name = "Science"

[[tests.sections]]
id = "maths"
name = "Mathematics"

[[tests.questions]]
question = "phy-units-001"
section = "science"

[[tests.questions]]
question = "phy-kin-001"
section = "science"

[[tests.questions]]
question = "chem-gas-001"
section = "science"

[[tests.questions]]
question = "math-alg-001"
section = "maths"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::parser::{parse_catalog_str, validate_catalog};

    #[test]
    fn sample_catalog_is_valid() {
        let catalog = parse_catalog_str(SAMPLE_CATALOG, Path::new("sample.toml")).unwrap();
        assert_eq!(catalog.questions.len(), 4);
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn sample_config_parses() {
        let config = examforge_store::config::parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.strong_threshold, 70.0);
    }
}
