//! The `examforge validate` command.

use anyhow::Result;

use examforge_core::parser::validate_catalog;

use crate::context::{load_catalog, Overrides};

pub fn execute(overrides: &Overrides) -> Result<()> {
    let config = overrides.load_config()?;
    let catalog = load_catalog(&config)?;

    println!(
        "Catalog: {} ({} questions, {} tests)",
        config.catalog.display(),
        catalog.questions.len(),
        catalog.tests.len()
    );

    let warnings = validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Catalog valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
