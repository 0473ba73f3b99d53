//! examforge-report: rendering of performance reports.

pub mod html;

pub use html::{generate_html, write_html_report, HtmlOptions};
