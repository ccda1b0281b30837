//! Output module for crawl reports
//!
//! This module handles:
//! - Writing the JSON report of a finished crawl
//! - Printing the human-readable summary to the console

mod report;

pub use report::{
    default_report_path, format_summary, print_summary, status_reason, write_json_report,
};
