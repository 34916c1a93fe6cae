//! autograder-report: Renderings of graded assignment records.
//!
//! The plain-text transcript and JSON record live in `autograder-core`; this
//! crate adds a standalone HTML page for sharing results with students.

pub mod html;

pub use html::{generate_html, write_html_report};
