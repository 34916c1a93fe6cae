//! HTML transcript renderer.
//!
//! Produces a self-contained HTML page with all CSS inlined.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::TimeDelta;

use autograder_core::assignment::{AssignmentRecord, PRETTY_TIMESTAMP_FORMAT};
use autograder_core::question::Scoresheet;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// `"2m 05s"` style rendering of the grading duration.
fn format_elapsed(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

fn row_class(sheet: &Scoresheet) -> &'static str {
    if sheet.score >= i64::from(sheet.max_points) {
        "pass"
    } else if sheet.score > 0 {
        "partial"
    } else {
        "fail"
    }
}

/// Render a graded assignment record as an HTML page.
pub fn generate_html(record: &AssignmentRecord) -> String {
    let (score, max) = record.get_score();
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Autograder transcript: {}</title>\n",
        html_escape(&record.name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>Autograder transcript for project: {}</h1>\n",
        html_escape(&record.name)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Grading started at {} and ended at {} ({})</p>\n",
        record.start.format(PRETTY_TIMESTAMP_FORMAT),
        record.end.format(PRETTY_TIMESTAMP_FORMAT),
        format_elapsed(record.end - record.start),
    ));
    html.push_str(&format!(
        "<p class=\"total\">Total: <strong>{score} / {max}</strong></p>\n"
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"questions\">\n");
    html.push_str("<table>\n");
    html.push_str(
        "<thead><tr><th>Question</th><th>Score</th><th>Timeout</th><th>Notes</th></tr></thead>\n",
    );
    html.push_str("<tbody>\n");
    for sheet in &record.questions {
        let notes = sheet
            .message
            .split('\n')
            .map(html_escape)
            .collect::<Vec<_>>()
            .join("<br>");
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{} / {}</td><td>{}s</td><td>{}</td></tr>\n",
            row_class(sheet),
            html_escape(&sheet.name),
            sheet.score,
            sheet.max_points,
            sheet.timeout_secs,
            notes,
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(record).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write the HTML rendering of `record` to `path`, creating parent directories.
pub fn write_html_report(record: &AssignmentRecord, path: &Path) -> Result<()> {
    let html = generate_html(record);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report: {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --partial: #fef9c3; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --partial: #713f12; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1 { margin-top: 1rem; font-size: 1.5rem; }
.meta { color: #6b7280; }
.total { font-size: 1.2rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); }
.pass { background: var(--pass); }
.partial { background: var(--partial); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;
