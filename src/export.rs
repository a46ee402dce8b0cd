//! CSV export of submissions.
//!
//! Header names are written as-is (they are form field identifiers); every
//! data cell is quoted, with embedded quotes doubled.

use serde_json::Value;

use crate::models::{Project, Submission};

pub fn to_csv<S: AsRef<str>>(rows: &[Submission], headers: &[S]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_ref())
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| quote(&cell_text(row.get(h.as_ref()))))
            .collect();
        lines.push(cells.join(","));
    }

    lines.join("\n")
}

/// CSV for a cached project, in its display column order.
pub fn project_csv(project: &Project) -> String {
    to_csv(&project.submissions, project.export_headers())
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
