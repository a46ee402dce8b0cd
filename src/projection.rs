//! Column projection: which of a project's columns are shown.
//!
//! These functions only compute the next selection. Committing it (remote
//! write first, then the cache) is the project store's job.

use crate::errors::{ClientError, Result};
use crate::models::Project;

/// Next selection after toggling `column`, or `None` when the column is
/// not part of the project's schema (the toggle is a no-op).
///
/// Enabling appends, so the selection keeps the order columns were
/// turned on in rather than schema order.
pub fn toggled(project: &Project, column: &str) -> Option<Vec<String>> {
    if !project.is_available(column) {
        return None;
    }

    let mut next = project.selected_columns.clone();
    match next.iter().position(|c| c == column) {
        Some(idx) => {
            next.remove(idx);
        }
        None => next.push(column.to_string()),
    }
    Some(next)
}

pub fn all_selected(project: &Project) -> Vec<String> {
    project.available_columns.clone()
}

pub fn none_selected() -> Vec<String> {
    Vec::new()
}

/// Validate an explicit selection. Duplicates collapse onto their first
/// occurrence; any column outside the schema rejects the whole write.
pub fn validated(project: &Project, columns: &[String]) -> Result<Vec<String>> {
    let mut next: Vec<String> = Vec::with_capacity(columns.len());
    for col in columns {
        if !project.is_available(col) {
            return Err(ClientError::UnknownColumn {
                uid: project.uid.clone(),
                column: col.clone(),
            });
        }
        if !next.contains(col) {
            next.push(col.clone());
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(available: &[&str], selected: &[&str]) -> Project {
        serde_json::from_value(serde_json::json!({
            "uid": "p1",
            "available_columns": available,
            "selected_columns": selected,
        }))
        .unwrap()
    }

    #[test]
    fn test_toggle_appends_in_enable_order() {
        let p = project(&["a", "b", "c"], &["b"]);
        assert_eq!(toggled(&p, "a").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_toggle_removes_selected() {
        let p = project(&["a", "b", "c"], &["c", "a"]);
        assert_eq!(toggled(&p, "c").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let original = project(&["a", "b", "c", "d"], &["c", "a"]);
        for col in ["a", "b", "c", "d"] {
            let mut p = original.clone();
            p.selected_columns = toggled(&p, col).unwrap();
            p.selected_columns = toggled(&p, col).unwrap();
            // re-enabling a removed column moves it to the end, so only
            // columns that started unselected round-trip exactly
            if original.selected_columns.contains(&col.to_string()) {
                let mut got = p.selected_columns.clone();
                let mut want = original.selected_columns.clone();
                got.sort();
                want.sort();
                assert_eq!(got, want, "set mismatch toggling {}", col);
            } else {
                assert_eq!(p.selected_columns, original.selected_columns, "toggling {}", col);
            }
        }
    }

    #[test]
    fn test_toggle_unknown_column_is_noop() {
        let p = project(&["a"], &[]);
        assert!(toggled(&p, "zzz").is_none());
    }

    #[test]
    fn test_select_all_then_clear() {
        let mut p = project(&["x", "y", "z"], &["y"]);
        p.selected_columns = all_selected(&p);
        assert_eq!(p.selected_columns, vec!["x", "y", "z"]);
        assert_eq!(all_selected(&p), p.selected_columns);
        p.selected_columns = none_selected();
        assert!(p.selected_columns.is_empty());
    }

    #[test]
    fn test_validated_rejects_unknown_and_dedupes() {
        let p = project(&["a", "b"], &[]);
        assert_eq!(
            validated(&p, &["b".into(), "a".into(), "b".into()]).unwrap(),
            vec!["b", "a"]
        );
        assert!(matches!(
            validated(&p, &["a".into(), "q".into()]),
            Err(ClientError::UnknownColumn { column, .. }) if column == "q"
        ));
    }
}
