use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use bulkops_core::{compare_strings, ActionOutcome, BulkRun, ItemKey, OutcomeStatus};
use camino::Utf8Path;
use serde_json::Value;

/// Reads the selection from a JSON file. Accepts a plain array or a paginated
/// list response (`{"count": .., "results": [..]}`).
pub fn load_items(path: &Utf8Path) -> Result<Vec<Value>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let parsed: Value =
        serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path))?;
    parse_items(parsed).with_context(|| format!("Unexpected item list in {}", path))
}

pub fn parse_items(parsed: Value) -> Result<Vec<Value>> {
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => bail!("expected a JSON array or an object with a `results` array"),
        },
        _ => bail!("expected a JSON array or an object with a `results` array"),
    }
}

/// Name shown for an item, falling back to its key.
pub fn display_name(item: &Value, key: &ItemKey) -> String {
    item.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| key.to_string())
}

/// Sorts items by name the way list views present them. Items without a
/// name sort first.
pub fn sort_by_name(items: &mut [Value]) {
    items.sort_by(|l, r| {
        let l = l.get("name").and_then(Value::as_str).unwrap_or_default();
        let r = r.get("name").and_then(Value::as_str).unwrap_or_default();
        compare_strings(l, r)
    });
}

/// Asks a yes/no question; anything but `y`/`yes` is a no.
pub fn confirm_from(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> io::Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Pending => "pending",
        OutcomeStatus::Success => "ok",
        OutcomeStatus::Failed => "FAILED",
        OutcomeStatus::Canceled => "canceled",
    }
}

pub fn render_row(outcome: &ActionOutcome<Value>) -> String {
    let detail = outcome
        .error
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_default();
    format!(
        "{:<12} {:<32} {:<10} {}",
        outcome.key.as_str(),
        display_name(&outcome.item, &outcome.key),
        status_label(outcome.status),
        detail
    )
    .trim_end()
    .to_string()
}

pub fn write_report(path: &Utf8Path, run: &BulkRun<Value>) -> Result<()> {
    let json = serde_json::to_string_pretty(run)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paginated_responses_are_unwrapped() {
        let items = parse_items(json!({ "count": 2, "results": [{ "id": 1 }, { "id": 2 }] })).unwrap();
        assert_eq!(items.len(), 2);
        assert!(parse_items(json!({ "id": 1 })).is_err());
        assert!(parse_items(json!("nope")).is_err());
    }

    #[test]
    fn names_sort_case_insensitively() {
        let mut items = vec![
            json!({ "name": "beta" }),
            json!({ "name": "Alpha" }),
            json!({ "name": "alpha" }),
        ];
        sort_by_name(&mut items);
        let names: Vec<&str> = items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn only_explicit_yes_confirms() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("\n", false), ("no\n", false)] {
            let mut out = Vec::new();
            let confirmed = confirm_from(&mut answer.as_bytes(), &mut out, "Delete?").unwrap();
            assert_eq!(confirmed, expected, "answer {answer:?}");
        }
    }
}
