//! Conversion from loosely-typed JSON to an [`EditPlan`].

use crate::domain::{EditOperation, EditPlan, SearchReplace};
use serde_json::{Map, Value};

/// A plan produced by one recovery stage plus the warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePlan {
    pub plan: EditPlan,
    pub warnings: Vec<String>,
}

const PLAN_KEYS: &[&str] = &["plan", "files", "instructions"];

/// Interpret `value` as an edit plan.
///
/// Returns `None` when the value is not an object carrying at least one of
/// `plan`, `files` or `instructions`. Individual file entries that are
/// unusable are skipped with a warning rather than failing the whole plan.
pub fn plan_from_value(value: &Value) -> Option<StagePlan> {
    let object = value.as_object()?;
    if !PLAN_KEYS.iter().any(|key| object.contains_key(*key)) {
        return None;
    }

    let mut warnings = Vec::new();
    let plan = string_list(object, "plan");
    let instructions = string_list(object, "instructions");

    let mut files = Vec::new();
    match object.get("files") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for (idx, entry) in entries.iter().enumerate() {
                match file_entry(entry, &mut warnings) {
                    Some(op) => files.push(op),
                    None => tracing::warn!("Skipped file entry #{}", idx + 1),
                }
            }
        }
        Some(_) => warnings.push("`files` is not an array; ignored".to_string()),
    }

    Some(StagePlan { plan: EditPlan { plan, files, instructions }, warnings })
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn str_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| object.get(*key).and_then(Value::as_str))
}

fn file_entry(entry: &Value, warnings: &mut Vec<String>) -> Option<EditOperation> {
    let Some(object) = entry.as_object() else {
        warnings.push("File entry is not an object; skipped".to_string());
        return None;
    };

    let path = match str_field(object, &["path"]).map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => {
            warnings.push("File entry without a `path`; skipped".to_string());
            return None;
        }
    };

    if let Some(content) = object.get("content").and_then(Value::as_str) {
        return Some(EditOperation::WholeFileWrite { path, content: content.to_string() });
    }

    if let Some(raw_edits) = object.get("edits").and_then(Value::as_array) {
        let mut edits = Vec::with_capacity(raw_edits.len());
        for (idx, raw) in raw_edits.iter().enumerate() {
            let pair = raw.as_object().and_then(|edit| {
                let search = str_field(edit, &["search", "old_string"])?;
                let replace = str_field(edit, &["replace", "new_string"])?;
                Some(SearchReplace { search: search.to_string(), replace: replace.to_string() })
            });
            match pair {
                Some(pair) => edits.push(pair),
                None => warnings.push(format!(
                    "{}: edit #{} lacks `search`/`replace` strings; skipped",
                    path,
                    idx + 1
                )),
            }
        }
        if edits.is_empty() {
            warnings.push(format!("{}: no usable edits; skipped", path));
            return None;
        }
        return Some(EditOperation::SurgicalEdit { path, edits });
    }

    warnings.push(format!("{}: neither `content` nor `edits` present; skipped", path));
    None
}
