//! TOC JSON import and export.

use serde_json::Value;

use super::schema;
use crate::error::{Error, Result};
use crate::model::TocEntry;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize entries as `[{title, page, level}, ...]`.
pub fn to_json(entries: &[TocEntry], format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(entries),
        JsonFormat::Compact => serde_json::to_string(entries),
    };
    Ok(result?)
}

/// Load a persisted TOC.
///
/// The document must be a JSON array. Elements are validated with the same
/// coercion rules as model output; unusable elements are skipped.
pub fn import_json(text: &str) -> Result<Vec<TocEntry>> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
    match value {
        Value::Array(values) => {
            let entries = schema::check_array(&values);
            log::info!("Imported {} of {} TOC entries", entries.len(), values.len());
            Ok(entries)
        }
        other => Err(Error::InvalidToc(format!(
            "expected a JSON array, found {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&[TocEntry::new("Intro", 1, 1)], JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\": \"Intro\""));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&[TocEntry::new("Intro", 1, 1)], JsonFormat::Compact).unwrap();
        assert_eq!(json, r#"[{"title":"Intro","page":1,"level":1}]"#);
    }

    #[test]
    fn test_import_coerces() {
        let entries = import_json(
            r#"[{"title": " Preface ", "page": "iv"}, {"title": "Ch 1", "page": 3.0, "level": "2"}, {"page": 9}]"#,
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![TocEntry::unresolved("Preface", 1), TocEntry::new("Ch 1", 3, 2)]
        );
    }

    #[test]
    fn test_import_requires_array() {
        assert!(matches!(
            import_json(r#"{"title": "x"}"#),
            Err(Error::InvalidToc(_))
        ));
        assert!(matches!(import_json("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_import_exported() {
        let entries = vec![TocEntry::new("A", 1, 1), TocEntry::new("B", -1, 2)];
        let json = to_json(&entries, JsonFormat::Pretty).unwrap();
        assert_eq!(import_json(&json).unwrap(), entries);
    }
}
