//! Tolerant parsing of LLM responses into TOC entries.
//!
//! Responses are supposed to be a bare JSON array but frequently arrive
//! wrapped in Markdown fences, prefixed with prose, or cut off mid-array.
//! [`ResponseParser`] tries a fixed list of strategies, from strict to
//! lenient, and stops at the first one that yields a JSON array.

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::schema::{self, FieldCheck};
use crate::model::TocEntry;

/// Which strategy produced the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParseTier {
    /// The cleaned text was a JSON array.
    Direct,
    /// The text between the first `[` and the last `]` was a JSON array.
    Bracketed,
    /// Entries were recovered field by field from object-like fragments.
    Salvaged,
}

impl std::fmt::Display for ParseTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParseTier::Direct => "direct",
            ParseTier::Bracketed => "bracketed",
            ParseTier::Salvaged => "salvaged",
        };
        f.write_str(name)
    }
}

/// Result of parsing one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Validated entries in response order
    pub entries: Vec<TocEntry>,

    /// Strategy that succeeded, `None` when every strategy failed
    pub tier: Option<ParseTier>,
}

impl ParseOutcome {
    /// Check if the response yielded no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One way of turning cleaned response text into entries.
///
/// Returning `None` means "this strategy does not apply"; the parser then
/// moves on to the next one. `Some(vec![])` is a success with no entries.
trait ParseStrategy: Send + Sync {
    fn tier(&self) -> ParseTier;
    fn attempt(&self, text: &str) -> Option<Vec<TocEntry>>;
}

/// Strict JSON array.
struct DirectJson;

impl ParseStrategy for DirectJson {
    fn tier(&self) -> ParseTier {
        ParseTier::Direct
    }

    fn attempt(&self, text: &str) -> Option<Vec<TocEntry>> {
        match serde_json::from_str::<Value>(text).ok()? {
            Value::Array(values) => Some(schema::check_array(&values)),
            _ => None,
        }
    }
}

/// JSON array surrounded by other text.
struct BracketedJson;

impl ParseStrategy for BracketedJson {
    fn tier(&self) -> ParseTier {
        ParseTier::Bracketed
    }

    fn attempt(&self, text: &str) -> Option<Vec<TocEntry>> {
        let start = text.find('[')?;
        let end = text.rfind(']')?;
        if end <= start {
            return None;
        }
        DirectJson.attempt(&text[start..=end])
    }
}

/// Longest fragment body, in characters, the salvage tier looks at.
const MAX_FRAGMENT_CHARS: usize = 512;

/// Field-by-field recovery from `{...}` fragments.
struct FragmentSalvage {
    title: Regex,
    page: Regex,
    level: Regex,
}

impl FragmentSalvage {
    fn new() -> Self {
        Self {
            title: Regex::new(
                r#"(?i)["']title["']\s*:\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#,
            )
            .unwrap(),
            page: Regex::new(r#"(?i)["']page["']\s*:\s*["']?(-?\d+)"#).unwrap(),
            level: Regex::new(r#"(?i)["']level["']\s*:\s*["']?(-?\d+)"#).unwrap(),
        }
    }

    fn title_of(&self, body: &str) -> Option<String> {
        let caps = self.title.captures(body)?;
        if let Some(raw) = caps.get(1) {
            let quoted = format!("\"{}\"", raw.as_str());
            Some(serde_json::from_str::<String>(&quoted).unwrap_or_else(|_| raw.as_str().to_string()))
        } else {
            caps.get(2).map(|raw| raw.as_str().replace("\\'", "'"))
        }
    }

    fn number_of(re: &Regex, body: &str) -> Option<String> {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl ParseStrategy for FragmentSalvage {
    fn tier(&self) -> ParseTier {
        ParseTier::Salvaged
    }

    fn attempt(&self, text: &str) -> Option<Vec<TocEntry>> {
        let mut entries = Vec::new();
        for body in fragments(text) {
            let Some(title) = self.title_of(body) else {
                continue;
            };

            // Fields go through the same coercion as well-formed JSON
            let mut object = json!({ "title": title });
            if let Some(page) = Self::number_of(&self.page, body) {
                object["page"] = Value::String(page);
            }
            if let Some(level) = Self::number_of(&self.level, body) {
                object["level"] = Value::String(level);
            }

            if let FieldCheck::Valid(entry) = schema::check_value(&object) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }
}

/// Where the scan of one fragment body stopped.
enum FragmentStop {
    /// Closing brace at this byte offset
    Close(usize),
    /// Unquoted opening brace at this byte offset
    Nested(usize),
    /// Text ended inside the fragment
    End,
    /// Body exceeded [`MAX_FRAGMENT_CHARS`]
    TooLong,
}

fn scan_fragment(body: &str) -> FragmentStop {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (count, (idx, ch)) in body.char_indices().enumerate() {
        if quote.is_none() {
            match ch {
                '{' => return FragmentStop::Nested(idx),
                '}' => return FragmentStop::Close(idx),
                _ => {}
            }
        }
        if count == MAX_FRAGMENT_CHARS {
            return FragmentStop::TooLong;
        }
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => {}
        }
    }
    FragmentStop::End
}

/// Bodies of `{...}` fragments in `text`.
///
/// Braces inside quoted strings do not delimit fragments. A final fragment
/// cut off before its closing brace is still returned.
fn fragments(text: &str) -> Vec<&str> {
    let mut bodies = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let body = &rest[open + 1..];
        match scan_fragment(body) {
            FragmentStop::Close(end) => {
                if end > 0 {
                    bodies.push(&body[..end]);
                }
                rest = &body[end + 1..];
            }
            FragmentStop::Nested(start) => rest = &body[start..],
            FragmentStop::End => {
                if !body.is_empty() {
                    bodies.push(body);
                }
                break;
            }
            FragmentStop::TooLong => rest = body,
        }
    }
    bodies
}

/// Multi-tier parser for raw model output.
pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl ResponseParser {
    /// Create a parser with the standard strategy order.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(DirectJson),
                Box::new(BracketedJson),
                Box::new(FragmentSalvage::new()),
            ],
        }
    }

    /// Parse a response. Never fails: unusable input gives an empty outcome.
    pub fn parse(&self, raw: &str) -> ParseOutcome {
        let text = strip_code_fence(raw);
        if text.is_empty() {
            log::warn!("LLM response is empty");
            return ParseOutcome::default();
        }

        for strategy in &self.strategies {
            if let Some(entries) = strategy.attempt(text) {
                log::debug!(
                    "Parsed {} entries ({} strategy)",
                    entries.len(),
                    strategy.tier()
                );
                return ParseOutcome {
                    entries,
                    tier: Some(strategy.tier()),
                };
            }
        }

        log::warn!(
            "Could not parse LLM response: {}",
            text.chars().take(120).collect::<String>()
        );
        ParseOutcome::default()
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a response with a one-off [`ResponseParser`].
pub fn parse_response(raw: &str) -> ParseOutcome {
    ResponseParser::new().parse(raw)
}

/// Remove Markdown code fences and a leading `json` language tag.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string on the opening fence line
        text = match rest.find('\n') {
            Some(pos) if !rest[..pos].contains(['[', '{']) => &rest[pos + 1..],
            _ => rest,
        };
        text = text.trim_end();
        if let Some(rest) = text.strip_suffix("```") {
            text = rest;
        }
        text = text.trim();
    }

    if let Some(tag) = text.get(..4) {
        let rest = &text[4..];
        if tag.eq_ignore_ascii_case("json") && rest.starts_with(['\n', '\r']) {
            text = rest.trim_start();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("json\n[1]"), "[1]");
        assert_eq!(strip_code_fence("JSON\n[1]"), "[1]");
        assert_eq!(strip_code_fence("Json\r\n[1]"), "[1]");
        assert_eq!(strip_code_fence("jsonish [1]"), "jsonish [1]");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
    }

    #[test]
    fn test_direct() {
        let outcome = parse_response(r#"[{"title":"Intro","page":1,"level":1}]"#);
        assert_eq!(outcome.tier, Some(ParseTier::Direct));
        assert_eq!(outcome.entries, vec![TocEntry::new("Intro", 1, 1)]);
    }

    #[test]
    fn test_direct_empty_array_is_success() {
        let outcome = parse_response("[]");
        assert_eq!(outcome.tier, Some(ParseTier::Direct));
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_fenced() {
        let raw = "```json\n[{\"title\": \"Preface\", \"page\": 3, \"level\": 1}]\n```";
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Direct));
        assert_eq!(outcome.entries[0].title, "Preface");
    }

    #[test]
    fn test_uppercase_json_tag_is_direct() {
        let outcome = parse_response("JSON\n[{\"title\": \"Intro\", \"page\": 1, \"level\": 1}]");
        assert_eq!(outcome.tier, Some(ParseTier::Direct));
        assert_eq!(outcome.entries, vec![TocEntry::new("Intro", 1, 1)]);
    }

    #[test]
    fn test_bracketed() {
        let raw = "Here is the table of contents:\n[{\"title\": \"A\", \"page\": 2, \"level\": 1}]\nHope this helps!";
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Bracketed));
        assert_eq!(outcome.entries, vec![TocEntry::new("A", 2, 1)]);
    }

    #[test]
    fn test_salvage_truncated_array() {
        let raw = r#"[{"title": "One", "page": 1, "level": 1}, {"title": "Two", "page": "5", "level": 2}, {"title": "Thr"#;
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Salvaged));
        assert_eq!(
            outcome.entries,
            vec![TocEntry::new("One", 1, 1), TocEntry::new("Two", 5, 2)]
        );
    }

    #[test]
    fn test_salvage_braces_inside_titles() {
        let raw = r#"[{"title": "Sets {A, B}", "page": 3, "level": 1}, {"title": "Maps }x{", "page": 4}, {"title": "Trunc"#;
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Salvaged));
        assert_eq!(
            outcome.entries,
            vec![TocEntry::new("Sets {A, B}", 3, 1), TocEntry::new("Maps }x{", 4, 1)]
        );

        let single = "{'title': 'Braces {}', 'page': 2} {'title': 'Next', 'page': 5";
        assert_eq!(
            parse_response(single).entries,
            vec![TocEntry::new("Braces {}", 2, 1), TocEntry::new("Next", 5, 1)]
        );
    }

    #[test]
    fn test_fragment_bounds() {
        let body = format!("\"title\": \"{}\"", "y".repeat(MAX_FRAGMENT_CHARS - 11));
        assert_eq!(body.chars().count(), MAX_FRAGMENT_CHARS);
        let fits = format!("{{{}}}", body);
        assert_eq!(fragments(&fits), vec![body.as_str()]);

        let too_long = format!("{{{}y}}", body);
        assert!(fragments(&too_long).is_empty());

        assert!(fragments("{} {{}}").is_empty());
        assert_eq!(fragments("{a {b}"), vec!["b"]);
    }

    #[test]
    fn test_salvage_unterminated_last_fragment() {
        let raw = r#"{"title": "Last words", "page": 40, "level": 1"#;
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Salvaged));
        assert_eq!(outcome.entries, vec![TocEntry::new("Last words", 40, 1)]);
    }

    #[test]
    fn test_salvage_single_quotes_and_field_order() {
        let raw = "{'page': 9, 'title': 'It\\'s here', 'level': 2} trailing";
        let outcome = parse_response(raw);
        assert_eq!(outcome.tier, Some(ParseTier::Salvaged));
        assert_eq!(outcome.entries, vec![TocEntry::new("It's here", 9, 2)]);
    }

    #[test]
    fn test_salvage_defaults() {
        let outcome = parse_response(r#"{"title": "No page here"} and more"#);
        assert_eq!(outcome.entries, vec![TocEntry::unresolved("No page here", 1)]);
    }

    #[test]
    fn test_unparseable() {
        for raw in ["", "   ", "I could not find a table of contents.", "{\"foo\": 1}"] {
            let outcome = parse_response(raw);
            assert!(outcome.is_empty(), "{:?}", raw);
            assert_eq!(outcome.tier, None);
        }
    }

    #[test]
    fn test_non_array_json_falls_through() {
        let outcome = parse_response(r#"{"title": "Solo", "page": 2, "level": 1}"#);
        assert_eq!(outcome.tier, Some(ParseTier::Salvaged));
        assert_eq!(outcome.entries.len(), 1);
    }
}
