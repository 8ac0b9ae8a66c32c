//! Line-based TOC recognition used when the model returns nothing usable.

use std::collections::HashSet;

use regex::Regex;

use crate::model::TocEntry;

/// Recognizes numbered TOC lines such as `1.2  Background ........ 14`.
pub struct HeuristicParser {
    line: Regex,
    leader: Regex,
}

impl HeuristicParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            line: Regex::new(r"^(\s*)(\d+(?:\.\d+)*)\.?\s+(.+?)\s+(\d+)$").unwrap(),
            leader: Regex::new(r"[\s.·…_]+$").unwrap(),
        }
    }

    /// Parse page text into entries, deduplicated and sorted by page.
    ///
    /// Level is the number of numbering segments. Single-segment numbering
    /// gains one level per four columns of indentation.
    pub fn parse(&self, text: &str) -> Vec<TocEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for line in text.lines() {
            let Some(caps) = self.line.captures(line.trim_end()) else {
                continue;
            };

            let title = self.leader.replace(&caps[3], "").trim().to_string();
            if title.is_empty() {
                continue;
            }
            let Ok(page) = caps[4].parse::<i64>() else {
                continue;
            };

            let segments = caps[2].split('.').count() as u32;
            let level = if segments == 1 {
                1 + indent_width(&caps[1]) / 4
            } else {
                segments
            };

            if seen.insert((title.clone(), page)) {
                entries.push(TocEntry::new(title, page, level));
            }
        }

        entries.sort_by_key(|entry| entry.page);
        log::debug!("Heuristic parser found {} entries", entries.len());
        entries
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

fn indent_width(indent: &str) -> u32 {
    indent
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}
