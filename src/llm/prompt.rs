//! Prompt text for TOC extraction.

/// Instructions sent with every extraction pass.
pub const SYSTEM_PROMPT: &str = "\
You are a table-of-contents extraction assistant. Extract the table of contents \
from the provided PDF page text (and page images, when present).

Rules:
1. Identify the title, page number and nesting level of every TOC item.
2. Ignore running headers, footers and the page numbers of the TOC pages themselves.
3. Infer the level from indentation or numbering (1 = top level).
4. If an item has no discernible page number, use -1.
5. Only extract real TOC items; ignore any other content.

Output a JSON array only. Each element has exactly three fields:
- title: item title (string)
- page: page number (integer)
- level: nesting level starting at 1 (integer)

Example:
[{\"title\": \"Chapter 1 Introduction\", \"page\": 1, \"level\": 1}, {\"title\": \"1.1 Background\", \"page\": 2, \"level\": 2}]

Do not add explanations or any text before or after the JSON.";

/// Format one page for the user prompt. `page` is 1-based.
pub fn page_section(page: u32, text: &str) -> String {
    format!("=== Page {} ===\n{}", page, text.trim_end())
}

/// Build the user prompt from already formatted page sections.
pub fn user_prompt(sections: &[String]) -> String {
    format!(
        "Extract the table of contents from the following PDF pages:\n\n{}",
        sections.join("\n\n")
    )
}

/// Whether a model accepts image input, judged by its name.
pub fn supports_vision(model: &str) -> bool {
    let model = model.to_lowercase();
    model.starts_with("gpt-4") || model.contains("omni") || model.contains("vl")
}
