//! Code block extraction from model output.
//!
//! Fences are paired in order of appearance, so a block always ends at the
//! next fence and never swallows the prose or blocks after it.
//!
//! Two passes:
//! 1. Blocks whose opening fence line is `r`/`R` (or an R Markdown chunk
//!    header such as `{r}`). If any non-empty block is found, those are the
//!    result.
//! 2. Otherwise every block, skipping those whose first line names a
//!    different language and dropping a first line that is an R tag.
//!
//! Text without fences yields an empty list; that is a normal outcome.

use regex::Regex;
use sdk::CodeBlock;
use std::sync::OnceLock;

/// First-line tags that mark a block as not R
const FOREIGN_LANGUAGES: &[&str] = &[
    "python", "python3", "py", "javascript", "js", "typescript", "ts", "bash", "sh", "shell",
    "console", "sql", "json", "yaml", "yml", "html", "css", "java", "c", "cpp", "c++", "rust",
    "go",
];

static FENCED_BLOCK: OnceLock<Regex> = OnceLock::new();

fn fenced_block() -> &'static Regex {
    FENCED_BLOCK.get_or_init(|| Regex::new(r"(?s)```(.*?)```").expect("Invalid fenced block pattern"))
}

/// Inner text of every fenced block, in order
fn fence_contents(text: &str) -> impl Iterator<Item = &str> {
    fenced_block()
        .captures_iter(text)
        .filter_map(|caps| Some(caps.get(1)?.as_str()))
}

/// Split at the first line break into (trimmed first line, rest)
fn split_tag(inner: &str) -> (&str, &str) {
    match inner.split_once('\n') {
        Some((tag, rest)) => (tag.trim(), rest),
        None => (inner.trim(), ""),
    }
}

/// Extract the ordered list of R code blocks from raw model output
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let tagged: Vec<CodeBlock> = fence_contents(text)
        .map(split_tag)
        .filter(|(tag, _)| is_r_tag(tag))
        .filter_map(|(_, body)| non_empty(body))
        .map(CodeBlock::r)
        .collect();

    if !tagged.is_empty() {
        return tagged;
    }

    fence_contents(text)
        .filter_map(|inner| {
            let body = non_empty(inner)?;
            let (tag, rest) = split_tag(body);

            if is_r_tag(tag) {
                return non_empty(rest);
            }
            if is_foreign_tag(tag) {
                return None;
            }
            Some(body)
        })
        .map(CodeBlock::r)
        .collect()
}

/// `r`, `R`, `{r}` or a chunk header with options such as `{r, echo=FALSE}`
fn is_r_tag(tag: &str) -> bool {
    if tag == "r" || tag == "R" {
        return true;
    }
    let Some(chunk) = tag.strip_prefix('{').and_then(|t| t.strip_suffix('}')) else {
        return false;
    };
    let mut chars = chunk.chars();
    matches!(chars.next(), Some('r' | 'R')) && matches!(chars.next(), None | Some(' ' | ','))
}

fn is_foreign_tag(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    FOREIGN_LANGUAGES.contains(&tag.as_str())
}

fn non_empty(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
