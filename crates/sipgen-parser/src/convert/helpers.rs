//! Shared conversion helpers: positions, doc comments, text cleanup.

use ast_grep_core::Node;
use sipgen_model::SourceRange;

/// Byte offset → 1-based line/column lookup.
pub(super) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(super) fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|start| *start <= offset).max(1);
        let column = offset - self.starts[line - 1] + 1;
        (to_u32(line), to_u32(column))
    }

    pub(super) fn span(&self, range: std::ops::Range<usize>) -> SourceRange {
        let (start_line, start_column) = self.position(range.start);
        let (end_line, end_column) = self.position(range.end);
        SourceRange {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Collapse runs of whitespace into single spaces.
pub(super) fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Doc comment (`///`, `//!`, `/** */`, `/*! */`) directly above `siblings[idx]`.
pub(super) fn doc_comment<D: ast_grep_core::Doc>(siblings: &[Node<D>], idx: usize) -> Option<String> {
    let mut comments = Vec::new();
    let mut next_start = siblings[idx].start_pos().line();

    let mut i = idx;
    while i > 0 {
        i -= 1;
        let sibling = &siblings[i];
        if sibling.kind().as_ref() != "comment" {
            break;
        }
        if next_start > sibling.end_pos().line() + 1 {
            break;
        }
        let text = sibling.text();
        if !is_doc_comment(&text) {
            break;
        }
        let stripped = strip_comment(&text);
        if !stripped.is_empty() {
            comments.push(stripped);
        }
        next_start = sibling.start_pos().line();
    }
    comments.reverse();
    (!comments.is_empty()).then(|| comments.join("\n"))
}

fn is_doc_comment(text: &str) -> bool {
    let text = text.trim_start();
    (text.starts_with("///") && !text.starts_with("////"))
        || text.starts_with("//!")
        || (text.starts_with("/**") && !text.starts_with("/**/"))
        || text.starts_with("/*!")
}

fn strip_comment(text: &str) -> String {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("//") {
        return rest.trim_start_matches(['/', '!', '<']).trim().to_string();
    }
    let inner = text
        .strip_prefix("/**")
        .or_else(|| text.strip_prefix("/*!"))
        .unwrap_or(text);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    inner
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            let stripped = trimmed
                .strip_prefix("* ")
                .unwrap_or_else(|| trimmed.strip_prefix('*').unwrap_or(trimmed));
            stripped.trim()
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
