//! Locked-region contract over the editable rule document.
//!
//! The first `8 + |parameters|` lines of the document are immutable
//! scaffold (doc comment + signature); everything after is author-editable
//! down to the closing brace of the `configure` body. Read-only enforcement
//! is advisory UI behavior, not a security boundary.

use crate::error::RuleError;
use crate::schema::Parameter;

/// Number of locked scaffold lines for the given parameter set.
pub fn locked_line_count(parameters: &[Parameter]) -> usize {
    8 + parameters.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A line-based selection or cursor range in the editor, inclusive on both
/// ends (a bare cursor has `start_line == end_line`).
pub struct Selection {
    pub start_line: usize,
    pub end_line: usize,
}

impl Selection {
    pub fn cursor(line: usize) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }
}

/// True if any part of the selection intersects the locked region
/// `[0, locked]`. While true, the editing surface must reject mutating
/// keystrokes in that range.
pub fn is_selection_locked(selection: Selection, locked: usize) -> bool {
    selection.start_line.min(selection.end_line) <= locked
}

/// Extracts the author-written body from a full document.
///
/// Scans forward from the lock boundary counting braces per line; the line
/// that drives the running balance to -1 is the function's closing brace,
/// and extraction stops immediately before it. A document whose balance
/// never reaches -1 is malformed and rejected rather than guessed at.
pub fn extract_user_body(document: &str, locked: usize) -> Result<String, RuleError> {
    let lines: Vec<&str> = document.lines().collect();
    match closing_brace_line(&lines, locked) {
        Some(end) => Ok(lines[locked..end].join("\n").trim().to_string()),
        None => Err(RuleError::Extraction(
            "no closing brace found for the rule body; fix the braces before saving".to_string(),
        )),
    }
}

/// Lenient body slice used when regenerating the scaffold around an
/// in-progress body: falls back to everything up to the last line,
/// exclusive, when the closing brace cannot be located. Never used on the
/// save path.
pub(crate) fn body_slice(document: &str, locked: usize) -> String {
    let lines: Vec<&str> = document.lines().collect();
    let end = closing_brace_line(&lines, locked).unwrap_or_else(|| lines.len().saturating_sub(1));
    if locked >= end {
        return String::new();
    }
    lines[locked..end].join("\n").trim_end().to_string()
}

fn closing_brace_line(lines: &[&str], locked: usize) -> Option<usize> {
    let mut balance: i64 = 0;
    for (offset, line) in lines.iter().enumerate().skip(locked) {
        for ch in line.chars() {
            match ch {
                '{' => balance += 1,
                '}' => balance -= 1,
                _ => {}
            }
        }
        if balance == -1 {
            return Some(offset);
        }
    }
    None
}

/// Capability interface the core expects from the code-editing widget.
/// No specific editor product is assumed.
pub trait EditorSurface {
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str);
    fn selection(&self) -> Selection;
    /// Marks lines `[0, locked]` read-only, with a message shown when the
    /// author attempts to edit inside the region.
    fn set_locked_region(&mut self, locked: usize, message: &str);
}

#[derive(Debug, Default)]
/// In-memory editor surface used by tests and the session layer.
pub struct MemoryEditor {
    text: String,
    selection: Selection,
    locked: usize,
    lock_message: String,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(0)
    }
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked_lines(&self) -> usize {
        self.locked
    }

    pub fn lock_message(&self) -> &str {
        &self.lock_message
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }
}

impl EditorSurface for MemoryEditor {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_locked_region(&mut self, locked: usize, message: &str) {
        self.locked = locked;
        self.lock_message = message.to_string();
    }
}
