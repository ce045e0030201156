//! Decide which edits of a transaction change a task's status mark.

use tracing::{debug, trace};

use crate::model::config::StatusCycleConfig;
use crate::model::transaction::{Edit, Transaction};
use crate::parse::task_line::{
    bracket_interior, has_third_party_glyph, is_task_line, is_task_prefix, match_task_line,
};

/// The original edit, kept when a third-party task plugin appears to have produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThirdPartyEdit {
    /// The third-party plugin already handled this change
    pub is_task_change: bool,
    pub original_from_a: usize,
    pub original_to_a: usize,
    pub original_from_b: usize,
    pub original_to_b: usize,
    pub original_inserted_text: String,
}

impl ThirdPartyEdit {
    fn from_edit(edit: &Edit) -> Self {
        ThirdPartyEdit {
            is_task_change: true,
            original_from_a: edit.from_a,
            original_to_a: edit.to_a,
            original_from_b: edit.from_b,
            original_to_b: edit.to_b,
            original_inserted_text: edit.inserted.clone(),
        }
    }
}

/// An edit that looks like a change to a task's status mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusChange {
    /// Offset of the mark in the new document
    pub position: usize,
    /// The mark before the edit
    pub current_mark: String,
    pub was_complete_task: bool,
    pub tasks_info: Option<ThirdPartyEdit>,
    /// Text inserted by the edit that produced this record
    pub inserted: String,
    /// A whole task line typed or dropped over a non-task line. The line is kept as
    /// inserted and never cycled.
    pub whole_line: bool,
}

/// Scan a transaction for task status changes.
///
/// Returns one record per edit that changes (or appears to change) a status mark. An
/// empty result means the transaction should be left alone.
pub fn find_task_status_changes(
    tr: &Transaction,
    third_party_active: bool,
    config: &StatusCycleConfig,
) -> Vec<TaskStatusChange> {
    if is_multi_line_indentation(tr) {
        debug!("multi-line indentation change, no status change");
        return Vec::new();
    }
    if deletes_leading_dash(tr) {
        debug!("leading dash deleted, no status change");
        return Vec::new();
    }

    tr.changes
        .iter()
        .filter_map(|edit| classify_edit(tr, edit, third_party_active, config))
        .collect()
}

/// Every edit indents or outdents by one tab or four spaces
fn is_multi_line_indentation(tr: &Transaction) -> bool {
    if tr.changes.len() <= 1 {
        return false;
    }
    let is_indent = |s: &str| s == "\t" || s == "    ";
    tr.changes.iter().all(|edit| {
        is_indent(&edit.inserted) || (edit.inserted.is_empty() && is_indent(edit.deleted(&tr.start_doc)))
    })
}

/// Some edit removes a `-` with nothing but whitespace before it on its line
fn deletes_leading_dash(tr: &Transaction) -> bool {
    tr.changes.iter().any(|edit| {
        if !edit.is_deletion() || edit.deleted(&tr.start_doc) != "-" {
            return false;
        }
        let line = tr.start_doc.line_at(edit.from_a);
        line.text[..edit.from_a - line.from].trim().is_empty()
    })
}

fn classify_edit(
    tr: &Transaction,
    edit: &Edit,
    third_party_active: bool,
    config: &StatusCycleConfig,
) -> Option<TaskStatusChange> {
    let inserted = edit.inserted.as_str();

    if inserted.contains('\n') {
        trace!("multi-line insert, skipping");
        return None;
    }
    if inserted.contains("[[") || inserted.contains("]]") {
        trace!("wiki link insert, skipping");
        return None;
    }
    if edit.from_b > tr.start_doc.len() {
        return None;
    }

    let pos = edit.from_b;
    let original_line = tr.start_doc.line_at(pos);
    if original_line.text.trim().is_empty() {
        return None;
    }
    let new_line = tr.new_doc.line_at(pos);

    let original_match = match_task_line(original_line.text);
    let new_match = match_task_line(new_line.text);

    // A whole task line replaced a non-task line in one go
    if let Some(new_task) = new_match
        && original_match.is_none()
        && inserted == new_line.text
    {
        debug!(position = pos, "whole task line inserted");
        return Some(TaskStatusChange {
            position: new_line.from + bracket_interior(new_line.text),
            current_mark: new_task.mark.to_string(),
            was_complete_task: true,
            tasks_info: None,
            inserted: inserted.to_string(),
            whole_line: true,
        });
    }

    let original_task = original_match?;

    let position = if is_task_prefix(inserted.trim()) {
        // A complete task inserted at once, e.g. "- [x]"
        Some(new_line.from + bracket_interior(new_line.text))
    } else if inserted.chars().count() == 1 {
        // Just the mark character
        let typing_into_empty_box = original_task.mark == " "
            && inserted.chars().all(|c| c.is_ascii_alphabetic())
            && !config.is_mark(inserted);

        if pos != new_line.from + bracket_interior(new_line.text)
            || inserted == "["
            || typing_into_empty_box
        {
            None
        } else {
            if edit.is_replacement() {
                let replaced = edit.deleted(&tr.start_doc);
                if !is_valid_task_marker_replacement(edit, replaced, new_line.text, config) {
                    debug!(
                        replaced,
                        inserted, "manual mark replacement, skipping automatic cycling"
                    );
                    return None;
                }
            }
            Some(pos)
        }
    } else if inserted.contains('[') && inserted.contains(']') && inserted != "[]" {
        // Several characters including a bracket pair
        Some(new_line.from + bracket_interior(new_line.text))
    } else {
        None
    };

    let triggered_by_third_party = third_party_active
        && new_line.text == inserted
        && (has_third_party_glyph(inserted) || has_third_party_glyph(original_line.text));

    let position = position?;
    debug!(
        position,
        mark = original_task.mark,
        third_party = triggered_by_third_party,
        "task status change detected"
    );
    Some(TaskStatusChange {
        position,
        current_mark: original_task.mark.to_string(),
        was_complete_task: true,
        tasks_info: triggered_by_third_party.then(|| ThirdPartyEdit::from_edit(edit)),
        inserted: inserted.to_string(),
        whole_line: false,
    })
}

/// Whether overwriting one character of a checkbox is a deliberate status edit.
///
/// Typing a non-mark character over an empty checkbox is never one. Under
/// `respect_manual_marks`, both characters must also be marks (or spaces), so a hand
/// typed arbitrary mark is kept as typed.
pub fn is_valid_task_marker_replacement(
    edit: &Edit,
    replaced: &str,
    new_line_text: &str,
    config: &StatusCycleConfig,
) -> bool {
    if edit.to_a - edit.from_a != replaced.len()
        || replaced.chars().count() != 1
        || edit.inserted.chars().count() != 1
    {
        return false;
    }
    let inserted = edit.inserted.as_str();
    let is_mark_or_space = |s: &str| s == " " || config.is_mark(s);

    if config.respect_manual_marks && (!is_mark_or_space(replaced) || !is_mark_or_space(inserted)) {
        return false;
    }
    if replaced == " " && !is_mark_or_space(inserted) {
        return false;
    }
    is_task_line(new_line_text)
}
