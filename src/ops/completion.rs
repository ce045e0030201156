//! Watches transactions for tasks moving to a completed mark and reports them to the
//! host. The transaction itself is never changed.

use tracing::{debug, trace};

use crate::model::transaction::{AnnotationKind, Transaction};
use crate::ops::filter::{StatusHost, TaskCompleted, TransactionFilter};
use crate::ops::rewrite::{Filtered, PassReason};
use crate::parse::task_line::{is_completed_task_line, is_task_line, task_body};

/// Deleted or inserted text shorter than this (trimmed, in chars) is never a line move
const MIN_MOVED_CHARS: usize = 10;

/// Reports completed tasks through [`StatusHost::task_completed`]
#[derive(Debug)]
pub struct CompletionMonitor<H> {
    host: H,
}

impl<H: StatusHost> CompletionMonitor<H> {
    pub fn new(host: H) -> Self {
        CompletionMonitor { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: StatusHost> TransactionFilter for CompletionMonitor<H> {
    fn filter(&self, tr: &Transaction) -> Filtered {
        for event in completed_tasks(tr) {
            debug!(line = event.line_number, "task completed");
            self.host.task_completed(&event);
        }
        Filtered::PassThrough(PassReason::Observed)
    }
}

/// Task lines that `tr` turns from an incomplete task into a completed one.
///
/// Bulk `set` edits, pastes and line moves report nothing. Neither do transactions
/// produced by status cycling, whose completions the cycler reports itself.
pub fn completed_tasks(tr: &Transaction) -> Vec<TaskCompleted> {
    if !tr.doc_changed() {
        return Vec::new();
    }
    if tr.is_user_event("set") && tr.changes.len() > 1 {
        trace!("bulk set, not monitored");
        return Vec::new();
    }
    if tr.is_user_event("input.paste") {
        trace!("paste, not monitored");
        return Vec::new();
    }
    if tr.annotation(AnnotationKind::TaskStatusChange).is_some() {
        trace!("status cycling transaction, already reported");
        return Vec::new();
    }
    if is_move_operation(tr) {
        debug!("line move, not monitored");
        return Vec::new();
    }

    let mut completed: Vec<TaskCompleted> = Vec::new();
    for edit in tr.changes.iter().filter(|e| !e.inserted.is_empty()) {
        let first = tr.new_doc.line_at(edit.from_b).number;
        let last = tr.new_doc.line_at(edit.to_b).number;

        for n in first..=last {
            let Some(line) = tr.new_doc.line(n) else {
                continue;
            };
            if !is_completed_task_line(line.text) {
                continue;
            }
            if completed.iter().any(|c| c.line_number == line.number) {
                continue;
            }
            let before = matching_deleted_task(tr, line.text)
                .unwrap_or_else(|| tr.start_doc.line_at(map_to_start(tr, line.from)).text);

            if is_task_line(before) && !is_completed_task_line(before) {
                completed.push(TaskCompleted {
                    line_number: line.number,
                    line_text: line.text.to_string(),
                });
                break;
            }
        }
    }
    completed
}

/// A deleted task line with the same body as `new_line`, if any edit removed one
fn matching_deleted_task<'a>(tr: &'a Transaction, new_line: &str) -> Option<&'a str> {
    let body = task_body(new_line)?;
    tr.changes
        .iter()
        .filter(|e| e.is_replacement())
        .flat_map(|e| e.deleted(&tr.start_doc).split('\n'))
        .find(|deleted| task_body(deleted) == Some(body))
}

/// Map a new-document offset back to the start document. Offsets inside inserted
/// text map to the start of the replaced range.
fn map_to_start(tr: &Transaction, pos: usize) -> usize {
    let mut shift: isize = 0;
    for edit in &tr.changes {
        if pos < edit.from_b {
            break;
        }
        if pos <= edit.to_b {
            return edit.from_a;
        }
        shift += (edit.to_b - edit.from_b) as isize - (edit.to_a - edit.from_a) as isize;
    }
    pos.saturating_add_signed(-shift).min(tr.start_doc.len())
}

/// Several edits where some deleted text reappears, line for line, as inserted text
fn is_move_operation(tr: &Transaction) -> bool {
    if tr.changes.len() <= 1 {
        return false;
    }
    let deleted: Vec<&str> = tr
        .changes
        .iter()
        .filter(|e| e.is_replacement())
        .map(|e| e.deleted(&tr.start_doc))
        .collect();
    let inserted: Vec<&str> = tr
        .changes
        .iter()
        .filter(|e| !e.inserted.is_empty())
        .map(|e| e.inserted.as_str())
        .collect();

    deleted.iter().any(|d| {
        inserted
            .iter()
            .any(|i| is_substantial(d) && is_substantial(i) && same_lines(d, i))
    })
}

fn is_substantial(text: &str) -> bool {
    text.trim().chars().count() >= MIN_MOVED_CHARS
}

/// Same non-blank lines, ignoring surrounding whitespace
fn same_lines(a: &str, b: &str) -> bool {
    let a = content_lines(a);
    !a.is_empty() && a == content_lines(b)
}

fn content_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(str::trim).filter(|l| !l.is_empty()).collect()
}
