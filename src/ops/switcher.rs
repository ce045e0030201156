//! Explicit status changes on a task's checkbox: cycle, set, or jump to an end state.

use std::ops::Range;

use tracing::debug;

use crate::model::config::StatusCycleConfig;
use crate::model::document::Text;
use crate::model::transaction::{Annotation, ChangeSpec, Selection, TransactionSpec};
use crate::parse::task_line::{find_checkbox, match_switcher_task};

/// A task checkbox found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpan {
    /// Document range from the bullet through the closing `]`
    pub span: Range<usize>,
    pub bullet: String,
    pub mark: String,
    /// 1-based line number
    pub line: usize,
}

/// Every task line of `doc` that the switcher can act on
pub fn find_task_spans(doc: &Text) -> Vec<TaskSpan> {
    (1..=doc.line_count())
        .filter_map(|n| {
            let line = doc.line(n)?;
            let task = match_switcher_task(line.text)?;
            Some(TaskSpan {
                span: line.from + task.span.start..line.from + task.span.end,
                bullet: task.bullet.to_string(),
                mark: task.mark.to_string(),
                line: line.number,
            })
        })
        .collect()
}

/// The task span on a given 1-based line, if that line is a task
pub fn task_span_at_line(doc: &Text, line: usize) -> Option<TaskSpan> {
    find_task_spans(doc).into_iter().find(|t| t.line == line)
}

/// State name whose mark is `mark`
pub fn task_state_of<'a>(mark: &str, config: &'a StatusCycleConfig) -> Option<&'a str> {
    config.state_for_mark(mark)
}

/// Advance the checkbox in `span` to the next state of the remaining cycle.
///
/// The cursor is placed just after the span.
pub fn cycle_task_state(
    doc: &Text,
    span: Range<usize>,
    config: &StatusCycleConfig,
) -> Option<TransactionSpec> {
    let current = doc.slice(span.start, span.end);
    let (_, mark) = find_checkbox(current)?;
    let Some(next_mark) = config.next_mark(mark) else {
        debug!("every state is excluded from the cycle");
        return None;
    };
    let cursor = (span.end + 1).min(doc.len());
    let mut spec = replace_mark(doc, span, next_mark)?;
    spec.selection = Some(Selection::cursor(cursor));
    Some(spec)
}

/// Write the mark of `state` into the checkbox in `span`.
pub fn set_task_state(
    doc: &Text,
    span: Range<usize>,
    state: &str,
    config: &StatusCycleConfig,
) -> Option<TransactionSpec> {
    replace_mark(doc, span, config.mark_for(state))
}

/// Jump to the last state of the cycle, or back to the first when already there.
pub fn jump_task_state(
    doc: &Text,
    span: Range<usize>,
    config: &StatusCycleConfig,
) -> Option<TransactionSpec> {
    let (first, last) = (config.cycle.first()?, config.cycle.last()?);
    let (_, mark) = find_checkbox(doc.slice(span.start, span.end))?;

    let remaining = config.remaining_cycle();
    let current = config
        .state_for_mark(mark)
        .or_else(|| remaining.first().copied());

    let target = if current == Some(last.as_str()) { first } else { last };
    set_task_state(doc, span, target, config)
}

fn replace_mark(doc: &Text, span: Range<usize>, mark: &str) -> Option<TransactionSpec> {
    if span.start > span.end || span.end > doc.len() {
        return None;
    }
    let current = doc.slice(span.start, span.end);
    let (range, old) = find_checkbox(current)?;
    debug!(from = old, to = mark, "switching task state");

    let mut text = String::with_capacity(current.len() + mark.len());
    text.push_str(&current[..range.start]);
    text.push_str(mark);
    text.push_str(&current[range.end..]);

    Some(TransactionSpec {
        changes: vec![ChangeSpec::new(span.start, span.end, &text)],
        selection: None,
        annotation: Annotation::task_status_change(),
        completes_task: mark == "x" || mark == "X",
    })
}
