//! Turn detected status changes into a replacement transaction that advances each
//! mark through the configured cycle.

use std::fmt;

use tracing::{debug, trace};

use crate::model::config::StatusCycleConfig;
use crate::model::transaction::{
    Annotation, AnnotationKind, ChangeSpec, Transaction, TransactionSpec,
};
use crate::ops::classify::{TaskStatusChange, find_task_status_changes};
use crate::ops::filter::StatusHost;
use crate::parse::task_line::{has_task_marker, is_fresh_task_creation, is_markdown_link};

/// Why a transaction was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    NoDocChange,
    AlreadyAnnotated,
    BulkSet,
    Paste,
    LinkInsertion,
    DashDeletion,
    NoStatusChange,
    EmptyCycle,
    TaskWithDeletion,
    Indentation,
    LineDeleteOrReplace,
    NothingToRewrite,
    /// Seen by a monitoring filter, which never rewrites
    Observed,
}

impl fmt::Display for PassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PassReason::NoDocChange => "document unchanged",
            PassReason::AlreadyAnnotated => "already annotated",
            PassReason::BulkSet => "bulk set",
            PassReason::Paste => "paste",
            PassReason::LinkInsertion => "link insertion",
            PassReason::DashDeletion => "dash deletion near a checkbox",
            PassReason::NoStatusChange => "no status change",
            PassReason::EmptyCycle => "empty cycle",
            PassReason::TaskWithDeletion => "task edit combined with deletion",
            PassReason::Indentation => "indentation",
            PassReason::LineDeleteOrReplace => "line delete or replace",
            PassReason::NothingToRewrite => "nothing to rewrite",
            PassReason::Observed => "observed",
        };
        f.write_str(s)
    }
}

/// Result of running a transaction through the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filtered {
    /// Apply the original transaction unchanged
    PassThrough(PassReason),
    /// Dispatch this spec instead
    Rewrite(TransactionSpec),
}

impl Filtered {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Filtered::PassThrough(_))
    }

    pub fn spec(&self) -> Option<&TransactionSpec> {
        match self {
            Filtered::Rewrite(spec) => Some(spec),
            Filtered::PassThrough(_) => None,
        }
    }
}

/// Filter one transaction: either pass it through or replace its edits with ones that
/// advance each toggled mark to the next status.
pub fn handle_cycle_transaction(tr: &Transaction, host: &impl StatusHost) -> Filtered {
    let outcome = evaluate(tr, host);
    if let Filtered::PassThrough(reason) = &outcome {
        debug!(%reason, "status cycling skipped");
    }
    outcome
}

fn evaluate(tr: &Transaction, host: &impl StatusHost) -> Filtered {
    if !tr.doc_changed() {
        return Filtered::PassThrough(PassReason::NoDocChange);
    }
    if tr.annotation(AnnotationKind::TaskStatusChange).is_some()
        || tr.annotation(AnnotationKind::PriorityChange).is_some()
    {
        return Filtered::PassThrough(PassReason::AlreadyAnnotated);
    }
    if tr.is_user_event("set") && tr.changes.len() > 1 {
        return Filtered::PassThrough(PassReason::BulkSet);
    }
    if tr.is_user_event("input.paste") {
        return Filtered::PassThrough(PassReason::Paste);
    }
    if tr.is_user_event("input.autocomplete")
        && tr.changes.iter().any(|e| is_markdown_link(&e.inserted))
    {
        return Filtered::PassThrough(PassReason::LinkInsertion);
    }
    if has_suspicious_dash_deletion(tr) {
        return Filtered::PassThrough(PassReason::DashDeletion);
    }

    // Settings are read once; later edits to them apply to the next transaction
    let config = StatusCycleConfig::from_settings(&host.settings());

    let status_changes = find_task_status_changes(tr, host.tasks_api_available(), &config);
    if status_changes.is_empty() {
        return Filtered::PassThrough(PassReason::NoStatusChange);
    }
    if config.remaining_cycle().is_empty() {
        return Filtered::PassThrough(PassReason::EmptyCycle);
    }
    if has_task_and_deletion(tr) {
        return Filtered::PassThrough(PassReason::TaskWithDeletion);
    }
    if is_indentation_change(tr) {
        return Filtered::PassThrough(PassReason::Indentation);
    }
    if is_line_delete_or_replace(tr) {
        return Filtered::PassThrough(PassReason::LineDeleteOrReplace);
    }

    let (changes, completes_task) = rewrite_changes(tr, &config, &status_changes);
    if changes.is_empty() {
        return Filtered::PassThrough(PassReason::NothingToRewrite);
    }
    debug!(count = changes.len(), completes_task, "rewriting task status");
    Filtered::Rewrite(TransactionSpec {
        changes,
        selection: tr.selection,
        annotation: Annotation::task_status_change(),
        completes_task,
    })
}

/// A lone `-` deleted while the edit shifted positions and a checkbox sits nearby:
/// backspacing a bullet, not a status edit.
fn has_suspicious_dash_deletion(tr: &Transaction) -> bool {
    tr.changes.iter().any(|e| {
        e.inserted.is_empty()
            && e.deleted(&tr.start_doc) == "-"
            && (e.from_b != e.from_a || e.to_b != e.to_a)
            && nearby(tr, e.from_b).contains('[')
    })
}

/// New-document text within five bytes either side of `pos`, widened to char boundaries
fn nearby(tr: &Transaction, pos: usize) -> &str {
    let doc = &tr.new_doc;
    let mut from = pos.saturating_sub(5);
    while from > 0 && !doc.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (pos + 5).min(doc.len());
    while to < doc.len() && !doc.is_char_boundary(to) {
        to += 1;
    }
    doc.slice(from, to)
}

/// Several edits where one deletes and one lands on a checkbox line
fn has_task_and_deletion(tr: &Transaction) -> bool {
    if tr.changes.len() <= 1 {
        return false;
    }
    let has_deletion = tr.changes.iter().any(|e| e.is_deletion());
    let touches_task = tr.changes.iter().any(|e| {
        let line = tr.new_doc.line_at(e.from_b);
        line.text.contains('[') && line.text.contains(']')
    });
    has_deletion && touches_task
}

/// A line rewritten with only its leading whitespace changed
fn is_indentation_change(tr: &Transaction) -> bool {
    tr.changes.iter().any(|e| {
        let at_line_start = e.from_a == 0 || tr.start_doc.slice(e.from_a - 1, e.from_a) == "\n";
        if !at_line_start {
            return false;
        }
        let original = tr.start_doc.line_at(e.from_a).text;
        original.trim() == e.inserted.trim() && original.len() != e.inserted.len()
    })
}

/// Deleting the line after a task while keeping the task, or replacing the whole
/// document with a single task line
fn is_line_delete_or_replace(tr: &Transaction) -> bool {
    tr.changes.iter().any(|e| {
        let deleted = e.deleted(&tr.start_doc);
        let inserted = e.inserted.as_str();

        let deletes_following_line = deleted.contains('\n')
            && !inserted.contains('\n')
            && has_task_marker(inserted)
            && has_task_marker(deleted)
            && deleted.contains(inserted.trim());

        let replaces_document = e.from_a == 0
            && e.to_a == tr.start_doc.len()
            && has_task_marker(inserted)
            && !inserted.contains('\n');

        deletes_following_line || replaces_document
    })
}

/// Compute the replacement edits for each detected status change.
///
/// Returns the edits and whether any of them completes a task.
pub(crate) fn rewrite_changes(
    tr: &Transaction,
    config: &StatusCycleConfig,
    status_changes: &[TaskStatusChange],
) -> (Vec<ChangeSpec>, bool) {
    let mut changes = Vec::new();
    let mut completes_task = false;

    for change in status_changes {
        if change.whole_line {
            trace!(position = change.position, "whole task line left as typed");
            continue;
        }
        if change.tasks_info.as_ref().is_some_and(|t| t.is_task_change) {
            trace!(position = change.position, "handled by third-party plugin");
            continue;
        }

        let Some(next_mark) = config.next_mark(&change.current_mark) else {
            continue;
        };
        if next_mark == change.current_mark {
            trace!(mark = next_mark, "mark is already the next in the cycle");
            continue;
        }
        if user_typed_next_mark(tr, config, change.position, next_mark) {
            trace!(mark = next_mark, "user already typed the next mark");
            continue;
        }
        if is_new_empty_task(tr, change) {
            trace!(position = change.position, "new empty task left as is");
            continue;
        }

        let position = change.position;
        let line = tr.new_doc.line_at(position);
        if position < line.from || position >= line.to {
            debug!(position, line_from = line.from, line_to = line.to, "mark position outside its line");
            continue;
        }
        let Some(mark_char) = tr.new_doc.char_at(position) else {
            continue;
        };
        let valid_to = (position + mark_char.len_utf8()).min(line.to);
        if valid_to <= position {
            continue;
        }

        if next_mark == "x" || next_mark == "X" {
            completes_task = true;
        }

        let safe_edit = ChangeSpec::new(position, valid_to, next_mark);
        match &change.tasks_info {
            Some(info) if matches!(next_mark, "x" | "X" | " ") => {
                // Keep the third-party edit (it may carry a completion date) when it
                // stays within one line
                let from_line = tr.start_doc.line_at(info.original_from_a).number;
                let to_line = tr
                    .start_doc
                    .line_at(info.original_to_a.min(tr.start_doc.len()))
                    .number;
                if from_line != to_line {
                    debug!(from_line, to_line, "third-party edit spans lines, using safe range");
                    changes.push(safe_edit);
                } else {
                    changes.push(ChangeSpec::new(
                        info.original_from_a,
                        info.original_to_a,
                        &info.original_inserted_text,
                    ));
                }
            }
            _ => changes.push(safe_edit),
        }
    }

    (changes, completes_task)
}

/// The user's own one-character edit at the mark already equals `next_mark`.
///
/// Overwriting the mark counts as a toggle request unless manual marks are respected,
/// so only inserted characters are matched by default.
fn user_typed_next_mark(
    tr: &Transaction,
    config: &StatusCycleConfig,
    position: usize,
    next_mark: &str,
) -> bool {
    tr.changes.iter().any(|e| {
        e.from_b == position
            && e.inserted.chars().count() == 1
            && e.inserted == next_mark
            && (config.respect_manual_marks || !e.is_replacement())
    })
}

/// An empty checkbox that was just created rather than toggled
fn is_new_empty_task(tr: &Transaction, change: &TaskStatusChange) -> bool {
    if !change.was_complete_task || change.current_mark != " " {
        return false;
    }
    let third_party_text = change
        .tasks_info
        .as_ref()
        .map(|t| t.original_inserted_text.as_str());

    let new_line = tr.new_doc.line_at(change.position).text;
    let original_line = tr
        .start_doc
        .line_at(change.position.min(tr.start_doc.len()))
        .text;

    let box_appeared = third_party_text.is_some_and(|t| t.contains("[ ]"))
        || (new_line.contains("[ ]") && !original_line.contains("[ ]"));
    let typed_new_task = is_fresh_task_creation(&change.inserted)
        || third_party_text.is_some_and(is_fresh_task_creation);

    box_appeared || typed_new_task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::StatusSettings;
    use crate::model::transaction::{Edit, Selection};
    use crate::ops::classify::ThirdPartyEdit;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    struct TestHost {
        settings: StatusSettings,
        tasks_api: bool,
    }

    impl StatusHost for TestHost {
        fn settings(&self) -> StatusSettings {
            self.settings.clone()
        }

        fn tasks_api_available(&self) -> bool {
            self.tasks_api
        }
    }

    fn host_with(states: &[(&str, &str)]) -> TestHost {
        let marks: IndexMap<String, String> = states
            .iter()
            .map(|(s, m)| (s.to_string(), m.to_string()))
            .collect();
        TestHost {
            settings: StatusSettings {
                task_status_cycle: states.iter().map(|(s, _)| s.to_string()).collect(),
                task_status_marks: marks,
                ..StatusSettings::default()
            },
            tasks_api: false,
        }
    }

    fn default_host() -> TestHost {
        host_with(&[("TODO", " "), ("IN_PROGRESS", "/"), ("DONE", "x")])
    }

    fn tr(start: &str, changes: Vec<ChangeSpec>) -> Transaction {
        Transaction::from_edits(start, changes).unwrap()
    }

    fn rewritten(result: &Filtered) -> &TransactionSpec {
        result.spec().expect("expected a rewrite")
    }

    #[test]
    fn test_doc_unchanged_passes_through() {
        let t = tr("- [ ] Task", vec![]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::NoDocChange)
        );
    }

    #[test]
    fn test_annotated_transactions_pass_through() {
        for annotation in [
            Annotation::task_status_change(),
            Annotation::PriorityChange("priorityChange".into()),
        ] {
            let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]).with_annotation(annotation);
            assert_eq!(
                handle_cycle_transaction(&t, &default_host()),
                Filtered::PassThrough(PassReason::AlreadyAnnotated)
            );
        }
    }

    #[test]
    fn test_unrelated_annotation_does_not_block() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]).with_annotation(Annotation::Other {
            name: "remote".into(),
            value: "sync".into(),
        });
        assert!(!handle_cycle_transaction(&t, &default_host()).is_pass_through());
    }

    #[test]
    fn test_bulk_set_passes_through() {
        let t = tr(
            "Line1\nLine2",
            vec![ChangeSpec::new(0, 5, "LineA"), ChangeSpec::new(6, 11, "LineB")],
        )
        .with_user_event("set");
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::BulkSet)
        );
    }

    #[test]
    fn test_paste_passes_through() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]).with_user_event("input.paste");
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::Paste)
        );
    }

    #[test]
    fn test_link_autocomplete_passes_through() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(6, 10, "[Task]()")])
            .with_user_event("input.autocomplete")
            .with_selection(Selection::cursor(12));
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::LinkInsertion)
        );
    }

    #[test]
    fn test_dash_backspace_passes_through() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(0, 1, "")]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::DashDeletion)
        );
    }

    #[test]
    fn test_cycles_through_default_states() {
        for (from, typed, expected) in [(" ", "/", "/"), ("/", "x", "x"), ("x", " ", " ")] {
            let start = format!("- [{}] Task", from);
            let t = tr(&start, vec![ChangeSpec::new(3, 4, typed)]);
            let result = handle_cycle_transaction(&t, &default_host());
            let spec = rewritten(&result);
            assert_eq!(spec.changes, vec![ChangeSpec::new(3, 4, expected)]);
            assert_eq!(spec.annotation, Annotation::task_status_change());
        }
    }

    #[test]
    fn test_completion_is_flagged() {
        let t = tr("- [/] Task", vec![ChangeSpec::new(3, 4, "x")]);
        assert!(rewritten(&handle_cycle_transaction(&t, &default_host())).completes_task);
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]);
        assert!(!rewritten(&handle_cycle_transaction(&t, &default_host())).completes_task);
    }

    #[test]
    fn test_selection_is_carried_over() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]).with_selection(Selection::cursor(4));
        let result = handle_cycle_transaction(&t, &default_host());
        assert_eq!(rewritten(&result).selection, Some(Selection::cursor(4)));
    }

    #[test]
    fn test_inserted_next_mark_is_not_doubled() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 3, "/")]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::NothingToRewrite)
        );
    }

    #[test]
    fn test_respect_manual_marks_keeps_typed_next_mark() {
        let mut host = default_host();
        host.settings.respect_manual_marks = true;
        let t = tr("- [x] Task", vec![ChangeSpec::new(3, 4, " ")]);
        assert!(handle_cycle_transaction(&t, &host).is_pass_through());
        let t = tr("- [x] Task", vec![ChangeSpec::new(3, 4, "a")]);
        assert_eq!(
            handle_cycle_transaction(&t, &host),
            Filtered::PassThrough(PassReason::NoStatusChange)
        );
    }

    #[test]
    fn test_empty_cycle_passes_through() {
        let mut host = default_host();
        host.settings.exclude_marks_from_cycle =
            Some(vec!["TODO".into(), "IN_PROGRESS".into(), "DONE".into()]);
        let t = tr("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]);
        assert_eq!(
            handle_cycle_transaction(&t, &host),
            Filtered::PassThrough(PassReason::EmptyCycle)
        );
    }

    #[test]
    fn test_single_state_cycle_is_a_no_op() {
        let host = host_with(&[("ONLY", "x")]);
        let t = tr("- [x] Task", vec![ChangeSpec::new(3, 4, "/")]);
        assert_eq!(
            handle_cycle_transaction(&t, &host),
            Filtered::PassThrough(PassReason::NothingToRewrite)
        );
    }

    #[test]
    fn test_task_edit_with_deletion_passes_through() {
        let t = tr(
            "- [ ] Task\n- [ ] ",
            vec![ChangeSpec::new(3, 4, "x"), ChangeSpec::new(10, 17, "")],
        );
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::TaskWithDeletion)
        );
    }

    #[test]
    fn test_indent_by_line_rewrite_passes_through() {
        let t = tr("- [ ] Task", vec![ChangeSpec::new(0, 10, "    - [ ] Task")]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::Indentation)
        );
        let t = tr("\t- [ ] Task", vec![ChangeSpec::new(0, 11, "- [ ] Task")]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::Indentation)
        );
    }

    #[test]
    fn test_deleting_line_after_task_passes_through() {
        for (task, indent) in [("- [ ] Task", ""), ("- [x] Task", ""), ("- [ ] Task", "    ")] {
            let start = format!("{}\n{}- ", task, indent);
            let t = tr(&start, vec![ChangeSpec::new(0, start.len() - 1, task)]);
            assert_eq!(
                handle_cycle_transaction(&t, &default_host()),
                Filtered::PassThrough(PassReason::LineDeleteOrReplace),
                "start: {:?}",
                start
            );
        }
    }

    #[test]
    fn test_whole_document_replacement_passes_through() {
        let start = "    - [x] ✅ 2025-04-24";
        let t = tr(start, vec![ChangeSpec::new(0, start.len(), "    - [ ] ")]);
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::LineDeleteOrReplace)
        );
    }

    #[test]
    fn test_third_party_handled_change_is_skipped() {
        let mut host = default_host();
        host.tasks_api = true;
        let t = tr("# Tasks\n- [ ] Task", vec![ChangeSpec::new(8, 18, "- [x] Task ✅ 2025-04-24")]);
        assert_eq!(
            handle_cycle_transaction(&t, &host),
            Filtered::PassThrough(PassReason::NothingToRewrite)
        );
    }

    #[test]
    fn test_task_line_typed_over_plain_line_is_kept() {
        let t = tr("Intro\nSome text", vec![ChangeSpec::new(6, 15, "- [x] Task")])
            .with_user_event("input.type");
        assert_eq!(t.new_doc.as_str(), "Intro\n- [x] Task");
        assert_eq!(
            handle_cycle_transaction(&t, &default_host()),
            Filtered::PassThrough(PassReason::NothingToRewrite)
        );

        // Whatever the mark, nothing is synthesized over the old text
        for mark in [" ", "/", "?"] {
            let line = format!("- [{}] Task", mark);
            let t = tr("Intro\nSome text", vec![ChangeSpec::new(6, 15, &line)]);
            assert!(handle_cycle_transaction(&t, &default_host()).is_pass_through(), "mark {:?}", mark);
        }
    }

    fn third_party_record(position: usize, mark: &str, info: ThirdPartyEdit) -> TaskStatusChange {
        TaskStatusChange {
            position,
            current_mark: mark.to_string(),
            was_complete_task: true,
            inserted: info.original_inserted_text.clone(),
            tasks_info: Some(info),
            whole_line: false,
        }
    }

    #[test]
    fn test_third_party_edit_reused_within_one_line() {
        let config = StatusCycleConfig::from_settings(&default_host().settings);
        let done = "- [x] Task ✅ 2025-04-24";
        let t = tr("- [/] Task", vec![ChangeSpec::new(0, 10, done)]);
        let info = ThirdPartyEdit {
            is_task_change: false,
            original_from_a: 0,
            original_to_a: 10,
            original_from_b: 0,
            original_to_b: done.len(),
            original_inserted_text: done.to_string(),
        };
        let (changes, completes) = rewrite_changes(&t, &config, &[third_party_record(3, "/", info)]);
        assert_eq!(changes, vec![ChangeSpec::new(0, 10, done)]);
        assert!(completes);
    }

    #[test]
    fn test_third_party_edit_spanning_lines_uses_safe_range() {
        let config = StatusCycleConfig::from_settings(&default_host().settings);
        let t = tr("- [/] Task\nnotes", vec![ChangeSpec::new(3, 4, "x")]);
        let info = ThirdPartyEdit {
            is_task_change: false,
            original_from_a: 0,
            original_to_a: 16,
            original_from_b: 0,
            original_to_b: 16,
            original_inserted_text: "- [x] Task\nnotes".to_string(),
        };
        let (changes, _) = rewrite_changes(&t, &config, &[third_party_record(3, "/", info)]);
        assert_eq!(changes, vec![ChangeSpec::new(3, 4, "x")]);
    }

    #[test]
    fn test_out_of_line_position_is_skipped() {
        let config = StatusCycleConfig::from_settings(&default_host().settings);
        let t = Transaction::with_docs("- [ ] Task", "- [x] Task", vec![Edit::new(3, 4, 3, 4, "x")]);
        let record = TaskStatusChange {
            position: 10,
            current_mark: "/".to_string(),
            was_complete_task: true,
            tasks_info: None,
            inserted: "x".to_string(),
            whole_line: false,
        };
        let (changes, _) = rewrite_changes(&t, &config, &[record.clone()]);
        assert!(changes.is_empty());

        // A bad record does not stop the good one after it
        let good = TaskStatusChange {
            position: 3,
            ..record.clone()
        };
        let (changes, _) = rewrite_changes(&t, &config, &[record, good]);
        assert_eq!(changes, vec![ChangeSpec::new(3, 4, "x")]);
    }
}
