//! Editor-facing adapter: registers status cycling as a transaction filter.

use tracing::debug;

use crate::model::config::StatusSettings;
use crate::model::transaction::{Transaction, TransactionError, TransactionSpec, apply_changes};
use crate::ops::rewrite::{Filtered, handle_cycle_transaction};
use crate::parse::task_line::is_completed_task_line;

/// Inspects a transaction before it is applied
pub trait TransactionFilter {
    fn filter(&self, tr: &Transaction) -> Filtered;
}

/// A task moved to a completed mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompleted {
    /// 1-based line number in the rewritten document
    pub line_number: usize,
    pub line_text: String,
}

/// What status cycling needs from the editor hosting it
pub trait StatusHost {
    /// A snapshot of the current settings
    fn settings(&self) -> StatusSettings;

    /// Whether a Tasks-compatible plugin is loaded
    fn tasks_api_available(&self) -> bool {
        false
    }

    /// Called once per completed task line
    fn task_completed(&self, _event: &TaskCompleted) {}
}

impl<T: StatusHost + ?Sized> StatusHost for &T {
    fn settings(&self) -> StatusSettings {
        (**self).settings()
    }

    fn tasks_api_available(&self) -> bool {
        (**self).tasks_api_available()
    }

    fn task_completed(&self, event: &TaskCompleted) {
        (**self).task_completed(event)
    }
}

/// The status cycling filter bound to its host
#[derive(Debug)]
pub struct StatusCycler<H> {
    host: H,
}

impl<H: StatusHost> StatusCycler<H> {
    pub fn new(host: H) -> Self {
        StatusCycler { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn notify_completions(&self, tr: &Transaction, spec: &TransactionSpec) {
        let (doc, edits) = match apply_changes(&tr.start_doc, spec.changes.clone()) {
            Ok(applied) => applied,
            Err(e) => {
                debug!(error = %e, "rewritten changes do not apply, no completion events");
                return;
            }
        };
        for edit in &edits {
            let line = doc.line_at(edit.from_b);
            if is_completed_task_line(line.text) {
                self.host.task_completed(&TaskCompleted {
                    line_number: line.number,
                    line_text: line.text.to_string(),
                });
            }
        }
    }
}

impl<H: StatusHost> TransactionFilter for StatusCycler<H> {
    fn filter(&self, tr: &Transaction) -> Filtered {
        let result = handle_cycle_transaction(tr, &self.host);
        if let Filtered::Rewrite(spec) = &result
            && spec.completes_task
        {
            self.notify_completions(tr, spec);
        }
        result
    }
}

/// The cycling filter, or `None` when `enableCycleCompleteStatus` is off.
pub fn cycle_complete_status_extension<H: StatusHost>(host: H) -> Option<StatusCycler<H>> {
    if !host.settings().enable_cycle_complete_status {
        debug!("cycle complete status disabled");
        return None;
    }
    Some(StatusCycler::new(host))
}

/// Runs filters in order, each seeing the transaction produced by the one before
#[derive(Default)]
pub struct FilterChain<'a> {
    filters: Vec<Box<dyn TransactionFilter + 'a>>,
}

impl<'a> FilterChain<'a> {
    pub fn new() -> Self {
        FilterChain {
            filters: Vec::new(),
        }
    }

    pub fn push(&mut self, filter: impl TransactionFilter + 'a) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The transaction the host should apply
    pub fn run(&self, tr: Transaction) -> Result<Transaction, TransactionError> {
        let mut current = tr;
        for filter in &self.filters {
            if let Filtered::Rewrite(spec) = filter.filter(&current) {
                current = Transaction::from_spec(current.start_doc.clone(), &spec)?;
            }
        }
        Ok(current)
    }
}
