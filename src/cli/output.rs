use indexmap::IndexMap;
use serde::Serialize;

use crate::model::config::StatusCycleConfig;
use crate::model::transaction::ChangeSpec;
use crate::ops::filter::TaskCompleted;
use crate::ops::rewrite::Filtered;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FilterJson {
    /// `pass` or `rewrite`
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ChangeSpec>,
    pub completes_task: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed: Vec<CompletedJson>,
    /// The document after the transaction the host would apply
    pub doc: String,
}

#[derive(Serialize)]
pub struct CompletedJson {
    pub line: usize,
    pub text: String,
}

#[derive(Serialize)]
pub struct StateChangeJson {
    pub line: usize,
    pub from_mark: String,
    pub to_mark: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_state: Option<String>,
    pub doc: String,
}

#[derive(Serialize)]
pub struct CycleJson {
    pub cycle: Vec<String>,
    pub marks: IndexMap<String, String>,
    pub excluded: Vec<String>,
    pub remaining: Vec<String>,
}

#[derive(Serialize)]
pub struct ConfigJson {
    pub enable_cycle_complete_status: bool,
    pub enable_task_status_switcher: bool,
    pub respect_manual_marks: bool,
    pub cycler: CycleJson,
    pub switcher: CycleJson,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn filter_to_json(result: &Filtered, completed: &[TaskCompleted], doc: String) -> FilterJson {
    let completed = completed
        .iter()
        .map(|c| CompletedJson {
            line: c.line_number,
            text: c.line_text.clone(),
        })
        .collect();
    match result {
        Filtered::PassThrough(reason) => FilterJson {
            outcome: "pass",
            reason: Some(reason.to_string()),
            changes: Vec::new(),
            completes_task: false,
            completed,
            doc,
        },
        Filtered::Rewrite(spec) => FilterJson {
            outcome: "rewrite",
            reason: None,
            changes: spec.changes.clone(),
            completes_task: spec.completes_task,
            completed,
            doc,
        },
    }
}

pub fn cycle_to_json(config: &StatusCycleConfig) -> CycleJson {
    CycleJson {
        cycle: config.cycle.clone(),
        marks: config.marks.clone(),
        excluded: config.exclude_from_cycle.clone(),
        remaining: config.remaining_cycle().into_iter().map(String::from).collect(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Cycle as `TODO [ ] → DOING [-] → …`, excluded states in parentheses
pub fn format_cycle(config: &StatusCycleConfig) -> String {
    config
        .cycle
        .iter()
        .map(|state| {
            let entry = format!("{} [{}]", state, config.mark_for(state));
            if config.exclude_from_cycle.contains(state) {
                format!("({})", entry)
            } else {
                entry
            }
        })
        .collect::<Vec<_>>()
        .join(" → ")
}

pub fn format_change(change: &ChangeSpec) -> String {
    format!("{}..{} {:?}", change.from, change.to, change.insert)
}
