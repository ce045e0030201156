use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Plugin settings relevant to task status handling.
///
/// Field names follow the plugin's `data.json`; snake_case aliases allow the same
/// settings to be written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSettings {
    #[serde(default = "default_cycle", alias = "task_status_cycle")]
    pub task_status_cycle: Vec<String>,
    #[serde(default = "default_marks", alias = "task_status_marks")]
    pub task_status_marks: IndexMap<String, String>,
    #[serde(
        default,
        alias = "exclude_marks_from_cycle",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclude_marks_from_cycle: Option<Vec<String>>,
    /// Register the cycling transaction filter at all
    #[serde(default, alias = "enable_cycle_complete_status")]
    pub enable_cycle_complete_status: bool,
    /// Use the configured cycle for the status switcher instead of the built-in table
    #[serde(default, alias = "enable_task_status_switcher")]
    pub enable_task_status_switcher: bool,
    /// Keep marks typed over an existing mark instead of cycling from it
    #[serde(default, alias = "respect_manual_marks")]
    pub respect_manual_marks: bool,
}

impl Default for StatusSettings {
    fn default() -> Self {
        StatusSettings {
            task_status_cycle: default_cycle(),
            task_status_marks: default_marks(),
            exclude_marks_from_cycle: None,
            enable_cycle_complete_status: false,
            enable_task_status_switcher: false,
            respect_manual_marks: false,
        }
    }
}

const DEFAULT_STATES: [(&str, &str); 5] = [
    ("Not Started", " "),
    ("In Progress", "/"),
    ("Completed", "x"),
    ("Abandoned", "-"),
    ("Planned", "?"),
];

/// States used by the status switcher when it is not enabled in settings
const SWITCHER_FALLBACK_STATES: [(&str, &str); 4] =
    [("TODO", " "), ("DOING", "-"), ("IN-PROGRESS", ">"), ("DONE", "x")];

fn default_cycle() -> Vec<String> {
    DEFAULT_STATES.iter().map(|(s, _)| s.to_string()).collect()
}

fn default_marks() -> IndexMap<String, String> {
    DEFAULT_STATES
        .iter()
        .map(|(s, m)| (s.to_string(), m.to_string()))
        .collect()
}

/// Immutable snapshot of the status cycle, captured once per transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCycleConfig {
    /// State names in cycle order
    pub cycle: Vec<String>,
    /// State name → mark character
    pub marks: IndexMap<String, String>,
    /// States present in `cycle` but skipped when advancing
    pub exclude_from_cycle: Vec<String>,
    pub respect_manual_marks: bool,
}

impl StatusCycleConfig {
    pub fn from_settings(settings: &StatusSettings) -> Self {
        StatusCycleConfig {
            cycle: settings.task_status_cycle.clone(),
            marks: settings.task_status_marks.clone(),
            exclude_from_cycle: settings.exclude_marks_from_cycle.clone().unwrap_or_default(),
            respect_manual_marks: settings.respect_manual_marks,
        }
    }

    /// Config for the status switcher: the settings cycle when the switcher is enabled,
    /// the built-in table otherwise.
    pub fn for_switcher(settings: &StatusSettings) -> Self {
        if settings.enable_task_status_switcher {
            return StatusCycleConfig::from_settings(settings);
        }
        StatusCycleConfig {
            cycle: SWITCHER_FALLBACK_STATES.iter().map(|(s, _)| s.to_string()).collect(),
            marks: SWITCHER_FALLBACK_STATES
                .iter()
                .map(|(s, m)| (s.to_string(), m.to_string()))
                .collect(),
            exclude_from_cycle: Vec::new(),
            respect_manual_marks: settings.respect_manual_marks,
        }
    }

    /// The cycle without excluded states
    pub fn remaining_cycle(&self) -> Vec<&str> {
        self.cycle
            .iter()
            .filter(|state| !self.exclude_from_cycle.contains(state))
            .map(String::as_str)
            .collect()
    }

    /// Mark for a state, `" "` when the state has none
    pub fn mark_for(&self, state: &str) -> &str {
        self.marks.get(state).map(String::as_str).unwrap_or(" ")
    }

    /// Whether `s` is one of the configured mark values
    pub fn is_mark(&self, s: &str) -> bool {
        self.marks.values().any(|m| m == s)
    }

    /// The first state in the mark table whose mark is `mark`
    pub fn state_for_mark(&self, mark: &str) -> Option<&str> {
        self.marks
            .iter()
            .find(|(_, m)| m.as_str() == mark)
            .map(|(state, _)| state.as_str())
    }

    /// Mark following `current` in the remaining cycle.
    ///
    /// Unknown marks are treated as sitting at index 0. Returns `None` when every state
    /// is excluded.
    pub fn next_mark(&self, current: &str) -> Option<&str> {
        let remaining = self.remaining_cycle();
        if remaining.is_empty() {
            return None;
        }
        let current_idx = remaining
            .iter()
            .position(|state| self.marks.get(*state).is_some_and(|m| m == current))
            .unwrap_or(0);
        let next_state = remaining[(current_idx + 1) % remaining.len()];
        Some(self.mark_for(next_state))
    }
}
