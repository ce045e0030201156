pub mod classify;
pub mod completion;
pub mod filter;
pub mod rewrite;
pub mod switcher;

pub use classify::{TaskStatusChange, ThirdPartyEdit, find_task_status_changes};
pub use completion::{CompletionMonitor, completed_tasks};
pub use filter::{
    FilterChain, StatusCycler, StatusHost, TaskCompleted, TransactionFilter,
    cycle_complete_status_extension,
};
pub use rewrite::{Filtered, PassReason, handle_cycle_transaction};
