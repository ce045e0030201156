pub mod task_line;

pub use task_line::{match_switcher_task, match_task_line};
