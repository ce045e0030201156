pub mod config;
pub mod document;
pub mod transaction;

pub use config::*;
pub use document::*;
pub use transaction::*;
