pub mod settings_io;
pub mod transaction_io;
