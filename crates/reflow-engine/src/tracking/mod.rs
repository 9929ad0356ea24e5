//! Edit tracking between formatting passes.

pub mod edit_log;

pub use edit_log::EditLog;
