pub mod audit;
pub mod chat_config;
pub mod command;
pub mod compaction;
pub mod completion;
pub mod config;
pub mod controller;
pub mod errors;
pub mod persona;
pub mod session;
pub mod transcript;
pub mod ui;

pub use errors::{ApiError, ChatError, ChatResult};
