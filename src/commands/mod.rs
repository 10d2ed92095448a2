pub mod analyze;
pub mod completions;
pub mod config;
pub mod init;
pub mod prompt;
pub mod session;
pub mod templates;
pub mod traits;
