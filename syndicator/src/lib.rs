// Library interface for syndicator modules
// This allows tests and the binary to import modules

pub mod dedup;
pub mod llm;
pub mod pipeline;
pub mod platform;
pub mod publisher;
pub mod reformulation;
pub mod run_log;
pub mod sanitize;
pub mod scraping;
