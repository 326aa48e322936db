// Library interface for ainewsbot modules
// This allows tests to import modules

pub mod digest;
pub mod llm;
pub mod notify;
