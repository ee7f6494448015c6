// Library interface for newsdesk modules
// This allows tests and the binary to import modules

pub mod ingestion;
pub mod llm;
pub mod policy;
pub mod processing;
pub mod server;
pub mod storage;
pub mod templates;
pub mod worker;
