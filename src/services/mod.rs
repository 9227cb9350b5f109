pub mod cache;
pub mod confidence;
pub mod engine;
pub mod job_store;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod stats;
pub mod storage;
