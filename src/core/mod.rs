pub mod agent;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod llm;
pub mod model;
pub mod store;
pub mod terminal;
