pub mod app;
pub mod catalog;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod memory;
pub mod message;
pub mod orchestrator;
