//! jarvis-chat is a terminal chat client for the Jarvis inference endpoint.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation state, the model catalog, the persona's
//!   rolling memory, and request orchestration with streaming and
//!   cancellation.
//! - [`api`] defines the request/reply payloads and the HTTP backend.
//! - [`voice`] bridges speech recognition and synthesis engines.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
pub mod voice;
