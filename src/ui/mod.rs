//! Terminal UI layer for interactive chat sessions.
//!
//! [`chat_loop`] owns the terminal and the event loop; [`renderer`] draws a
//! frame from the current [`crate::core::app::App`].

pub mod chat_loop;
pub mod renderer;
