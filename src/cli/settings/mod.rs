//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a handler. Handlers edit a loaded [`Config`];
//! the caller persists the result.

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

pub trait SettingHandler: Send + Sync {
    /// The configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Apply `args` to `config` and return a message for the user.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Clear the value so the default applies again.
    fn unset(&self, config: &mut Config) -> Result<String, SettingError>;

    /// Current value as shown by `jarvis-chat set`.
    fn format(&self, config: &Config) -> String;
}
