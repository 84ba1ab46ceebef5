//! Diagnostic logging setup.
//!
//! The interactive UI owns the terminal, so it logs to a file; one-shot
//! commands log to stderr. `JARVIS_LOG` takes a standard filter directive.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "JARVIS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "jarvis_chat=debug,info"
    } else {
        "info"
    }
}

pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn open_log_file(path: &PathBuf) -> std::io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Calling it twice is harmless; the first
/// subscriber wins.
pub fn init_tracing(target: LogTarget, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(verbose));

    let result = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
    Ok(())
}
