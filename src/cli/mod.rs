//! Command-line interface parsing and handling

pub mod memory;
pub mod model_list;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::cli::memory::{clear_memory, show_memory};
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::cli::settings::helpers::mutate_config_at;
use crate::cli::settings::{SettingError, SettingRegistry};
use crate::core::app::AppInitConfig;
use crate::core::config::data::{path_display, Config};
use crate::core::config::io::default_log_path;
use crate::logging::{init_tracing, LogTarget};
use crate::ui::chat_loop::run_chat;

#[derive(Parser, Debug)]
#[command(name = "jarvis-chat")]
#[command(version)]
#[command(about = "A terminal chat client for the Jarvis inference endpoint")]
#[command(
    long_about = "jarvis-chat is a full-screen terminal chat client. Replies stream in as they \
are generated, the Jarvis persona remembers your recent exchanges, and turns can be spoken \
and answered aloud when speech commands are configured.\n\n\
Environment Variables:\n\
  JARVIS_LOG        Log filter directive (e.g. debug, jarvis_chat=trace)\n\n\
Controls:\n\
  Enter             Send the message\n\
  Esc               Stop the reply in progress and any speech\n\
  Tab               Switch to the next model\n\
  Ctrl+N            Start a new chat (memory is kept)\n\
  Ctrl+T            Speak a message\n\
  Up/Down/PgUp/PgDn Scroll through the conversation\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with (see `jarvis-chat models`)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Inference endpoint URL for this run
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Wait for each reply as one JSON document instead of streaming it
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Log debug details
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one prompt and print the reply without starting the UI
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List available models
    Models,
    /// Inspect or clear the persona's rolling memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Set configuration values, or show them all when no value is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryCommands {
    /// Print the remembered exchanges, oldest first
    Show,
    /// Forget every remembered exchange
    Clear,
}

impl Args {
    fn init_config(&self, voice: bool) -> AppInitConfig {
        AppInitConfig {
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            stream: self.no_stream.then_some(false),
            voice,
        }
    }

    /// The UI owns the terminal, so it only logs to a file.
    fn log_target(&self) -> Option<LogTarget> {
        match (&self.command, &self.log) {
            (_, Some(path)) => Some(LogTarget::File(path.clone())),
            (None | Some(Commands::Chat), None) => match default_log_path() {
                Ok(path) => Some(LogTarget::File(path)),
                Err(_) => None,
            },
            _ => Some(LogTarget::Stderr),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(target) = args.log_target() {
        init_tracing(target, args.verbose)?;
    }

    let config = Config::load()?;

    match args.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => run_chat(args.init_config(true), &config).await,
        Commands::Say { prompt } => run_say(prompt.clone(), args.init_config(false), &config).await,
        Commands::Models => {
            list_models(&config);
            Ok(())
        }
        Commands::Memory { command } => match command {
            MemoryCommands::Show => show_memory(),
            MemoryCommands::Clear => clear_memory(),
        },
        Commands::Set { key, value } => {
            let path = Config::get_config_path()?;
            let registry = SettingRegistry::new();
            match key {
                Some(key) if !value.is_empty() => {
                    exit_on_setting_error(apply_set(&registry, &path, key, value))
                }
                _ => {
                    print_settings(&registry, &path, &config);
                    Ok(())
                }
            }
        }
        Commands::Unset { key } => {
            let path = Config::get_config_path()?;
            let registry = SettingRegistry::new();
            exit_on_setting_error(apply_unset(&registry, &path, key))
        }
    }
}

fn exit_on_setting_error(result: Result<String, SettingError>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "setting not changed");
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}

fn apply_set(
    registry: &SettingRegistry,
    path: &Path,
    key: &str,
    value: &[String],
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config_at(path, |config| handler.set(value, config))
}

fn apply_unset(registry: &SettingRegistry, path: &Path, key: &str) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config_at(path, |config| handler.unset(config))
}

fn print_settings(registry: &SettingRegistry, path: &Path, config: &Config) {
    println!("Current configuration ({}):", path_display(path));
    for key in registry.keys_display_order() {
        if let Some(handler) = registry.get(key) {
            println!("{}", handler.format(config));
        }
    }
}
