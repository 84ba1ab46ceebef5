//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::app::{self, AppInitConfig, SessionBootstrap};
use crate::core::chat_stream::StreamMessage;
use crate::core::config::data::Config;

pub async fn run_say(
    prompt: Vec<String>,
    init_config: AppInitConfig,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: jarvis-chat say <prompt>");
        std::process::exit(1);
    }

    let SessionBootstrap {
        mut app,
        mut stream_rx,
        ..
    } = app::new_with_config(init_config, config)?;

    let Some(handle) = app.submit(Some(prompt)) else {
        return Ok(());
    };

    let mut stdout = io::stdout();
    let mut printed = String::new();
    while let Some((message, stream_id)) = stream_rx.recv().await {
        if stream_id != handle.stream_id {
            continue;
        }

        let finished = !matches!(message, StreamMessage::Partial(_));
        match &message {
            StreamMessage::Partial(text) | StreamMessage::Completed(text) => {
                write!(stdout, "{}", unprinted_suffix(&printed, text))?;
                stdout.flush()?;
                printed.clone_from(text);
            }
            StreamMessage::Failed(err) => {
                eprintln!("\n❌ Error: {err}");
                std::process::exit(1);
            }
            StreamMessage::Cancelled => {}
        }

        // Persona replies are remembered exactly as in the interactive UI.
        app.handle_stream_message(message, stream_id);
        if finished {
            break;
        }
    }

    println!();
    Ok(())
}

/// Partials carry the whole reply so far; only the new tail is printed.
fn unprinted_suffix<'a>(printed: &str, text: &'a str) -> &'a str {
    text.strip_prefix(printed).unwrap_or(text)
}
