//! Main chat event loop
//!
//! Terminal input, request task messages and voice events all arrive on
//! channels; the loop applies them to the [`App`] and redraws.

mod keybindings;
mod lifecycle;

use std::error::Error;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, info};

use self::keybindings::{map_key, KeyAction};
use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::core::app::{self, App, AppInitConfig, SessionBootstrap};
use crate::core::chat_stream::StreamMessage;
use crate::core::config::data::Config;
use crate::ui::renderer::ui;
use crate::utils::scroll::ScrollState;
use crate::voice::VoiceEvent;

const TICK: Duration = Duration::from_millis(120);

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Quit,
}

pub async fn run_chat(init_config: AppInitConfig, config: &Config) -> Result<(), Box<dyn Error>> {
    let SessionBootstrap {
        mut app,
        mut stream_rx,
        mut voice_rx,
    } = app::new_with_config(init_config, config)?;

    let mut terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    });

    info!("chat session started");
    let result = event_loop(
        &mut terminal,
        &mut app,
        &mut stream_rx,
        &mut voice_rx,
        &mut event_rx,
    )
    .await;

    event_reader_handle.abort();
    app.stop();
    restore_terminal(&mut terminal)?;
    info!("chat session ended");
    result
}

async fn event_loop(
    terminal: &mut ChatTerminal,
    app: &mut App,
    stream_rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    voice_rx: &mut mpsc::UnboundedReceiver<VoiceEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
) -> Result<(), Box<dyn Error>> {
    let mut scroll = ScrollState::default();
    let mut ticker = tokio::time::interval(TICK);
    let mut tick = 0usize;

    loop {
        terminal.draw(|f| ui(f, app, &mut scroll, tick))?;

        tokio::select! {
            Some(ev) = event_rx.recv() => {
                if handle_ui_event(app, &mut scroll, ev) == LoopControl::Quit {
                    return Ok(());
                }
                while let Ok(ev) = event_rx.try_recv() {
                    if handle_ui_event(app, &mut scroll, ev) == LoopControl::Quit {
                        return Ok(());
                    }
                }
            }
            Some((message, stream_id)) = stream_rx.recv() => {
                app.handle_stream_message(message, stream_id);
                while let Ok((message, stream_id)) = stream_rx.try_recv() {
                    app.handle_stream_message(message, stream_id);
                }
            }
            Some(voice_event) = voice_rx.recv() => {
                app.handle_voice_event(voice_event);
            }
            _ = ticker.tick() => {
                tick = tick.wrapping_add(1);
            }
        }
    }
}

fn handle_ui_event(app: &mut App, scroll: &mut ScrollState, ev: UiEvent) -> LoopControl {
    match ev {
        UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            apply_key_action(app, scroll, map_key(&key, scroll.viewport_height()))
        }
        UiEvent::Crossterm(Event::Paste(text)) => {
            let flattened = text.replace(['\r', '\n'], " ");
            app.state.input_mut().push_str(&flattened);
            LoopControl::Continue
        }
        UiEvent::Crossterm(_) => LoopControl::Continue,
    }
}

fn apply_key_action(app: &mut App, scroll: &mut ScrollState, action: KeyAction) -> LoopControl {
    match action {
        KeyAction::Quit => return LoopControl::Quit,
        KeyAction::Submit => {
            if app.submit(None).is_some() {
                scroll.scroll_to_bottom();
            }
        }
        KeyAction::Stop => app.stop(),
        KeyAction::CycleModel => {
            let selected = app.cycle_model().to_string();
            debug!(model = %selected, "model switched");
        }
        KeyAction::NewChat => {
            app.new_chat();
            scroll.scroll_to_bottom();
        }
        KeyAction::Listen => {
            app.start_listening();
        }
        KeyAction::Insert(c) => app.state.input_mut().push(c),
        KeyAction::Backspace => {
            app.state.input_mut().pop();
        }
        KeyAction::ClearInput => app.state.clear_input(),
        KeyAction::ScrollUp(lines) => scroll.scroll_up(lines),
        KeyAction::ScrollDown(lines) => scroll.scroll_down(lines),
        KeyAction::ScrollTop => scroll.scroll_to_top(),
        KeyAction::ScrollBottom => scroll.scroll_to_bottom(),
        KeyAction::Ignored => {}
    }
    LoopControl::Continue
}
