use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::app::App;
use crate::core::memory::MEMORY_LIMIT;
use crate::utils::scroll::{wrap_text, ScrollState};

const SIDEBAR_WIDTH: u16 = 30;
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub fn ui(f: &mut Frame, app: &App, scroll: &mut ScrollState, tick: usize) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(f.area());

    render_sidebar(f, app, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(columns[1]);

    render_transcript(f, app, scroll, rows[0]);
    render_input(f, app, rows[1]);

    let status = Paragraph::new(status_text(app, tick)).style(status_style(app));
    f.render_widget(status, rows[2]);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let selected = &app.state.selected_model().id;
    let mut lines: Vec<Line> = app
        .state
        .catalog()
        .entries()
        .iter()
        .map(|entry| {
            if &entry.id == selected {
                Line::from(Span::styled(
                    format!("▶ {}", entry.display_name),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {}", entry.display_name))
            }
        })
        .collect();

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Memory: {}/{MEMORY_LIMIT}", app.state.memory().len()),
        Style::default().fg(Color::DarkGray),
    )));
    let voice = if app.voice.is_listening() {
        "listening"
    } else if app.voice.can_listen() {
        "ready (Ctrl+T)"
    } else {
        "off"
    };
    lines.push(Line::from(Span::styled(
        format!("Voice: {voice}"),
        Style::default().fg(Color::DarkGray),
    )));

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Models (Tab)"),
    );
    f.render_widget(sidebar, area);
}

fn render_transcript(f: &mut Frame, app: &App, scroll: &mut ScrollState, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let lines = build_transcript_lines(app, inner_width);
    let offset = scroll.resolve(lines.len(), inner_height);

    let title = format!(
        "Jarvis Chat v{} - {}",
        env!("CARGO_PKG_VERSION"),
        app.state.selected_model().display_name
    );
    let transcript = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((offset, 0));
    f.render_widget(transcript, area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let visible = visible_input_tail(app.state.input(), inner_width);
    let cursor_x = UnicodeWidthStr::width(visible.as_str()).min(inner_width);

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Type your message (Enter to send, Ctrl+C to quit)"),
        );
    f.render_widget(input, area);

    let cursor_x = u16::try_from(cursor_x).unwrap_or(u16::MAX);
    f.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
}

/// The transcript as display lines wrapped to `width` columns.
pub fn build_transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width);
    let messages = app.state.messages();
    let mut lines = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        let awaiting = message.is_assistant()
            && message.content.is_empty()
            && app.state.is_loading()
            && index + 1 == messages.len();
        // Placeholders of failed or stopped replies never got any text.
        if message.is_assistant() && message.content.is_empty() && !awaiting {
            continue;
        }

        let header_style = if message.is_user() {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", message.speaker()),
            header_style,
        )));

        if awaiting {
            lines.push(Line::from(Span::styled(
                "…",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            let body_style = if message.is_user() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            for wrapped in wrap_text(&message.content, width) {
                lines.push(Line::from(Span::styled(wrapped, body_style)));
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

/// The end of the input that fits in `width` columns.
fn visible_input_tail(input: &str, width: usize) -> String {
    let mut taken = 0usize;
    let mut start = input.len();
    for (index, ch) in input.char_indices().rev() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if taken + ch_width >= width.max(1) {
            break;
        }
        taken += ch_width;
        start = index;
    }
    input[start..].to_string()
}

pub fn status_text(app: &App, tick: usize) -> String {
    if app.voice.is_listening() {
        "🎙 Listening…".to_string()
    } else if app.state.is_loading() {
        format!(
            "{} Waiting for reply (Esc to stop)",
            SPINNER[tick % SPINNER.len()]
        )
    } else if let Some(notice) = app.notice() {
        notice.to_string()
    } else {
        "Ctrl+N new chat • Tab switch model • Esc stop".to_string()
    }
}

fn status_style(app: &App) -> Style {
    if app.notice().is_some() && !app.state.is_loading() && !app.voice.is_listening() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat_stream::ResponseMode;
    use crate::utils::test_utils::{create_test_app, ScriptedBackend};
    use ratatui::{backend::TestBackend, Terminal};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn transcript_lines_label_each_speaker() {
        let mut harness = create_test_app(ScriptedBackend::whole("unused"), ResponseMode::Whole);
        let state = &mut harness.app.state;
        state.append_user_message("Hello", "Jarvis (Personal AI)");
        let epoch = state.epoch();
        state.append_reply(epoch, "Jarvis (Personal AI)", "Hi there");

        let lines: Vec<String> = build_transcript_lines(&harness.app, 40)
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(
            lines,
            vec!["You:", "Hello", "", "Jarvis (Personal AI):", "Hi there", ""]
        );
    }

    #[test]
    fn empty_placeholder_shows_progress_while_loading() {
        let mut harness = create_test_app(ScriptedBackend::whole("unused"), ResponseMode::Streamed);
        let state = &mut harness.app.state;
        state.append_user_message("Hello", "Jarvis (Personal AI)");
        state.append_placeholder_reply("Jarvis (Personal AI)");
        state.set_loading(true);

        let lines: Vec<String> = build_transcript_lines(&harness.app, 40)
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(lines[4], "…");
        assert!(status_text(&harness.app, 0).contains("Esc to stop"));
    }

    #[tokio::test]
    async fn failed_reply_placeholders_are_not_drawn() {
        let mut harness = create_test_app(
            ScriptedBackend::failing(502, "upstream down"),
            ResponseMode::Streamed,
        );
        harness.app.submit(Some("Hello".to_string()));
        harness.settle().await;
        assert_eq!(harness.app.state.messages().len(), 2);

        let lines: Vec<String> = build_transcript_lines(&harness.app, 40)
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(lines, vec!["You:", "Hello", ""]);
    }

    #[test]
    fn input_tail_fits_the_box() {
        assert_eq!(visible_input_tail("hello", 10), "hello");
        assert_eq!(visible_input_tail("hello world", 6), "world");
        assert_eq!(visible_input_tail("", 6), "");
    }

    #[test]
    fn draws_sidebar_and_transcript() {
        let mut harness = create_test_app(ScriptedBackend::whole("unused"), ResponseMode::Whole);
        harness
            .app
            .state
            .append_user_message("Hello", "Jarvis (Personal AI)");

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).expect("terminal");
        let mut scroll = ScrollState::default();
        terminal
            .draw(|f| ui(f, &harness.app, &mut scroll, 0))
            .expect("draw");

        let buffer = terminal.backend().buffer().clone();
        let rendered: String = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Mistral 7B Instruct"));
        assert!(rendered.contains("Memory: 0/200"));
        assert!(rendered.contains("Hello"));
    }
}
