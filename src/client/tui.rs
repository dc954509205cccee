//! Interactive mode: an input line over a scrolling history view.
//!
//! Commands are typed as `<command> <input…>` and dispatched on Enter;
//! results render into the history pane from the same blocks the one-shot
//! printer uses. Dispatch is
//! single-flight: while a command is pending the loading placeholder is
//! shown and no further input is accepted, so a second submission can never
//! remove the wrong placeholder.

use crate::client::ApiClient;
use crate::dispatch::Dispatch;
use crate::history::HistoryStore;
use crate::protocol::{Command, InputKind};
use crate::render::{self, Block, EntryView, ImageNote, ItemStyle};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block as Widget, Borders, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::path::Path;
use std::str::FromStr;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

struct App {
    input: Input,
    status: Option<String>,
    scroll: u16,
    fst_available: bool,
    confirm_clear: bool,
}

/// Run the interactive session. Owns the terminal for its lifetime and
/// restores it on the way out, including on error.
pub async fn run_tui(client: &ApiClient, history: &mut HistoryStore) -> Result<()> {
    // Probe before taking over the screen so FST commands can be
    // advertised (or not) from the first frame.
    let fst_available = client.probe_fst().await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, client, history, fst_available).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: &ApiClient,
    history: &mut HistoryStore,
    fst_available: bool,
) -> Result<()> {
    let mut app = App {
        input: Input::default(),
        status: None,
        scroll: 0,
        fst_available,
        confirm_clear: false,
    };

    loop {
        terminal.draw(|frame| draw_ui(frame, &app, history))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.confirm_clear {
            if let KeyCode::Char('y') | KeyCode::Char('Y') = key.code {
                history.clear();
                app.scroll = 0;
                app.status = Some("History cleared".to_string());
            } else {
                app.status = None;
            }
            app.confirm_clear = false;
            continue;
        }

        match key.code {
            KeyCode::Enter => {
                submit(terminal, client, history, &mut app).await?;
            }
            KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(());
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.confirm_clear = true;
                app.status = Some("Clear history? (y/N)".to_string());
            }
            KeyCode::Up => app.scroll = app.scroll.saturating_sub(1),
            KeyCode::Down => app.scroll = app.scroll.saturating_add(1),
            KeyCode::PageUp => app.scroll = app.scroll.saturating_sub(10),
            KeyCode::PageDown => app.scroll = app.scroll.saturating_add(10),
            _ => {
                app.status = None;
                app.input.handle_event(&Event::Key(key));
            }
        }
    }
}

async fn submit(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: &ApiClient,
    history: &mut HistoryStore,
    app: &mut App,
) -> Result<()> {
    let line = app.input.value().to_string();
    let Some(parsed) = parse_command_line(&line) else {
        return Ok(());
    };

    let dispatch = match parsed.kind {
        InputKind::Text => Dispatch::text(
            &parsed.command,
            &parsed.input,
            parsed.chunk_sizes.as_deref(),
        ),
        InputKind::Image => {
            if parsed.input.is_empty() {
                app.status = Some("Please select an image file".to_string());
                return Ok(());
            }
            Dispatch::image(&parsed.command, Path::new(&parsed.input))
        }
    };

    let dispatch = match dispatch {
        Ok(dispatch) => dispatch,
        Err(e) => {
            // Validation failure: surfaced immediately, nothing recorded.
            app.status = Some(e.to_string());
            return Ok(());
        }
    };

    app.input.reset();
    app.status = None;
    app.scroll = 0;

    // Repaint with the placeholder before blocking on the network.
    dispatch.begin(history);
    terminal.draw(|frame| draw_ui(frame, app, history))?;
    dispatch.run(client, history).await;

    Ok(())
}

struct ParsedLine {
    command: String,
    input: String,
    chunk_sizes: Option<String>,
    kind: InputKind,
}

/// Split an input line into command and input. For `chunk` the leading
/// numeric tokens become the size specifier; image commands treat the rest
/// of the line as a file path.
fn parse_command_line(line: &str) -> Option<ParsedLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    };

    let known = Command::from_str(&command).ok();
    let kind = known.map(|c| c.kind()).unwrap_or(InputKind::Text);

    if known == Some(Command::Chunk) {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let sizes: Vec<&str> = tokens
            .iter()
            .take_while(|t| t.parse::<u32>().is_ok())
            .copied()
            .collect();
        let input = tokens[sizes.len()..].join(" ");
        return Some(ParsedLine {
            command,
            input,
            chunk_sizes: Some(sizes.join(" ")),
            kind,
        });
    }

    Some(ParsedLine {
        command,
        input: rest,
        chunk_sizes: None,
        kind,
    })
}

fn draw_ui(frame: &mut Frame, app: &App, history: &HistoryStore) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Input line.
    let input_block = Widget::default()
        .title(" kowctl ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = input_block.inner(chunks[0]);
    frame.render_widget(input_block, chunks[0]);

    let width = inner.width as usize;
    let cursor = app.input.visual_cursor();
    let scroll = if cursor >= width { cursor - width + 1 } else { 0 };
    let visible: String = app.input.value().chars().skip(scroll).take(width).collect();
    frame.render_widget(Paragraph::new(visible), inner);
    frame.set_cursor_position((inner.x + (cursor - scroll) as u16, inner.y));

    // Status line: validation errors and confirmations.
    let status = app.status.as_deref().unwrap_or("");
    frame.render_widget(
        Paragraph::new(Span::styled(status, Style::default().fg(Color::Yellow))),
        chunks[1],
    );

    // History pane, placeholder first.
    let mut lines: Vec<Line> = Vec::new();
    if let Some(pending) = history.pending() {
        lines.extend(view_to_lines(&render::render_pending(pending)));
        lines.push(Line::default());
    }
    for entry in history.entries() {
        lines.extend(view_to_lines(&render::render_entry(entry)));
        lines.push(Line::default());
    }
    frame.render_widget(Paragraph::new(lines).scroll((app.scroll, 0)), chunks[2]);

    // Help bar.
    let mut help = String::from("Enter run · Esc quit · Ctrl-L clear history · ↑/↓ scroll");
    if app.fst_available {
        help.push_str(" · FST commands available");
    }
    frame.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        chunks[3],
    );
}

/// Flatten a rendered entry into styled terminal lines.
fn view_to_lines(view: &EntryView) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                view.command.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(view.time.clone(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(Span::styled(
            format!("> {}", view.input),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    for block in &view.blocks {
        match block {
            Block::Line(text) => lines.push(Line::from(text.clone())),
            Block::Heading(text) => lines.push(Line::from(Span::styled(
                text.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))),
            Block::WordList(items) => {
                let mut spans = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw("  "));
                    }
                    let style = match item.style {
                        ItemStyle::Primary => Style::default(),
                        ItemStyle::Secondary => Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                        ItemStyle::Invalid => Style::default().fg(Color::Red),
                    };
                    spans.push(Span::styled(item.text.clone(), style));
                }
                lines.push(Line::from(spans));
            }
            Block::Bullets(items) => {
                for item in items {
                    lines.push(Line::from(format!("  - {}", item)));
                }
            }
            Block::Pre(text) | Block::Dump(text) => {
                for line in text.lines() {
                    lines.push(Line::from(format!("  {}", line)));
                }
            }
            Block::LetterBars(bars) => {
                for bar in bars {
                    lines.push(Line::from(vec![
                        Span::raw(format!("  {}: ", bar.letter)),
                        Span::styled(
                            "█".repeat(bar.width as usize),
                            Style::default().fg(Color::Cyan),
                        ),
                        Span::raw(format!(" {}", bar.count)),
                    ]));
                }
            }
            Block::Shifts(rows) => {
                for row in rows {
                    let style = if row.highlight {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(Span::styled(
                        format!("  {:>2}: {} ({})", row.shift, row.text, row.score),
                        style,
                    )));
                }
            }
            Block::Swatches(colours) => {
                for colour in colours {
                    let alpha = if colour.a < 255 {
                        format!(" | A({})", colour.a)
                    } else {
                        String::new()
                    };
                    lines.push(Line::from(vec![
                        Span::styled(
                            "  ██ ",
                            Style::default().fg(Color::Rgb(colour.r, colour.g, colour.b)),
                        ),
                        Span::raw(format!(
                            "{} | RGB({}, {}, {}){} | {} pixels",
                            colour.hex, colour.r, colour.g, colour.b, alpha, colour.count
                        )),
                    ]));
                }
            }
            Block::Image { label, note } => {
                let text = match note {
                    ImageNote::Saved(path) => {
                        format!("{}: saved to {}", label, path.display())
                    }
                    ImageNote::Unavailable => {
                        format!("{}: image data not available in history", label)
                    }
                    ImageNote::Raw(len) => {
                        format!("{}: image payload present ({} base64 chars)", label, len)
                    }
                };
                lines.push(Line::from(text));
            }
            Block::Error(text) => lines.push(Line::from(Span::styled(
                text.clone(),
                Style::default().fg(Color::Red),
            ))),
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let parsed = parse_command_line("anagram listen").unwrap();
        assert_eq!(parsed.command, "anagram");
        assert_eq!(parsed.input, "listen");
        assert_eq!(parsed.kind, InputKind::Text);
        assert!(parsed.chunk_sizes.is_none());
    }

    #[test]
    fn test_parse_chunk_splits_sizes() {
        let parsed = parse_command_line("chunk 2 3 abcdef").unwrap();
        assert_eq!(parsed.command, "chunk");
        assert_eq!(parsed.chunk_sizes.as_deref(), Some("2 3"));
        assert_eq!(parsed.input, "abcdef");
    }

    #[test]
    fn test_parse_chunk_without_sizes() {
        let parsed = parse_command_line("chunk abcdef").unwrap();
        assert_eq!(parsed.chunk_sizes.as_deref(), Some(""));
        assert_eq!(parsed.input, "abcdef");
    }

    #[test]
    fn test_parse_image_command() {
        let parsed = parse_command_line("hidden secret.png").unwrap();
        assert_eq!(parsed.kind, InputKind::Image);
        assert_eq!(parsed.input, "secret.png");
    }

    #[test]
    fn test_parse_unknown_command_defaults_to_text() {
        let parsed = parse_command_line("mystery something").unwrap();
        assert_eq!(parsed.kind, InputKind::Text);
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(parse_command_line("   ").is_none());
    }

    #[test]
    fn test_view_to_lines_has_header() {
        use crate::history::HistoryEntry;
        let mut entry = HistoryEntry::new("anagram", "listen", InputKind::Text);
        entry.error = Some("x".to_string());
        let lines = view_to_lines(&render::render_entry(&entry));
        // Header, input, and the error line.
        assert_eq!(lines.len(), 3);
    }
}
