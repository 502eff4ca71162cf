use crate::{
    app::{AppCommand, AppEvent, AppState},
    form::FIELD_ORDER,
    view::{ResultRegion, UiMode},
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const HELP_TEXT: &str = "Enter submit | Tab/Up/Down move | Ctrl-R try again | Esc quit";
const LABEL_WIDTH: usize = 17;

pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
) -> Result<()> {
    loop {
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }

        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = handle_key(app, key) {
                    if command_tx.send(command).is_err() {
                        app.handle_event(AppEvent::Error("controller is not running".into()));
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            None
        }
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            None
        }
        KeyCode::Char('r') if ctrl => app.reload_command(),
        KeyCode::Enter => app.submit_command(),
        KeyCode::Tab | KeyCode::Down => {
            app.form.focus_next();
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.form.focus_prev();
            None
        }
        KeyCode::Backspace => {
            app.form.backspace();
            None
        }
        KeyCode::Char(c) if !ctrl => {
            app.form.insert_char(c);
            None
        }
        _ => None,
    }
}

pub fn draw(frame: &mut Frame, app: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(frame.size());

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(FIELD_ORDER.len() as u16 + 2),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(columns[0]);

    draw_form(frame, main[0], app);
    draw_button(frame, main[1], app);
    draw_result(frame, main[2], &app.result);
    frame.render_widget(
        Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::DarkGray)),
        main[3],
    );
    draw_status(frame, columns[1], app);
}

fn draw_form(frame: &mut Frame, area: Rect, app: &AppState) {
    let focused = app.form.focused();
    let lines = FIELD_ORDER
        .iter()
        .map(|field| {
            let is_focused = *field == focused;
            let marker = if is_focused { ">" } else { " " };
            let label_style = if is_focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(vec![
                Span::styled(
                    format!("{marker} {:<width$}", field.label(), width = LABEL_WIDTH),
                    label_style,
                ),
                Span::raw(app.form.values().get(*field).to_string()),
            ])
        })
        .collect::<Vec<_>>();

    let block = Block::default().title("Music Video Request").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_button(frame: &mut Frame, area: Rect, app: &AppState) {
    let style = match app.button.mode() {
        UiMode::Idle => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        UiMode::Submitting => Style::default().fg(Color::DarkGray),
    };
    let block = Block::default().borders(Borders::ALL).border_style(style);
    let button = Paragraph::new(app.button.label().to_string()).style(style).block(block);
    frame.render_widget(button, area);
}

fn draw_result(frame: &mut Frame, area: Rect, result: &ResultRegion) {
    let color = match result {
        ResultRegion::Empty => Color::Gray,
        ResultRegion::Processing { .. } => Color::Yellow,
        ResultRegion::Success(_) => Color::Green,
        ResultRegion::Error(_) => Color::Red,
    };
    let title = result.title().unwrap_or("Result");
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(color).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let mut lines = result.body_lines().into_iter().map(Line::from).collect::<Vec<_>>();
    if let Some(hint) = result.action_hint() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(hint, Style::default().add_modifier(Modifier::BOLD))));
    }
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_status(frame: &mut Frame, area: Rect, app: &AppState) {
    let mut lines = vec![
        Line::from(format!("Server: {}", app.server_url)),
        Line::from(format!("Mode: {}", app.mode)),
        Line::from(format!("Stream: {}", app.open_stream.as_deref().unwrap_or("-"))),
        Line::from(""),
    ];
    lines.extend(app.status_lines.iter().map(|line| {
        Line::from(format!("[{}] {}", line.timestamp.format("%H:%M:%S"), line.text))
    }));

    let block = Block::default().title("Status").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
