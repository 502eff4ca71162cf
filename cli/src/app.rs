use crate::{
    config::AppConfig,
    form::{Form, FormValues},
    types::ProtocolMode,
    view::{ResultRegion, SubmitButton},
};
use chrono::{DateTime, Local};

const MAX_STATUS_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

/// Everything the terminal page draws. Button and result region mirror the
/// controller's copies through [`AppEvent`]s.
#[derive(Debug)]
pub struct AppState {
    pub form: Form,
    pub button: SubmitButton,
    pub result: ResultRegion,
    pub status_lines: Vec<StatusLine>,
    pub open_stream: Option<String>,
    pub mode: ProtocolMode,
    pub server_url: String,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(config: &AppConfig, server_url: String, initial: FormValues) -> Self {
        Self {
            form: Form::new(initial),
            button: SubmitButton::new(config.button_label()),
            result: ResultRegion::Empty,
            status_lines: Vec::new(),
            open_stream: None,
            mode: config.mode(),
            server_url,
            should_quit: false,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Info(message) => self.push_status_line(message),
            AppEvent::Error(message) => self.push_status_line(format!("Error: {message}")),
            AppEvent::ButtonChanged(button) => {
                if button.is_enabled() && !self.button.is_enabled() {
                    self.push_status_line("Ready for another submission".to_string());
                }
                self.button = button;
            }
            AppEvent::ResultChanged(result) => {
                if let ResultRegion::Error(card) = &result {
                    self.push_status_line(format!("{}: {}", card.title(), card.message));
                }
                self.result = result;
            }
            AppEvent::StreamOpened { task_id } => {
                self.push_status_line(format!("Listening for task {task_id}"));
                self.open_stream = Some(task_id);
            }
            AppEvent::StreamClosed { task_id } => {
                self.push_status_line(format!("Closed event stream for task {task_id}"));
                if self.open_stream.as_deref() == Some(task_id.as_str()) {
                    self.open_stream = None;
                }
            }
        }
    }

    /// Snapshot of the form for a submit, or `None` while the button is
    /// disabled.
    pub fn submit_command(&self) -> Option<AppCommand> {
        if !self.button.is_enabled() {
            return None;
        }
        Some(AppCommand::Submit { values: self.form.values().clone() })
    }

    /// The error card's "Try Again": restore the form and ask the
    /// controller to clear the result region.
    pub fn reload_command(&mut self) -> Option<AppCommand> {
        if !self.result.is_error() || !self.button.is_enabled() {
            return None;
        }
        self.form.reset();
        Some(AppCommand::Reload)
    }

    pub fn push_status_line(&mut self, text: String) {
        self.status_lines.push(StatusLine { timestamp: Local::now(), text });
        if self.status_lines.len() > MAX_STATUS_LINES {
            let overflow = self.status_lines.len() - MAX_STATUS_LINES;
            self.status_lines.drain(0..overflow);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Info(String),
    Error(String),
    ButtonChanged(SubmitButton),
    ResultChanged(ResultRegion),
    StreamOpened { task_id: String },
    StreamClosed { task_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Submit { values: FormValues },
    Reload,
}
