use crate::types::{CompletePayload, MediaLinks};

pub const DEFAULT_BUTTON_LABEL: &str = "Create My Music Video";
pub const BUSY_BUTTON_LABEL: &str = "Creating...";

pub const PROCESSING_TITLE: &str = "Generating...";
pub const REQUESTING_STATUS: &str = "Requesting music generation...";
pub const TASK_STARTED_STATUS: &str =
    "Music task started. Waiting for completion to create video...";

pub const SUCCESS_TITLE: &str = "Creation Successful!";
pub const MEDIA_READY_MESSAGE: &str = "Your AI-generated music and video are ready.";
pub const ACCEPTED_MESSAGE: &str = "Your request was accepted.";
pub const TRY_AGAIN_LABEL: &str = "Try Again";

/// Whether a submission is in flight, as shown by the submit button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    idle_label: String,
    label: String,
    enabled: bool,
}

impl SubmitButton {
    pub fn new(idle_label: impl Into<String>) -> Self {
        let idle_label = idle_label.into();
        Self { label: idle_label.clone(), idle_label, enabled: true }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> UiMode {
        if self.enabled {
            UiMode::Idle
        } else {
            UiMode::Submitting
        }
    }

    pub fn set_busy(&mut self) {
        self.enabled = false;
        self.label = BUSY_BUTTON_LABEL.to_string();
    }

    pub fn reset(&mut self) {
        self.enabled = true;
        self.label = self.idle_label.clone();
    }
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self::new(DEFAULT_BUTTON_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessCard {
    pub message: String,
    pub media: Option<MediaLinks>,
}

impl SuccessCard {
    pub fn from_completion(payload: CompletePayload) -> Self {
        match payload {
            CompletePayload::Media(links) => {
                Self { message: MEDIA_READY_MESSAGE.to_string(), media: Some(links) }
            }
            CompletePayload::Message { message } => Self { message, media: None },
        }
    }

    pub fn from_message(message: Option<String>) -> Self {
        let message = message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| ACCEPTED_MESSAGE.to_string());
        Self { message, media: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The task reported failure on its event stream.
    TaskFailed,
    /// The submission itself could not be completed.
    SubmissionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCard {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorCard {
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::TaskFailed, message: message.into() }
    }

    pub fn submission_failed(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::SubmissionFailed, message: message.into() }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            ErrorKind::TaskFailed => "An Error Occurred",
            ErrorKind::SubmissionFailed => "Submission Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultRegion {
    #[default]
    Empty,
    Processing {
        status: String,
    },
    Success(SuccessCard),
    Error(ErrorCard),
}

impl ResultRegion {
    pub fn processing(status: impl Into<String>) -> Self {
        Self::Processing { status: status.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn title(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Processing { .. } => Some(PROCESSING_TITLE),
            Self::Success(_) => Some(SUCCESS_TITLE),
            Self::Error(card) => Some(card.title()),
        }
    }

    /// Plain text form of the region, used by headless output and the
    /// terminal page alike.
    pub fn body_lines(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::Processing { status } => vec![status.clone()],
            Self::Success(card) => {
                let mut lines = vec![card.message.clone()];
                if let Some(media) = &card.media {
                    lines.push(format!("Audio: {}", media.audio_url));
                    lines.push(format!("Video: {}", media.video_url));
                    lines.push(format!("View video in new tab: {}", media.video_url));
                }
                lines
            }
            Self::Error(card) => vec![card.message.clone()],
        }
    }

    /// The recovery action offered next to an error card.
    pub fn action_hint(&self) -> Option<String> {
        match self {
            Self::Error(_) => Some(format!("[{TRY_AGAIN_LABEL}] (Ctrl-R)")),
            _ => None,
        }
    }
}

/// The button and result region owned by one submission controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionView {
    pub button: SubmitButton,
    pub result: ResultRegion,
}

impl SubmissionView {
    pub fn new(idle_label: impl Into<String>) -> Self {
        Self { button: SubmitButton::new(idle_label), result: ResultRegion::Empty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_toggles_between_busy_and_original_label() {
        let mut button = SubmitButton::new("Make it");
        assert_eq!(button.mode(), UiMode::Idle);

        button.set_busy();
        assert!(!button.is_enabled());
        assert_eq!(button.label(), BUSY_BUTTON_LABEL);
        assert_eq!(button.mode(), UiMode::Submitting);

        button.reset();
        assert!(button.is_enabled());
        assert_eq!(button.label(), "Make it");
    }

    #[test]
    fn media_completion_lists_both_elements_and_video_link() {
        let card = SuccessCard::from_completion(CompletePayload::Media(MediaLinks {
            audio_url: "a.mp3".into(),
            video_url: "b.mp4".into(),
        }));
        let region = ResultRegion::Success(card);
        let lines = region.body_lines();

        assert_eq!(region.title(), Some(SUCCESS_TITLE));
        assert_eq!(lines[0], MEDIA_READY_MESSAGE);
        assert!(lines.contains(&"Audio: a.mp3".to_string()));
        assert!(lines.contains(&"Video: b.mp4".to_string()));
        assert!(lines.iter().any(|line| line.starts_with("View video") && line.ends_with("b.mp4")));
    }

    #[test]
    fn empty_message_uses_accepted_fallback() {
        assert_eq!(SuccessCard::from_message(Some("  ".into())).message, ACCEPTED_MESSAGE);
        assert_eq!(SuccessCard::from_message(Some("queued".into())).message, "queued");
    }

    #[test]
    fn error_cards_offer_try_again() {
        let region = ResultRegion::Error(ErrorCard::submission_failed("invalid mood"));
        assert_eq!(region.title(), Some("Submission Failed"));
        assert_eq!(region.body_lines(), vec!["invalid mood".to_string()]);
        assert!(region.action_hint().unwrap().contains(TRY_AGAIN_LABEL));
        assert_eq!(ResultRegion::processing("x").action_hint(), None);
    }
}
