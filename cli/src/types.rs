use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How the creation endpoint reports the outcome of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolMode {
    /// `/create` answers with a `task_id`; the outcome arrives on `/events/{task_id}`.
    Streaming,
    /// `/create` answers with the final `message` itself.
    #[default]
    Synchronous,
}

impl ProtocolMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Synchronous => "synchronous",
        }
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProtocolMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "streaming" | "stream" | "sse" => Ok(Self::Streaming),
            "synchronous" | "sync" => Ok(Self::Synchronous),
            other => {
                Err(format!("unknown protocol mode `{other}` (expected streaming or synchronous)"))
            }
        }
    }
}

/// Track length as entered on the form. Numeric input is sent as whole
/// seconds, anything else is forwarded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TrackLength {
    Seconds(u32),
    Text(String),
}

impl TrackLength {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u32>() {
            Ok(seconds) => Self::Seconds(seconds),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

/// Body of `POST /create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub mood: String,
    pub age: String,
    pub pricing: String,
    pub length: TrackLength,
    pub artist: String,
    pub vision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CreateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaLinks {
    pub audio_url: String,
    pub video_url: String,
}

/// Data carried by a `complete` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CompletePayload {
    Media(MediaLinks),
    Message { message: String },
}

/// Data carried by an `error` event.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FailurePayload {
    #[serde(default)]
    pub message: Option<String>,
}
