//! Server-sent event decoding and the task event subscription opened for
//! `/events/{task_id}`.

use crate::{
    error::SubmitError,
    types::{CompletePayload, FailurePayload},
};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const COMPLETE_EVENT: &str = "complete";
pub const ERROR_EVENT: &str = "error";
pub const DEFAULT_EVENT: &str = "message";

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";
pub const UNREADABLE_COMPLETION_MESSAGE: &str =
    "The task finished but its result could not be read.";

const FRAME_BUFFER: usize = 32;
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
}

/// Incremental decoder for `text/event-stream` bodies. Chunks may split
/// lines (and multi-byte characters) anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry_ms: Option<u64>,
    bom_checked: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        if !self.bom_checked {
            if self.pending.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.pending) {
                return Vec::new();
            }
            if self.pending.starts_with(&UTF8_BOM) {
                self.pending.drain(..UTF8_BOM.len());
            }
            self.bom_checked = true;
        }

        let mut frames = Vec::new();
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(retry) = value.parse::<u64>() {
                    self.retry_ms = Some(retry);
                }
            }
            other => debug!("ignoring unknown event-stream field {other}"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let retry_ms = self.retry_ms.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.filter(|name| !name.is_empty()).unwrap_or_else(|| DEFAULT_EVENT.into()),
            data,
            id: self.id.clone(),
            retry_ms,
        })
    }
}

/// Terminal outcome reported on a task's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Complete(CompletePayload),
    Failed(String),
}

impl TaskEvent {
    /// Maps a frame to a task event; frames with other names yield `None`.
    pub fn from_frame(frame: &SseFrame) -> Option<Self> {
        match frame.event.as_str() {
            COMPLETE_EVENT => match serde_json::from_str::<CompletePayload>(&frame.data) {
                Ok(payload) => Some(Self::Complete(payload)),
                Err(err) => {
                    warn!("could not parse complete event data {:?}: {err}", frame.data);
                    Some(Self::Failed(UNREADABLE_COMPLETION_MESSAGE.to_string()))
                }
            },
            ERROR_EVENT => {
                let message = match serde_json::from_str::<FailurePayload>(&frame.data) {
                    Ok(payload) => payload.message.filter(|message| !message.is_empty()),
                    Err(err) => {
                        warn!("could not parse error event data {:?}: {err}", frame.data);
                        None
                    }
                };
                Some(Self::Failed(message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())))
            }
            _ => None,
        }
    }
}

/// A live `/events/{task_id}` connection. Frames are read by a background
/// task that stops as soon as the subscription is closed.
pub struct EventSubscription {
    task_id: String,
    frames: mpsc::Receiver<Result<SseFrame, SubmitError>>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
    ended: bool,
    closed: bool,
}

impl EventSubscription {
    pub fn spawn<S, B, E>(task_id: impl Into<String>, body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send,
        E: Display + Send,
    {
        let task_id = task_id.into();
        let (frame_tx, frames) = mpsc::channel(FRAME_BUFFER);
        let cancel = CancellationToken::new();
        let reader_cancel = cancel.clone();
        let reader_task_id = task_id.clone();

        let reader = tokio::spawn(async move {
            let mut body = Box::pin(body);
            let mut decoder = SseDecoder::new();
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    chunk = body.next() => match chunk {
                        Some(Ok(bytes)) => {
                            for frame in decoder.feed(bytes.as_ref()) {
                                if frame_tx.send(Ok(frame)).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(err)) => {
                            let _ = frame_tx.send(Err(SubmitError::Stream(err.to_string()))).await;
                            break;
                        }
                        None => break,
                    },
                }
            }
            debug!("event reader for task {reader_task_id} stopped");
        });

        Self { task_id, frames, cancel, reader: Some(reader), ended: false, closed: false }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Waits for the next `complete` or `error` event. A connection that ends
    /// or fails before either arrives is reported once as a failure with the
    /// generic message. Returns `None` after the stream is closed.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        if self.closed || self.ended {
            return None;
        }
        loop {
            match self.frames.recv().await {
                Some(Ok(frame)) => {
                    if let Some(event) = TaskEvent::from_frame(&frame) {
                        return Some(event);
                    }
                    debug!(
                        "task {} ignoring `{}` event (id {:?}, retry {:?})",
                        self.task_id, frame.event, frame.id, frame.retry_ms
                    );
                }
                Some(Err(err)) => {
                    warn!("task {} event stream error: {err}", self.task_id);
                    self.ended = true;
                    return Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.to_string()));
                }
                None => {
                    warn!("task {} event stream ended without a terminal event", self.task_id);
                    self.ended = true;
                    return Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.to_string()));
                }
            }
        }
    }

    /// Tears the connection down. Returns `true` only for the call that
    /// actually closed it.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.cancel.cancel();
        self.frames.close();
        self.reader.take();
        debug!("closed event stream for task {}", self.task_id);
        true
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaLinks;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send {
        let owned: Vec<Result<Vec<u8>, std::io::Error>> =
            parts.iter().map(|part| Ok(part.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn decodes_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: comp").is_empty());
        assert!(decoder.feed(b"lete\ndata: {\"message\"").is_empty());
        let frames = decoder.feed(b":\"ok\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "complete");
        assert_eq!(frames[0].data, r#"{"message":"ok"}"#);
    }

    #[test]
    fn strips_leading_byte_order_mark() {
        let mut decoder = SseDecoder::new();
        let stream = "\u{FEFF}event: complete\ndata: {\"message\":\"ok\"}\n\n";
        let frames = decoder.feed(stream.as_bytes());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, COMPLETE_EVENT);
    }

    #[test]
    fn strips_byte_order_mark_split_across_chunks_only_once() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&[0xEF]).is_empty());
        assert!(decoder.feed(&[0xBB, 0xBF]).is_empty());
        let frames = decoder.feed(b"event: error\ndata: {}\n\n");
        assert_eq!(frames[0].event, ERROR_EVENT);

        let frames = decoder.feed("\u{FEFF}event: complete\ndata: x\n\n".as_bytes());
        assert_eq!(frames[0].event, DEFAULT_EVENT);
    }

    #[test]
    fn handles_crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames =
            decoder.feed(b": keep-alive\r\nid: 7\r\nretry: 1500\r\ndata: one\r\ndata: two\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: DEFAULT_EVENT.into(),
                data: "one\ntwo".into(),
                id: Some("7".into()),
                retry_ms: Some(1500),
            }]
        );
    }

    #[test]
    fn blank_frames_are_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: complete\n\n\n").is_empty());
        let frames = decoder.feed(b"data: x\n\n");
        assert_eq!(frames[0].event, DEFAULT_EVENT);
    }

    #[test]
    fn error_event_with_malformed_json_falls_back_to_generic_message() {
        let frame = SseFrame {
            event: ERROR_EVENT.into(),
            data: "not json".into(),
            id: None,
            retry_ms: None,
        };
        assert_eq!(
            TaskEvent::from_frame(&frame),
            Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.into()))
        );
    }

    #[test]
    fn error_event_without_message_falls_back_to_generic_message() {
        let frame =
            SseFrame { event: ERROR_EVENT.into(), data: "{}".into(), id: None, retry_ms: None };
        assert_eq!(
            TaskEvent::from_frame(&frame),
            Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.into()))
        );
    }

    #[test]
    fn unrelated_events_are_skipped() {
        let frame =
            SseFrame { event: "progress".into(), data: "{}".into(), id: None, retry_ms: None };
        assert_eq!(TaskEvent::from_frame(&frame), None);
    }

    #[tokio::test]
    async fn subscription_yields_terminal_event_and_stops_after_close() {
        let body = chunks(&[
            "event: progress\ndata: {\"pct\":10}\n\n",
            "event: complete\ndata: {\"audio_url\":\"a.mp3\",\"video_url\":\"b.mp4\"}\n\n",
            "event: error\ndata: {\"message\":\"late\"}\n\n",
        ]);
        let mut subscription = EventSubscription::spawn("abc123", body);

        let event = subscription.next_event().await;
        assert_eq!(
            event,
            Some(TaskEvent::Complete(CompletePayload::Media(MediaLinks {
                audio_url: "a.mp3".into(),
                video_url: "b.mp4".into(),
            })))
        );

        assert!(subscription.close());
        assert!(!subscription.close());
        assert_eq!(subscription.next_event().await, None);
    }

    #[tokio::test]
    async fn stream_ending_without_terminal_event_reports_failure_once() {
        let mut subscription = EventSubscription::spawn("t1", chunks(&[": ping\n\n"]));
        assert_eq!(
            subscription.next_event().await,
            Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.into()))
        );
        assert_eq!(subscription.next_event().await, None);
    }

    #[tokio::test]
    async fn transport_error_is_reported_as_failure() {
        let body = stream::iter(vec![
            Ok(b"event: progress\ndata: 1\n\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let mut subscription = EventSubscription::spawn("t2", body);
        assert_eq!(
            subscription.next_event().await,
            Some(TaskEvent::Failed(UNKNOWN_ERROR_MESSAGE.into()))
        );
    }
}
