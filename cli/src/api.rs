use crate::{
    error::{SubmitError, SubmitResult},
    events::EventSubscription,
    types::{CreateErrorBody, CreateResponse, SubmissionPayload},
};
use anyhow::{Context, Result};
use reqwest::{
    header::{ACCEPT, CACHE_CONTROL},
    Url,
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const CREATE_PATH: &str = "create";
const EVENTS_PATH: &str = "events";

pub const GENERIC_CREATE_FAILURE: &str = "Failed to start the creation process.";

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Option<Duration>,
}

impl Client {
    pub fn new(base_url: Option<&str>, request_timeout: Option<Duration>) -> Result<Self> {
        let mut url = base_url
            .map(Url::parse)
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL))
            .context("invalid server base URL")?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url: url, request_timeout })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /create`. A non-2xx answer becomes [`SubmitError::Rejected`]
    /// carrying the body's `error` text, or a generic message when the body
    /// has none.
    pub async fn create(&self, payload: &SubmissionPayload) -> SubmitResult<CreateResponse> {
        let url = self.endpoint(CREATE_PATH)?;
        debug!("posting submission to {url}");

        let mut request = self.http.post(url).json(payload);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<CreateErrorBody>(&body)
                .ok()
                .and_then(|body| body.error)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| GENERIC_CREATE_FAILURE.to_string());
            return Err(SubmitError::Rejected { status: status.as_u16(), message });
        }

        serde_json::from_slice::<CreateResponse>(&body)
            .map_err(|err| SubmitError::MalformedResponse(err.to_string()))
    }

    /// Opens `GET /events/{task_id}` and hands the body to an
    /// [`EventSubscription`]. No timeout applies to the stream.
    pub async fn open_events(&self, task_id: &str) -> SubmitResult<EventSubscription> {
        let url = self.events_url(task_id)?;
        debug!("opening event stream {url}");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = format!("event stream responded with status {status}");
            return Err(SubmitError::Stream(message));
        }
        Ok(EventSubscription::spawn(task_id, response.bytes_stream()))
    }

    pub fn events_url(&self, task_id: &str) -> SubmitResult<Url> {
        let mut url = self.endpoint(EVENTS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| SubmitError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(task_id);
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> SubmitResult<Url> {
        self.base_url.join(path).map_err(|err| SubmitError::Url(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::TaskEvent,
        types::{CompletePayload, TrackLength},
    };
    use mockito::Matcher;
    use serde_json::json;

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            mood: "happy".into(),
            age: "25".into(),
            pricing: "standard".into(),
            length: TrackLength::Seconds(30),
            artist: "test".into(),
            vision: "sunset".into(),
        }
    }

    #[test]
    fn builds_endpoints_under_base_path() {
        let client = Client::new(Some("http://example.test/app"), None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://example.test/app/");
        assert_eq!(
            client.events_url("abc 123").unwrap().as_str(),
            "http://example.test/app/events/abc%20123"
        );
        assert_eq!(
            client.endpoint(CREATE_PATH).unwrap().as_str(),
            "http://example.test/app/create"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(Client::new(Some("not a url"), None).is_err());
    }

    #[tokio::test]
    async fn posts_json_payload_to_create() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/create")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "mood": "happy",
                "age": "25",
                "pricing": "standard",
                "length": 30,
                "artist": "test",
                "vision": "sunset"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id":"abc123"}"#)
            .create_async()
            .await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let response = client.create(&payload()).await.unwrap();
        assert_eq!(response.task_id.as_deref(), Some("abc123"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_server_error_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/create")
            .with_status(400)
            .with_body(r#"{"error":"invalid mood"}"#)
            .create_async()
            .await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let err = client.create(&payload()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "invalid mood");
    }

    #[tokio::test]
    async fn falls_back_to_generic_failure_without_error_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/create")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let err = client.create(&payload()).await.unwrap_err();
        assert_eq!(err.to_string(), GENERIC_CREATE_FAILURE);
    }

    #[tokio::test]
    async fn malformed_success_body_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/create").with_status(200).with_body("<html>").create_async().await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let err = client.create(&payload()).await.unwrap_err();
        assert!(matches!(err, SubmitError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn opens_event_stream_for_task() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/events/abc123")
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("event: complete\ndata: {\"message\":\"all done\"}\n\n")
            .create_async()
            .await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let mut subscription = client.open_events("abc123").await.unwrap();
        assert_eq!(subscription.task_id(), "abc123");
        assert_eq!(
            subscription.next_event().await,
            Some(TaskEvent::Complete(CompletePayload::Message { message: "all done".into() }))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn event_stream_status_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/events/missing").with_status(404).create_async().await;

        let client = Client::new(Some(server.url().as_str()), None).unwrap();
        let result = client.open_events("missing").await;
        assert!(matches!(result, Err(SubmitError::Stream(_))));
    }
}
