use crate::{
    api,
    app::{AppCommand, AppEvent},
    error::SubmitError,
    events::{TaskEvent, UNKNOWN_ERROR_MESSAGE},
    form::FormValues,
    types::ProtocolMode,
    view::{
        ErrorCard, ResultRegion, SubmissionView, SuccessCard, REQUESTING_STATUS,
        TASK_STARTED_STATUS,
    },
};
use std::sync::Arc;
use tokio::sync::{
    mpsc::{UnboundedReceiver, UnboundedSender},
    Mutex,
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// A submission was already in flight.
    Ignored,
    Succeeded,
    Failed,
}

/// Drives one form's submissions and owns its button and result region.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: api::Client,
    mode: ProtocolMode,
    event_tx: UnboundedSender<AppEvent>,
    view: Mutex<SubmissionView>,
}

impl Controller {
    pub fn new(
        client: api::Client,
        mode: ProtocolMode,
        button_label: impl Into<String>,
        event_tx: UnboundedSender<AppEvent>,
    ) -> Self {
        let inner = ControllerInner {
            client,
            mode,
            event_tx,
            view: Mutex::new(SubmissionView::new(button_label)),
        };
        Self { inner: Arc::new(inner) }
    }

    pub async fn view(&self) -> SubmissionView {
        self.inner.view.lock().await.clone()
    }

    pub fn spawn(self, mut command_rx: UnboundedReceiver<AppCommand>) {
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    AppCommand::Submit { values } => {
                        let controller = self.clone();
                        tokio::spawn(async move {
                            controller.submit(values).await;
                        });
                    }
                    AppCommand::Reload => {
                        if !self.reload().await {
                            debug!("reload ignored while a submission is in flight");
                        }
                    }
                }
            }
            debug!("command channel closed");
        });
    }

    /// Runs one submission to its terminal state. The button is disabled and
    /// the processing placeholder shown before any request is made; the
    /// button is re-enabled exactly once when the submission ends.
    pub async fn submit(&self, values: FormValues) -> SubmissionOutcome {
        if !self.begin().await {
            debug!("submit ignored: button is disabled");
            return SubmissionOutcome::Ignored;
        }

        let outcome = match self.run(&values).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(status = ?err.status(), "submission failed: {err}");
                self.show(ResultRegion::Error(ErrorCard::submission_failed(err.to_string())))
                    .await;
                SubmissionOutcome::Failed
            }
        };

        self.reset_button().await;
        outcome
    }

    /// The error card's recovery action: clears the result region. Refused
    /// while a submission is running.
    pub async fn reload(&self) -> bool {
        let mut view = self.inner.view.lock().await;
        if !view.button.is_enabled() {
            return false;
        }
        view.result = ResultRegion::Empty;
        self.emit(AppEvent::ResultChanged(view.result.clone()));
        true
    }

    async fn begin(&self) -> bool {
        let mut view = self.inner.view.lock().await;
        if !view.button.is_enabled() {
            return false;
        }
        view.button.set_busy();
        view.result = ResultRegion::processing(REQUESTING_STATUS);
        self.emit(AppEvent::ButtonChanged(view.button.clone()));
        self.emit(AppEvent::ResultChanged(view.result.clone()));
        true
    }

    async fn run(&self, values: &FormValues) -> Result<SubmissionOutcome, SubmitError> {
        let payload = values.to_payload();
        info!(
            "submitting {} request (mood {:?}, length {:?})",
            self.inner.mode, payload.mood, payload.length
        );

        let response = self.inner.client.create(&payload).await?;

        match self.inner.mode {
            ProtocolMode::Synchronous => {
                info!("creation accepted: {}", response.message.as_deref().unwrap_or("-"));
                self.show(ResultRegion::Success(SuccessCard::from_message(response.message)))
                    .await;
                Ok(SubmissionOutcome::Succeeded)
            }
            ProtocolMode::Streaming => {
                let task_id = response
                    .task_id
                    .filter(|task_id| !task_id.is_empty())
                    .ok_or(SubmitError::MissingTaskId)?;
                info!("task {task_id} started");
                self.show(ResultRegion::processing(TASK_STARTED_STATUS)).await;
                Ok(self.follow_task(&task_id).await)
            }
        }
    }

    async fn follow_task(&self, task_id: &str) -> SubmissionOutcome {
        let mut subscription = match self.inner.client.open_events(task_id).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!("could not open event stream for task {task_id}: {err}");
                self.show(ResultRegion::Error(ErrorCard::task_failed(UNKNOWN_ERROR_MESSAGE)))
                    .await;
                return SubmissionOutcome::Failed;
            }
        };
        self.emit(AppEvent::StreamOpened { task_id: task_id.to_string() });

        let outcome = match subscription.next_event().await {
            Some(TaskEvent::Complete(payload)) => {
                info!("task {task_id} complete");
                self.show(ResultRegion::Success(SuccessCard::from_completion(payload))).await;
                SubmissionOutcome::Succeeded
            }
            Some(TaskEvent::Failed(message)) => {
                warn!("task {task_id} failed: {message}");
                self.show(ResultRegion::Error(ErrorCard::task_failed(message))).await;
                SubmissionOutcome::Failed
            }
            None => {
                self.show(ResultRegion::Error(ErrorCard::task_failed(UNKNOWN_ERROR_MESSAGE)))
                    .await;
                SubmissionOutcome::Failed
            }
        };

        if subscription.close() {
            self.emit(AppEvent::StreamClosed { task_id: subscription.task_id().to_string() });
        }
        outcome
    }

    async fn show(&self, result: ResultRegion) {
        let mut view = self.inner.view.lock().await;
        view.result = result;
        self.emit(AppEvent::ResultChanged(view.result.clone()));
    }

    async fn reset_button(&self) {
        let mut view = self.inner.view.lock().await;
        view.button.reset();
        self.emit(AppEvent::ButtonChanged(view.button.clone()));
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.inner.event_tx.send(event);
    }
}
