//! Workflow orchestrator
//!
//! One workflow instance owns the form (schema sources and parameters) and a
//! single `WorkflowState`. A submission runs as a strictly sequential pipeline:
//!
//! resolve schema -> build request -> generate -> fetch -> (download, preview)
//!
//! Each stage hands its result to the next as a value. Download and preview are
//! independent consumers of the same fetched content, so a failed save does not
//! block the preview. Failures leave the form untouched and keep the last
//! generated file name around so the fetch can be retried on its own.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::backend::GenerationBackend;
use crate::config::ClientConfig;
use crate::download::DownloadTrigger;
use crate::error::{ErrorMetadata, Failure, LogLevel, Stage, WorkflowError};
use crate::models::{GenerationMode, GenerationParameters, PreviewTable, UploadedSchema};
use crate::preview::PreviewParser;
use crate::request::build_request;
use crate::schema::resolve_schema;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Deadline for each network stage
    pub stage_timeout: Duration,
    pub parser: PreviewParser,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stage_timeout: ClientConfig::default().stage_timeout,
            parser: PreviewParser::default(),
        }
    }
}

impl From<&ClientConfig> for WorkflowConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            stage_timeout: config.stage_timeout,
            parser: PreviewParser::default(),
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub status_message: String,
    pub output_file_name: String,
    /// Where the artifact was saved, if the download succeeded
    pub saved_to: Option<PathBuf>,
    pub download_failure: Option<Failure>,
    pub preview: PreviewTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    SchemaSelected,
    Submitting,
    Generated {
        status_message: String,
        output_file_name: String,
    },
    Fetching {
        output_file_name: String,
    },
    Complete(Box<WorkflowOutcome>),
    Errored {
        failure: Failure,
        /// Set when the download went through but the preview did not
        saved_to: Option<PathBuf>,
    },
}

impl WorkflowState {
    /// Whether a network call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            WorkflowState::Submitting
                | WorkflowState::Generated { .. }
                | WorkflowState::Fetching { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::SchemaSelected => "schema_selected",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Generated { .. } => "generated",
            WorkflowState::Fetching { .. } => "fetching",
            WorkflowState::Complete(_) => "complete",
            WorkflowState::Errored { .. } => "errored",
        }
    }

    fn errored(err: &WorkflowError, saved_to: Option<PathBuf>) -> Self {
        WorkflowState::Errored {
            failure: Failure::from(err),
            saved_to,
        }
    }
}

/// User-editable form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaForm {
    pub typed_text: String,
    pub upload: Option<UploadedSchema>,
    pub params: GenerationParameters,
}

pub struct Workflow<B, D> {
    backend: B,
    downloader: D,
    config: WorkflowConfig,
    form: SchemaForm,
    state: WorkflowState,
    /// Status for failures that do not change state (e.g. missing schema)
    notice: Option<String>,
    /// File name from the last successful generation
    last_output: Option<String>,
}

impl<B, D> Workflow<B, D>
where
    B: GenerationBackend,
    D: DownloadTrigger,
{
    pub fn new(backend: B, downloader: D, config: WorkflowConfig) -> Self {
        Self {
            backend,
            downloader,
            config,
            form: SchemaForm::default(),
            state: WorkflowState::Idle,
            notice: None,
            last_output: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn form(&self) -> &SchemaForm {
        &self.form
    }

    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    /// The single user-visible status line.
    pub fn status(&self) -> Option<String> {
        match &self.state {
            WorkflowState::Idle | WorkflowState::SchemaSelected => self.notice.clone(),
            WorkflowState::Submitting => Some("Generating...".to_string()),
            WorkflowState::Generated { status_message, .. } => Some(status_message.clone()),
            WorkflowState::Fetching { output_file_name } => {
                Some(format!("Downloading {}...", output_file_name))
            }
            WorkflowState::Complete(outcome) => Some(match &outcome.download_failure {
                Some(failure) => format!("{} {}", outcome.status_message, failure.message),
                None => outcome.status_message.clone(),
            }),
            WorkflowState::Errored { failure, .. } => Some(failure.message.clone()),
        }
    }

    pub fn set_typed_text(&mut self, text: impl Into<String>) {
        self.form.typed_text = text.into();
        self.on_edit();
    }

    /// Select a schema file. Its text is copied into the typed-text slot when
    /// that slot is empty (or still holds the previous file's text), so it can
    /// be shown and edited before submission.
    pub fn select_file(&mut self, upload: UploadedSchema) {
        let prefilled = self
            .form
            .upload
            .as_ref()
            .and_then(UploadedSchema::as_text)
            .is_some_and(|text| text == self.form.typed_text);
        if prefilled || self.form.typed_text.is_empty() {
            self.form.typed_text = upload.as_text().unwrap_or_default().to_string();
        }
        debug!(file_name = %upload.file_name, bytes = upload.bytes.len(), "Schema file selected");
        self.form.upload = Some(upload);
        self.on_edit();
    }

    pub fn clear_file(&mut self) {
        self.form.upload = None;
        self.on_edit();
    }

    pub fn set_record_count(&mut self, raw: impl Into<String>) {
        self.form.params.record_count = raw.into();
        self.on_edit();
    }

    pub fn set_interval_minutes(&mut self, raw: impl Into<String>) {
        self.form.params.interval_minutes = raw.into();
        self.on_edit();
    }

    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.form.params.mode = mode;
        self.on_edit();
    }

    pub fn set_output_name(&mut self, name: Option<String>) {
        self.form.params.output_name = name;
        self.on_edit();
    }

    /// Make a previously generated file available to `retry_fetch`.
    pub fn remember_artifact(&mut self, output_file_name: impl Into<String>) {
        let name = output_file_name.into();
        if !name.is_empty() {
            self.last_output = Some(name);
        }
    }

    fn on_edit(&mut self) {
        self.notice = None;
        let has_schema =
            resolve_schema(&self.form.typed_text, self.form.upload.as_ref()).is_ok();
        match self.state {
            WorkflowState::Idle if has_schema => self.state = WorkflowState::SchemaSelected,
            WorkflowState::Complete(_) | WorkflowState::Errored { .. } => {
                self.state = WorkflowState::SchemaSelected
            }
            _ => {}
        }
    }

    /// Run the full pipeline for the current form.
    ///
    /// A missing schema fails before any network call and leaves the state as
    /// it was. Any later failure moves to `Errored` with the form kept intact.
    pub async fn submit(&mut self) -> Result<WorkflowOutcome, WorkflowError> {
        let input = match resolve_schema(&self.form.typed_text, self.form.upload.as_ref()) {
            Ok(input) => input,
            Err(err) => {
                log_failure(&err);
                self.notice = Some(err.client_message());
                return Err(err);
            }
        };
        let request = build_request(&input, &self.form.params);
        for warning in &request.warnings {
            warn!(warning = %warning, "Submitting generation request with invalid parameter");
        }

        let Self {
            backend,
            downloader,
            config,
            state,
            notice,
            last_output,
            ..
        } = self;
        *notice = None;

        let mut guard = StageGuard::enter(
            state,
            WorkflowState::Submitting,
            cancelled(Stage::Generate),
        );
        *last_output = None;

        let span = info_span!("generate", mode = %request.mode, schema = %request.schema_file_name);
        info!(
            records = %request.record_count,
            interval = %request.interval_minutes,
            degraded = request.is_degraded(),
            "Submitting generation request"
        );
        let result = match run_stage(
            config.stage_timeout,
            Stage::Generate,
            backend.generate(&request).instrument(span),
        )
        .await
        {
            Ok(result) => result,
            Err(err) => {
                log_failure(&err);
                guard.settle(WorkflowState::errored(&err, None));
                return Err(err);
            }
        };
        info!(
            output_file = %result.output_file_name,
            message = %result.status_message,
            "Generation accepted"
        );
        *last_output = Some(result.output_file_name.clone());

        guard.advance(
            WorkflowState::Generated {
                status_message: result.status_message.clone(),
                output_file_name: result.output_file_name.clone(),
            },
            cancelled(Stage::Fetch),
        );
        guard.advance(
            WorkflowState::Fetching {
                output_file_name: result.output_file_name.clone(),
            },
            cancelled(Stage::Fetch),
        );

        match fetch_and_present(backend, downloader, config, &result.output_file_name).await {
            Ok(presented) => {
                let outcome = presented.into_outcome(result.status_message);
                guard.settle(WorkflowState::Complete(Box::new(outcome.clone())));
                Ok(outcome)
            }
            Err((err, saved_to)) => {
                log_failure(&err);
                guard.settle(WorkflowState::errored(&err, saved_to));
                Err(err)
            }
        }
    }

    /// Fetch the last generated file again without regenerating it.
    pub async fn retry_fetch(&mut self) -> Result<WorkflowOutcome, WorkflowError> {
        let Self {
            backend,
            downloader,
            config,
            state,
            notice,
            last_output,
            ..
        } = self;
        *notice = None;

        let output_file_name = match last_output.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let err = WorkflowError::NoArtifactAvailable;
                log_failure(&err);
                *state = WorkflowState::errored(&err, None);
                return Err(err);
            }
        };

        let guard = StageGuard::enter(
            state,
            WorkflowState::Fetching {
                output_file_name: output_file_name.clone(),
            },
            cancelled(Stage::Fetch),
        );

        match fetch_and_present(backend, downloader, config, &output_file_name).await {
            Ok(presented) => {
                let outcome = presented.into_outcome(format!("Fetched {}.", output_file_name));
                guard.settle(WorkflowState::Complete(Box::new(outcome.clone())));
                Ok(outcome)
            }
            Err((err, saved_to)) => {
                log_failure(&err);
                guard.settle(WorkflowState::errored(&err, saved_to));
                Err(err)
            }
        }
    }

    /// Pull the latest snapshot of a streaming artifact.
    pub async fn refresh(&mut self) -> Result<WorkflowOutcome, WorkflowError> {
        self.retry_fetch().await
    }
}

struct Presented {
    output_file_name: String,
    saved_to: Option<PathBuf>,
    download_failure: Option<Failure>,
    preview: PreviewTable,
}

impl Presented {
    fn into_outcome(self, status_message: String) -> WorkflowOutcome {
        WorkflowOutcome {
            status_message,
            output_file_name: self.output_file_name,
            saved_to: self.saved_to,
            download_failure: self.download_failure,
            preview: self.preview,
        }
    }
}

/// Fetch once, then hand the same content to the download trigger and the
/// preview parser. The error side carries the saved path when only the
/// preview failed.
async fn fetch_and_present<B, D>(
    backend: &B,
    downloader: &D,
    config: &WorkflowConfig,
    output_file_name: &str,
) -> Result<Presented, (WorkflowError, Option<PathBuf>)>
where
    B: GenerationBackend,
    D: DownloadTrigger,
{
    if output_file_name.is_empty() {
        return Err((WorkflowError::NoArtifactAvailable, None));
    }

    let span = info_span!("fetch", output_file = %output_file_name);
    let content = run_stage(
        config.stage_timeout,
        Stage::Fetch,
        backend.fetch(output_file_name).instrument(span),
    )
    .await
    .map_err(|err| (err, None))?;
    info!(output_file = %output_file_name, bytes = content.len(), "Artifact fetched");

    let (saved_to, download_failure) =
        match downloader.trigger_download(&content, output_file_name) {
            Ok(path) => (Some(path), None),
            Err(err) => {
                log_failure(&err);
                (None, Some(Failure::from(&err)))
            }
        };

    let preview = match config.parser.parse(&content) {
        Ok(preview) => preview,
        Err(err) => return Err((WorkflowError::Parse(err), saved_to)),
    };
    if !preview.anomalies().is_empty() {
        warn!(
            skipped = preview.anomalies().len(),
            "Preview skipped rows with the wrong number of fields"
        );
    }

    Ok(Presented {
        output_file_name: output_file_name.to_string(),
        saved_to,
        download_failure,
        preview,
    })
}

async fn run_stage<T, F>(limit: Duration, stage: Stage, fut: F) -> Result<T, WorkflowError>
where
    F: Future<Output = Result<T, WorkflowError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| WorkflowError::TimedOut { stage })?
}

fn cancelled(stage: Stage) -> WorkflowState {
    WorkflowState::errored(&WorkflowError::Cancelled { stage }, None)
}

fn log_failure(err: &WorkflowError) {
    match err.log_level() {
        LogLevel::Debug => debug!(code = err.error_code(), error = %err, "Workflow step failed"),
        LogLevel::Warn => warn!(code = err.error_code(), error = %err, "Workflow step failed"),
        LogLevel::Error => error!(code = err.error_code(), error = %err, "Workflow step failed"),
    }
}

/// Holds the state while a stage is in flight. If the run is dropped before
/// it settles, the state falls back to the failure state of the current stage.
struct StageGuard<'a> {
    state: &'a mut WorkflowState,
    on_drop: Option<WorkflowState>,
}

impl<'a> StageGuard<'a> {
    fn enter(state: &'a mut WorkflowState, current: WorkflowState, on_drop: WorkflowState) -> Self {
        *state = current;
        Self {
            state,
            on_drop: Some(on_drop),
        }
    }

    fn advance(&mut self, current: WorkflowState, on_drop: WorkflowState) {
        *self.state = current;
        self.on_drop = Some(on_drop);
    }

    fn settle(mut self, state: WorkflowState) {
        *self.state = state;
        self.on_drop = None;
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.on_drop.take() {
            debug!(state = state.name(), "Workflow run dropped before completion");
            *self.state = state;
        }
    }
}

/// Shareable workflow that refuses a second submission while one is running.
pub struct WorkflowHandle<B, D> {
    inner: Arc<tokio::sync::Mutex<Workflow<B, D>>>,
}

impl<B, D> Clone for WorkflowHandle<B, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, D> WorkflowHandle<B, D>
where
    B: GenerationBackend,
    D: DownloadTrigger,
{
    pub fn new(workflow: Workflow<B, D>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(workflow)),
        }
    }

    pub async fn submit(&self) -> Result<WorkflowOutcome, WorkflowError> {
        let mut workflow = self.try_acquire()?;
        workflow.submit().await
    }

    pub async fn retry_fetch(&self) -> Result<WorkflowOutcome, WorkflowError> {
        let mut workflow = self.try_acquire()?;
        workflow.retry_fetch().await
    }

    /// Apply a form edit. Rejected while a run is in flight.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Workflow<B, D>) -> R) -> Result<R, WorkflowError> {
        let mut workflow = self.try_acquire()?;
        Ok(f(&mut workflow))
    }

    /// Current state and status line, waiting for any in-flight run.
    pub async fn snapshot(&self) -> (WorkflowState, Option<String>) {
        let workflow = self.inner.lock().await;
        (workflow.state().clone(), workflow.status())
    }

    fn try_acquire(&self) -> Result<tokio::sync::MutexGuard<'_, Workflow<B, D>>, WorkflowError> {
        self.inner.try_lock().map_err(|_| {
            debug!("Rejected request while a submission is in flight");
            WorkflowError::SubmissionInFlight
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RetryStep, GENERIC_GENERATION_FAILURE};
    use crate::test_helpers::{FakeBackend, RecordingDownloader};
    use crate::DirectoryDownloader;
    use tempfile::tempdir;

    fn workflow(backend: FakeBackend) -> Workflow<FakeBackend, RecordingDownloader> {
        Workflow::new(backend, RecordingDownloader::default(), WorkflowConfig::default())
    }

    #[tokio::test]
    async fn batch_run_generates_fetches_and_previews() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out_1.csv");
        backend.push_fetch_ok("a,b\n1,2\n3,4\n");
        let dir = tempdir().unwrap();
        let mut wf = Workflow::new(
            backend.clone(),
            DirectoryDownloader::new(dir.path()),
            WorkflowConfig::default(),
        );

        wf.set_typed_text(r#"{"fields":["a","b"]}"#);
        wf.set_record_count("5");
        wf.set_mode(GenerationMode::Batch);
        assert_eq!(wf.state(), &WorkflowState::SchemaSelected);

        let outcome = wf.submit().await.unwrap();

        assert_eq!(outcome.preview.row_count(), 2);
        assert_eq!(outcome.preview.headers(), ["a", "b"]);
        assert_eq!(outcome.status_message, "ok");
        assert_eq!(outcome.saved_to, Some(dir.path().join("out_1.csv")));
        assert_eq!(
            std::fs::read(dir.path().join("out_1.csv")).unwrap(),
            b"a,b\n1,2\n3,4\n"
        );
        assert!(matches!(wf.state(), WorkflowState::Complete(_)));
        assert_eq!(wf.status().as_deref(), Some("ok"));

        let generated = backend.generate_calls();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].schema_file_name, "schema.json");
        assert_eq!(&generated[0].schema_blob[..], br#"{"fields":["a","b"]}"#);
        assert_eq!(generated[0].record_count, "5");
        assert_eq!(generated[0].mode, GenerationMode::Batch);
        assert_eq!(backend.fetch_calls(), vec!["out_1.csv".to_string()]);
    }

    #[tokio::test]
    async fn missing_schema_makes_no_network_call() {
        let backend = FakeBackend::new();
        let mut wf = workflow(backend.clone());

        let err = wf.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::NoSchemaProvided));
        assert_eq!(wf.status().as_deref(), Some("Please upload or type a schema."));
        assert_eq!(wf.state(), &WorkflowState::Idle);
        assert!(backend.generate_calls().is_empty());
        assert!(backend.fetch_calls().is_empty());
    }

    #[tokio::test]
    async fn typed_text_wins_over_selected_file() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend.clone());

        wf.set_typed_text(r#"{"typed":"word"}"#);
        wf.select_file(UploadedSchema::new("file.json", br#"{"file":"int"}"#.to_vec()));
        wf.submit().await.unwrap();

        let request = &backend.generate_calls()[0];
        assert_eq!(&request.schema_blob[..], br#"{"typed":"word"}"#);
        assert_eq!(request.schema_file_name, "schema.json");
    }

    #[tokio::test]
    async fn selected_file_prefills_text_and_keeps_its_name() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend.clone());

        wf.select_file(UploadedSchema::new("users.json", br#"{"id":"int"}"#.to_vec()));
        assert_eq!(wf.form().typed_text, r#"{"id":"int"}"#);
        assert_eq!(wf.state(), &WorkflowState::SchemaSelected);
        wf.submit().await.unwrap();

        let request = &backend.generate_calls()[0];
        assert_eq!(request.schema_file_name, "users.json");
        assert_eq!(&request.schema_blob[..], br#"{"id":"int"}"#);
    }

    #[tokio::test]
    async fn reselecting_a_file_replaces_prefilled_text() {
        let backend = FakeBackend::new();
        let mut wf = workflow(backend);

        wf.select_file(UploadedSchema::new("a.json", br#"{"a":"int"}"#.to_vec()));
        wf.select_file(UploadedSchema::new("b.json", br#"{"b":"int"}"#.to_vec()));
        assert_eq!(wf.form().typed_text, r#"{"b":"int"}"#);

        wf.set_typed_text(r#"{"mine":"word"}"#);
        wf.select_file(UploadedSchema::new("c.json", br#"{"c":"int"}"#.to_vec()));
        assert_eq!(wf.form().typed_text, r#"{"mine":"word"}"#);
    }

    #[tokio::test]
    async fn binary_upload_is_sent_as_is() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend.clone());

        wf.select_file(UploadedSchema::new("blob.bin", vec![0xff, 0x00, 0x7b]));
        assert_eq!(wf.form().typed_text, "");
        wf.submit().await.unwrap();

        assert_eq!(&backend.generate_calls()[0].schema_blob[..], &[0xff, 0x00, 0x7b]);
    }

    #[tokio::test]
    async fn generation_failure_keeps_form_and_allows_resubmit() {
        let backend = FakeBackend::new();
        backend.push_generate_err(WorkflowError::generation(None, Some(500)));
        backend.push_generate_ok("CSV generation started in streaming mode!", "output.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend.clone());

        wf.set_typed_text(r#"{"a":"int"}"#);
        wf.set_mode(GenerationMode::Stream);
        wf.set_interval_minutes("5");

        let err = wf.submit().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Generation { status: Some(500), .. }));
        match wf.state() {
            WorkflowState::Errored { failure, .. } => {
                assert_eq!(failure.retry, RetryStep::Resubmit);
                assert_eq!(failure.message, GENERIC_GENERATION_FAILURE);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(backend.fetch_calls().is_empty());
        assert_eq!(wf.form().typed_text, r#"{"a":"int"}"#);
        assert_eq!(wf.form().params.interval_minutes, "5");

        wf.submit().await.unwrap();

        let calls = backend.generate_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[1].mode, GenerationMode::Stream);
        assert_eq!(calls[1].interval_minutes, "5");
        assert_eq!(backend.fetch_calls().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_output_for_fetch_only_retry() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out_1.csv");
        backend.push_fetch_err(WorkflowError::fetch(None, Some(404)));
        backend.push_fetch_ok("a,b\n1,2\n");
        let mut wf = workflow(backend.clone());

        wf.set_typed_text("{}");
        let err = wf.submit().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Fetch { status: Some(404), .. }));
        assert_eq!(wf.last_output(), Some("out_1.csv"));
        match wf.state() {
            WorkflowState::Errored { failure, .. } => assert_eq!(failure.retry, RetryStep::Fetch),
            other => panic!("unexpected state {:?}", other),
        }

        let outcome = wf.retry_fetch().await.unwrap();

        assert_eq!(outcome.preview.row_count(), 1);
        assert_eq!(backend.generate_calls().len(), 1);
        assert_eq!(
            backend.fetch_calls(),
            vec!["out_1.csv".to_string(), "out_1.csv".to_string()]
        );
    }

    #[tokio::test]
    async fn output_survives_edits_after_fetch_failure() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out_1.csv");
        backend.push_fetch_err(WorkflowError::fetch(None, None));
        let mut wf = workflow(backend.clone());

        wf.set_typed_text("{}");
        let _ = wf.submit().await;
        wf.set_record_count("7");

        assert_eq!(wf.state(), &WorkflowState::SchemaSelected);
        assert_eq!(wf.last_output(), Some("out_1.csv"));
    }

    #[tokio::test]
    async fn failed_resubmit_forgets_previous_output() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out_1.csv");
        backend.push_fetch_ok("a\n1\n");
        backend.push_generate_err(WorkflowError::generation(None, Some(500)));
        let mut wf = workflow(backend.clone());

        wf.set_typed_text("{}");
        wf.submit().await.unwrap();
        assert_eq!(wf.last_output(), Some("out_1.csv"));

        wf.set_record_count("20");
        wf.submit().await.unwrap_err();
        assert_eq!(wf.last_output(), None);

        let err = wf.retry_fetch().await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoArtifactAvailable));
        assert_eq!(backend.fetch_calls(), vec!["out_1.csv".to_string()]);
    }

    #[tokio::test]
    async fn retry_without_artifact_makes_no_call() {
        let backend = FakeBackend::new();
        let mut wf = workflow(backend.clone());

        let err = wf.retry_fetch().await.unwrap_err();

        assert!(matches!(err, WorkflowError::NoArtifactAvailable));
        assert_eq!(wf.status().as_deref(), Some("No file available for download."));
        assert!(backend.fetch_calls().is_empty());
    }

    #[tokio::test]
    async fn empty_output_name_is_never_fetched() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "");
        let mut wf = workflow(backend.clone());

        wf.set_typed_text("{}");
        let err = wf.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::NoArtifactAvailable));
        assert!(backend.fetch_calls().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_errors_but_download_still_happens() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("");
        let downloader = RecordingDownloader::default();
        let mut wf = Workflow::new(backend.clone(), downloader.clone(), WorkflowConfig::default());

        wf.set_typed_text("{}");
        let err = wf.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::Parse(_)));
        assert_eq!(downloader.saved(), vec!["out.csv".to_string()]);
        match wf.state() {
            WorkflowState::Errored { failure, saved_to } => {
                assert_eq!(failure.code, "PARSE_ERROR");
                assert_eq!(failure.retry, RetryStep::Fetch);
                assert!(saved_to.is_some());
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn download_failure_does_not_block_preview() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = Workflow::new(
            backend,
            RecordingDownloader::failing(),
            WorkflowConfig::default(),
        );

        wf.set_typed_text("{}");
        let outcome = wf.submit().await.unwrap();

        assert_eq!(outcome.preview.row_count(), 1);
        assert_eq!(outcome.saved_to, None);
        assert_eq!(
            outcome.download_failure.as_ref().map(|f| f.code),
            Some("DOWNLOAD_INITIATION_ERROR")
        );
        assert_eq!(
            wf.status().as_deref(),
            Some("ok Download could not be initiated.")
        );
    }

    #[tokio::test]
    async fn generate_timeout_follows_failure_transition() {
        let backend = FakeBackend::new();
        backend.hang_generate();
        let mut wf = Workflow::new(
            backend.clone(),
            RecordingDownloader::default(),
            WorkflowConfig {
                stage_timeout: Duration::from_millis(20),
                ..WorkflowConfig::default()
            },
        );

        wf.set_typed_text("{}");
        let err = wf.submit().await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::TimedOut {
                stage: Stage::Generate
            }
        ));
        match wf.state() {
            WorkflowState::Errored { failure, .. } => assert_eq!(failure.retry, RetryStep::Resubmit),
            other => panic!("unexpected state {:?}", other),
        }
        assert!(backend.fetch_calls().is_empty());
    }

    #[tokio::test]
    async fn dropped_run_falls_back_to_errored() {
        let backend = FakeBackend::new();
        backend.hang_generate();
        let mut wf = workflow(backend);
        wf.set_typed_text("{}");

        let result = tokio::time::timeout(Duration::from_millis(20), wf.submit()).await;
        assert!(result.is_err());
        assert!(!wf.state().is_in_flight());

        match wf.state() {
            WorkflowState::Errored { failure, .. } => {
                assert_eq!(failure.code, "CANCELLED");
                assert_eq!(failure.retry, RetryStep::Resubmit);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn second_submission_rejected_while_in_flight() {
        let backend = FakeBackend::new();
        let gate = backend.gate_generate();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend.clone());
        wf.set_typed_text("{}");
        let handle = WorkflowHandle::new(wf);

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.submit().await }
        });
        gate.entered.notified().await;

        assert!(matches!(
            handle.submit().await,
            Err(WorkflowError::SubmissionInFlight)
        ));
        assert!(matches!(
            handle.edit(|wf| wf.set_record_count("3")),
            Err(WorkflowError::SubmissionInFlight)
        ));

        gate.release.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(backend.generate_calls().len(), 1);
        let (state, status) = handle.snapshot().await;
        assert!(matches!(state, WorkflowState::Complete(_)));
        assert_eq!(status.as_deref(), Some("ok"));
        assert!(handle.edit(|wf| wf.set_record_count("3")).is_ok());
    }

    #[tokio::test]
    async fn degraded_request_is_still_sent() {
        let backend = FakeBackend::new();
        backend.push_generate_err(WorkflowError::generation(
            Some("num_records: value is not a valid integer".to_string()),
            Some(422),
        ));
        let mut wf = workflow(backend.clone());

        wf.set_typed_text("{}");
        wf.set_record_count("ten");
        let err = wf.submit().await.unwrap_err();

        assert_eq!(
            wf.status().as_deref(),
            Some("num_records: value is not a valid integer")
        );
        assert!(matches!(err, WorkflowError::Generation { .. }));
        let request = &backend.generate_calls()[0];
        assert_eq!(request.record_count, "ten");
        assert!(request.is_degraded());
    }

    #[tokio::test]
    async fn edits_return_terminal_states_to_schema_selected() {
        let backend = FakeBackend::new();
        backend.push_generate_ok("ok", "out.csv");
        backend.push_fetch_ok("a\n1\n");
        let mut wf = workflow(backend);

        wf.set_record_count("3");
        assert_eq!(wf.state(), &WorkflowState::Idle);

        wf.set_typed_text("{}");
        wf.submit().await.unwrap();
        assert!(matches!(wf.state(), WorkflowState::Complete(_)));

        wf.set_mode(GenerationMode::Stream);
        assert_eq!(wf.state(), &WorkflowState::SchemaSelected);
    }

    #[tokio::test]
    async fn refresh_refetches_stream_snapshot() {
        let backend = FakeBackend::new();
        backend.push_fetch_ok("a\n1\n");
        backend.push_fetch_ok("a\n1\n2\n");
        let mut wf = workflow(backend.clone());
        wf.remember_artifact("output.csv");

        assert_eq!(wf.refresh().await.unwrap().preview.row_count(), 1);
        assert_eq!(wf.refresh().await.unwrap().preview.row_count(), 2);
        assert!(backend.generate_calls().is_empty());
        assert_eq!(backend.fetch_calls().len(), 2);
    }
}
