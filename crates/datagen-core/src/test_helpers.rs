//! In-process fakes for workflow tests
//!
//! `FakeBackend` records every call and answers from queued responses.
//! `RecordingDownloader` records saved names without touching the disk.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::backend::GenerationBackend;
use crate::download::DownloadTrigger;
use crate::error::WorkflowError;
use crate::models::{ArtifactContent, GenerationRequest, GenerationResult};

/// Lets a test hold a generate call open until it releases it.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct FakeState {
    generate_responses: VecDeque<Result<GenerationResult, WorkflowError>>,
    fetch_responses: VecDeque<Result<ArtifactContent, WorkflowError>>,
    generate_calls: Vec<GenerationRequest>,
    fetch_calls: Vec<String>,
    gate: Option<Gate>,
    hang_generate: bool,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_generate_ok(&self, message: &str, output_file: &str) {
        self.inner
            .lock()
            .unwrap()
            .generate_responses
            .push_back(Ok(GenerationResult {
                status_message: message.to_string(),
                output_file_name: output_file.to_string(),
            }));
    }

    pub fn push_generate_err(&self, err: WorkflowError) {
        self.inner
            .lock()
            .unwrap()
            .generate_responses
            .push_back(Err(err));
    }

    pub fn push_fetch_ok(&self, body: &str) {
        self.inner
            .lock()
            .unwrap()
            .fetch_responses
            .push_back(Ok(ArtifactContent::new(body.as_bytes().to_vec())));
    }

    pub fn push_fetch_err(&self, err: WorkflowError) {
        self.inner.lock().unwrap().fetch_responses.push_back(Err(err));
    }

    /// Generate calls never complete.
    pub fn hang_generate(&self) {
        self.inner.lock().unwrap().hang_generate = true;
    }

    pub fn gate_generate(&self) -> Gate {
        let gate = Gate::default();
        self.inner.lock().unwrap().gate = Some(gate.clone());
        gate
    }

    pub fn generate_calls(&self) -> Vec<GenerationRequest> {
        self.inner.lock().unwrap().generate_calls.clone()
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().fetch_calls.clone()
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, WorkflowError> {
        let (gate, hang) = {
            let mut state = self.inner.lock().unwrap();
            state.generate_calls.push(request.clone());
            (state.gate.clone(), state.hang_generate)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.inner
            .lock()
            .unwrap()
            .generate_responses
            .pop_front()
            .unwrap_or_else(|| Err(WorkflowError::generation(None, None)))
    }

    async fn fetch(&self, output_file_name: &str) -> Result<ArtifactContent, WorkflowError> {
        if output_file_name.is_empty() {
            return Err(WorkflowError::NoArtifactAvailable);
        }
        let mut state = self.inner.lock().unwrap();
        state.fetch_calls.push(output_file_name.to_string());
        state
            .fetch_responses
            .pop_front()
            .unwrap_or_else(|| Err(WorkflowError::fetch(None, None)))
    }
}

#[derive(Clone, Default)]
pub struct RecordingDownloader {
    saved: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingDownloader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

impl DownloadTrigger for RecordingDownloader {
    fn trigger_download(
        &self,
        _content: &ArtifactContent,
        suggested_name: &str,
    ) -> Result<PathBuf, WorkflowError> {
        if self.fail {
            return Err(WorkflowError::DownloadInitiation("disk full".to_string()));
        }
        self.saved.lock().unwrap().push(suggested_name.to_string());
        Ok(PathBuf::from(suggested_name))
    }
}
