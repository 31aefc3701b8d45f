//! Test harness for isolated capture-flow tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use delfin::{
    CapturePipeline, CapturedImage, CaptureState, Database, ExtractionError, InferenceClient,
    Notifier, OrderBook, OrderExtractor, Severity,
};

/// Inference client that answers from a queue of canned replies.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, ExtractionError>>>,
}

impl ScriptedClient {
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: ExtractionError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn generate(
        &self,
        _prompt: &str,
        _image: &CapturedImage,
    ) -> Result<String, ExtractionError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ExtractionError::EmptyResponse))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Keeps notifications and state changes in arrival order.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(Severity, String)>>,
    pub states: Mutex<Vec<CaptureState>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(Severity, String)> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn states(&self) -> Vec<CaptureState> {
        self.states.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }

    fn state_changed(&self, state: CaptureState) {
        self.states.lock().unwrap().push(state);
    }
}

/// A small JPEG-typed payload; the scripted client never looks at it.
pub fn jpeg(name: &str) -> CapturedImage {
    CapturedImage::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg", name)
        .expect("valid test image")
}

/// Isolated environment: temp database, export directory, scripted model.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub db: Database,
    pub client: Arc<ScriptedClient>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("delfin.db");
        let export_dir = temp_dir.path().join("exports");
        std::fs::create_dir_all(&export_dir).expect("Failed to create export dir");

        let db = Database::open(&db_path).expect("Failed to open database");

        Self {
            temp_dir,
            db_path,
            export_dir,
            db,
            client: Arc::new(ScriptedClient::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn pipeline(&self) -> CapturePipeline {
        CapturePipeline::new(
            self.db.clone(),
            OrderExtractor::new(self.client.clone()),
            self.notifier.clone(),
        )
    }

    pub fn book(&self) -> OrderBook {
        OrderBook::new(self.db.clone(), self.notifier.clone())
    }

    /// Reopens the database file, as a new process would.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen database")
    }
}
