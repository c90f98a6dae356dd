//! Shared test utilities for integration tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use cs_core::config::StackConfig;
use cs_core::error::CsResult;
use cs_services::{CapturedOutput, Invocation, Orchestrator, StackLifecycle};

/// Records every invocation instead of spawning anything.
///
/// Exit codes for `run` and outputs for `capture` are served from queues;
/// once a queue is empty every call succeeds with empty output.
#[derive(Default)]
pub struct FakeOrchestrator {
    calls: Mutex<Vec<Invocation>>,
    run_codes: Mutex<VecDeque<i32>>,
    captures: Mutex<VecDeque<CapturedOutput>>,
    /// Whether `watched` existed at the time of each call.
    watched: Option<PathBuf>,
    watched_seen: Mutex<Vec<bool>>,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether `path` exists whenever the fake is invoked.
    pub fn watching(path: impl Into<PathBuf>) -> Self {
        Self {
            watched: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn push_run_code(&self, code: i32) {
        self.run_codes.lock().unwrap().push_back(code);
    }

    pub fn push_capture(&self, code: i32, stdout: &str) {
        self.captures.lock().unwrap().push_back(CapturedOutput {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn watched_seen(&self) -> Vec<bool> {
        self.watched_seen.lock().unwrap().clone()
    }

    fn record(&self, invocation: &Invocation) {
        self.calls.lock().unwrap().push(invocation.clone());
        if let Some(path) = &self.watched {
            self.watched_seen.lock().unwrap().push(path.exists());
        }
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn run(&self, invocation: &Invocation) -> CsResult<i32> {
        self.record(invocation);
        Ok(self.run_codes.lock().unwrap().pop_front().unwrap_or(0))
    }

    async fn capture(&self, invocation: &Invocation) -> CsResult<CapturedOutput> {
        self.record(invocation);
        Ok(self.captures.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Default configuration rooted in a fresh temporary project directory.
/// The TempDir must be held alive for the duration of the test.
pub fn create_test_project() -> (StackConfig, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut config = StackConfig::default();
    config.project.directory = dir.path().display().to_string();
    (config, dir)
}

/// Same as `create_test_project`, with an environment file written.
pub fn create_initialized_project() -> (StackConfig, TempDir) {
    let (config, dir) = create_test_project();
    cs_services::setup::init_env_file(&config, false).expect("failed to write env file");
    (config, dir)
}

pub fn lifecycle(config: &StackConfig, fake: &Arc<FakeOrchestrator>) -> StackLifecycle {
    StackLifecycle::new(config.clone(), fake.clone())
}

pub fn compose_path(dir: &Path) -> PathBuf {
    dir.join("docker-compose.yml")
}

pub fn env_path(dir: &Path) -> PathBuf {
    dir.join(".env")
}
