// recast-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and for downstream tests through the "test-mocks"
// feature.
#![cfg(any(test, feature = "test-mocks"))]

use super::ffmpeg_executor::{FfmpegProcess, FfmpegSpawner};
use super::ffprobe_executor::FfprobeExecutor;
use super::mkvpropedit::MetadataEditor;
use crate::error::{CoreError, CoreResult};
use crate::media::{HdrMetadata, StreamCatalog};
use ffmpeg_sidecar::event::FfmpegEvent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::OsString;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Vec<FfmpegEvent>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
    quits: Rc<Cell<usize>>,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for event in self.events_to_emit.clone() {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }

    fn quit(&mut self) -> CoreResult<()> {
        self.quits.set(self.quits.get() + 1);
        Ok(())
    }
}

/// Represents an expected ffmpeg command call and its mock result.
struct MockFfmpegExpectation {
    arg_pattern: String,
    events: Vec<FfmpegEvent>,
    result: CoreResult<i32>,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// An expectation matches when any argument contains its pattern and is
/// consumed by the first matching call.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
    received_env: Rc<RefCell<Vec<Vec<(String, String)>>>>,
    quits: Rc<Cell<usize>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            events,
            result: Ok(0),
        });
    }

    pub fn add_exit_error_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        exit_code: i32,
    ) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            events,
            result: Ok(exit_code),
        });
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            events: Vec::new(),
            result: Err(error),
        });
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    pub fn get_received_env(&self) -> Vec<Vec<(String, String)>> {
        self.received_env.borrow().clone()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.get()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, args: &[OsString], env: &[(String, String)]) -> CoreResult<Self::Process> {
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        self.received_calls.borrow_mut().push(args.clone());
        self.received_env.borrow_mut().push(env.to_vec());

        let mut expectations = self.expectations.borrow_mut();
        let found_index = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)));

        let Some(index) = found_index else {
            log::error!("MockFfmpegSpawner: No expectation found for command args: {:?}", args);
            panic!("MockFfmpegSpawner: No expectation found for command args: {args:?}");
        };

        let expectation = expectations.remove(index);
        log::debug!(
            "MockFfmpegSpawner: Matched expectation with pattern '{}'",
            expectation.arg_pattern
        );
        let exit_code = expectation.result?;
        Ok(MockFfmpegProcess {
            events_to_emit: expectation.events,
            exit_status: ExitStatus::from_raw(exit_code << 8),
            quits: Rc::clone(&self.quits),
        })
    }
}

/// Mock implementation of FfprobeExecutor keyed by input path.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    catalogs: Rc<RefCell<HashMap<PathBuf, StreamCatalog>>>,
    hdr: Rc<RefCell<HashMap<PathBuf, HdrMetadata>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn expect_catalog(&self, input_path: &Path, catalog: StreamCatalog) {
        self.catalogs
            .borrow_mut()
            .insert(input_path.to_path_buf(), catalog);
    }

    pub fn expect_hdr(&self, path: &Path, hdr: HdrMetadata) {
        self.hdr.borrow_mut().insert(path.to_path_buf(), hdr);
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<StreamCatalog> {
        self.catalogs
            .borrow()
            .get(input_path)
            .cloned()
            .ok_or_else(|| CoreError::ProbeParse(input_path.display().to_string()))
    }

    fn first_frame_hdr(&self, path: &Path) -> CoreResult<Option<HdrMetadata>> {
        Ok(self.hdr.borrow().get(path).cloned())
    }
}

/// Calls received by `MockMetadataEditor`.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    Statistics(PathBuf),
    Hdr(PathBuf, Vec<String>),
}

/// Mock implementation of MetadataEditor that records every call.
#[derive(Clone, Default)]
pub struct MockMetadataEditor {
    calls: Rc<RefCell<Vec<EditorCall>>>,
}

impl MockMetadataEditor {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn calls(&self) -> Vec<EditorCall> {
        self.calls.borrow().clone()
    }
}

impl MetadataEditor for MockMetadataEditor {
    fn add_track_statistics(&self, output: &Path) -> CoreResult<()> {
        self.calls
            .borrow_mut()
            .push(EditorCall::Statistics(output.to_path_buf()));
        Ok(())
    }

    fn apply_hdr(&self, output: &Path, hdr: &HdrMetadata) -> CoreResult<()> {
        self.calls.borrow_mut().push(EditorCall::Hdr(
            output.to_path_buf(),
            hdr.property_assignments(),
        ));
        Ok(())
    }
}
