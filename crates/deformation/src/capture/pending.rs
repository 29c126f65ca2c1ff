//! The single capture in flight.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task, TaskPool};

use super::{CaptureRequest, CaptureScene, Snapshot, SnapshotSource};
use crate::config::CaptureMode;
use crate::error::DeformationError;

type CaptureResult = Result<Snapshot, DeformationError>;

enum CaptureJob {
    Running(Task<CaptureResult>),
    Finished(CaptureResult),
}

struct InFlight {
    request: CaptureRequest,
    started_at: f32,
    job: CaptureJob,
}

/// Outcome of polling the pending capture.
#[derive(Debug)]
pub enum CapturePoll {
    /// Nothing was dispatched.
    Idle,
    /// Still running.
    Pending,
    Complete(CaptureResult),
    /// Abandoned after exceeding the timeout. The task was dropped.
    TimedOut { waited: f32 },
}

/// At most one capture at a time. Dropping the task cancels it.
#[derive(Default)]
pub struct PendingCapture {
    in_flight: Option<InFlight>,
}

impl PendingCapture {
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn request(&self) -> Option<&CaptureRequest> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    /// Start capturing `request`.
    ///
    /// `Inline` captures (and every capture on wasm, where there are no worker
    /// threads) complete before this returns; `Async` captures run on the
    /// `AsyncComputeTaskPool`.
    pub fn dispatch(
        &mut self,
        source: Arc<dyn SnapshotSource>,
        request: CaptureRequest,
        scene: CaptureScene,
        mode: CaptureMode,
        now: f32,
    ) -> Result<(), DeformationError> {
        if self.in_flight.is_some() {
            return Err(DeformationError::CaptureUnavailable(
                "a capture is already in flight".to_string(),
            ));
        }
        if !source.is_ready() {
            return Err(DeformationError::CaptureUnavailable(
                "capture backend not ready".to_string(),
            ));
        }

        let job = if cfg!(target_arch = "wasm32") || mode == CaptureMode::Inline {
            CaptureJob::Finished(source.capture(&request, &scene))
        } else {
            let pool = AsyncComputeTaskPool::get_or_init(TaskPool::default);
            CaptureJob::Running(pool.spawn(async move { source.capture(&request, &scene) }))
        };
        self.in_flight = Some(InFlight {
            request,
            started_at: now,
            job,
        });
        Ok(())
    }

    /// Check on the capture. Completion and timeout both clear the slot.
    pub fn poll(&mut self, now: f32, timeout_secs: f32) -> CapturePoll {
        let Some(InFlight {
            request,
            started_at,
            job,
        }) = self.in_flight.take()
        else {
            return CapturePoll::Idle;
        };
        let mut task = match job {
            CaptureJob::Finished(result) => return CapturePoll::Complete(result),
            CaptureJob::Running(task) => task,
        };
        if let Some(result) = block_on(futures_lite::future::poll_once(&mut task)) {
            return CapturePoll::Complete(result);
        }

        let waited = now - started_at;
        if waited > timeout_secs {
            return CapturePoll::TimedOut { waited };
        }
        self.in_flight = Some(InFlight {
            request,
            started_at,
            job: CaptureJob::Running(task),
        });
        CapturePoll::Pending
    }

    /// Drop whatever is in flight.
    pub fn cancel(&mut self) -> bool {
        self.in_flight.take().is_some()
    }
}
