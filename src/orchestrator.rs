//! Two-stage delivery for the cross-type suppression variant.
//!
//! A request publishes the stage-1 marker raster immediately, then schedules
//! stage 2 (suppression plus region extraction) after a fixed delay. Each
//! request owns its result channel, and submitting a new request cancels the
//! pending stage 2 of the previous one so a stale result can never arrive
//! after a newer one.

use std::sync::Arc;
use std::time::Duration;

use image::Rgba32FImage;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::config::{Adjustments, ThresholdConfig};
use crate::detection::{self, SuppressedOutput};
use crate::error::{DetectionError, DetectionResult};
use crate::raster::Raster;

pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_secs(2);

/// Both deliveries of a request fit without blocking the producer.
const RESULT_CAPACITY: usize = 2;

/// Where a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    ClassifiedPublished,
    Suppressing,
    FinalPublished,
    Cancelled,
    Failed,
}

impl StageState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageState::FinalPublished | StageState::Cancelled | StageState::Failed
        )
    }
}

/// One delivery on a request's result channel.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Classified(Rgba32FImage),
    Suppressed(SuppressedOutput),
}

pub type StageResult = DetectionResult<StageOutput>;

/// Cancellation flag shared between the orchestrator and a scheduled stage.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { flag: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller side of one submitted request.
#[derive(Debug)]
pub struct DetectionRequest {
    id: Uuid,
    results: mpsc::Receiver<StageResult>,
    state: watch::Receiver<StageState>,
}

impl DetectionRequest {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> StageState {
        *self.state.borrow()
    }

    /// Next delivery, or `None` once the request has nothing more to send.
    pub async fn next(&mut self) -> Option<StageResult> {
        self.results.recv().await
    }

    /// Wait until the request reaches a terminal state.
    pub async fn finished(&mut self) -> StageState {
        let reached = self.state.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        reached.unwrap_or_else(|_| *self.state.borrow())
    }
}

struct PendingStage {
    id: Uuid,
    token: CancelToken,
    handle: JoinHandle<()>,
}

/// Runs the cross-type variant as a cancellable two-stage state machine.
pub struct SuppressionOrchestrator {
    config: ThresholdConfig,
    adjustments: Adjustments,
    delay: Duration,
    pending: Option<PendingStage>,
}

impl SuppressionOrchestrator {
    pub fn new(config: ThresholdConfig, adjustments: Adjustments) -> Self {
        Self {
            config,
            adjustments,
            delay: DEFAULT_STAGE_DELAY,
            pending: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Id of the request whose stage 2 has not finished yet.
    pub fn pending_request(&self) -> Option<Uuid> {
        self.pending
            .as_ref()
            .filter(|p| !p.handle.is_finished())
            .map(|p| p.id)
    }

    /// Classify `raster` now and schedule suppression after the delay.
    ///
    /// Stage-1 failures are returned directly; stage-2 failures arrive on
    /// the request's channel.
    pub fn submit<R: Raster>(&mut self, raster: &R) -> DetectionResult<DetectionRequest> {
        let runtime = Handle::try_current().map_err(|_| DetectionError::NoRuntime)?;
        let markers = detection::classify_stage(raster, &self.adjustments)?;
        Ok(self.schedule(&runtime, markers))
    }

    /// Start from a marker raster that was already classified elsewhere.
    pub fn submit_classified(&mut self, markers: Rgba32FImage) -> DetectionResult<DetectionRequest> {
        let runtime = Handle::try_current().map_err(|_| DetectionError::NoRuntime)?;
        Ok(self.schedule(&runtime, markers))
    }

    fn schedule(&mut self, runtime: &Handle, markers: Rgba32FImage) -> DetectionRequest {
        self.cancel_pending();

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(RESULT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(StageState::Idle);

        // Fresh channel with spare capacity, cannot fail
        let _ = tx.try_send(Ok(StageOutput::Classified(markers.clone())));
        state_tx.send_replace(StageState::ClassifiedPublished);
        debug!("Request {}: stage 1 published", id);

        let token = CancelToken::new();
        let stage = SecondStage {
            id,
            markers,
            config: self.config,
            delay: self.delay,
            token: token.clone(),
            results: tx,
            state: state_tx,
        };
        let handle = runtime.spawn(stage.run());
        self.pending = Some(PendingStage { id, token, handle });

        DetectionRequest {
            id,
            results: rx,
            state: state_rx,
        }
    }

    /// Cancel the outstanding stage 2, if any.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.handle.is_finished() {
                warn!("Request {} superseded before stage 2 was delivered", pending.id);
            }
            pending.token.cancel();
        }
    }
}

impl Drop for SuppressionOrchestrator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

struct SecondStage {
    id: Uuid,
    markers: Rgba32FImage,
    config: ThresholdConfig,
    delay: Duration,
    token: CancelToken,
    results: mpsc::Sender<StageResult>,
    state: watch::Sender<StageState>,
}

impl SecondStage {
    async fn run(self) {
        tokio::select! {
            _ = self.token.cancelled() => {
                debug!("Request {}: cancelled while waiting", self.id);
                self.state.send_replace(StageState::Cancelled);
                return;
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        self.state.send_replace(StageState::Suppressing);
        let markers = self.markers;
        let config = self.config;
        let joined = tokio::task::spawn_blocking(move || {
            detection::suppression_stage(&markers, &config)
        })
        .await;
        let result = joined_outcome(joined);

        if self.token.is_cancelled() {
            debug!("Request {}: cancelled during suppression, result dropped", self.id);
            self.state.send_replace(StageState::Cancelled);
            return;
        }

        let next = match &result {
            Ok(out) => {
                info!("Request {}: stage 2 found {} regions", self.id, out.regions.len());
                StageState::FinalPublished
            }
            Err(e) => {
                warn!("Request {}: stage 2 failed: {}", self.id, e);
                StageState::Failed
            }
        };
        self.state.send_replace(next);
        if self.results.send(result.map(StageOutput::Suppressed)).await.is_err() {
            debug!("Request {}: receiver gone, stage 2 discarded", self.id);
        }
    }
}

/// A panicked or aborted blocking task becomes `StageAborted`.
fn joined_outcome(
    joined: Result<DetectionResult<SuppressedOutput>, JoinError>,
) -> DetectionResult<SuppressedOutput> {
    joined.unwrap_or_else(|e| Err(DetectionError::StageAborted(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, Sample};
    use crate::raster::{RasterMut, filled};

    fn photo() -> Rgba32FImage {
        let mut img = filled(12, 12, Sample::new(0.9, 0.9, 0.9));
        for y in 1..4 {
            for x in 1..4 {
                img.put(x, y, Sample::new(0.3, 0.0, 0.5));
            }
        }
        for y in 4..6 {
            for x in 4..6 {
                img.put(x, y, Sample::new(0.9, 0.4, 0.7));
            }
        }
        img
    }

    fn orchestrator() -> SuppressionOrchestrator {
        SuppressionOrchestrator::new(
            ThresholdConfig::new(0.5, 0.5, 1, 100).unwrap(),
            Adjustments::default(),
        )
    }

    #[test]
    fn test_submit_without_runtime() {
        let mut orch = orchestrator();
        assert!(matches!(orch.submit(&photo()), Err(DetectionError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_deliveries_in_order() {
        let mut orch = orchestrator();
        let mut req = orch.submit(&photo()).unwrap();
        assert_eq!(req.state(), StageState::ClassifiedPublished);

        match req.next().await {
            Some(Ok(StageOutput::Classified(raster))) => assert_eq!(raster.dimensions(), (12, 12)),
            other => panic!("unexpected first delivery: {:?}", other.map(|r| r.is_ok())),
        }

        match req.next().await {
            Some(Ok(StageOutput::Suppressed(out))) => {
                assert_eq!(out.stats.red_removed(), 4);
                assert_eq!(out.regions.len(), 1);
                assert_eq!(out.regions[0].label, Label::WhiteCell);
            }
            other => panic!("unexpected second delivery: {:?}", other.map(|r| r.is_ok())),
        }
        assert!(req.next().await.is_none());
        assert_eq!(req.state(), StageState::FinalPublished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_two_waits_for_delay() {
        let mut orch = orchestrator().with_delay(Duration::from_millis(500));
        let mut req = orch.submit(&photo()).unwrap();
        assert!(req.next().await.is_some());

        let early = tokio::time::timeout(Duration::from_millis(499), req.next()).await;
        assert!(early.is_err());
        assert_eq!(req.state(), StageState::ClassifiedPublished);

        assert!(matches!(req.next().await, Some(Ok(StageOutput::Suppressed(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_cancels_pending_stage() {
        let mut orch = orchestrator();
        let mut first = orch.submit(&photo()).unwrap();
        assert!(first.next().await.is_some());
        assert_eq!(orch.pending_request(), Some(first.id()));

        let mut second = orch.submit(&photo()).unwrap();
        assert_ne!(first.id(), second.id());

        // the stale request closes without a stage-2 delivery
        assert!(first.next().await.is_none());
        assert_eq!(first.finished().await, StageState::Cancelled);

        assert!(second.next().await.is_some());
        assert!(matches!(second.next().await, Some(Ok(StageOutput::Suppressed(_)))));
        assert_eq!(second.finished().await, StageState::FinalPublished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_two_error_reaches_channel() {
        let mut orch = orchestrator();
        let mut req = orch.submit_classified(Rgba32FImage::new(0, 0)).unwrap();
        assert!(matches!(req.next().await, Some(Ok(StageOutput::Classified(_)))));
        assert!(matches!(
            req.next().await,
            Some(Err(DetectionError::EmptyRaster { .. }))
        ));
        assert_eq!(req.finished().await, StageState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_one_error_is_synchronous() {
        let mut orch = orchestrator();
        assert!(matches!(
            orch.submit(&Rgba32FImage::new(3, 0)),
            Err(DetectionError::EmptyRaster { .. })
        ));
        assert!(orch.pending_request().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_suppression_drops_result() {
        let mut big = filled(400, 400, Sample::new(0.9, 0.9, 0.9));
        for y in (0..400).step_by(2) {
            for x in 0..400 {
                let s = if x % 3 == 0 {
                    Sample::new(0.3, 0.0, 0.5)
                } else {
                    Sample::new(0.9, 0.4, 0.7)
                };
                big.put(x, y, s);
            }
        }
        let mut orch = orchestrator().with_delay(Duration::from_millis(50));
        let mut req = orch.submit(&big).unwrap();
        assert!(matches!(req.next().await, Some(Ok(StageOutput::Classified(_)))));

        // paused clock auto-advances past the delay; stage 2 then yields on the blocking task
        req.state
            .wait_for(|s| *s == StageState::Suppressing)
            .await
            .unwrap();
        orch.cancel_pending();

        assert!(req.next().await.is_none());
        assert_eq!(req.finished().await, StageState::Cancelled);
    }

    #[tokio::test]
    async fn test_panicked_stage_maps_to_aborted() {
        let joined = tokio::task::spawn_blocking(|| -> DetectionResult<SuppressedOutput> {
            panic!("suppression blew up")
        })
        .await;
        assert!(joined.is_err());
        assert!(matches!(
            joined_outcome(joined),
            Err(DetectionError::StageAborted(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        token.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
        // already cancelled resolves at once
        token.cancelled().await;
    }
}
