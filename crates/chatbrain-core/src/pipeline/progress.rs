//! Synthesized progress for remote stages that report no partial completion.
//!
//! Each active stage gets a time-driven animation with a ceiling and a
//! nominal duration. The animation runs as its own task and is aborted on
//! every transition; its writes are additionally fenced by the transition
//! number, so a tick that races a transition can never land.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::state::{PipelineEvent, PipelineState};
use crate::config::ProgressConfig;
use crate::types::{Generation, Stage};

/// Elapsed-time easing curve for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressCurve {
    ceiling: u8,
    nominal: Duration,
}

impl ProgressCurve {
    pub fn new(ceiling: u8, nominal: Duration) -> Self {
        Self {
            ceiling: ceiling.min(100),
            nominal,
        }
    }

    /// Curve for the given stage of an input set with `item_count` items.
    pub fn for_stage(config: &ProgressConfig, stage: Stage, item_count: usize) -> Self {
        match stage {
            Stage::Structural => Self::new(
                config.structural.ceiling,
                config.structural.nominal_duration(item_count),
            ),
            Stage::Semantic => Self::new(
                config.semantic.ceiling,
                Duration::from_millis(config.semantic.duration_ms),
            ),
        }
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    /// Displayed percent after `elapsed`.
    ///
    /// Linear at 0.9x up to 90% of the nominal duration (reaching 81%), then
    /// twice as fast, always capped at the ceiling.
    pub fn percent_at(&self, elapsed: Duration) -> u8 {
        if self.nominal.is_zero() {
            return self.ceiling;
        }
        let r = elapsed.as_secs_f64() / self.nominal.as_secs_f64();
        let eased = if r < 0.9 {
            r * 0.9
        } else {
            0.81 + (r - 0.9) * 2.0
        };
        let percent = (eased * 100.0).min(f64::from(self.ceiling)).floor();
        percent.max(0.0) as u8
    }
}

/// What the presentation layer shows for the pipeline right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub generation: Generation,

    /// Transition this snapshot belongs to
    pub transition: u64,

    /// Stage being animated, `None` outside the two remote stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    pub displayed_percent: u8,

    pub status_text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ProgressSnapshot {
    /// Fresh snapshot for a just-entered state.
    fn entering(event: &PipelineEvent) -> Self {
        let (displayed_percent, error_text) = match &event.state {
            PipelineState::Complete => (100, None),
            PipelineState::Failed(reason) => (0, Some(reason.clone())),
            _ => (0, None),
        };
        let status_text = match (&event.state, &event.notice) {
            (PipelineState::Idle, Some(notice)) => notice.clone(),
            (state, _) => state.status_text().to_string(),
        };
        Self {
            generation: event.generation,
            transition: event.transition,
            stage: event.state.stage(),
            displayed_percent,
            status_text,
            error_text,
            notice: event.notice.clone(),
        }
    }
}

/// Drives the displayed percent from controller events.
///
/// Reads controller events only; never touches pipeline state.
pub struct ProgressEstimator {
    config: ProgressConfig,
    snapshot: watch::Sender<ProgressSnapshot>,
    animation: Option<JoinHandle<()>>,
}

impl ProgressEstimator {
    pub fn new(config: ProgressConfig) -> Self {
        let (snapshot, _) = watch::channel(ProgressSnapshot::default());
        Self {
            config,
            snapshot,
            animation: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }

    /// React to a state entry: cancel the running animation, reset the
    /// snapshot, and start a new animation if the state is a remote stage.
    pub fn observe(&mut self, event: &PipelineEvent) {
        self.cancel();
        self.snapshot.send_replace(ProgressSnapshot::entering(event));

        if let Some(stage) = event.state.stage() {
            let curve = ProgressCurve::for_stage(&self.config, stage, event.item_count);
            self.animation = Some(animate(
                self.snapshot.clone(),
                event.transition,
                curve,
                self.config.tick(),
            ));
        }
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.animation.take() {
            handle.abort();
        }
    }

    /// Follow a controller's event stream on a background task.
    pub fn spawn(mut self, mut events: broadcast::Receiver<PipelineEvent>) -> ProgressHandle {
        let snapshot = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.observe(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Progress estimator lagged behind by {skipped} event(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            self.cancel();
        });
        ProgressHandle { snapshot, task }
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Handle to an estimator running on its own task.
pub struct ProgressHandle {
    snapshot: watch::Receiver<ProgressSnapshot>,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn animate(
    snapshot: watch::Sender<ProgressSnapshot>,
    transition: u64,
    curve: ProgressCurve,
    tick: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = Instant::now();
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let percent = curve.percent_at(start.elapsed());
            let mut superseded = false;
            snapshot.send_if_modified(|snap| {
                if snap.transition != transition {
                    superseded = true;
                    return false;
                }
                if percent > snap.displayed_percent {
                    snap.displayed_percent = percent;
                    true
                } else {
                    false
                }
            });
            if superseded || percent >= curve.ceiling() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> ProgressCurve {
        ProgressCurve::new(96, Duration::from_secs(10))
    }

    fn event(transition: u64, state: PipelineState) -> PipelineEvent {
        PipelineEvent {
            generation: Generation(1),
            transition,
            state,
            item_count: 2,
            notice: None,
        }
    }

    fn fast_config() -> ProgressConfig {
        let mut config = ProgressConfig::default();
        config.tick_ms = 100;
        config.structural.base_ms = 1000;
        config.structural.per_item_ms = 500;
        config.semantic.duration_ms = 4000;
        config
    }

    #[test]
    fn test_curve_first_segment() {
        let c = curve();
        assert_eq!(c.percent_at(Duration::ZERO), 0);
        assert_eq!(c.percent_at(Duration::from_millis(5050)), 45);
        assert_eq!(c.percent_at(Duration::from_millis(8950)), 80);
    }

    #[test]
    fn test_curve_second_segment_accelerates() {
        let c = curve();
        // 0.81 + 0.0525 * 2 = 0.915
        assert_eq!(c.percent_at(Duration::from_millis(9525)), 91);
        assert_eq!(c.percent_at(Duration::from_millis(9725)), 95);
    }

    #[test]
    fn test_curve_respects_ceiling() {
        let c = curve();
        assert_eq!(c.percent_at(Duration::from_secs(10)), 96);
        assert_eq!(c.percent_at(Duration::from_secs(600)), 96);

        let semantic = ProgressCurve::new(99, Duration::from_secs(10));
        assert_eq!(semantic.percent_at(Duration::from_secs(600)), 99);
    }

    #[test]
    fn test_curve_is_monotonic() {
        let c = curve();
        let mut last = 0;
        for ms in (0..20_000).step_by(37) {
            let p = c.percent_at(Duration::from_millis(ms));
            assert!(p >= last, "dropped from {last} to {p} at {ms}ms");
            assert!(p <= 96);
            last = p;
        }
    }

    #[test]
    fn test_curve_for_stage_uses_item_count() {
        let config = fast_config();
        let structural = ProgressCurve::for_stage(&config, Stage::Structural, 4);
        assert_eq!(structural, ProgressCurve::new(96, Duration::from_millis(3000)));
        let semantic = ProgressCurve::for_stage(&config, Stage::Semantic, 4);
        assert_eq!(semantic, ProgressCurve::new(99, Duration::from_millis(4000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_moves_monotonically_to_ceiling() {
        let mut estimator = ProgressEstimator::new(fast_config());
        let rx = estimator.subscribe();
        estimator.observe(&event(1, PipelineState::Structural));

        let mut last = 0;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let snap = rx.borrow().clone();
            assert_eq!(snap.stage, Some(Stage::Structural));
            assert!(snap.displayed_percent >= last);
            assert!(snap.displayed_percent <= 96);
            last = snap.displayed_percent;
        }
        // nominal duration is 1000 + 2 * 500 ms, long since exceeded
        assert_eq!(last, 96);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_change_resets_to_zero() {
        let mut estimator = ProgressEstimator::new(fast_config());
        let rx = estimator.subscribe();
        estimator.observe(&event(1, PipelineState::Structural));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(rx.borrow().displayed_percent > 0);

        estimator.observe(&event(2, PipelineState::Semantic));
        let snap = rx.borrow().clone();
        assert_eq!(snap.displayed_percent, 0);
        assert_eq!(snap.stage, Some(Stage::Semantic));
        assert_eq!(snap.status_text, "Running semantic analysis...");

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let snap = rx.borrow().clone();
        assert_eq!(snap.transition, 2);
        assert!(snap.displayed_percent > 0 && snap.displayed_percent < 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_suppresses_progress() {
        let mut estimator = ProgressEstimator::new(fast_config());
        let rx = estimator.subscribe();
        estimator.observe(&event(1, PipelineState::Structural));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        estimator.observe(&event(2, PipelineState::Failed("HTTP 500".into())));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let snap = rx.borrow().clone();
        assert_eq!(snap.displayed_percent, 0);
        assert_eq!(snap.stage, None);
        assert_eq!(snap.error_text.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_shows_full_bar_and_notice() {
        let mut estimator = ProgressEstimator::new(fast_config());
        let rx = estimator.subscribe();
        estimator.observe(&event(1, PipelineState::Semantic));

        let mut complete = event(2, PipelineState::Complete);
        complete.notice = Some("too long".into());
        estimator.observe(&complete);
        tokio::time::sleep(Duration::from_millis(500)).await;

        let snap = rx.borrow().clone();
        assert_eq!(snap.displayed_percent, 100);
        assert_eq!(snap.notice.as_deref(), Some("too long"));
        assert!(snap.error_text.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_is_fenced_by_transition() {
        let config = fast_config();
        let (tx, rx) = watch::channel(ProgressSnapshot {
            transition: 5,
            ..Default::default()
        });
        let handle = animate(
            tx,
            4,
            ProgressCurve::new(96, Duration::from_millis(100)),
            config.tick(),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(handle.is_finished());
        assert_eq!(rx.borrow().displayed_percent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_estimator_follows_events() {
        let (tx, events) = broadcast::channel(16);
        let handle = ProgressEstimator::new(fast_config()).spawn(events);
        let mut rx = handle.subscribe();

        tx.send(event(1, PipelineState::Structural)).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().stage, Some(Stage::Structural));

        let mut idle = event(2, PipelineState::Idle);
        idle.notice = Some("No participants detected".into());
        tx.send(idle).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snap = handle.snapshot();
        assert_eq!(snap.transition, 2);
        assert_eq!(snap.displayed_percent, 0);
        assert_eq!(snap.status_text, "No participants detected");
    }
}
