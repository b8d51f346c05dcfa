//! Replays a generated stream through a [`TrackingController`] on a manual
//! clock, one second at a time.

use time::Duration;
use tracking::{
    SessionStatus, TrackedWorkoutMetrics, TrackingController, TrackingError,
    clock::{Clock as _, ManualClock},
};

use crate::stream::SimulatedFix;

/// Upper bound on countdown ticks before giving up.
const MAX_COUNTDOWN_TICKS: u32 = 600;

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub metrics: TrackedWorkoutMetrics,
    /// Accumulated distance after every fix.
    pub distance_trace: Vec<f64>,
    pub auto_pauses: usize,
    pub transitions: usize,
    /// Fixes that arrived while the session was not tracking.
    pub fixes_while_paused: usize,
}

/// Runs countdown, feeds every fix with the seconds in between ticked
/// off, then stops the session.
///
/// The clock must already read the session start; fixes are expected to
/// start at or after the end of the countdown.
pub fn replay(
    controller: &mut TrackingController,
    clock: &ManualClock,
    fixes: &[SimulatedFix],
) -> Result<ReplayReport, TrackingError> {
    controller.start_countdown()?;
    let mut ticks = 0;
    while controller.status() == SessionStatus::Countdown && ticks < MAX_COUNTDOWN_TICKS {
        clock.advance(Duration::SECOND);
        controller.tick();
        ticks += 1;
    }
    if controller.status() != SessionStatus::Tracking {
        return Err(controller
            .error()
            .cloned()
            .unwrap_or(TrackingError::NotStarted));
    }

    let mut report = Report::default();
    for fix in fixes {
        while clock.now() + Duration::SECOND <= fix.sample.timestamp {
            clock.advance(Duration::SECOND);
            report.observe(controller.tick());
        }
        clock.set(fix.sample.timestamp.max(clock.now()));

        if controller.status().is_paused() {
            report.fixes_while_paused += 1;
        }
        controller.handle_location(fix.sample);
        controller.record_heart_rate(fix.heart_rate);
        report.observe(controller.status());
        report.distance_trace.push(controller.metrics().distance_meters);
    }

    let metrics = controller.stop()?.clone();
    tracing::info!(
        distance = metrics.actual_distance_meters,
        duration = metrics.actual_duration_seconds,
        auto_pauses = report.auto_pauses,
        "Replay finished"
    );
    Ok(ReplayReport {
        metrics,
        distance_trace: report.distance_trace,
        auto_pauses: report.auto_pauses,
        transitions: report.transitions,
        fixes_while_paused: report.fixes_while_paused,
    })
}

#[derive(Default)]
struct Report {
    previous: Option<SessionStatus>,
    distance_trace: Vec<f64>,
    auto_pauses: usize,
    transitions: usize,
    fixes_while_paused: usize,
}

impl Report {
    fn observe(&mut self, status: SessionStatus) {
        let entered = self.previous != Some(status);
        match status {
            SessionStatus::AutoPaused if entered => self.auto_pauses += 1,
            SessionStatus::SegmentTransition if entered => self.transitions += 1,
            _ => {}
        }
        self.previous = Some(status);
    }
}
