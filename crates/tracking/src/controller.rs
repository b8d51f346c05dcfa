//! The live tracking session state machine.
//!
//! ```text
//! idle -> countdown -> tracking <-> paused / auto_paused
//!                         |  ^
//!                         v  |
//!                  segment_transition
//! tracking / paused / auto_paused / segment_transition -> stopping -> summary -> saving
//! ```
//!
//! The controller is driven entirely from the outside: one-second ticks,
//! location fixes and user actions. It owns the sampler subscription and
//! guarantees the subscription is released on every exit path.

use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    clock::Clock,
    config::TrackingConfig,
    errors::TrackingError,
    metrics::{AccumulatedMetrics, MetricsAccumulator, SampleOutcome, displacement_meters},
    models::{
        DataSource, GpsSignal, HeartRateStats, LocationSample, SessionStatus, Sport,
        TrackedWorkoutMetrics,
    },
    provider::{DeviceStatus, LocationProvider, Subscription},
    segments::{
        SegmentDefinition, SegmentEvent, SegmentProgress, SegmentTracker, SegmentTrackingState,
        expand_segments,
    },
    timers::{TickOutcome, TimerSlot},
};

/// Everything the UI needs to render the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub sport: Sport,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paused_at: Option<OffsetDateTime>,
    pub total_paused_seconds: f64,
    pub active_elapsed_seconds: f64,
    pub countdown_remaining: Option<u32>,
    pub metrics: AccumulatedMetrics,
    pub gps_signal: GpsSignal,
    pub last_location: Option<LocationSample>,
    pub segments: Option<SegmentTrackingState>,
    pub error: Option<String>,
}

pub struct TrackingController {
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    provider: Box<dyn LocationProvider>,
    sport: Sport,
    session_id: Uuid,
    status: SessionStatus,
    countdown: TimerSlot,
    transition: TimerSlot,
    subscription: Option<Box<dyn Subscription>>,
    started_at: Option<OffsetDateTime>,
    paused_at: Option<OffsetDateTime>,
    stopped_at: Option<OffsetDateTime>,
    total_paused: Duration,
    accumulator: MetricsAccumulator,
    plan: Vec<SegmentProgress>,
    auto_advance: bool,
    segments: Option<SegmentTracker>,
    still_samples: u32,
    heart_rate: HeartRateStats,
    signal: GpsSignal,
    last_fix_at: Option<OffsetDateTime>,
    summary: Option<TrackedWorkoutMetrics>,
    error: Option<TrackingError>,
}

impl TrackingController {
    pub fn new(
        config: TrackingConfig,
        clock: Arc<dyn Clock>,
        provider: Box<dyn LocationProvider>,
        sport: Sport,
    ) -> Self {
        let accumulator = MetricsAccumulator::new(config.accumulator);
        let auto_advance = config.auto_advance_segments;
        Self {
            config,
            clock,
            provider,
            sport,
            session_id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            countdown: TimerSlot::new("countdown"),
            transition: TimerSlot::new("segment transition"),
            subscription: None,
            started_at: None,
            paused_at: None,
            stopped_at: None,
            total_paused: Duration::ZERO,
            accumulator,
            plan: Vec::new(),
            auto_advance,
            segments: None,
            still_samples: 0,
            heart_rate: HeartRateStats::default(),
            signal: GpsSignal::none(),
            last_fix_at: None,
            summary: None,
            error: None,
        }
    }

    /// Turns the session into a multi-segment workout. Only allowed while idle.
    pub fn with_segments(
        &mut self,
        definitions: &[SegmentDefinition],
    ) -> Result<(), TrackingError> {
        if self.status != SessionStatus::Idle {
            return Err(TrackingError::invalid(self.status, "change segments"));
        }
        let plan = expand_segments(definitions)?;
        self.segments = Some(SegmentTracker::new(plan.clone(), self.auto_advance)?);
        self.plan = plan;
        Ok(())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn sport(&self) -> Sport {
        self.sport
    }

    /// Terminal error of the last start attempt, if any.
    pub fn error(&self) -> Option<&TrackingError> {
        self.error.as_ref()
    }

    pub fn gps_signal(&self) -> GpsSignal {
        self.signal
    }

    pub fn metrics(&self) -> AccumulatedMetrics {
        self.accumulator.snapshot()
    }

    pub fn last_location(&self) -> Option<&LocationSample> {
        self.accumulator.last_location()
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    pub fn summary(&self) -> Option<&TrackedWorkoutMetrics> {
        self.summary.as_ref()
    }

    pub fn is_sampler_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn segment_state(&self) -> Option<SegmentTrackingState> {
        self.segments
            .as_ref()
            .map(|tracker| tracker.state(self.transition.remaining()))
    }

    /// Active time: wall clock since start minus all paused time. Frozen
    /// while paused and after stop.
    pub fn active_elapsed(&self) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self
            .stopped_at
            .or(self.paused_at)
            .unwrap_or_else(|| self.clock.now());
        (end - started_at - self.total_paused).max(Duration::ZERO)
    }

    /// Advisory problems worth showing before a start. Never blocks.
    pub fn check_readiness(&self, device: &dyn DeviceStatus) -> Vec<String> {
        let mut issues = Vec::new();
        match device.gps_accuracy() {
            None => issues.push("No GPS signal".to_string()),
            Some(accuracy) if accuracy > self.config.readiness.weak_accuracy_meters => {
                issues.push("GPS signal is weak".to_string())
            }
            Some(_) => {}
        }
        if let Some(level) = device.battery_level()
            && level < self.config.readiness.low_battery_level
        {
            issues.push(format!("Battery is low ({:.0}%)", level * 100.0));
        }
        issues
    }

    pub fn start_countdown(&mut self) -> Result<(), TrackingError> {
        match self.status {
            SessionStatus::Idle => self.reset_session(),
            SessionStatus::Countdown => self.countdown.clear(),
            other => return Err(TrackingError::invalid(other, "start countdown")),
        }
        self.error = None;

        if let Err(e) = self.provider.request_permission() {
            return Err(self.fail_start(e.into()));
        }

        if self.config.countdown_seconds == 0 {
            return self.begin_tracking();
        }
        self.countdown.arm(self.config.countdown_seconds);
        self.status = SessionStatus::Countdown;
        tracing::info!(
            session = %self.session_id,
            seconds = self.config.countdown_seconds,
            "Countdown started"
        );
        Ok(())
    }

    pub fn cancel_countdown(&mut self) -> Result<(), TrackingError> {
        if self.status != SessionStatus::Countdown {
            return Err(TrackingError::invalid(self.status, "cancel countdown"));
        }
        self.countdown.clear();
        self.status = SessionStatus::Idle;
        tracing::info!(session = %self.session_id, "Countdown cancelled");
        Ok(())
    }

    /// One-second heartbeat: runs the countdown and transition timers,
    /// checks time-based segment targets and signal staleness.
    pub fn tick(&mut self) -> SessionStatus {
        match self.status {
            SessionStatus::Countdown => {
                if self.countdown.tick() == TickOutcome::Fired {
                    // Failure is recorded in `self.error`.
                    let _ = self.begin_tracking();
                }
            }
            SessionStatus::SegmentTransition => {
                if self.transition.tick() == TickOutcome::Fired {
                    self.finish_transition();
                }
            }
            SessionStatus::Tracking => self.update_segments(),
            _ => {}
        }
        self.refresh_signal();
        self.status
    }

    /// Feeds one fix from the sampler.
    pub fn handle_location(&mut self, sample: LocationSample) -> SampleOutcome {
        if !self.status.is_recording() {
            tracing::debug!(status = %self.status, "Dropping fix outside a recording");
            return SampleOutcome::Ignored;
        }

        let displacement = self
            .accumulator
            .last_location()
            .map(|previous| displacement_meters(previous, &sample));
        let elapsed = self.active_elapsed();
        let outcome = self.accumulator.accept(sample, self.status, elapsed);
        self.signal = GpsSignal::from_accuracy(sample.accuracy);
        self.last_fix_at = Some(self.clock.now());

        match self.status {
            SessionStatus::Tracking => {
                self.update_segments();
                if self.status == SessionStatus::Tracking {
                    self.detect_stillness(displacement);
                }
            }
            SessionStatus::AutoPaused => {
                let threshold = self.config.auto_pause.displacement_threshold_meters;
                if displacement.is_some_and(|d| d > threshold) {
                    tracing::info!(session = %self.session_id, "Movement detected, auto-resuming");
                    self.resume_tracking();
                }
            }
            _ => {}
        }
        outcome
    }

    pub fn record_heart_rate(&mut self, bpm: u16) {
        if self.status != SessionStatus::Tracking {
            return;
        }
        self.heart_rate.record(bpm);
        if let Some(tracker) = self.segments.as_mut() {
            tracker.record_heart_rate(bpm);
        }
    }

    pub fn pause(&mut self) -> Result<(), TrackingError> {
        match self.status {
            SessionStatus::Tracking => {
                self.paused_at = Some(self.clock.now());
                self.enter_pause(SessionStatus::Paused);
                Ok(())
            }
            // An auto-pause the user confirms keeps its original start.
            SessionStatus::AutoPaused => {
                self.status = SessionStatus::Paused;
                Ok(())
            }
            other => Err(TrackingError::invalid(other, "pause")),
        }
    }

    pub fn resume(&mut self) -> Result<(), TrackingError> {
        if !self.status.is_paused() {
            return Err(TrackingError::invalid(self.status, "resume"));
        }
        self.resume_tracking();
        Ok(())
    }

    /// Confirms a finished segment, ends a transition early, or abandons the
    /// current segment.
    pub fn skip_segment(&mut self) -> Result<(), TrackingError> {
        if self.segments.is_none() {
            return Err(TrackingError::invalid(self.status, "skip a segment"));
        }
        match self.status {
            SessionStatus::SegmentTransition => {
                self.finish_transition();
                Ok(())
            }
            SessionStatus::Tracking => {
                let elapsed = self.active_elapsed().as_seconds_f64();
                let distance = self.accumulator.distance_meters();
                if let Some(tracker) = self.segments.as_mut()
                    && tracker.skip(elapsed, distance) == Some(SegmentEvent::AllCompleted)
                {
                    tracing::info!(session = %self.session_id, "All segments completed");
                }
                Ok(())
            }
            other => Err(TrackingError::invalid(other, "skip a segment")),
        }
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
        if let Some(tracker) = self.segments.as_mut() {
            tracker.set_auto_advance(enabled);
        }
    }

    /// Finalizes the workout. From a countdown this cancels the start and
    /// reports [`TrackingError::NotStarted`]. The sampler is never left
    /// subscribed.
    pub fn stop(&mut self) -> Result<&TrackedWorkoutMetrics, TrackingError> {
        match self.status {
            s if s.is_recording() => {}
            SessionStatus::Countdown => {
                self.countdown.clear();
                self.release_sampler();
                self.status = SessionStatus::Idle;
                self.error = Some(TrackingError::NotStarted);
                return Err(TrackingError::NotStarted);
            }
            other => return Err(TrackingError::invalid(other, "stop")),
        }

        self.status = SessionStatus::Stopping;
        let now = self.clock.now();
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += now - paused_at;
        }
        self.stopped_at = Some(now);
        self.release_sampler();
        self.countdown.clear();
        self.transition.clear();

        let metrics = self.build_metrics(now);
        tracing::info!(
            session = %self.session_id,
            distance = metrics.actual_distance_meters,
            duration = metrics.actual_duration_seconds,
            "Workout stopped"
        );
        self.status = SessionStatus::Summary;
        Ok(&*self.summary.insert(metrics))
    }

    /// Throws the session away without producing metrics.
    pub fn discard(&mut self) {
        if self.status == SessionStatus::Idle {
            return;
        }
        self.release_sampler();
        self.countdown.clear();
        self.transition.clear();
        tracing::info!(session = %self.session_id, status = %self.status, "Session discarded");
        self.reset_session();
        self.status = SessionStatus::Idle;
    }

    /// Hands the summary to the caller for persistence. The controller keeps
    /// no copy.
    pub fn save(&mut self) -> Result<TrackedWorkoutMetrics, TrackingError> {
        if self.status != SessionStatus::Summary {
            return Err(TrackingError::invalid(self.status, "save"));
        }
        let metrics = self
            .summary
            .take()
            .ok_or(TrackingError::invalid(self.status, "save"))?;
        self.status = SessionStatus::Saving;
        Ok(metrics)
    }

    /// Returns to idle after the summary was saved or shown.
    pub fn reset(&mut self) -> Result<(), TrackingError> {
        match self.status {
            SessionStatus::Summary | SessionStatus::Saving => {
                self.reset_session();
                self.status = SessionStatus::Idle;
                Ok(())
            }
            other => Err(TrackingError::invalid(other, "reset")),
        }
    }

    /// Uses a workout recorded by the health platform instead of live GPS.
    pub fn import_health_workout(
        &mut self,
        mut metrics: TrackedWorkoutMetrics,
    ) -> Result<&TrackedWorkoutMetrics, TrackingError> {
        if self.status != SessionStatus::Idle {
            return Err(TrackingError::invalid(self.status, "import a health workout"));
        }
        self.reset_session();
        metrics.session_id = self.session_id;
        tracing::info!(
            session = %self.session_id,
            health_workout = ?metrics.health_workout_id,
            "Imported health workout"
        );
        self.status = SessionStatus::Summary;
        Ok(&*self.summary.insert(metrics))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            status: self.status,
            sport: self.sport,
            started_at: self.started_at,
            paused_at: self.paused_at,
            total_paused_seconds: self.total_paused.as_seconds_f64(),
            active_elapsed_seconds: self.active_elapsed().as_seconds_f64(),
            countdown_remaining: self.countdown.remaining(),
            metrics: self.accumulator.snapshot(),
            gps_signal: self.signal,
            last_location: self.accumulator.last_location().copied(),
            segments: self.segment_state(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    fn begin_tracking(&mut self) -> Result<(), TrackingError> {
        let subscription = match self.provider.subscribe(&self.config.sampler) {
            Ok(subscription) => subscription,
            Err(e) => return Err(self.fail_start(e.into())),
        };
        self.subscription = Some(subscription);
        self.started_at = Some(self.clock.now());
        self.status = SessionStatus::Tracking;
        if let Some(tracker) = self.segments.as_mut() {
            tracker.begin(0.0, 0.0);
        }
        tracing::info!(session = %self.session_id, sport = ?self.sport, "Tracking started");
        Ok(())
    }

    fn fail_start(&mut self, err: TrackingError) -> TrackingError {
        tracing::warn!(session = %self.session_id, "Could not start tracking: {err}");
        self.countdown.clear();
        self.release_sampler();
        self.status = SessionStatus::Idle;
        self.error = Some(err.clone());
        err
    }

    fn enter_pause(&mut self, status: SessionStatus) {
        self.status = status;
        self.still_samples = 0;
        self.accumulator.reset_window();
        tracing::info!(session = %self.session_id, status = %status, "Tracking paused");
    }

    fn resume_tracking(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += self.clock.now() - paused_at;
        }
        self.still_samples = 0;
        self.status = SessionStatus::Tracking;
        tracing::info!(
            session = %self.session_id,
            total_paused = self.total_paused.as_seconds_f64(),
            "Tracking resumed"
        );
    }

    fn detect_stillness(&mut self, displacement: Option<f64>) {
        let policy = self.config.auto_pause;
        let Some(displacement) = displacement.filter(|_| policy.enabled) else {
            return;
        };
        if displacement >= policy.displacement_threshold_meters {
            self.still_samples = 0;
            return;
        }
        self.still_samples += 1;
        if self.still_samples >= policy.still_sample_count {
            self.paused_at = Some(self.clock.now());
            self.enter_pause(SessionStatus::AutoPaused);
        }
    }

    fn update_segments(&mut self) {
        let elapsed = self.active_elapsed().as_seconds_f64();
        let distance = self.accumulator.distance_meters();
        let Some(tracker) = self.segments.as_mut() else {
            return;
        };
        match tracker.update(elapsed, distance) {
            Some(SegmentEvent::TargetReached { .. }) if tracker.auto_advance() => {
                self.enter_transition();
            }
            Some(SegmentEvent::AllCompleted) => {
                tracing::info!(session = %self.session_id, "All segments completed");
            }
            _ => {}
        }
    }

    fn enter_transition(&mut self) {
        self.status = SessionStatus::SegmentTransition;
        self.still_samples = 0;
        self.accumulator.reset_window();
        if self.config.segment_transition_seconds == 0 {
            self.finish_transition();
            return;
        }
        self.transition.arm(self.config.segment_transition_seconds);
    }

    fn finish_transition(&mut self) {
        self.transition.clear();
        let elapsed = self.active_elapsed().as_seconds_f64();
        let distance = self.accumulator.distance_meters();
        if let Some(tracker) = self.segments.as_mut() {
            tracker.advance(elapsed, distance);
            tracing::info!(
                session = %self.session_id,
                segment = tracker.current_index(),
                "Advanced to next segment"
            );
        }
        self.status = SessionStatus::Tracking;
    }

    fn refresh_signal(&mut self) {
        let Some(last_fix_at) = self.last_fix_at else {
            return;
        };
        if !self.status.is_recording() || self.signal.accuracy.is_none() {
            return;
        }
        let stale_after = Duration::seconds(i64::from(self.config.signal_stale_seconds));
        if self.clock.now() - last_fix_at > stale_after {
            tracing::warn!(session = %self.session_id, "GPS signal lost");
            self.signal = GpsSignal::none();
        }
    }

    fn build_metrics(&mut self, completed_at: OffsetDateTime) -> TrackedWorkoutMetrics {
        let elapsed = self.active_elapsed();
        self.accumulator.refresh_averages(elapsed);
        let snap = self.accumulator.snapshot();
        let segments = self
            .segments
            .take()
            .map(SegmentTracker::into_results)
            .unwrap_or_default();
        let hours = elapsed.as_seconds_f64() / 3600.0;
        let calories = self
            .config
            .body_mass_kg
            .map(|kg| (self.sport.met(snap.average_speed_kmh) * kg * hours).round() as u32);

        TrackedWorkoutMetrics {
            session_id: self.session_id,
            sport: self.sport,
            actual_duration_seconds: elapsed.whole_seconds(),
            actual_distance_meters: snap.distance_meters,
            average_pace_seconds_per_km: snap.average_pace_seconds_per_km,
            average_speed_kmh: snap.average_speed_kmh,
            max_speed_kmh: snap.max_speed_kmh,
            average_heart_rate: self.heart_rate.average(),
            max_heart_rate: self.heart_rate.max(),
            elevation_gain_meters: snap.elevation_gain_meters,
            elevation_loss_meters: snap.elevation_loss_meters,
            calories,
            average_cadence: None,
            data_source: DataSource::GpsTracking,
            health_workout_id: None,
            segments,
            started_at: self.started_at.unwrap_or(completed_at),
            completed_at,
        }
    }

    fn release_sampler(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!(session = %self.session_id, "Location updates stopped");
        }
    }

    /// Fresh accumulators and a new session id.
    fn reset_session(&mut self) {
        self.session_id = Uuid::new_v4();
        self.started_at = None;
        self.paused_at = None;
        self.stopped_at = None;
        self.total_paused = Duration::ZERO;
        self.accumulator = MetricsAccumulator::new(self.config.accumulator);
        self.segments = if self.plan.is_empty() {
            None
        } else {
            SegmentTracker::new(self.plan.clone(), self.auto_advance).ok()
        };
        self.still_samples = 0;
        self.heart_rate = HeartRateStats::default();
        self.signal = GpsSignal::none();
        self.last_fix_at = None;
        self.summary = None;
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        self.release_sampler();
    }
}
