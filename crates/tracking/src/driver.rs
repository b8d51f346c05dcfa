//! Async runtime glue around [`TrackingController`].
//!
//! The controller itself is synchronous. The driver owns it on a single task
//! and feeds it one-second ticks, location fixes and user commands from one
//! channel, publishing a fresh [`SessionSnapshot`] after every step.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{
    sync::{mpsc, watch},
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    config::SamplerOptions,
    controller::{SessionSnapshot, TrackingController},
    errors::{ProviderError, TrackingError},
    models::{LocationSample, TrackedWorkoutMetrics},
    provider::{LocationProvider, Subscription},
};

const TICK: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    StartCountdown,
    CancelCountdown,
    Pause,
    Resume,
    SkipSegment,
    SetAutoAdvance(bool),
    HeartRate(u16),
    Stop,
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Location(LocationSample),
    Command(SessionCommand),
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Stopped; the metrics now belong to the caller.
    Completed(TrackedWorkoutMetrics),
    Discarded,
}

pub struct SessionDriver {
    controller: TrackingController,
    events: mpsc::Receiver<SessionEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionDriver {
    pub fn new(
        controller: TrackingController,
        events: mpsc::Receiver<SessionEvent>,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let (snapshots, rx) = watch::channel(controller.snapshot());
        (
            Self {
                controller,
                events,
                snapshots,
            },
            rx,
        )
    }

    /// Runs until the session is stopped or discarded. A closed event
    /// channel counts as teardown and discards the session.
    pub async fn run(mut self) -> SessionOutcome {
        let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.controller.tick();
                }
                event = self.events.recv() => match event {
                    Some(SessionEvent::Location(sample)) => {
                        self.controller.handle_location(sample);
                    }
                    Some(SessionEvent::Command(command)) => {
                        if let Some(outcome) = self.apply(command) {
                            self.publish();
                            return outcome;
                        }
                    }
                    None => {
                        tracing::info!("Session events closed, discarding");
                        self.controller.discard();
                        self.publish();
                        return SessionOutcome::Discarded;
                    }
                },
            }
            self.publish();
        }
    }

    fn apply(&mut self, command: SessionCommand) -> Option<SessionOutcome> {
        let result = match command {
            SessionCommand::StartCountdown => self.controller.start_countdown(),
            SessionCommand::CancelCountdown => self.controller.cancel_countdown(),
            SessionCommand::Pause => self.controller.pause(),
            SessionCommand::Resume => self.controller.resume(),
            SessionCommand::SkipSegment => self.controller.skip_segment(),
            SessionCommand::SetAutoAdvance(enabled) => {
                self.controller.set_auto_advance(enabled);
                Ok(())
            }
            SessionCommand::HeartRate(bpm) => {
                self.controller.record_heart_rate(bpm);
                Ok(())
            }
            SessionCommand::Stop => match self.finish() {
                Ok(metrics) => return Some(SessionOutcome::Completed(metrics)),
                Err(e) => Err(e),
            },
            SessionCommand::Discard => {
                self.controller.discard();
                return Some(SessionOutcome::Discarded);
            }
        };

        if let Err(e) = result {
            tracing::warn!("Ignoring {command:?}: {e}");
        }
        None
    }

    fn finish(&mut self) -> Result<TrackedWorkoutMetrics, TrackingError> {
        self.controller.stop()?;
        self.controller.save()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }
}

/// Location provider backed by the driver's event channel. Fixes pushed
/// through the paired [`LocationFeed`] reach the session only while a
/// subscription is held.
#[derive(Debug)]
pub struct ChannelLocationProvider {
    subscribed: Arc<AtomicBool>,
    permission_granted: bool,
}

impl ChannelLocationProvider {
    pub fn deny_permission(mut self) -> Self {
        self.permission_granted = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LocationFeed {
    subscribed: Arc<AtomicBool>,
    events: mpsc::Sender<SessionEvent>,
}

impl LocationFeed {
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Forwards a fix; returns `false` when nobody is listening.
    pub async fn push(&self, sample: LocationSample) -> bool {
        if !self.is_subscribed() {
            return false;
        }
        self.events
            .send(SessionEvent::Location(sample))
            .await
            .is_ok()
    }
}

pub fn location_channel(
    events: mpsc::Sender<SessionEvent>,
) -> (ChannelLocationProvider, LocationFeed) {
    let subscribed = Arc::new(AtomicBool::new(false));
    (
        ChannelLocationProvider {
            subscribed: subscribed.clone(),
            permission_granted: true,
        },
        LocationFeed { subscribed, events },
    )
}

struct FlagSubscription(Arc<AtomicBool>);

impl Subscription for FlagSubscription {
    fn unsubscribe(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl LocationProvider for ChannelLocationProvider {
    fn request_permission(&mut self) -> Result<(), ProviderError> {
        if self.permission_granted {
            Ok(())
        } else {
            Err(ProviderError::PermissionDenied)
        }
    }

    fn subscribe(
        &mut self,
        options: &SamplerOptions,
    ) -> Result<Box<dyn Subscription>, ProviderError> {
        tracing::debug!(
            interval_ms = options.interval_ms,
            distance_filter = options.distance_filter_meters,
            "Subscribing to location updates"
        );
        self.subscribed.store(true, Ordering::SeqCst);
        Ok(Box::new(FlagSubscription(self.subscribed.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        config::TrackingConfig,
        models::{SessionStatus, Sport},
    };
    use ::time::macros::datetime;

    fn sample(north_steps: u32) -> LocationSample {
        // ~100 m per step along the meridian.
        LocationSample::new(
            45.0 + f64::from(north_steps) * 0.000_899_3,
            7.0,
            4.0,
            datetime!(2024-05-01 07:00 UTC) + ::time::Duration::seconds(i64::from(north_steps) * 30),
        )
    }

    fn driver(
        provider: ChannelLocationProvider,
        rx: mpsc::Receiver<SessionEvent>,
    ) -> (SessionDriver, watch::Receiver<SessionSnapshot>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-05-01 07:00 UTC)));
        let controller = TrackingController::new(
            TrackingConfig::default(),
            clock,
            Box::new(provider),
            Sport::Running,
        );
        SessionDriver::new(controller, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_track_and_stop() {
        let (tx, rx) = mpsc::channel(64);
        let (provider, feed) = location_channel(tx.clone());
        let (driver, snapshots) = driver(provider, rx);
        let handle = tokio::spawn(driver.run());

        tx.send(SessionEvent::Command(SessionCommand::StartCountdown))
            .await
            .unwrap();
        time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(snapshots.borrow().status, SessionStatus::Countdown);
        assert!(!feed.is_subscribed());

        time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(snapshots.borrow().status, SessionStatus::Tracking);

        for step in 0..=3 {
            assert!(feed.push(sample(step)).await);
        }
        tx.send(SessionEvent::Command(SessionCommand::Stop))
            .await
            .unwrap();

        let SessionOutcome::Completed(metrics) = handle.await.unwrap() else {
            panic!("session was not completed");
        };
        assert!((metrics.actual_distance_meters - 300.0).abs() < 1.0);
        assert!(!feed.is_subscribed());
        assert!(!feed.push(sample(4)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_discards() {
        let (tx, rx) = mpsc::channel(8);
        let (provider, feed) = location_channel(tx.clone());
        let (driver, _snapshots) = driver(provider, rx);
        let handle = tokio::spawn(driver.run());

        tx.send(SessionEvent::Command(SessionCommand::StartCountdown))
            .await
            .unwrap();
        time::sleep(std::time::Duration::from_secs(4)).await;
        assert!(feed.is_subscribed());

        let watcher = feed.subscribed.clone();
        drop(tx);
        drop(feed);
        assert_eq!(handle.await.unwrap(), SessionOutcome::Discarded);
        assert!(!watcher.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_permission_keeps_driver_alive() {
        let (tx, rx) = mpsc::channel(8);
        let (provider, _feed) = location_channel(tx.clone());
        let (driver, snapshots) = driver(provider.deny_permission(), rx);
        let handle = tokio::spawn(driver.run());

        tx.send(SessionEvent::Command(SessionCommand::StartCountdown))
            .await
            .unwrap();
        time::sleep(std::time::Duration::from_millis(100)).await;
        {
            let snap = snapshots.borrow();
            assert_eq!(snap.status, SessionStatus::Idle);
            assert_eq!(snap.error.as_deref(), Some("Location permission denied"));
        }

        tx.send(SessionEvent::Command(SessionCommand::Discard))
            .await
            .unwrap();
        assert_eq!(handle.await.unwrap(), SessionOutcome::Discarded);
    }
}
