//! Device-side collaborators: the location sampler and device status.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{config::SamplerOptions, errors::ProviderError};

/// A live location subscription. Dropping the handle without calling
/// `unsubscribe` leaks the device watcher, so owners release it explicitly.
pub trait Subscription: Send {
    fn unsubscribe(&mut self);
}

/// Source of location fixes.
///
/// Fixes are not returned from here: the platform layer delivers them to
/// [`TrackingController::handle_location`](crate::TrackingController::handle_location)
/// (directly or through the session driver) for as long as the subscription
/// is held.
pub trait LocationProvider: Send {
    fn request_permission(&mut self) -> Result<(), ProviderError>;
    fn subscribe(&mut self, options: &SamplerOptions)
    -> Result<Box<dyn Subscription>, ProviderError>;
}

/// Battery and GPS state used by the readiness check.
pub trait DeviceStatus {
    /// Current horizontal accuracy in meters, `None` without a fix.
    fn gps_accuracy(&self) -> Option<f64>;
    /// Battery level 0.0 - 1.0, `None` when unknown.
    fn battery_level(&self) -> Option<f64>;
}

/// Fixed device readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDeviceStatus {
    pub gps_accuracy: Option<f64>,
    pub battery_level: Option<f64>,
}

impl DeviceStatus for StaticDeviceStatus {
    fn gps_accuracy(&self) -> Option<f64> {
        self.gps_accuracy
    }

    fn battery_level(&self) -> Option<f64> {
        self.battery_level
    }
}

/// Counters shared between a [`ScriptedProvider`] and its observers.
#[derive(Debug, Clone, Default)]
pub struct ProviderCounters {
    subscribes: Arc<AtomicUsize>,
    unsubscribes: Arc<AtomicUsize>,
}

impl ProviderCounters {
    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Subscriptions currently held.
    pub fn live(&self) -> usize {
        self.subscribes().saturating_sub(self.unsubscribes())
    }
}

/// A provider whose permission and subscribe results are decided up front.
/// Used by simulations and tests; fixes are pushed by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    pub deny_permission: bool,
    pub fail_subscribe: Option<String>,
    counters: ProviderCounters,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denying_permission() -> Self {
        Self {
            deny_permission: true,
            ..Self::default()
        }
    }

    pub fn failing_subscribe(reason: impl Into<String>) -> Self {
        Self {
            fail_subscribe: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn counters(&self) -> ProviderCounters {
        self.counters.clone()
    }
}

struct CountedSubscription {
    unsubscribes: Arc<AtomicUsize>,
    active: bool,
}

impl Subscription for CountedSubscription {
    fn unsubscribe(&mut self) {
        if std::mem::take(&mut self.active) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl LocationProvider for ScriptedProvider {
    fn request_permission(&mut self) -> Result<(), ProviderError> {
        if self.deny_permission {
            return Err(ProviderError::PermissionDenied);
        }
        Ok(())
    }

    fn subscribe(
        &mut self,
        _options: &SamplerOptions,
    ) -> Result<Box<dyn Subscription>, ProviderError> {
        if let Some(reason) = &self.fail_subscribe {
            return Err(ProviderError::Unavailable(reason.clone()));
        }
        self.counters.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountedSubscription {
            unsubscribes: self.counters.unsubscribes.clone(),
            active: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_provider_counts_pairs() {
        let mut provider = ScriptedProvider::new();
        let counters = provider.counters();
        let mut sub = provider.subscribe(&SamplerOptions::default()).unwrap();
        assert_eq!(counters.live(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(counters.unsubscribes(), 1);
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn test_scripted_failures() {
        let mut denied = ScriptedProvider::denying_permission();
        assert_eq!(
            denied.request_permission(),
            Err(ProviderError::PermissionDenied)
        );
        let mut broken = ScriptedProvider::failing_subscribe("gps off");
        assert!(broken.subscribe(&SamplerOptions::default()).is_err());
        assert_eq!(broken.counters().subscribes(), 0);
    }
}
