//! Progress through the targeted segments of a structured endurance workout.
//!
//! A plan such as "warm up 10 min, 4 × 1 km, cool down" is expanded into
//! individual trackable segments before the session starts. The tracker then
//! attributes active time and distance to whichever segment is current and
//! reports when its target is reached.

use serde::{Deserialize, Serialize};

use crate::{errors::TrackingError, models::HeartRateStats};

/// Slack for floating point sums of haversine steps.
const DISTANCE_EPSILON_METERS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Warmup,
    Work,
    Recovery,
    Cooldown,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Target value in seconds.
    Time,
    /// Target value in meters.
    Distance,
    /// Runs until skipped.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOutcome {
    Pending,
    Active,
    Completed,
    Skipped,
    /// The session stopped while this segment was running.
    Incomplete,
}

/// A segment as written in a training plan, possibly repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub id: String,
    pub segment_order: u32,
    pub segment_type: SegmentType,
    pub target_type: TargetType,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
}

fn default_repeat_count() -> u32 {
    1
}

impl SegmentDefinition {
    pub fn new(
        id: impl Into<String>,
        segment_order: u32,
        segment_type: SegmentType,
        target_type: TargetType,
        target_value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            segment_order,
            segment_type,
            target_type,
            target_value,
            repeat_count: 1,
        }
    }

    pub fn repeated(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }
}

/// One trackable segment instance and what was achieved in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProgress {
    pub segment_id: String,
    /// Position in the expanded sequence.
    pub segment_order: u32,
    /// Zero-based repeat of the originating definition.
    pub repeat_index: u32,
    pub segment_type: SegmentType,
    pub target_type: TargetType,
    pub target_value: f64,
    pub actual_duration_seconds: f64,
    pub actual_distance_meters: f64,
    pub actual_avg_heart_rate: Option<u16>,
    pub outcome: SegmentOutcome,
}

impl SegmentProgress {
    /// Whether the actual values meet the target. Open segments never do.
    pub fn target_reached(&self) -> bool {
        match self.target_type {
            TargetType::Time => self.actual_duration_seconds >= self.target_value,
            TargetType::Distance => {
                self.actual_distance_meters + DISTANCE_EPSILON_METERS >= self.target_value
            }
            TargetType::Open => false,
        }
    }

    /// Fraction of the target achieved, clamped to 0..=1.
    pub fn progress(&self) -> Option<f64> {
        let actual = match self.target_type {
            TargetType::Time => self.actual_duration_seconds,
            TargetType::Distance => self.actual_distance_meters,
            TargetType::Open => return None,
        };
        (self.target_value > 0.0).then(|| (actual / self.target_value).clamp(0.0, 1.0))
    }
}

/// Expands repeated definitions into individual segments.
///
/// Definitions are ordered by `segment_order`; definitions sharing an order
/// keep their declaration order. Each repeat is emitted contiguously where
/// its definition sits.
pub fn expand_segments(
    definitions: &[SegmentDefinition],
) -> Result<Vec<SegmentProgress>, TrackingError> {
    let mut ordered: Vec<&SegmentDefinition> = definitions.iter().collect();
    ordered.sort_by_key(|d| d.segment_order);

    for pair in ordered.windows(2) {
        if pair[0].segment_order == pair[1].segment_order {
            tracing::warn!(
                "Segments {} and {} share order {}; keeping declaration order",
                pair[0].id,
                pair[1].id,
                pair[0].segment_order
            );
        }
    }

    let mut expanded = Vec::new();
    for def in ordered {
        if def.repeat_count == 0 {
            return Err(TrackingError::InvalidSegments(format!(
                "segment {} has a repeat count of zero",
                def.id
            )));
        }
        if def.target_type != TargetType::Open && !(def.target_value > 0.0) {
            return Err(TrackingError::InvalidSegments(format!(
                "segment {} needs a positive target",
                def.id
            )));
        }

        for repeat in 0..def.repeat_count {
            let segment_id = if def.repeat_count > 1 {
                format!("{}#{}", def.id, repeat + 1)
            } else {
                def.id.clone()
            };
            expanded.push(SegmentProgress {
                segment_id,
                segment_order: expanded.len() as u32,
                repeat_index: repeat,
                segment_type: def.segment_type,
                target_type: def.target_type,
                target_value: def.target_value,
                actual_duration_seconds: 0.0,
                actual_distance_meters: 0.0,
                actual_avg_heart_rate: None,
                outcome: SegmentOutcome::Pending,
            });
        }
    }

    Ok(expanded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEvent {
    /// The current segment met its target; the controller decides whether
    /// to enter a transition.
    TargetReached { index: usize },
    /// The last segment is done.
    AllCompleted,
}

/// Serializable view for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentTrackingState {
    pub segments: Vec<SegmentProgress>,
    pub current_segment_index: usize,
    pub is_auto_advance_enabled: bool,
    pub transition_countdown: Option<u32>,
    pub next_ready: bool,
}

#[derive(Debug, Clone)]
pub struct SegmentTracker {
    segments: Vec<SegmentProgress>,
    current: usize,
    auto_advance: bool,
    next_ready: bool,
    reported: bool,
    finished: bool,
    started_elapsed: f64,
    started_distance: f64,
    heart_rate: HeartRateStats,
}

impl SegmentTracker {
    pub fn new(segments: Vec<SegmentProgress>, auto_advance: bool) -> Result<Self, TrackingError> {
        if segments.is_empty() {
            return Err(TrackingError::InvalidSegments(
                "a segmented workout needs at least one segment".to_string(),
            ));
        }
        Ok(Self {
            segments,
            current: 0,
            auto_advance,
            next_ready: false,
            reported: false,
            finished: false,
            started_elapsed: 0.0,
            started_distance: 0.0,
            heart_rate: HeartRateStats::default(),
        })
    }

    pub fn from_definitions(
        definitions: &[SegmentDefinition],
        auto_advance: bool,
    ) -> Result<Self, TrackingError> {
        Self::new(expand_segments(definitions)?, auto_advance)
    }

    /// Activates the first segment at the given active time and distance.
    pub fn begin(&mut self, elapsed_seconds: f64, distance_meters: f64) {
        self.start_current(elapsed_seconds, distance_meters);
    }

    /// Attributes progress to the current segment. Reports completion once,
    /// on the update whose totals first reach the target.
    pub fn update(&mut self, elapsed_seconds: f64, distance_meters: f64) -> Option<SegmentEvent> {
        if self.finished {
            return None;
        }
        let started_elapsed = self.started_elapsed;
        let started_distance = self.started_distance;
        let segment = &mut self.segments[self.current];
        segment.actual_duration_seconds = (elapsed_seconds - started_elapsed).max(0.0);
        segment.actual_distance_meters = (distance_meters - started_distance).max(0.0);

        if self.reported || !segment.target_reached() {
            return None;
        }

        self.reported = true;
        segment.outcome = SegmentOutcome::Completed;
        tracing::info!(
            segment = %segment.segment_id,
            duration = segment.actual_duration_seconds,
            distance = segment.actual_distance_meters,
            "Segment target reached"
        );

        if self.current + 1 == self.segments.len() {
            self.finished = true;
            return Some(SegmentEvent::AllCompleted);
        }
        if !self.auto_advance {
            self.next_ready = true;
        }
        Some(SegmentEvent::TargetReached {
            index: self.current,
        })
    }

    /// Moves on to the next segment.
    pub fn advance(&mut self, elapsed_seconds: f64, distance_meters: f64) -> Option<SegmentEvent> {
        if self.finished {
            return None;
        }
        if self.current + 1 >= self.segments.len() {
            self.finish();
            return Some(SegmentEvent::AllCompleted);
        }
        self.current += 1;
        self.start_current(elapsed_seconds, distance_meters);
        None
    }

    /// Ends the current segment early (or confirms a ready one) and moves on.
    pub fn skip(&mut self, elapsed_seconds: f64, distance_meters: f64) -> Option<SegmentEvent> {
        if self.finished {
            return None;
        }
        self.update(elapsed_seconds, distance_meters);
        if self.finished {
            return Some(SegmentEvent::AllCompleted);
        }
        let segment = &mut self.segments[self.current];
        if segment.outcome == SegmentOutcome::Active {
            segment.outcome = SegmentOutcome::Skipped;
        }
        if self.current + 1 >= self.segments.len() {
            self.finished = true;
            return Some(SegmentEvent::AllCompleted);
        }
        self.advance(elapsed_seconds, distance_meters)
    }

    pub fn record_heart_rate(&mut self, bpm: u16) {
        if self.finished {
            return;
        }
        self.heart_rate.record(bpm);
        self.segments[self.current].actual_avg_heart_rate = self.heart_rate.average();
    }

    /// Marks whatever is still running as incomplete.
    pub fn finish(&mut self) {
        self.finished = true;
        for segment in &mut self.segments {
            if segment.outcome == SegmentOutcome::Active {
                segment.outcome = SegmentOutcome::Incomplete;
            }
        }
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn next_ready(&self) -> bool {
        self.next_ready
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &SegmentProgress {
        &self.segments[self.current]
    }

    pub fn segments(&self) -> &[SegmentProgress] {
        &self.segments
    }

    pub fn into_results(mut self) -> Vec<SegmentProgress> {
        self.finish();
        self.segments
    }

    pub fn state(&self, transition_countdown: Option<u32>) -> SegmentTrackingState {
        SegmentTrackingState {
            segments: self.segments.clone(),
            current_segment_index: self.current,
            is_auto_advance_enabled: self.auto_advance,
            transition_countdown,
            next_ready: self.next_ready,
        }
    }

    fn start_current(&mut self, elapsed_seconds: f64, distance_meters: f64) {
        self.started_elapsed = elapsed_seconds;
        self.started_distance = distance_meters;
        self.reported = false;
        self.next_ready = false;
        self.heart_rate = HeartRateStats::default();
        self.segments[self.current].outcome = SegmentOutcome::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals() -> Vec<SegmentDefinition> {
        vec![
            SegmentDefinition::new("cooldown", 3, SegmentType::Cooldown, TargetType::Open, 0.0),
            SegmentDefinition::new("warmup", 1, SegmentType::Warmup, TargetType::Time, 600.0),
            SegmentDefinition::new("km", 2, SegmentType::Work, TargetType::Distance, 1000.0)
                .repeated(4),
        ]
    }

    #[test]
    fn test_expansion_orders_and_repeats() {
        let expanded = expand_segments(&intervals()).unwrap();
        let ids: Vec<&str> = expanded.iter().map(|s| s.segment_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["warmup", "km#1", "km#2", "km#3", "km#4", "cooldown"]
        );
        let orders: Vec<u32> = expanded.iter().map(|s| s.segment_order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(expanded[3].repeat_index, 2);
        assert!(expanded.iter().all(|s| s.outcome == SegmentOutcome::Pending));
    }

    #[test]
    fn test_progress_fraction() {
        let mut expanded = expand_segments(&intervals()).unwrap();
        expanded[0].actual_duration_seconds = 150.0;
        assert_eq!(expanded[0].progress(), Some(0.25));
        expanded[1].actual_distance_meters = 1200.0;
        assert_eq!(expanded[1].progress(), Some(1.0));
        assert_eq!(expanded[5].progress(), None);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        assert_eq!(
            expand_segments(&intervals()).unwrap(),
            expand_segments(&intervals()).unwrap()
        );
    }

    #[test]
    fn test_shared_order_keeps_declaration_order() {
        let defs = vec![
            SegmentDefinition::new("b", 1, SegmentType::Work, TargetType::Time, 60.0),
            SegmentDefinition::new("a", 1, SegmentType::Recovery, TargetType::Time, 30.0)
                .repeated(2),
        ];
        let ids: Vec<String> = expand_segments(&defs)
            .unwrap()
            .into_iter()
            .map(|s| s.segment_id)
            .collect();
        assert_eq!(ids, vec!["b", "a#1", "a#2"]);
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let zero = vec![
            SegmentDefinition::new("x", 1, SegmentType::Work, TargetType::Time, 60.0).repeated(0),
        ];
        assert!(matches!(
            expand_segments(&zero),
            Err(TrackingError::InvalidSegments(_))
        ));
        let no_target = vec![SegmentDefinition::new(
            "y",
            1,
            SegmentType::Work,
            TargetType::Distance,
            0.0,
        )];
        assert!(expand_segments(&no_target).is_err());
        assert!(SegmentTracker::new(Vec::new(), true).is_err());
    }

    #[test]
    fn test_distance_target_completes_on_crossing_update() {
        let defs = vec![
            SegmentDefinition::new("km", 1, SegmentType::Work, TargetType::Distance, 1000.0),
            SegmentDefinition::new("jog", 2, SegmentType::Recovery, TargetType::Time, 90.0),
        ];
        let mut tracker = SegmentTracker::from_definitions(&defs, true).unwrap();
        tracker.begin(0.0, 0.0);

        for step in 1..10 {
            let meters = f64::from(step) * 100.0;
            assert_eq!(tracker.update(f64::from(step) * 30.0, meters), None);
        }
        assert_eq!(
            tracker.update(300.0, 1000.0),
            Some(SegmentEvent::TargetReached { index: 0 })
        );
        // Reported once only.
        assert_eq!(tracker.update(305.0, 1010.0), None);
        assert_eq!(tracker.current().outcome, SegmentOutcome::Completed);
    }

    #[test]
    fn test_time_target_and_advance() {
        let defs = vec![
            SegmentDefinition::new("fast", 1, SegmentType::Work, TargetType::Time, 60.0),
            SegmentDefinition::new("easy", 2, SegmentType::Recovery, TargetType::Time, 60.0),
        ];
        let mut tracker = SegmentTracker::from_definitions(&defs, true).unwrap();
        tracker.begin(10.0, 50.0);
        assert_eq!(tracker.update(69.0, 300.0), None);
        assert!(tracker.update(70.0, 310.0).is_some());

        assert_eq!(tracker.advance(75.0, 320.0), None);
        assert_eq!(tracker.current_index(), 1);
        tracker.update(100.0, 400.0);
        assert_eq!(tracker.current().actual_duration_seconds, 25.0);
        assert_eq!(tracker.current().actual_distance_meters, 80.0);
        assert_eq!(
            tracker.update(135.0, 500.0),
            Some(SegmentEvent::AllCompleted)
        );
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_open_segment_only_advances_on_skip() {
        let defs = vec![
            SegmentDefinition::new("free", 1, SegmentType::Other, TargetType::Open, 0.0),
            SegmentDefinition::new("cool", 2, SegmentType::Cooldown, TargetType::Open, 0.0),
        ];
        let mut tracker = SegmentTracker::from_definitions(&defs, true).unwrap();
        tracker.begin(0.0, 0.0);
        assert_eq!(tracker.update(10_000.0, 50_000.0), None);

        assert_eq!(tracker.skip(10_000.0, 50_000.0), None);
        assert_eq!(tracker.segments()[0].outcome, SegmentOutcome::Skipped);
        assert_eq!(tracker.current_index(), 1);

        assert_eq!(
            tracker.skip(10_100.0, 50_200.0),
            Some(SegmentEvent::AllCompleted)
        );
        assert_eq!(tracker.segments()[1].outcome, SegmentOutcome::Skipped);
    }

    #[test]
    fn test_manual_advance_marks_next_ready() {
        let defs = vec![
            SegmentDefinition::new("a", 1, SegmentType::Work, TargetType::Distance, 400.0),
            SegmentDefinition::new("b", 2, SegmentType::Recovery, TargetType::Open, 0.0),
        ];
        let mut tracker = SegmentTracker::from_definitions(&defs, false).unwrap();
        tracker.begin(0.0, 0.0);
        assert!(tracker.update(90.0, 400.0).is_some());
        assert!(tracker.next_ready());
        // Still attributing to the finished segment until the user moves on.
        tracker.update(100.0, 430.0);
        assert_eq!(tracker.current_index(), 0);
        assert_eq!(tracker.current().actual_distance_meters, 430.0);

        tracker.skip(100.0, 430.0);
        assert_eq!(tracker.segments()[0].outcome, SegmentOutcome::Completed);
        assert_eq!(tracker.current_index(), 1);
        assert!(!tracker.next_ready());
    }

    #[test]
    fn test_heart_rate_per_segment_and_finish() {
        let defs = vec![
            SegmentDefinition::new("a", 1, SegmentType::Work, TargetType::Time, 60.0),
            SegmentDefinition::new("b", 2, SegmentType::Work, TargetType::Time, 60.0),
        ];
        let mut tracker = SegmentTracker::from_definitions(&defs, true).unwrap();
        tracker.begin(0.0, 0.0);
        tracker.record_heart_rate(150);
        tracker.record_heart_rate(160);
        tracker.update(60.0, 200.0);
        tracker.advance(60.0, 200.0);
        tracker.record_heart_rate(120);

        let results = tracker.into_results();
        assert_eq!(results[0].actual_avg_heart_rate, Some(155));
        assert_eq!(results[1].actual_avg_heart_rate, Some(120));
        assert_eq!(results[1].outcome, SegmentOutcome::Incomplete);
    }
}
