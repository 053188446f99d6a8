//! Proximity gesture classification
//!
//! A gesture is a near -> far transition of the proximity sensor. How long
//! the object stayed in front of the sensor decides which gesture it was:
//! a short cover is a hand wave, a long one means the device left a pocket.


use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::CoreError;
use crate::event::ProximityReading;
use crate::platform::SensorSource;

/// Near duration separating a hand wave from a pocket exit (1 second)
pub const POCKET_DELTA_NS: i64 = 1_000_000_000;

/// Reason attached to every wake broadcast
pub const DOZE_PULSE_REASON: &str = "doze_pulse";

/// Which gestures the user has turned on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureSet {
    pub handwave: bool,
    pub pocket: bool,
}

impl GestureSet {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.handwave || self.pocket
    }
}

/// Snapshot of everything that gates gesture detection
///
/// Built fresh for every decision so the system doze switch is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    pub handwave_enabled: bool,
    pub pocket_enabled: bool,
    pub doze_system_enabled: bool,
}

impl GestureConfig {
    #[must_use]
    pub const fn new(gestures: GestureSet, doze_system_enabled: bool) -> Self {
        Self {
            handwave_enabled: gestures.handwave,
            pocket_enabled: gestures.pocket,
            doze_system_enabled,
        }
    }

    /// At least one gesture is on and the system allows doze pulses
    #[must_use]
    pub const fn gestures_enabled(&self) -> bool {
        (self.handwave_enabled || self.pocket_enabled) && self.doze_system_enabled
    }
}

/// Gesture kind inferred from the near duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Gesture {
    #[strum(to_string = "hand wave")]
    HandWave,
    #[strum(to_string = "pocket")]
    Pocket,
}

impl Gesture {
    #[must_use]
    pub const fn from_delta(delta_ns: i64) -> Self {
        if delta_ns < POCKET_DELTA_NS {
            Self::HandWave
        } else {
            Self::Pocket
        }
    }
}

/// Request to pulse the low-power display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeSignal {
    pub gesture: Gesture,
    pub delta_ns: i64,
    pub timestamp_ns: i64,
}

impl WakeSignal {
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        DOZE_PULSE_REASON
    }
}

/// Mutable classifier state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureState {
    pub was_near: bool,
    /// Refreshed by every reading that is not a near -> far transition,
    /// near readings included.
    pub last_far_timestamp_ns: i64,
}

/// Turns a stream of near/far readings into wake signals
///
/// State is never reset: it carries over when the sensor subscription is
/// dropped and re-established.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    state: GestureState,
    gestures: GestureSet,
}

impl GestureClassifier {
    /// Create a classifier that is not tied to a sensor (offline replay)
    #[must_use]
    pub fn new(gestures: GestureSet) -> Self {
        Self {
            state: GestureState::default(),
            gestures,
        }
    }

    /// Create a classifier for a live sensor
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if the sensor does not report a usable range
    pub fn for_sensor(sensor: &dyn SensorSource) -> Result<Self, CoreError> {
        let max_range = sensor.max_range();
        if !max_range.is_finite() || max_range <= 0.0 {
            return Err(CoreError::SensorUnavailable(format!(
                "{} reports max range {max_range}",
                sensor.name()
            )));
        }
        log::debug!("Classifier bound to {} (max range {max_range})", sensor.name());
        Ok(Self::default())
    }

    #[must_use]
    pub const fn gestures(&self) -> GestureSet {
        self.gestures
    }

    pub fn set_gestures(&mut self, gestures: GestureSet) {
        self.gestures = gestures;
    }

    #[must_use]
    pub const fn state(&self) -> GestureState {
        self.state
    }

    /// Classify a raw sensor event
    pub fn on_reading(&mut self, reading: &ProximityReading) -> Option<WakeSignal> {
        self.process_reading(reading.is_near(), reading.timestamp_ns)
    }

    /// Classify one reading that has already been reduced to near/far
    pub fn process_reading(&mut self, is_near: bool, timestamp_ns: i64) -> Option<WakeSignal> {
        let mut signal = None;

        if self.state.was_near && !is_near {
            let delta_ns = timestamp_ns.wrapping_sub(self.state.last_far_timestamp_ns);
            if self.should_pulse(delta_ns) {
                signal = Some(WakeSignal {
                    gesture: Gesture::from_delta(delta_ns),
                    delta_ns,
                    timestamp_ns,
                });
            } else {
                log::debug!("Near -> far after {delta_ns} ns does not match enabled gestures");
            }
        } else {
            self.state.last_far_timestamp_ns = timestamp_ns;
        }

        self.state.was_near = is_near;
        signal
    }

    /// Whether a near -> far transition `delta_ns` after the last reference
    /// point qualifies under the enabled gestures
    #[must_use]
    pub const fn should_pulse(&self, delta_ns: i64) -> bool {
        match (self.gestures.handwave, self.gestures.pocket) {
            (true, true) => true,
            (true, false) => delta_ns < POCKET_DELTA_NS,
            (false, true) => delta_ns >= POCKET_DELTA_NS,
            (false, false) => false,
        }
    }
}
