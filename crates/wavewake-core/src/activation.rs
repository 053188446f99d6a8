use serde::{Deserialize, Serialize};

use crate::event::EventSender;
use crate::gesture::GestureConfig;
use crate::platform::{SensorHandle, SensorSource, Wakelock};

/// Current outputs of the activation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub sensor_subscribed: bool,
    pub wakelock_held: bool,
}

/// Duty-cycles the proximity sensor and the wakelock
///
/// The sensor only runs while the display is off and gestures are enabled.
/// The wakelock is taken when the display turns on or a preference change
/// leaves gestures enabled, and is dropped on display off and on stop.
pub struct ActivationController {
    sensor: Box<dyn SensorSource>,
    wakelock: Box<dyn Wakelock>,
    events: EventSender,
    sensor_handle: Option<SensorHandle>,
}

impl ActivationController {
    #[must_use]
    pub fn new(
        sensor: Box<dyn SensorSource>,
        wakelock: Box<dyn Wakelock>,
        events: EventSender,
    ) -> Self {
        Self {
            sensor,
            wakelock,
            events,
            sensor_handle: None,
        }
    }

    #[must_use]
    pub fn sensor(&self) -> &dyn SensorSource {
        self.sensor.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> ActivationState {
        ActivationState {
            sensor_subscribed: self.sensor_handle.is_some(),
            wakelock_held: self.wakelock.is_held(),
        }
    }

    /// Service start: arm the sensor if the screen is already off
    pub fn start(&mut self, interactive: bool, config: &GestureConfig) {
        if !interactive && config.gestures_enabled() {
            self.set_prox_enabled(true);
        }
    }

    /// Service stop: release everything
    pub fn stop(&mut self) {
        self.set_prox_enabled(false);
        self.hold_wakelock(false);
    }

    pub fn on_display_on(&mut self, config: &GestureConfig) {
        log::debug!("Display on");
        self.set_prox_enabled(false);
        if config.gestures_enabled() {
            self.hold_wakelock(true);
        }
    }

    pub fn on_display_off(&mut self, config: &GestureConfig) {
        log::debug!("Display off");
        if config.gestures_enabled() {
            self.set_prox_enabled(true);
        }
        self.hold_wakelock(false);
    }

    /// Called after the in-memory gesture flags were refreshed
    pub fn on_preferences_changed(&mut self, config: &GestureConfig) {
        if config.gestures_enabled() {
            self.hold_wakelock(true);
        }
    }

    /// Subscribe or unsubscribe the sensor; no-op when already in the requested state
    pub fn set_prox_enabled(&mut self, enable: bool) {
        if self.sensor_handle.is_some() == enable {
            return;
        }

        if enable {
            match self.sensor.subscribe(self.events.clone()) {
                Ok(handle) => {
                    log::info!("Proximity sensor enabled");
                    self.sensor_handle = Some(handle);
                }
                Err(e) => log::error!("Failed to enable proximity sensor: {e:#}"),
            }
        } else if let Some(handle) = self.sensor_handle.take() {
            self.sensor.unsubscribe(handle);
            log::info!("Proximity sensor disabled");
        }
    }

    /// Acquire or release the wakelock; no-op when it is already in the requested state
    pub fn hold_wakelock(&mut self, hold: bool) {
        let held = self.wakelock.is_held();
        log::debug!("hold={hold}, held={held}");
        if hold == held {
            return;
        }

        if hold {
            self.wakelock.acquire();
        } else {
            self.wakelock.release();
        }
    }
}
