use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use wavewake_storage::{PreferenceKey, DOZE_ENABLED_SETTING};

use crate::activation::ActivationController;
use crate::error::CoreError;
use crate::event::{DaemonEvent, DisplayState, EventSender, ProximityReading};
use crate::gesture::{GestureClassifier, GestureConfig};
use crate::platform::{PreferenceStore, SensorSource, SystemSettings, WakeSignalSink, Wakelock};

/// Platform collaborators the service drives
pub struct Platform {
    pub sensor: Box<dyn SensorSource>,
    pub wakelock: Box<dyn Wakelock>,
    pub preferences: Box<dyn PreferenceStore>,
    pub settings: Box<dyn SystemSettings>,
    pub sink: Box<dyn WakeSignalSink>,
}

/// Snapshot reported over IPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub sensor_name: String,
    pub display: DisplayState,
    pub sensor_subscribed: bool,
    pub wakelock_held: bool,
    pub handwave_enabled: bool,
    pub pocket_enabled: bool,
    pub doze_system_enabled: bool,
    pub gestures_enabled: bool,
    pub pulses_emitted: u64,
    pub last_pulse_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

/// The gesture service: classifier plus activation policy behind one event handler
///
/// Owned by a single task; every event goes through `handle_event`.
pub struct GestureService {
    classifier: GestureClassifier,
    controller: ActivationController,
    preferences: Box<dyn PreferenceStore>,
    settings: Box<dyn SystemSettings>,
    sink: Box<dyn WakeSignalSink>,
    display: DisplayState,
    pulses_emitted: u64,
    last_pulse_at: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
}

impl GestureService {
    /// Assemble the service; sensor readings will be delivered into `events`
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if the sensor cannot back a classifier
    pub fn new(platform: Platform, events: EventSender) -> Result<Self, CoreError> {
        let classifier = GestureClassifier::for_sensor(platform.sensor.as_ref())?;
        Ok(Self {
            classifier,
            controller: ActivationController::new(platform.sensor, platform.wakelock, events),
            preferences: platform.preferences,
            settings: platform.settings,
            sink: platform.sink,
            display: DisplayState::On,
            pulses_emitted: 0,
            last_pulse_at: None,
            started_at: Utc::now(),
        })
    }

    /// Load preferences and arm the sensor if the display is already off
    pub fn start(&mut self, interactive: bool) {
        let mut gestures = self.classifier.gestures();
        gestures.handwave = self.preferences.get_bool(PreferenceKey::HandWave, false);
        gestures.pocket = self.preferences.get_bool(PreferenceKey::Pocket, false);
        self.classifier.set_gestures(gestures);

        self.display = DisplayState::from_interactive(interactive);
        self.started_at = Utc::now();

        let config = self.config();
        log::info!(
            "Gesture service started (display {}, hand wave {}, pocket {}, doze {})",
            self.display,
            config.handwave_enabled,
            config.pocket_enabled,
            config.doze_system_enabled
        );
        self.controller.start(interactive, &config);
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        log::info!("Gesture service stopped");
    }

    /// Current gating configuration; re-reads the doze setting every call
    #[must_use]
    pub fn config(&self) -> GestureConfig {
        let doze = self.settings.get_int(DOZE_ENABLED_SETTING, 1) != 0;
        GestureConfig::new(self.classifier.gestures(), doze)
    }

    /// Apply one event; `Break` once the daemon should shut down
    pub fn handle_event(&mut self, event: DaemonEvent) -> ControlFlow<()> {
        match event {
            DaemonEvent::Reading(reading) => self.on_reading(&reading),
            DaemonEvent::Display(DisplayState::On) => self.on_display_on(),
            DaemonEvent::Display(DisplayState::Off) => self.on_display_off(),
            DaemonEvent::PreferenceChanged(key) => self.on_preference_changed(key),
            DaemonEvent::Status(reply) => {
                if reply.send(self.status()).is_err() {
                    log::debug!("Status requester went away");
                }
            }
            DaemonEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        let config = self.config();
        let activation = self.controller.state();
        ServiceStatus {
            sensor_name: self.controller.sensor().name().to_string(),
            display: self.display,
            sensor_subscribed: activation.sensor_subscribed,
            wakelock_held: activation.wakelock_held,
            handwave_enabled: config.handwave_enabled,
            pocket_enabled: config.pocket_enabled,
            doze_system_enabled: config.doze_system_enabled,
            gestures_enabled: config.gestures_enabled(),
            pulses_emitted: self.pulses_emitted,
            last_pulse_at: self.last_pulse_at,
            started_at: self.started_at,
        }
    }

    fn on_reading(&mut self, reading: &ProximityReading) {
        // Readings queued before an unsubscribe are stale
        if !self.controller.state().sensor_subscribed {
            log::trace!("Dropping reading while sensor is disabled");
            return;
        }

        if let Some(signal) = self.classifier.on_reading(reading) {
            log::info!(
                "Detected {} gesture ({} ms near), pulsing display",
                signal.gesture,
                signal.delta_ns / 1_000_000
            );
            self.sink.emit(signal.reason());
            self.pulses_emitted += 1;
            self.last_pulse_at = Some(Utc::now());
        }
    }

    fn on_display_on(&mut self) {
        self.display = DisplayState::On;
        let config = self.config();
        self.controller.on_display_on(&config);
    }

    fn on_display_off(&mut self) {
        self.display = DisplayState::Off;
        let config = self.config();
        self.controller.on_display_off(&config);
    }

    fn on_preference_changed(&mut self, key: PreferenceKey) {
        let mut gestures = self.classifier.gestures();
        let value = self.preferences.get_bool(key, false);
        match key {
            PreferenceKey::HandWave => gestures.handwave = value,
            PreferenceKey::Pocket => gestures.pocket = value,
        }
        self.classifier.set_gestures(gestures);
        log::info!("Preference {key} changed to {value}");

        let config = self.config();
        self.controller.on_preferences_changed(&config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event;
    use crate::testing::Probe;
    use std::sync::atomic::Ordering;
    use tokio::sync::oneshot;

    fn service(probe: &Probe) -> GestureService {
        let (tx, _rx) = event::channel();
        GestureService::new(probe.platform(), tx).unwrap()
    }

    fn reading(near: bool, timestamp_ns: i64) -> DaemonEvent {
        DaemonEvent::Reading(ProximityReading {
            value: if near { 0.0 } else { 5.0 },
            max_range: 5.0,
            timestamp_ns,
        })
    }

    #[test]
    fn test_new_rejects_sensor_without_range() {
        let probe = Probe::new();
        let mut platform = probe.platform();
        let mut sensor = probe.sensor();
        sensor.max_range = f32::NAN;
        platform.sensor = Box::new(sensor);

        let (tx, _rx) = event::channel();
        let err = GestureService::new(platform, tx).err().unwrap();
        assert!(matches!(err, CoreError::SensorUnavailable(_)));
    }

    #[test]
    fn test_start_loads_preferences() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::Pocket, true);
        let mut service = service(&probe);

        service.start(true);
        let status = service.status();
        assert!(!status.handwave_enabled);
        assert!(status.pocket_enabled);
        assert!(status.gestures_enabled);
        assert!(!status.sensor_subscribed);
        assert_eq!(status.display, DisplayState::On);
        assert_eq!(status.sensor_name, "recording");
    }

    #[test]
    fn test_start_with_screen_off_arms_sensor() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        let mut service = service(&probe);

        service.start(false);
        assert_eq!(probe.subscribes(), 1);
        assert_eq!(service.status().display, DisplayState::Off);
    }

    #[test]
    fn test_doze_setting_is_read_per_decision() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        let mut service = service(&probe);
        service.start(true);

        probe.set_doze(0);
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::Off));
        assert_eq!(probe.subscribes(), 0);

        let _ = service.handle_event(DaemonEvent::Display(DisplayState::On));
        probe.set_doze(1);
        let reads_before = probe.doze_reads.load(Ordering::SeqCst);
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::Off));
        assert_eq!(probe.subscribes(), 1);
        assert!(probe.doze_reads.load(Ordering::SeqCst) > reads_before);
    }

    #[test]
    fn test_handwave_pulse_end_to_end() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        let mut service = service(&probe);
        service.start(true);
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::Off));

        let _ = service.handle_event(reading(false, 0));
        let _ = service.handle_event(reading(true, 100));
        let _ = service.handle_event(reading(false, 900_000_000));

        assert_eq!(probe.pulses(), vec!["doze_pulse".to_string()]);
        let status = service.status();
        assert_eq!(status.pulses_emitted, 1);
        assert!(status.last_pulse_at.is_some());
    }

    #[test]
    fn test_readings_ignored_while_sensor_disabled() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        probe.set_pref(PreferenceKey::Pocket, true);
        let mut service = service(&probe);
        service.start(true);

        let _ = service.handle_event(reading(true, 0));
        let _ = service.handle_event(reading(false, 10));
        assert!(probe.pulses().is_empty());
    }

    #[test]
    fn test_classifier_state_survives_resubscribe() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        probe.set_pref(PreferenceKey::Pocket, true);
        let mut service = service(&probe);
        service.start(false);

        let _ = service.handle_event(reading(true, 0));
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::On));
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::Off));
        assert_eq!(probe.subscribes(), 2);

        // Still "near" from before the display cycle: a far reading completes the gesture
        let _ = service.handle_event(reading(false, 5_000_000_000));
        assert_eq!(probe.pulses().len(), 1);
    }

    #[test]
    fn test_preference_change_updates_flag_and_wakelock() {
        let probe = Probe::new();
        let mut service = service(&probe);
        service.start(false);
        assert_eq!(probe.subscribes(), 0);

        probe.set_pref(PreferenceKey::HandWave, true);
        let _ = service.handle_event(DaemonEvent::PreferenceChanged(PreferenceKey::HandWave));

        assert!(service.status().handwave_enabled);
        assert_eq!(probe.acquires(), 1);
        // Preference changes never arm the sensor by themselves
        assert_eq!(probe.subscribes(), 0);
    }

    #[test]
    fn test_display_off_with_gestures_disabled_releases_wakelock() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        let mut service = service(&probe);
        service.start(true);
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::On));
        assert!(probe.held());

        probe.set_pref(PreferenceKey::HandWave, false);
        let _ = service.handle_event(DaemonEvent::PreferenceChanged(PreferenceKey::HandWave));
        let _ = service.handle_event(DaemonEvent::Display(DisplayState::Off));

        let status = service.status();
        assert!(!status.sensor_subscribed);
        assert!(!status.wakelock_held);
    }

    #[test]
    fn test_status_event_replies() {
        let probe = Probe::new();
        let mut service = service(&probe);
        service.start(true);

        let (tx, mut rx) = oneshot::channel();
        assert!(service
            .handle_event(DaemonEvent::Status(tx))
            .is_continue());
        let status = rx.try_recv().unwrap();
        assert_eq!(status.pulses_emitted, 0);
        assert!(status.doze_system_enabled);
    }

    #[test]
    fn test_shutdown_breaks() {
        let probe = Probe::new();
        let mut service = service(&probe);
        assert!(service.handle_event(DaemonEvent::Shutdown).is_break());
    }

    #[test]
    fn test_stop_releases_sensor_and_wakelock() {
        let probe = Probe::new();
        probe.set_pref(PreferenceKey::HandWave, true);
        let mut service = service(&probe);
        service.start(false);
        let _ = service.handle_event(DaemonEvent::PreferenceChanged(PreferenceKey::Pocket));
        assert!(probe.held());

        service.stop();
        assert_eq!(probe.unsubscribes(), 1);
        assert_eq!(probe.releases(), 1);
    }
}
