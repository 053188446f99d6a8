//! Recording platform doubles shared by the unit tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wavewake_storage::PreferenceKey;

use crate::event::{DisplayState, EventSender};
use crate::platform::{
    DisplayStateSource, PreferenceStore, SensorHandle, SensorSource, SystemSettings,
    WakeSignalSink, Wakelock,
};
use crate::service::Platform;

/// Shared view of everything the doubles recorded
#[derive(Clone, Default)]
pub struct Probe {
    pub subscribes: Arc<AtomicUsize>,
    pub unsubscribes: Arc<AtomicUsize>,
    pub acquires: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    pub held: Arc<AtomicBool>,
    pub pulses: Arc<Mutex<Vec<String>>>,
    pub prefs: Arc<Mutex<HashMap<PreferenceKey, bool>>>,
    pub doze: Arc<AtomicI64>,
    pub doze_reads: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        let probe = Self::default();
        probe.doze.store(1, Ordering::SeqCst);
        probe
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn pulses(&self) -> Vec<String> {
        self.pulses.lock().unwrap().clone()
    }

    pub fn set_pref(&self, key: PreferenceKey, value: bool) {
        self.prefs.lock().unwrap().insert(key, value);
    }

    pub fn set_doze(&self, value: i64) {
        self.doze.store(value, Ordering::SeqCst);
    }

    pub fn sensor(&self) -> RecordingSensor {
        RecordingSensor {
            probe: self.clone(),
            max_range: 5.0,
            next_id: 0,
        }
    }

    pub fn wakelock(&self) -> RecordingWakelock {
        RecordingWakelock {
            probe: self.clone(),
        }
    }

    /// Full platform wired to this probe
    pub fn platform(&self) -> Platform {
        Platform {
            sensor: Box::new(self.sensor()),
            wakelock: Box::new(self.wakelock()),
            preferences: Box::new(RecordingPreferences {
                probe: self.clone(),
            }),
            settings: Box::new(RecordingSettings {
                probe: self.clone(),
            }),
            sink: Box::new(RecordingSink {
                probe: self.clone(),
            }),
        }
    }
}

pub struct RecordingSensor {
    probe: Probe,
    pub max_range: f32,
    next_id: u64,
}

impl SensorSource for RecordingSensor {
    fn name(&self) -> &str {
        "recording"
    }

    fn max_range(&self) -> f32 {
        self.max_range
    }

    fn subscribe(&mut self, _events: EventSender) -> Result<SensorHandle> {
        self.probe.subscribes.fetch_add(1, Ordering::SeqCst);
        self.next_id += 1;
        Ok(SensorHandle::new(self.next_id))
    }

    fn unsubscribe(&mut self, _handle: SensorHandle) {
        self.probe.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingWakelock {
    probe: Probe,
}

impl Wakelock for RecordingWakelock {
    fn acquire(&mut self) {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        self.probe.held.store(true, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        self.probe.held.store(false, Ordering::SeqCst);
    }

    fn is_held(&self) -> bool {
        self.probe.held()
    }
}

struct RecordingPreferences {
    probe: Probe,
}

impl PreferenceStore for RecordingPreferences {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool {
        self.probe
            .prefs
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .unwrap_or(default)
    }
}

struct RecordingSettings {
    probe: Probe,
}

impl SystemSettings for RecordingSettings {
    fn get_int(&self, _name: &str, _default: i64) -> i64 {
        self.probe.doze_reads.fetch_add(1, Ordering::SeqCst);
        self.probe.doze.load(Ordering::SeqCst)
    }
}

struct RecordingSink {
    probe: Probe,
}

impl WakeSignalSink for RecordingSink {
    fn emit(&mut self, reason: &str) {
        self.probe.pulses.lock().unwrap().push(reason.to_string());
    }
}

/// Display source with a fixed starting state and no edges of its own
pub struct StaticDisplay(pub DisplayState);

#[async_trait]
impl DisplayStateSource for StaticDisplay {
    async fn is_interactive(&self) -> Result<bool> {
        Ok(self.0.is_interactive())
    }

    async fn next_change(&mut self) -> Result<Option<DisplayState>> {
        Ok(None)
    }
}
