use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use wavewake_storage::PreferenceKey;

use crate::config::{DisplayConfig, SensorConfig, WakelockConfig};
use crate::error::CoreError;
use crate::event::{DaemonEvent, DisplayState, EventSender};

pub mod backlight;
pub mod broadcast;
pub mod iio;
pub mod settings;
pub mod wakelock;

pub use backlight::{BacklightDisplaySource, FixedDisplaySource};
pub use broadcast::PulseBroadcaster;
pub use iio::IioProximitySensor;
pub use wakelock::{LocalWakelock, SysfsWakelock};

/// Token returned by `SensorSource::subscribe`
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SensorHandle(u64);

impl SensorHandle {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// Background task owned by whoever registered it; dropping it cancels the task
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Spawn `future` on the current tokio runtime
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Proximity sensor capability
pub trait SensorSource {
    fn name(&self) -> &str;

    /// Readings strictly below this value are "near"
    fn max_range(&self) -> f32;

    /// Start delivering `DaemonEvent::Reading` into `events`
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor cannot be started
    fn subscribe(&mut self, events: EventSender) -> Result<SensorHandle>;

    fn unsubscribe(&mut self, handle: SensorHandle);
}

/// Display interactivity
#[async_trait]
pub trait DisplayStateSource: Send {
    /// Whether the display is currently on
    async fn is_interactive(&self) -> Result<bool>;

    /// Wait for the next on/off edge; `None` once the source has nothing more to report
    async fn next_change(&mut self) -> Result<Option<DisplayState>>;
}

/// Read access to gesture preferences
pub trait PreferenceStore {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool;
}

/// Read access to system-wide integer settings
pub trait SystemSettings {
    fn get_int(&self, name: &str, default: i64) -> i64;
}

/// Fire-and-forget wake broadcast
pub trait WakeSignalSink {
    fn emit(&mut self, reason: &str);
}

/// CPU wakelock
pub trait Wakelock {
    fn acquire(&mut self);
    fn release(&mut self);
    fn is_held(&self) -> bool;
}

/// Open the configured proximity sensor
///
/// # Errors
///
/// Returns `SensorUnavailable` if no proximity device exists, or
/// `InvalidConfig` for an unusable range
pub fn create_sensor(config: &SensorConfig) -> Result<Box<dyn SensorSource>, CoreError> {
    Ok(Box::new(IioProximitySensor::discover(config)?))
}

/// Use the kernel wakelock interface when present, an in-process flag otherwise
#[must_use]
pub fn create_wakelock(config: &WakelockConfig) -> Box<dyn Wakelock> {
    match SysfsWakelock::open(&config.sysfs_root, &config.name) {
        Some(lock) => Box::new(lock),
        None => {
            log::warn!(
                "No kernel wakelock interface under {}, holding '{}' in-process only",
                config.sysfs_root.display(),
                config.name
            );
            Box::new(LocalWakelock::new(&config.name))
        }
    }
}

/// Watch a backlight when one is found; otherwise display state only changes over IPC
#[must_use]
pub fn create_display_source(config: &DisplayConfig) -> Box<dyn DisplayStateSource> {
    match BacklightDisplaySource::discover(config) {
        Ok(source) => Box::new(source),
        Err(e) => {
            log::warn!("No backlight to watch ({e:#}); display state comes from IPC only");
            Box::new(FixedDisplaySource::new(true))
        }
    }
}

/// Forward display edges into the daemon mailbox until the source runs dry
pub fn watch_display(mut source: Box<dyn DisplayStateSource>, events: EventSender) -> Subscription {
    Subscription::spawn(async move {
        loop {
            match source.next_change().await {
                Ok(Some(state)) => {
                    if events.send(DaemonEvent::Display(state)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    log::debug!("Display source finished");
                    break;
                }
                Err(e) => {
                    log::warn!("Failed to read display state: {e:#}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    })
}
