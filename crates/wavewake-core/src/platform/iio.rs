use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{SensorHandle, SensorSource, Subscription};
use crate::config::SensorConfig;
use crate::error::CoreError;
use crate::event::{DaemonEvent, EventSender, ProximityReading};

const RAW_ATTRIBUTES: [&str; 2] = ["in_proximity_raw", "in_proximity0_raw"];

/// Proximity sensor exposed through the Linux IIO sysfs interface
///
/// IIO reports reflected intensity, so the raw value is folded into a binary
/// distance: 0.0 when near, `max_range` when far. Only the first reading and
/// subsequent near/far changes are delivered, matching an on-change sensor.
pub struct IioProximitySensor {
    name: String,
    raw_path: PathBuf,
    max_range: f32,
    near_threshold: i64,
    poll_interval: Duration,
    epoch: Instant,
    next_id: u64,
    active: HashMap<u64, Subscription>,
}

impl IioProximitySensor {
    /// Open the device named in `config`, or the first IIO device with a proximity channel
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if no device is found, `InvalidConfig` for a bad range
    pub fn discover(config: &SensorConfig) -> Result<Self, CoreError> {
        if !config.max_range.is_finite() || config.max_range <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "sensor.max_range must be positive, got {}",
                config.max_range
            )));
        }

        let device = match &config.device {
            Some(device) => device.clone(),
            None => find_proximity_device(&config.iio_root).ok_or_else(|| {
                CoreError::SensorUnavailable(format!(
                    "no IIO proximity device under {}",
                    config.iio_root.display()
                ))
            })?,
        };

        Self::open(&device, config)
    }

    /// Open a specific IIO device directory
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if the directory has no proximity channel
    pub fn open(device: &Path, config: &SensorConfig) -> Result<Self, CoreError> {
        let raw_path = raw_attribute(device).ok_or_else(|| {
            CoreError::SensorUnavailable(format!(
                "{} has no proximity channel",
                device.display()
            ))
        })?;

        let name = std::fs::read_to_string(device.join("name"))
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|_| device.display().to_string());

        log::info!("Using proximity sensor '{name}' at {}", raw_path.display());

        Ok(Self {
            name,
            raw_path,
            max_range: config.max_range,
            near_threshold: config.near_threshold,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            epoch: Instant::now(),
            next_id: 0,
            active: HashMap::new(),
        })
    }
}

impl SensorSource for IioProximitySensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_range(&self) -> f32 {
        self.max_range
    }

    fn subscribe(&mut self, events: EventSender) -> Result<SensorHandle> {
        // Fail early rather than inside the polling task
        read_raw(&self.raw_path)
            .with_context(|| format!("Failed to read {}", self.raw_path.display()))?;

        let id = self.next_id;
        self.next_id += 1;

        let raw_path = self.raw_path.clone();
        let max_range = self.max_range;
        let near_threshold = self.near_threshold;
        let poll_interval = self.poll_interval;
        let epoch = self.epoch;

        let task = Subscription::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last_near: Option<bool> = None;

            loop {
                ticker.tick().await;
                let raw = match read_raw(&raw_path) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::debug!("Proximity read failed: {e}");
                        continue;
                    }
                };

                let value = fold_raw(raw, near_threshold, max_range);
                let near = value < max_range;
                if last_near == Some(near) {
                    continue;
                }
                last_near = Some(near);

                let reading = ProximityReading {
                    value,
                    max_range,
                    timestamp_ns: monotonic_ns(epoch),
                };
                if events.send(DaemonEvent::Reading(reading)).is_err() {
                    break;
                }
            }
        });

        self.active.insert(id, task);
        log::debug!("Proximity sensor subscribed (handle {id})");
        Ok(SensorHandle::new(id))
    }

    fn unsubscribe(&mut self, handle: SensorHandle) {
        if self.active.remove(&handle.id()).is_some() {
            log::debug!("Proximity sensor unsubscribed (handle {})", handle.id());
        } else {
            log::warn!("Unknown sensor handle {}", handle.id());
        }
    }
}

fn find_proximity_device(root: &Path) -> Option<PathBuf> {
    let mut devices: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| raw_attribute(path).is_some())
        .collect();
    devices.sort();
    devices.into_iter().next()
}

fn raw_attribute(device: &Path) -> Option<PathBuf> {
    RAW_ATTRIBUTES
        .iter()
        .map(|attr| device.join(attr))
        .find(|path| path.is_file())
}

fn read_raw(path: &Path) -> Result<i64> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.trim().parse()?)
}

fn fold_raw(raw: i64, near_threshold: i64, max_range: f32) -> f32 {
    if raw >= near_threshold {
        0.0
    } else {
        max_range
    }
}

fn monotonic_ns(epoch: Instant) -> i64 {
    i64::try_from(epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event;

    fn fake_device(root: &Path, name: &str, attr: &str, raw: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(attr), raw).unwrap();
        std::fs::write(dir.join("name"), "stk3x1x\n").unwrap();
        dir
    }

    fn config_for(root: &Path) -> SensorConfig {
        SensorConfig {
            iio_root: root.to_path_buf(),
            poll_interval_ms: 5,
            ..SensorConfig::default()
        }
    }

    #[test]
    fn test_fold_raw() {
        assert!(fold_raw(10, 1, 5.0).abs() < f32::EPSILON);
        assert!(fold_raw(1, 1, 5.0).abs() < f32::EPSILON);
        assert!((fold_raw(0, 1, 5.0) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_discover_skips_devices_without_proximity() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "iio:device0", "in_illuminance_raw", "40");
        fake_device(root.path(), "iio:device1", "in_proximity0_raw", "0");

        let sensor = IioProximitySensor::discover(&config_for(root.path())).unwrap();
        assert_eq!(sensor.name(), "stk3x1x");
        assert!(sensor.raw_path.ends_with("iio:device1/in_proximity0_raw"));
    }

    #[test]
    fn test_discover_without_device_is_unavailable() {
        let root = tempfile::tempdir().unwrap();
        let err = IioProximitySensor::discover(&config_for(root.path()))
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::SensorUnavailable(_)));
    }

    #[test]
    fn test_discover_rejects_bad_range() {
        let root = tempfile::tempdir().unwrap();
        let config = SensorConfig {
            max_range: 0.0,
            ..config_for(root.path())
        };
        let err = IioProximitySensor::discover(&config).err().unwrap();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_subscription_reports_changes_only() {
        let root = tempfile::tempdir().unwrap();
        let device = fake_device(root.path(), "iio:device0", "in_proximity_raw", "0\n");
        let mut sensor = IioProximitySensor::discover(&config_for(root.path())).unwrap();

        let (tx, mut rx) = event::channel();
        let handle = sensor.subscribe(tx).unwrap();

        let Some(DaemonEvent::Reading(first)) = rx.recv().await else {
            panic!("expected a reading");
        };
        assert!(!first.is_near());

        std::fs::write(device.join("in_proximity_raw"), "200\n").unwrap();
        let Some(DaemonEvent::Reading(second)) = rx.recv().await else {
            panic!("expected a reading");
        };
        assert!(second.is_near());
        assert!(second.timestamp_ns >= first.timestamp_ns);

        sensor.unsubscribe(handle);
        assert!(sensor.active.is_empty());
    }

    #[test]
    fn test_subscribe_fails_when_attribute_vanishes() {
        let root = tempfile::tempdir().unwrap();
        let device = fake_device(root.path(), "iio:device0", "in_proximity_raw", "0");
        let mut sensor = IioProximitySensor::discover(&config_for(root.path())).unwrap();
        std::fs::remove_file(device.join("in_proximity_raw")).unwrap();

        let (tx, _rx) = event::channel();
        assert!(sensor.subscribe(tx).is_err());
    }
}
