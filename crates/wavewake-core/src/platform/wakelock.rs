use std::path::{Path, PathBuf};

use super::Wakelock;

/// Android-style kernel wakelock (`/sys/power/wake_lock`, `/sys/power/wake_unlock`)
pub struct SysfsWakelock {
    name: String,
    lock_path: PathBuf,
    unlock_path: PathBuf,
}

impl SysfsWakelock {
    /// `None` when the kernel does not expose user-space wakelocks
    #[must_use]
    pub fn open(sysfs_root: &Path, name: &str) -> Option<Self> {
        let lock_path = sysfs_root.join("wake_lock");
        let unlock_path = sysfs_root.join("wake_unlock");
        if !lock_path.is_file() || !unlock_path.is_file() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            lock_path,
            unlock_path,
        })
    }
}

impl Wakelock for SysfsWakelock {
    fn acquire(&mut self) {
        if let Err(e) = std::fs::write(&self.lock_path, &self.name) {
            log::error!("Failed to acquire wakelock '{}': {e}", self.name);
        }
    }

    fn release(&mut self) {
        if let Err(e) = std::fs::write(&self.unlock_path, &self.name) {
            log::error!("Failed to release wakelock '{}': {e}", self.name);
        }
    }

    fn is_held(&self) -> bool {
        std::fs::read_to_string(&self.lock_path)
            .map(|active| active.split_whitespace().any(|lock| lock == self.name))
            .unwrap_or(false)
    }
}

/// Wakelock bookkeeping for hosts without kernel wakelocks
pub struct LocalWakelock {
    name: String,
    held: bool,
}

impl LocalWakelock {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            held: false,
        }
    }
}

impl Wakelock for LocalWakelock {
    fn acquire(&mut self) {
        log::debug!("Holding local wakelock '{}'", self.name);
        self.held = true;
    }

    fn release(&mut self) {
        log::debug!("Dropping local wakelock '{}'", self.name);
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}
