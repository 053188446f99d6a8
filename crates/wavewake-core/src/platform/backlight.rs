use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::DisplayStateSource;
use crate::config::DisplayConfig;
use crate::event::DisplayState;

/// Display state read from a sysfs backlight's `bl_power` attribute
///
/// `bl_power` is 0 (`FB_BLANK_UNBLANK`) while the panel is lit; any other
/// value means it is blanked.
pub struct BacklightDisplaySource {
    bl_power: PathBuf,
    poll_interval: Duration,
    last: DisplayState,
}

impl BacklightDisplaySource {
    /// Open the configured backlight, or the first one under `backlight_root`
    ///
    /// # Errors
    ///
    /// Returns an error if no backlight is found or its state cannot be read
    pub fn discover(config: &DisplayConfig) -> Result<Self> {
        let dir = match &config.backlight {
            Some(dir) => dir.clone(),
            None => first_backlight(&config.backlight_root).with_context(|| {
                format!("No backlight under {}", config.backlight_root.display())
            })?,
        };
        Self::open(&dir, Duration::from_millis(config.poll_interval_ms.max(1)))
    }

    /// Open a backlight directory
    ///
    /// # Errors
    ///
    /// Returns an error if `bl_power` cannot be read
    pub fn open(dir: &Path, poll_interval: Duration) -> Result<Self> {
        let bl_power = dir.join("bl_power");
        let last = read_state(&bl_power)?;
        log::info!(
            "Watching display power at {} (currently {last})",
            bl_power.display()
        );
        Ok(Self {
            bl_power,
            poll_interval,
            last,
        })
    }
}

#[async_trait]
impl DisplayStateSource for BacklightDisplaySource {
    async fn is_interactive(&self) -> Result<bool> {
        Ok(read_state(&self.bl_power)?.is_interactive())
    }

    async fn next_change(&mut self) -> Result<Option<DisplayState>> {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let state = read_state(&self.bl_power)?;
            if state != self.last {
                self.last = state;
                return Ok(Some(state));
            }
        }
    }
}

/// Display source with no hardware behind it; state changes arrive over IPC
pub struct FixedDisplaySource {
    interactive: bool,
}

impl FixedDisplaySource {
    #[must_use]
    pub const fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

#[async_trait]
impl DisplayStateSource for FixedDisplaySource {
    async fn is_interactive(&self) -> Result<bool> {
        Ok(self.interactive)
    }

    async fn next_change(&mut self) -> Result<Option<DisplayState>> {
        Ok(None)
    }
}

fn first_backlight(root: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.join("bl_power").is_file())
        .collect();
    dirs.sort();
    dirs.into_iter().next()
}

fn read_state(bl_power: &Path) -> Result<DisplayState> {
    let contents = std::fs::read_to_string(bl_power)
        .with_context(|| format!("Failed to read {}", bl_power.display()))?;
    let value: u32 = contents
        .trim()
        .parse()
        .with_context(|| format!("Unexpected bl_power value '{}'", contents.trim()))?;
    Ok(DisplayState::from_interactive(value == 0))
}
