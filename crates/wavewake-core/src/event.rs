use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::sync::{mpsc, oneshot};
use wavewake_storage::PreferenceKey;

use crate::service::ServiceStatus;

/// Display interactivity, delivered edge-triggered by display sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DisplayState {
    On,
    Off,
}

impl DisplayState {
    #[must_use]
    pub const fn from_interactive(interactive: bool) -> Self {
        if interactive {
            Self::On
        } else {
            Self::Off
        }
    }

    #[must_use]
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::On)
    }
}

/// One proximity sample as reported by a sensor source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityReading {
    /// Distance-like value; anything below `max_range` counts as near
    pub value: f32,
    pub max_range: f32,
    /// Monotonic timestamp in nanoseconds
    pub timestamp_ns: i64,
}

impl ProximityReading {
    #[must_use]
    pub fn is_near(&self) -> bool {
        self.value < self.max_range
    }
}

/// Everything the daemon actor reacts to, in delivery order
#[derive(Debug)]
pub enum DaemonEvent {
    Reading(ProximityReading),
    Display(DisplayState),
    PreferenceChanged(PreferenceKey),
    Status(oneshot::Sender<ServiceStatus>),
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<DaemonEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DaemonEvent>;

/// Create the daemon mailbox
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
