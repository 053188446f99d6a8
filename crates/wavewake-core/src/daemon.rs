use crate::{
    config::DaemonConfig,
    event::{self, DaemonEvent, EventReceiver, EventSender},
    ipc::{listen, DaemonIpcHandler},
    platform::{self, DisplayStateSource, PulseBroadcaster, Subscription},
    service::{GestureService, Platform},
};
use anyhow::{Context, Result};
use std::{path::Path, rc::Rc, sync::Arc};
use wavewake_storage::Database;

/// Single-owner actor around the gesture service
///
/// Sensor readings, display edges, preference notifications and IPC requests
/// all arrive through one mailbox and are applied in order.
pub struct Daemon {
    service: GestureService,
    display: Option<Box<dyn DisplayStateSource>>,
    events: EventSender,
    inbox: EventReceiver,
}

impl Daemon {
    /// Build the daemon on the host platform
    ///
    /// # Errors
    ///
    /// Returns an error if no proximity sensor can be opened
    pub fn new(db: Database, config: &DaemonConfig) -> Result<Self> {
        let db = Rc::new(db);
        let platform = Platform {
            sensor: platform::create_sensor(&config.sensor)?,
            wakelock: platform::create_wakelock(&config.wakelock),
            preferences: Box::new(Rc::clone(&db)),
            settings: Box::new(db),
            sink: Box::new(PulseBroadcaster::new(config.pulse.command.clone())),
        };
        let display = platform::create_display_source(&config.display);
        Self::with_platform(platform, display)
    }

    /// Build the daemon from explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor cannot back a classifier
    pub fn with_platform(platform: Platform, display: Box<dyn DisplayStateSource>) -> Result<Self> {
        let (events, inbox) = event::channel();
        let service = GestureService::new(platform, events.clone())?;
        Ok(Self {
            service,
            display: Some(display),
            events,
            inbox,
        })
    }

    /// Handle for posting events into the mailbox
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }

    #[must_use]
    pub fn service(&self) -> &GestureService {
        &self.service
    }

    /// Run with the IPC socket and Ctrl-C handling until shut down
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon was already run
    pub async fn run_with_signals(&mut self, sock_path: &Path) -> Result<()> {
        let ipc_handler = Arc::new(DaemonIpcHandler::new(self.events.clone()));
        let ipc_path = sock_path.to_path_buf();
        let _ipc = Subscription::spawn(async move {
            if let Err(e) = listen(ipc_handler, &ipc_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let events = self.events.clone();
        let _signals = Subscription::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Received Ctrl-C, shutting down...");
                events.send(DaemonEvent::Shutdown).ok();
            }
        });

        log::info!("Daemon started with signal handling and IPC");
        self.run().await?;

        if sock_path.exists() {
            std::fs::remove_file(sock_path)?;
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    /// Start the service and process events until `Shutdown`
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon was already run
    pub async fn run(&mut self) -> Result<()> {
        let display = self.display.take().context("Daemon has already run")?;
        let interactive = display.is_interactive().await.unwrap_or_else(|e| {
            log::warn!("Could not read display state, assuming on: {e:#}");
            true
        });

        self.service.start(interactive);
        let _display_watch = platform::watch_display(display, self.events.clone());

        while let Some(event) = self.inbox.recv().await {
            if self.service.handle_event(event).is_break() {
                break;
            }
        }

        self.service.stop();

        // Drop anything queued behind Shutdown so pending status replies resolve
        self.inbox.close();
        while let Ok(event) = self.inbox.try_recv() {
            log::debug!("Discarding {event:?} received after shutdown");
        }
        Ok(())
    }
}
