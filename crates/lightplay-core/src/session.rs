//! Device session: connection lifecycle and the outbound command path.
//!
//! A [`DeviceSession`] owns a [`Transport`], the last-known light state and
//! the rate limiter. Every light command flows through the same pipeline:
//!
//! 1. resolve the requested color (`Surprise` becomes a concrete color)
//! 2. consult the cache and skip the command if it would change nothing
//! 3. build the 9-byte frame
//! 4. drop it if there is no link or the rate limiter says no
//! 5. write it, and record the new state only if the write succeeded
//! 6. hold the caller until the pacing delay has elapsed
//!
//! The caller is released at the pacing deadline whatever the write does. A
//! failed write reports its error at the deadline. A write still running at
//! the deadline finishes in the background and the command reports
//! [`CommandOutcome::InFlight`]; its effect is recorded in the cache when it
//! succeeds, unless a later command or a reconnect has happened since.
//!
//! Dropped commands are not errors. They are counted in [`SendMetrics`] and
//! published as [`SessionEvent::SendDropped`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use btleplug::api::WriteType;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use lightplay_types::{
    Color, ColorChoice, CommandFrame, LightState, LightStatus, Port, Transition,
};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::events::{
    DisconnectReason, DropReason, EventDispatcher, EventReceiver, SessionEvent, SessionState,
};
use crate::limiter::{DEFAULT_MAX_SENDS_PER_SECOND, RateLimiter};
use crate::metrics::{AtomicSendMetrics, SendMetrics};
use crate::scan::{DiscoveredLight, ScanOptions};
use crate::state::{Intent, LightStateCache};
use crate::transport::Transport;
use crate::uuids::{LIGHTPLAY_SERVICE, RX_CHARACTERISTIC, TX_CHARACTERISTIC};

/// Default hold time after issuing a command.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(300);

/// Default fade duration written to the device on connect.
pub const DEFAULT_FADE_DURATION: Duration = Duration::from_secs(2);

/// Default scan duration.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Configuration for a [`DeviceSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Token-bucket rate for rate-limited sends.
    pub max_sends_per_second: u32,
    /// How long a command holds its caller, measured from issue.
    pub pacing_delay: Duration,
    /// Fade duration configured on the device at connect.
    pub fade_duration: Duration,
    /// How long `scan` listens for advertisements.
    pub scan_duration: Duration,
    /// Connect only to the peripheral matching this id or name.
    pub device: Option<String>,
    /// Write type used for command frames.
    pub write_type: WriteType,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sends_per_second: DEFAULT_MAX_SENDS_PER_SECOND,
            pacing_delay: DEFAULT_PACING_DELAY,
            fade_duration: DEFAULT_FADE_DURATION,
            scan_duration: DEFAULT_SCAN_DURATION,
            device: None,
            write_type: WriteType::WithResponse,
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rate limit.
    #[must_use]
    pub fn max_sends_per_second(mut self, rate: u32) -> Self {
        self.max_sends_per_second = rate;
        self
    }

    /// Set the pacing delay.
    #[must_use]
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Set the device fade duration.
    #[must_use]
    pub fn fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    /// Set the scan duration.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Restrict `scan` to a specific peripheral.
    #[must_use]
    pub fn device(mut self, identifier: impl Into<String>) -> Self {
        self.device = Some(identifier.into());
        self
    }

    /// Set the write type for command frames.
    #[must_use]
    pub fn write_type(mut self, write_type: WriteType) -> Self {
        self.write_type = write_type;
        self
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_sends_per_second == 0 {
            return Err(Error::invalid_config(
                "max_sends_per_second must be at least 1",
            ));
        }
        if self.fade_duration.as_millis() > u128::from(u16::MAX) {
            return Err(Error::invalid_config(format!(
                "fade_duration must be at most {} ms",
                u16::MAX
            )));
        }
        if self.scan_duration.is_zero() {
            return Err(Error::invalid_config("scan_duration must be non-zero"));
        }
        Ok(())
    }
}

/// What happened to a command or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The transport accepted the frame.
    Sent,
    /// The cache showed the command would change nothing.
    Suppressed,
    /// The frame never reached the transport.
    Dropped(DropReason),
    /// The write outlasted the pacing delay and finishes in the background.
    InFlight,
}

impl CommandOutcome {
    /// Whether a frame was written.
    pub fn was_sent(self) -> bool {
        matches!(self, CommandOutcome::Sent)
    }
}

/// A session with one LightPlay toy.
pub struct DeviceSession<T: Transport> {
    transport: Arc<T>,
    config: SessionConfig,
    state: RwLock<SessionState>,
    /// Id of the linked peripheral.
    link: RwLock<Option<String>>,
    cache: Arc<Mutex<LightStateCache>>,
    /// Bumped per written command and per reconnect; a background write only
    /// updates the cache if nothing newer happened.
    generation: Arc<AtomicU64>,
    limiter: Mutex<RateLimiter>,
    metrics: Arc<AtomicSendMetrics>,
    events: EventDispatcher,
}

impl<T: Transport> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Create a disconnected session over `transport`.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let limiter = RateLimiter::per_second(config.max_sends_per_second);
        let cache = LightStateCache::with_fade_duration(config.fade_duration);
        Self {
            transport: Arc::new(transport),
            config,
            state: RwLock::new(SessionState::Disconnected),
            link: RwLock::new(None),
            cache: Arc::new(Mutex::new(cache)),
            generation: Arc::new(AtomicU64::new(0)),
            limiter: Mutex::new(limiter),
            metrics: Arc::new(AtomicSendMetrics::new()),
            events: EventDispatcher::default(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Id of the linked peripheral, if any.
    pub async fn linked_id(&self) -> Option<String> {
        self.link.read().await.clone()
    }

    /// Snapshot of send-path counters.
    pub fn metrics(&self) -> SendMetrics {
        self.metrics.snapshot()
    }

    /// Receive session events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    async fn set_state(&self, to: SessionState) {
        let from = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, to)
        };
        if from != to {
            debug!("Session state {} -> {}", from, to);
            self.events.send(SessionEvent::StateChanged { from, to });
        }
    }

    // --- Lifecycle ---

    /// Discover a LightPlay toy and connect to it.
    ///
    /// Any existing link is released first. The first peripheral found is
    /// used unless [`SessionConfig::device`] names a specific one.
    #[tracing::instrument(level = "info", skip_all, fields(device = ?self.config.device))]
    pub async fn scan(&self) -> Result<DiscoveredLight> {
        self.release_previous().await;

        self.set_state(SessionState::Scanning).await;
        let target = match self.discover().await {
            Ok(target) => target,
            Err(e) => {
                self.set_state(SessionState::Disconnected).await;
                return Err(e);
            }
        };

        self.connect(&target.id).await?;
        Ok(target)
    }

    async fn release_previous(&self) {
        let held = self.link.read().await.is_some();
        if held && let Err(e) = self.release(DisconnectReason::Rescan).await {
            warn!("Failed to release previous link: {}", e);
        }
    }

    async fn discover(&self) -> Result<DiscoveredLight> {
        let options = ScanOptions::new().duration(self.config.scan_duration);
        info!("Scanning for LightPlay devices ({:?})", options.duration);
        let found = self.transport.start_scan(&options).await?;
        info!("Scan finished, {} device(s) found", found.len());

        for light in &found {
            self.events.send(SessionEvent::Discovered {
                id: light.id.clone(),
                name: light.name.clone(),
            });
        }

        match &self.config.device {
            Some(identifier) => found
                .into_iter()
                .find(|light| light.matches(identifier))
                .ok_or_else(|| Error::device_not_found(identifier.clone())),
            None => found
                .into_iter()
                .next()
                .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)),
        }
    }

    /// Link to a discovered peripheral and bootstrap it.
    ///
    /// On success the cache is reset, TX notifications are subscribed and
    /// the reset and fade-duration frames are written. On failure the
    /// session returns to [`SessionState::Disconnected`].
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn connect(&self, id: &str) -> Result<()> {
        self.release_previous().await;

        self.set_state(SessionState::Scanning).await;
        match self.establish(id).await {
            Ok(()) => {
                info!("Connected to {}", id);
                self.set_state(SessionState::Connected).await;
                self.events.send(SessionEvent::Connected { id: id.to_string() });
                Ok(())
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", id, e);
                let linked = self.link.write().await.take().is_some();
                if linked && let Err(cleanup) = self.transport.disconnect().await {
                    debug!("Cleanup after failed connect: {}", cleanup);
                }
                self.set_state(SessionState::Disconnected).await;
                self.events.send(SessionEvent::Disconnected {
                    reason: DisconnectReason::ConnectFailed(e.to_string()),
                });
                Err(e)
            }
        }
    }

    async fn establish(&self, id: &str) -> Result<()> {
        self.transport.connect_peripheral(id).await?;
        *self.link.write().await = Some(id.to_string());

        // The device forgets everything on reconnect.
        {
            let mut cache = self.cache.lock().await;
            cache.reset();
            self.generation.fetch_add(1, Ordering::Relaxed);
        }

        let events = self.events.clone();
        let on_notify = Arc::new(move |data: &[u8]| {
            debug!("Notification: {:02X?}", data);
            events.send(SessionEvent::Notification {
                data: data.to_vec(),
            });
        });
        if let Err(e) = self
            .transport
            .subscribe(LIGHTPLAY_SERVICE, TX_CHARACTERISTIC, on_notify)
            .await
        {
            warn!("Could not subscribe to notifications: {}", e);
        }

        self.write_frame(&CommandFrame::reset()).await?;
        self.write_frame(&CommandFrame::fade_duration(self.config.fade_duration))
            .await?;
        Ok(())
    }

    /// Release the link. Later commands become no-ops.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn disconnect(&self) -> Result<()> {
        self.release(DisconnectReason::UserRequested).await
    }

    async fn release(&self, reason: DisconnectReason) -> Result<()> {
        let Some(id) = self.link.write().await.take() else {
            self.set_state(SessionState::Disconnected).await;
            return Ok(());
        };

        info!("Disconnecting from {} ({:?})", id, reason);
        let result = self.transport.disconnect().await;
        self.set_state(SessionState::Disconnected).await;
        self.events.send(SessionEvent::Disconnected { reason });
        result
    }

    /// Whether a link is held and still up.
    ///
    /// A held link the transport reports as down is handled as link loss.
    pub async fn is_connected(&self) -> bool {
        if self.link.read().await.is_none() {
            return false;
        }
        if self.transport.is_connected().await {
            return true;
        }
        self.on_link_lost().await;
        false
    }

    /// Handle a link the transport has lost.
    pub async fn on_link_lost(&self) {
        let Some(id) = self.link.write().await.take() else {
            return;
        };

        warn!("Link to {} lost", id);
        if let Err(e) = self.transport.disconnect().await {
            debug!("Cleanup after link loss: {}", e);
        }
        self.set_state(SessionState::Disconnected).await;
        self.events.send(SessionEvent::Disconnected {
            reason: DisconnectReason::LinkLost,
        });
    }

    // --- Send path ---

    /// Send a raw frame to the device.
    ///
    /// Without a link, or when `rate_limited` and the limiter has no token,
    /// the frame is dropped and `Ok(Dropped(..))` is returned. Otherwise the
    /// transport's result is returned as is.
    pub async fn send(&self, frame: &CommandFrame, rate_limited: bool) -> Result<CommandOutcome> {
        if let Some(reason) = self.admit(frame, rate_limited).await {
            return Ok(self.dropped(frame, reason));
        }

        self.write_frame(frame).await?;
        Ok(CommandOutcome::Sent)
    }

    /// Decide whether `frame` may go to the transport.
    async fn admit(&self, frame: &CommandFrame, rate_limited: bool) -> Option<DropReason> {
        if !self.is_connected().await {
            debug!("Not connected, dropping {}", frame);
            self.metrics.record_not_connected();
            return Some(DropReason::NotConnected);
        }

        if rate_limited && !self.limiter.lock().await.okay_to_send() {
            debug!("Rate limited, dropping {}", frame);
            self.metrics.record_rate_limited();
            return Some(DropReason::RateLimited);
        }
        None
    }

    fn dropped(&self, frame: &CommandFrame, reason: DropReason) -> CommandOutcome {
        self.events.send(SessionEvent::SendDropped {
            frame: frame.as_bytes().to_vec(),
            reason,
        });
        CommandOutcome::Dropped(reason)
    }

    async fn write_frame(&self, frame: &CommandFrame) -> Result<()> {
        write_command(
            self.transport.as_ref(),
            &self.metrics,
            frame,
            self.config.write_type,
        )
        .await
    }

    /// Write a command frame, waiting for it at most until `deadline`.
    ///
    /// The write runs on its own task so that one outlasting the deadline is
    /// not cancelled.
    async fn write_until(
        &self,
        frame: CommandFrame,
        port: Port,
        intent: Intent,
        deadline: Instant,
    ) -> Result<CommandOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        let write_type = self.config.write_type;
        let mut write = tokio::spawn(async move {
            write_command(transport.as_ref(), &metrics, &frame, write_type).await
        });

        match tokio::time::timeout_at(deadline, &mut write).await {
            Ok(joined) => {
                flatten(joined)?;
                self.cache.lock().await.apply_intent(port, intent);
                Ok(CommandOutcome::Sent)
            }
            Err(_) => {
                debug!("Write of {} still running at the pacing deadline", frame);
                let cache = Arc::clone(&self.cache);
                let current = Arc::clone(&self.generation);
                tokio::spawn(async move {
                    if flatten(write.await).is_err() {
                        return;
                    }
                    let mut cache = cache.lock().await;
                    if current.load(Ordering::Relaxed) == generation {
                        cache.apply_intent(port, intent);
                    } else {
                        debug!("Discarding late write of {}", frame);
                    }
                });
                Ok(CommandOutcome::InFlight)
            }
        }
    }

    // --- Light commands ---

    /// Show `color` on `port` immediately.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn set_color(&self, port: Port, color: ColorChoice) -> Result<CommandOutcome> {
        self.execute(port, Some(color), Transition::Immediate).await
    }

    /// Turn `port` off immediately.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn set_off(&self, port: Port) -> Result<CommandOutcome> {
        self.execute(port, None, Transition::Immediate).await
    }

    /// Fade `port` to `color` over the configured fade duration.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fade_to_color(&self, port: Port, color: ColorChoice) -> Result<CommandOutcome> {
        self.execute(port, Some(color), Transition::Fade).await
    }

    /// Fade `port` out over the configured fade duration.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fade_off(&self, port: Port) -> Result<CommandOutcome> {
        self.execute(port, None, Transition::Fade).await
    }

    async fn execute(
        &self,
        port: Port,
        choice: Option<ColorChoice>,
        transition: Transition,
    ) -> Result<CommandOutcome> {
        let issued = Instant::now();
        let deadline = issued + self.config.pacing_delay;

        let intent = {
            let mut cache = self.cache.lock().await;
            cache.settle();
            let intent = match choice {
                Some(choice) => Intent::Lit {
                    color: cache.resolve(port, choice, &mut rand::rng()),
                    transition,
                },
                None => Intent::Dark { transition },
            };
            if cache.is_redundant(port, intent) {
                debug!("{:?} on {} changes nothing, skipping", intent, port);
                self.metrics.record_suppressed();
                return Ok(CommandOutcome::Suppressed);
            }
            intent
        };

        let frame = intent.frame(port);
        let result = match self.admit(&frame, true).await {
            Some(reason) => Ok(self.dropped(&frame, reason)),
            None => self.write_until(frame, port, intent, deadline).await,
        };

        tokio::time::sleep_until(deadline).await;
        result
    }

    // --- Cached state ---

    /// Cached state of `port`; `None` when `AllLights` is mixed.
    pub async fn light_state(&self, port: Port) -> Option<LightState> {
        let mut cache = self.cache.lock().await;
        cache.settle();
        cache.state_of(port)
    }

    /// Cached status of `port`; `None` when `AllLights` is mixed.
    pub async fn status_of(&self, port: Port) -> Option<LightStatus> {
        let mut cache = self.cache.lock().await;
        cache.settle();
        cache.status_of(port)
    }

    /// Cached color of `port`; `None` when `AllLights` is mixed.
    pub async fn color_of(&self, port: Port) -> Option<Color> {
        let mut cache = self.cache.lock().await;
        cache.settle();
        cache.color_of(port)
    }
}

async fn write_command<T: Transport>(
    transport: &T,
    metrics: &AtomicSendMetrics,
    frame: &CommandFrame,
    write_type: WriteType,
) -> Result<()> {
    let start = Instant::now();
    let result = transport
        .write(
            LIGHTPLAY_SERVICE,
            RX_CHARACTERISTIC,
            frame.as_bytes(),
            write_type,
        )
        .await;

    match &result {
        Ok(()) => {
            debug!("Wrote {}", frame);
            metrics.record_written(start.elapsed());
        }
        Err(e) => {
            warn!("Write of {} failed: {}", frame, e);
            metrics.record_failed(start.elapsed());
        }
    }
    result
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.unwrap_or_else(|e| {
        Err(Error::write_failed(
            RX_CHARACTERISTIC.to_string(),
            format!("write task ended: {}", e),
        ))
    })
}
