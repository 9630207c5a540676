//! Link session state machine.
//!
//! Replaces the original timer-driven connection flow with an explicit FSM.
//! All timing comes from an injectable [`Clock`] and all nondeterminism from
//! a caller-supplied `Rng`, so delays and failure injection are tunable and
//! every transition is reproducible under test.
//!
//! ```text
//! Idle ──begin_linking──▶ Linking ──scan + delay──▶ Linked
//!                           │  │                       │
//!          codes exhausted  │  │ (injected failure)    │ last device removed
//!                           ▼  ▼                       ▼
//!                     Expired  Failed                Idle
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::link::qr::QrRotation;
use crate::types::{Event, EventHandler, LinkedDevice, Platform};

/// Location stamped onto simulated devices.
pub const DEFAULT_LOCATION: &str = "New York, USA";

/// Time source for the session. Production uses [`SystemClock`]; tests inject
/// a manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// States of the link session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Idle,
    Linking,
    Linked,
    Expired,
    Failed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkState::Idle => "idle",
            LinkState::Linking => "linking",
            LinkState::Linked => "linked",
            LinkState::Expired => "expired",
            LinkState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tunables for the linking flow.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Simulated handshake time between scan and completion.
    pub connect_delay: Duration,
    /// How long the first code of a batch stays scannable.
    pub qr_initial_ttl: Duration,
    /// How long each rotated code stays scannable.
    pub qr_rotate_ttl: Duration,
    /// Probability in `[0, 1]` that a handshake is failed on purpose.
    pub failure_probability: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_secs(3),
            qr_initial_ttl: Duration::from_secs(60),
            qr_rotate_ttl: Duration::from_secs(20),
            failure_probability: 0.1,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("a link attempt is already in progress")]
    AlreadyLinking,
    #[error("no link in progress; call `begin_linking` first")]
    NotLinking,
    #[error("no linked device with id {0}")]
    UnknownDevice(String),
}

/// The link session: state machine plus linked-device registry.
pub struct LinkSession<C: Clock = SystemClock> {
    config: LinkConfig,
    clock: C,
    state: LinkState,
    qr: Option<QrRotation>,
    scan_deadline: Option<DateTime<Utc>>,
    link_deadline: Option<DateTime<Utc>>,
    pending_device_name: Option<String>,
    devices: Vec<LinkedDevice>,
    handlers: Vec<EventHandler>,
}

impl LinkSession<SystemClock> {
    /// Create a session on wall-clock time.
    pub fn new(config: LinkConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LinkSession<C> {
    /// Create a session with an injected clock.
    pub fn with_clock(config: LinkConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: LinkState::Idle,
            qr: None,
            scan_deadline: None,
            link_deadline: None,
            pending_device_name: None,
            devices: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Register an event handler.
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Linked devices, newest first.
    pub fn devices(&self) -> &[LinkedDevice] {
        &self.devices
    }

    /// The link code currently on display, if a link is in progress.
    pub fn current_code(&self) -> Option<&str> {
        if self.state == LinkState::Linking {
            self.qr.as_ref().map(|qr| qr.current_code())
        } else {
            None
        }
    }

    /// Start a linking attempt and return the first code to display.
    ///
    /// Allowed from every state except `Linking`; linking again while
    /// `Linked` pairs an additional device.
    pub fn begin_linking<R: Rng>(&mut self, rng: &mut R) -> Result<String, LinkError> {
        if self.state == LinkState::Linking {
            return Err(LinkError::AlreadyLinking);
        }

        let rotation = QrRotation::generate(rng);
        let code = rotation.current_code().to_string();
        let ttl = self.config.qr_initial_ttl;

        self.qr = Some(rotation);
        self.scan_deadline = Some(self.clock.now() + to_delta(ttl));
        self.link_deadline = None;
        self.pending_device_name = None;
        self.set_state(LinkState::Linking);
        self.emit(Event::QrIssued {
            data: code.clone(),
            timeout: ttl,
        });

        Ok(code)
    }

    /// Record a scan of the current code and start the simulated handshake.
    pub fn scan(&mut self, device_name: impl Into<String>) -> Result<(), LinkError> {
        if self.state != LinkState::Linking {
            return Err(LinkError::NotLinking);
        }
        if self.link_deadline.is_some() {
            return Err(LinkError::AlreadyLinking);
        }

        self.pending_device_name = Some(device_name.into());
        self.link_deadline = Some(self.clock.now() + to_delta(self.config.connect_delay));
        self.scan_deadline = None;
        debug!("link code scanned, handshake in progress");
        Ok(())
    }

    /// Advance the machine against the clock. Call periodically while a link
    /// is in progress; a no-op in every other state.
    pub fn poll<R: Rng>(&mut self, rng: &mut R) -> LinkState {
        if self.state != LinkState::Linking {
            return self.state;
        }
        let now = self.clock.now();

        if let Some(deadline) = self.link_deadline {
            if now >= deadline {
                self.finish_handshake(rng, now);
            }
            return self.state;
        }

        if let Some(deadline) = self.scan_deadline {
            if now >= deadline {
                self.rotate_code(now);
            }
        }

        self.state
    }

    /// Log out a linked device. Removing the last device returns the session
    /// to `Idle`.
    pub fn disconnect(&mut self, id: &str) -> Result<(), LinkError> {
        let position = self
            .devices
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| LinkError::UnknownDevice(id.to_string()))?;

        let device = self.devices.remove(position);
        info!("device {} ({}) logged out", device.name, device.id);
        self.emit(Event::DeviceRemoved { id: device.id });

        if self.devices.is_empty() && self.state == LinkState::Linked {
            self.set_state(LinkState::Idle);
        }
        Ok(())
    }

    fn finish_handshake<R: Rng>(&mut self, rng: &mut R, now: DateTime<Utc>) {
        self.link_deadline = None;
        self.qr = None;

        if rng.gen::<f64>() < self.config.failure_probability {
            info!("injected link failure");
            self.pending_device_name = None;
            self.set_state(LinkState::Failed);
            return;
        }

        let name = self.pending_device_name.take().unwrap_or_default();
        let platform = Platform::ALL[rng.gen_range(0..Platform::ALL.len())];
        let device = LinkedDevice::new(name, platform, DEFAULT_LOCATION, now);
        info!("device {} linked on {}", device.name, device.platform);

        self.devices.insert(0, device.clone());
        self.set_state(LinkState::Linked);
        self.emit(Event::DeviceLinked(device));
    }

    fn rotate_code(&mut self, now: DateTime<Utc>) {
        let rotated = match self.qr.as_mut() {
            Some(qr) => qr.advance(),
            None => false,
        };

        if rotated {
            let ttl = self.config.qr_rotate_ttl;
            self.scan_deadline = Some(now + to_delta(ttl));
            let data = self
                .qr
                .as_ref()
                .map(|qr| qr.current_code().to_string())
                .unwrap_or_default();
            self.emit(Event::QrIssued { data, timeout: ttl });
        } else {
            self.qr = None;
            self.scan_deadline = None;
            self.set_state(LinkState::Expired);
        }
    }

    fn set_state(&mut self, to: LinkState) {
        let from = self.state;
        if from != to {
            debug!("link state {from} -> {to}");
            self.state = to;
            self.emit(Event::LinkStateChanged { from, to });
        }
    }

    fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

fn to_delta(duration: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(duration.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::qr::CODE_BATCH;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(Utc::now())),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + to_delta(duration);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn config(failure_probability: f64) -> LinkConfig {
        LinkConfig {
            connect_delay: Duration::from_secs(3),
            qr_initial_ttl: Duration::from_secs(60),
            qr_rotate_ttl: Duration::from_secs(20),
            failure_probability,
        }
    }

    #[test]
    fn scan_then_delay_links_a_device() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(0.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        let code = session.begin_linking(&mut rng).unwrap();
        assert!(!code.is_empty());
        assert_eq!(session.state(), LinkState::Linking);

        session.scan("My Browser").unwrap();
        assert_eq!(session.poll(&mut rng), LinkState::Linking);

        clock.advance(Duration::from_secs(3));
        assert_eq!(session.poll(&mut rng), LinkState::Linked);
        assert_eq!(session.devices().len(), 1);
        assert_eq!(session.devices()[0].name, "My Browser");
        assert_eq!(session.devices()[0].location, DEFAULT_LOCATION);
    }

    #[test]
    fn certain_failure_injection_fails_the_handshake() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(1.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        session.begin_linking(&mut rng).unwrap();
        session.scan("My Browser").unwrap();
        clock.advance(Duration::from_secs(3));

        assert_eq!(session.poll(&mut rng), LinkState::Failed);
        assert!(session.devices().is_empty());
    }

    #[test]
    fn unscanned_codes_rotate_then_expire() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(0.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        let first = session.begin_linking(&mut rng).unwrap();

        clock.advance(Duration::from_secs(60));
        assert_eq!(session.poll(&mut rng), LinkState::Linking);
        assert_ne!(session.current_code().unwrap(), first);

        // Burn through the remaining rotations.
        for _ in 0..CODE_BATCH - 2 {
            clock.advance(Duration::from_secs(20));
            assert_eq!(session.poll(&mut rng), LinkState::Linking);
        }
        clock.advance(Duration::from_secs(20));
        assert_eq!(session.poll(&mut rng), LinkState::Expired);
        assert!(session.current_code().is_none());
    }

    #[test]
    fn scan_requires_a_link_in_progress() {
        let mut session = LinkSession::with_clock(config(0.0), ManualClock::new());
        assert_eq!(session.scan("X").unwrap_err(), LinkError::NotLinking);
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut session = LinkSession::with_clock(config(0.0), ManualClock::new());
        let mut rng = StdRng::seed_from_u64(7);
        session.begin_linking(&mut rng).unwrap();
        assert_eq!(
            session.begin_linking(&mut rng).unwrap_err(),
            LinkError::AlreadyLinking
        );
    }

    #[test]
    fn removing_last_device_returns_to_idle() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(0.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        session.begin_linking(&mut rng).unwrap();
        session.scan("A").unwrap();
        clock.advance(Duration::from_secs(3));
        session.poll(&mut rng);

        let id = session.devices()[0].id.clone();
        session.disconnect(&id).unwrap();
        assert_eq!(session.state(), LinkState::Idle);
        assert!(session.devices().is_empty());

        assert!(matches!(
            session.disconnect(&id),
            Err(LinkError::UnknownDevice(_))
        ));
    }

    #[test]
    fn retry_after_failure_can_link() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(1.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        session.begin_linking(&mut rng).unwrap();
        session.scan("A").unwrap();
        clock.advance(Duration::from_secs(3));
        assert_eq!(session.poll(&mut rng), LinkState::Failed);

        session.config.failure_probability = 0.0;
        session.begin_linking(&mut rng).unwrap();
        session.scan("A").unwrap();
        clock.advance(Duration::from_secs(3));
        assert_eq!(session.poll(&mut rng), LinkState::Linked);
    }

    #[test]
    fn state_changes_are_emitted() {
        let clock = ManualClock::new();
        let mut session = LinkSession::with_clock(config(0.0), clock.clone());
        let mut rng = StdRng::seed_from_u64(7);

        let seen: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

        session.begin_linking(&mut rng).unwrap();
        session.scan("A").unwrap();
        clock.advance(Duration::from_secs(3));
        session.poll(&mut rng);

        let events = seen.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::QrIssued { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::DeviceLinked(_))));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::LinkStateChanged {
                from: LinkState::Linking,
                to: LinkState::Linked,
            }
        )));
    }
}
