//! Activity simulator.
//!
//! Fabricates incoming customer messages, appends pending log entries, and
//! resolves them with generated replies. Generation runs off-thread so
//! several entries may be in flight at once; completion order is not
//! guaranteed and each completion is applied by entry id.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::debug;
use rand::Rng;
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::generator::ReplyGenerator;
use crate::monitor::log::{ActivityLog, LogSource};
use crate::types::{Event, EventHandler};

/// Customer questions the simulator picks from, uniformly at random.
pub const SCENARIOS: [&str; 6] = [
    "How much does a logo design cost?",
    "Can I schedule a meeting for next Tuesday?",
    "What are your agency hours today?",
    "I have a problem with my current project.",
    "Do you provide social media management services?",
    "Hi, can I speak to the manager about an urgent matter?",
];

/// Interval between timer-driven triggers while the simulator is active.
pub const SIMULATION_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("no linked device; connect before simulating traffic")]
    NotConnected,
}

/// Fabricates incoming traffic and records generator results.
pub struct Simulator {
    generator: ReplyGenerator,
    config: GeneratorConfig,
    log: ActivityLog,
    active: bool,
    connected: bool,
    in_flight: usize,
    completion_tx: mpsc::Sender<(String, String)>,
    completion_rx: mpsc::Receiver<(String, String)>,
    handlers: Vec<EventHandler>,
}

impl Simulator {
    pub fn new(generator: ReplyGenerator, config: GeneratorConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            generator,
            config,
            log: ActivityLog::new(),
            active: false,
            connected: false,
            in_flight: 0,
            completion_tx,
            completion_rx,
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

    /// Replace the configuration used for subsequent triggers. Entries
    /// already in flight keep the configuration they were started with.
    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The activity log, newest entries first.
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Discard all recorded entries.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Enable timer-driven triggering (takes effect on the next tick).
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop timer-driven triggering. In-flight replies still resolve.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mirror of the link session's connection flag; triggers are rejected
    /// while false.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Number of entries awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Fabricate one incoming message and start resolving it off-thread.
    /// Returns the new entry's id.
    pub fn trigger<R: Rng>(
        &mut self,
        rng: &mut R,
        source: LogSource,
    ) -> Result<String, SimulatorError> {
        let incoming = SCENARIOS[rng.gen_range(0..SCENARIOS.len())];
        self.trigger_with(incoming, rng, source)
    }

    /// Like [`Simulator::trigger`] but with a caller-chosen message.
    pub fn trigger_with<R: Rng>(
        &mut self,
        incoming: &str,
        rng: &mut R,
        source: LogSource,
    ) -> Result<String, SimulatorError> {
        if !self.connected {
            return Err(SimulatorError::NotConnected);
        }

        let from = synthesize_sender(rng);
        let id = self
            .log
            .push_pending(&from, incoming, source, Utc::now());
        debug!("incoming message {id} from {from}");
        self.emit(Event::MessageReceived {
            id: id.clone(),
            from,
            text: incoming.to_string(),
        });

        let generator = self.generator.clone();
        let config = self.config.clone();
        let incoming = incoming.to_string();
        let tx = self.completion_tx.clone();
        let entry_id = id.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            // Never fails; errors arrive as classified reply text.
            let reply = generator.generate_reply_to(&incoming, &config);
            let _ = tx.send((entry_id, reply));
        });

        Ok(id)
    }

    /// Apply any completions that have arrived, without blocking. Returns the
    /// number of entries resolved.
    pub fn poll_completions(&mut self) -> usize {
        let mut resolved = 0;
        while let Ok((id, reply)) = self.completion_rx.try_recv() {
            self.apply_completion(id, reply);
            resolved += 1;
        }
        resolved
    }

    /// Block until every in-flight reply has resolved.
    pub fn drain(&mut self) {
        while self.in_flight > 0 {
            match self.completion_rx.recv() {
                Ok((id, reply)) => self.apply_completion(id, reply),
                Err(_) => break,
            }
        }
    }

    /// One step of the interval driver: apply completions, then trigger a new
    /// message if the simulator is active and connected.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> Option<String> {
        self.poll_completions();
        if self.active && self.connected {
            self.trigger(rng, LogSource::Simulator).ok()
        } else {
            None
        }
    }

    fn apply_completion(&mut self, id: String, reply: String) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.log.resolve(&id, &reply) {
            self.emit(Event::ReplyResolved { id, reply });
        }
    }

    fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

/// Synthesize a sender in the `+1 (555) NNN-NNNN` template.
fn synthesize_sender<R: Rng>(rng: &mut R) -> String {
    format!(
        "+1 (555) {:03}-{:04}",
        rng.gen_range(100..1000),
        rng.gen_range(1000..10000)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::prompt::GenerationRequest;
    use crate::generator::{ReplyBackend, ReplyError};
    use crate::monitor::log::PENDING_REPLY;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    struct EchoBackend;

    impl ReplyBackend for EchoBackend {
        fn generate(&self, request: &GenerationRequest) -> Result<String, ReplyError> {
            Ok(format!("reply to: {}", request.user_content))
        }
    }

    struct FailingBackend;

    impl ReplyBackend for FailingBackend {
        fn generate(&self, _request: &GenerationRequest) -> Result<String, ReplyError> {
            Err(ReplyError::RateLimited)
        }
    }

    fn simulator(backend: Arc<dyn ReplyBackend>) -> Simulator {
        let generator = ReplyGenerator::new(backend);
        let mut sim = Simulator::new(generator, GeneratorConfig::default());
        sim.set_connected(true);
        sim
    }

    #[test]
    fn trigger_requires_connection() {
        let mut sim = simulator(Arc::new(EchoBackend));
        sim.set_connected(false);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            sim.trigger(&mut rng, LogSource::Manual).unwrap_err(),
            SimulatorError::NotConnected
        );
    }

    #[test]
    fn trigger_appends_pending_then_drain_resolves() {
        let mut sim = simulator(Arc::new(EchoBackend));
        let mut rng = StdRng::seed_from_u64(3);

        let id = sim.trigger(&mut rng, LogSource::Simulator).unwrap();
        let entry = sim.log().get(&id).unwrap();
        assert_eq!(entry.outbound_reply, PENDING_REPLY);
        assert!(SCENARIOS.contains(&entry.incoming_message.as_str()));
        assert!(entry.from.starts_with("+1 (555) "));

        sim.drain();
        let entry = sim.log().get(&id).unwrap();
        assert!(!entry.is_pending());
        assert!(entry.outbound_reply.starts_with("reply to:"));
        assert_eq!(sim.in_flight(), 0);
    }

    #[test]
    fn multiple_entries_may_be_pending_concurrently() {
        let mut sim = simulator(Arc::new(EchoBackend));
        let mut rng = StdRng::seed_from_u64(3);

        let a = sim.trigger(&mut rng, LogSource::Simulator).unwrap();
        let b = sim.trigger(&mut rng, LogSource::Simulator).unwrap();
        assert_ne!(a, b);
        assert_eq!(sim.in_flight(), 2);

        sim.drain();
        assert_eq!(sim.log().pending_count(), 0);
        assert_eq!(sim.log().len(), 2);
    }

    #[test]
    fn backend_failure_resolves_with_classified_text() {
        let mut sim = simulator(Arc::new(FailingBackend));
        let mut rng = StdRng::seed_from_u64(3);

        let id = sim
            .trigger_with("How much does a logo cost?", &mut rng, LogSource::Manual)
            .unwrap();
        sim.drain();

        let entry = sim.log().get(&id).unwrap();
        assert_eq!(entry.outbound_reply, ReplyError::RateLimited.to_string());
    }

    #[test]
    fn tick_only_triggers_while_active_and_connected() {
        let mut sim = simulator(Arc::new(EchoBackend));
        let mut rng = StdRng::seed_from_u64(3);

        assert!(sim.tick(&mut rng).is_none());

        sim.start();
        assert!(sim.tick(&mut rng).is_some());

        sim.stop();
        assert!(sim.tick(&mut rng).is_none());

        sim.drain();
    }

    #[test]
    fn resolved_events_are_emitted() {
        let mut sim = simulator(Arc::new(EchoBackend));
        let seen: Arc<std::sync::Mutex<Vec<Event>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sim.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

        let mut rng = StdRng::seed_from_u64(3);
        sim.trigger(&mut rng, LogSource::Manual).unwrap();
        sim.drain();

        let events = seen.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::MessageReceived { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ReplyResolved { .. })));
    }
}
