//! Events emitted by the link session and the traffic simulator.
//!
//! Handlers are registered on the emitting component and invoked inline on
//! the calling thread.

use std::time::Duration;

use crate::link::LinkState;
use crate::types::LinkedDevice;

/// Event handler type.
pub type EventHandler = Box<dyn Fn(&Event) + Send + Sync>;

/// All observable events.
#[derive(Debug, Clone)]
pub enum Event {
    /// A link code is ready to display.
    QrIssued {
        /// The QR payload string
        data: String,
        /// How long the code stays scannable
        timeout: Duration,
    },
    /// The link session moved between states.
    LinkStateChanged { from: LinkState, to: LinkState },
    /// A device finished linking.
    DeviceLinked(LinkedDevice),
    /// A device was logged out.
    DeviceRemoved { id: String },
    /// The simulator fabricated an incoming message.
    MessageReceived {
        /// Activity log entry id
        id: String,
        from: String,
        text: String,
    },
    /// A pending log entry resolved with reply text.
    ReplyResolved { id: String, reply: String },
}
