//! AutoReply Pro: WhatsApp auto-reply assistant core.
//!
//! Implements the logic behind the product's three tabs: a Gemini-backed
//! reply generator, a device-link session with an explicit state machine,
//! and a traffic simulator feeding a keyed activity log.
//!
//! ## Modules
//!
//! - `config` - business profile and credential holders
//! - `gemini` - prompt construction and the generateContent REST client
//! - `generator` - reply operations and the classified error taxonomy
//! - `link` - QR link codes and the link-session state machine
//! - `monitor` - activity log and incoming-traffic simulator
//! - `types` - shared domain types and events

pub mod config;
pub mod gemini;
pub mod generator;
pub mod link;
pub mod monitor;
pub mod types;

pub use config::{CloudConfig, GeneratorConfig, ReplyType};
pub use gemini::GeminiClient;
pub use generator::{
    ReplyBackend, ReplyError, ReplyGenerator, DEFAULT_REPLY_FALLBACK, DYNAMIC_REPLY_FALLBACK,
};
pub use link::{LinkConfig, LinkError, LinkSession, LinkState};
pub use monitor::{ActivityLog, ActivityLogEntry, LogSource, Simulator, SimulatorError};
pub use types::{Event, LinkedDevice, Platform};
