//! Device linking.
//!
//! - `qr` - link-code generation, rotation, and ASCII rendering
//! - `session` - the link state machine and linked-device registry

pub mod qr;
pub mod session;

pub use qr::{render_qr_ascii, QrError, QrRotation};
pub use session::{Clock, LinkConfig, LinkError, LinkSession, LinkState, SystemClock};
