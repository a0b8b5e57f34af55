//! Client session state: who is signed in, and the gate protected views use.

pub mod gate;
pub mod manager;

pub use gate::{require_identity, Gated, LOGIN_REQUIRED_MESSAGE};
pub use manager::{SessionHandle, SessionWatch};
