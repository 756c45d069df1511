//! Mock implementations for testing.
//!
//! These let the request executor and the services run against scripted
//! responses without network I/O.

mod auth;
mod transport;

pub use auth::MockAuthProvider;
pub use transport::{MockResponse, MockTransport};
