//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger → broadcast → HTTP server stops accepting → in-flight requests drain
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) → Shutdown::trigger
//! ```
//!
//! The refresh worker is not part of this flow; it stops when its engine is dropped.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
