//! Structured logging for NestForge.
//!
//! Console output for interactive runs, optional JSON file rotation for
//! deployments. Components log through `tracing` with subsystem targets
//! (`seatalk`, `sessions_spawn`, …) so the env filter can scope them.

pub mod logger;

pub use logger::init_logger;
