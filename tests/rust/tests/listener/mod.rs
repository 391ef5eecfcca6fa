//! Event Listener Integration Tests
//!
//! Drives the listener through the in-memory transport with tokio's paused
//! clock, so dedup windows elapse instantly and deterministically.

mod coalescing;
mod delivery;
mod lifecycle;
