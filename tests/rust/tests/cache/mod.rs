//! Group Cache Integration Tests
//!
//! Cache behavior against a counting mock directory, and invalidation driven
//! by admin events on the event bus.
