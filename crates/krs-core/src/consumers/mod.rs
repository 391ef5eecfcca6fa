//! Event Consumers - admin event reactions
//!
//! Consumers subscribe to the `EventBus` (or are plugged straight into the
//! listener as its handler) and react to admin events:
//!
//! - **GroupCacheInvalidator**: drops cached group membership when Keycloak
//!   reports group or membership changes
//!
//! ```text
//! ┌──────────────────────────────┐
//! │      EventBus (AdminEvent)   │
//! └──────────────────────────────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!  ┌─────────────┐   ┌──────────┐
//!  │ GroupCache  │   │  CLI     │
//!  │ Invalidator │   │  printer │
//!  └─────────────┘   └──────────┘
//! ```

mod cache_invalidator;

pub use cache_invalidator::{GroupCacheInvalidator, Invalidation};
