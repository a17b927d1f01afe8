//! # beacon-core
//!
//! Subscription registry, event routing, and fan-out for the beacon
//! signaling relay.
//!
//! Every inbound lifecycle or message event is handled by an independent
//! unit of execution; the units share nothing but the externally
//! persisted registry, so any of them can run on any process at any
//! time. The building blocks:
//!
//! - **Registry** - durable topic ↔ connection mapping over a
//!   [`beacon_store::SetStore`]
//! - **SignalRouter** - stateless per-event dispatcher
//! - **Broadcaster** - concurrent fan-out via the [`Pusher`] seam
//! - **Sweeper** - reclaims registry state for dead connections
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌──────────────┐     ┌─────────────┐
//! │   event    │────▶│ SignalRouter │────▶│  Registry   │──▶ SetStore
//! └───────────┘     └──────┬───────┘     └─────────────┘
//!                          │                    ▲
//!                          ▼                    │ reap
//!                   ┌─────────────┐      ┌──────┴──────┐
//!                   │ Broadcaster │─────▶│   Sweeper   │
//!                   └─────────────┘ stale└─────────────┘
//! ```

pub mod broadcast;
pub mod push;
pub mod registry;
pub mod router;
pub mod sweeper;
pub mod topic;

pub use broadcast::{Broadcaster, Delivery};
pub use push::{ConnectionId, PushError, Pusher};
pub use registry::{Registry, RegistryConfig};
pub use router::{EventError, EventOutcome, SignalEvent, SignalRouter};
pub use sweeper::Sweeper;
pub use topic::validate_topic_name;
