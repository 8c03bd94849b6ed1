//! Topic-based event bus for runtime events.
//!
//! Events are published to specific topics, and consumers subscribe only to
//! the topics they need: the transport listens to [`Topic::Replication`],
//! persistence to [`Topic::World`].

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{Envelope, WorldEvent};
