//! Authoritative battle host.
//!
//! This crate owns every live [`Encounter`](battle_core::Encounter) on one
//! simulation worker task and drives them at a fixed tick rate. Consumers embed
//! [`Runtime`] and talk to it through the cloneable [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based bus for replication and world events
//! - [`world`] bridges battle callbacks onto the bus
//! - [`workers`] keeps the simulation task internal to the crate
pub mod api;
pub mod events;
pub mod runtime;
pub mod world;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use events::{Envelope, Event, EventBus, Topic, WorldEvent};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use world::EventWorld;
