//! `tilbud-infra` — infrastructure for the offer domain.
//!
//! In-memory event store, the command dispatch pipeline, and read-model
//! projections. Domain crates stay pure; everything here composes them
//! behind traits so storage backends can be swapped without touching
//! business rules.

pub mod dispatcher;
pub mod event_store;
pub mod projections;

pub use dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
pub use projections::offer_list::{OfferListProjection, OfferListRow, ProjectionError};
