//! Command execution pipeline (application-level orchestration).
//!
//! The same lifecycle applies to every event-sourced aggregate: load the
//! stream, rehydrate state, let the aggregate decide, append the decided
//! events with an optimistic concurrency check. Centralizing it here keeps
//! the domain crates free of storage concerns and every caller consistent.
//!
//! ```text
//! Command
//!   -> load events from store
//!   -> rehydrate aggregate (apply history)
//!   -> handle command (pure decision logic, produces events)
//!   -> append events (append-only, optimistic concurrency check)
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use tilbud_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale aggregate version).
    Concurrency(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain-level not found.
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the event store so tests run against
/// [`crate::InMemoryEventStore`] and a real backend can be swapped in
/// without touching domain code.
///
/// Aggregates used with the dispatcher must be deterministic and
/// side-effect free, and must track their version in `apply()` (one per
/// event) for the optimistic concurrency check to hold.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Dispatch a command through the full event-sourcing pipeline.
    ///
    /// The `make_aggregate` closure constructs a fresh instance for
    /// rehydration (e.g. `Offer::empty(id)`), keeping the dispatcher
    /// generic over aggregate types.
    ///
    /// Returns the committed events (with assigned sequence numbers). On a
    /// concurrent modification the append fails with
    /// [`DispatchError::Concurrency`]; callers retry by re-executing the
    /// command or surface a conflict.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: tilbud_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Even a buggy backend must not feed us another aggregate's events or a
    // reordered stream.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!("loaded stream contains wrong aggregate_id at index {idx}"),
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use tilbud_core::{AggregateRoot, Money};
    use tilbud_offers::{
        AddLineItem, ChangeStatus, CreateOffer, LineItemId, Offer, OfferCommand, OfferId,
        OfferStatus,
    };
    use tilbud_templates::{
        CreateTemplate, ItemTemplate, TemplateCommand, TemplateId,
    };

    use crate::event_store::InMemoryEventStore;

    const OFFER_TYPE: &str = "offers.offer";
    const TEMPLATE_TYPE: &str = "templates.template";

    fn dispatcher() -> CommandDispatcher<InMemoryEventStore> {
        CommandDispatcher::new(InMemoryEventStore::new())
    }

    fn rehydrate_offer(store: &impl EventStore, offer_id: OfferId) -> Offer {
        let mut offer = Offer::empty(offer_id);
        let history = store.load_stream(offer_id.0).unwrap();
        apply_history::<Offer>(&mut offer, &history).unwrap();
        offer
    }

    #[test]
    fn dispatch_persists_decided_events() {
        let dispatcher = dispatcher();
        let offer_id = OfferId::new(tilbud_core::AggregateId::new());

        let committed = dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::CreateOffer(CreateOffer {
                    offer_id,
                    title: "Skifte tak".to_string(),
                    customer: "Berg Eiendom AS".to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].event_type, "offers.offer.created");
    }

    #[test]
    fn dispatch_rehydrates_before_handling() {
        let dispatcher = dispatcher();
        let offer_id = OfferId::new(tilbud_core::AggregateId::new());

        dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::CreateOffer(CreateOffer {
                    offer_id,
                    title: "Skifte tak".to_string(),
                    customer: "Berg Eiendom AS".to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap();

        dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::AddLineItem(AddLineItem {
                    offer_id,
                    item_id: LineItemId::new(tilbud_core::AggregateId::new()),
                    template_id: None,
                    name: "Takstein".to_string(),
                    unit_price: Money::from_nok(45),
                    quantity: 400,
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap();

        dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::ChangeStatus(ChangeStatus {
                    offer_id,
                    to: OfferStatus::Pending,
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap();

        let offer = rehydrate_offer(dispatcher.store(), offer_id);
        assert_eq!(offer.status(), OfferStatus::Pending);
        assert_eq!(offer.items().len(), 1);
        assert_eq!(offer.version(), 3);
    }

    #[test]
    fn domain_rejection_persists_nothing() {
        let dispatcher = dispatcher();
        let offer_id = OfferId::new(tilbud_core::AggregateId::new());

        // Status change on a never-created offer.
        let err = dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::ChangeStatus(ChangeStatus {
                    offer_id,
                    to: OfferStatus::Pending,
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        assert!(dispatcher
            .store()
            .load_stream(offer_id.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn illegal_transition_maps_to_invariant_violation() {
        let dispatcher = dispatcher();
        let offer_id = OfferId::new(tilbud_core::AggregateId::new());

        dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::CreateOffer(CreateOffer {
                    offer_id,
                    title: "Membran".to_string(),
                    customer: "Vik Borettslag".to_string(),
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap();

        let err = dispatcher
            .dispatch(
                offer_id.0,
                OFFER_TYPE,
                OfferCommand::ChangeStatus(ChangeStatus {
                    offer_id,
                    to: OfferStatus::Completed,
                    occurred_at: Utc::now(),
                }),
                |id| Offer::empty(OfferId::new(id)),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvariantViolation(_)));
    }

    #[test]
    fn template_commands_run_through_the_same_pipeline() {
        let dispatcher = dispatcher();
        let template_id = TemplateId::new(tilbud_core::AggregateId::new());

        let committed = dispatcher
            .dispatch(
                template_id.0,
                TEMPLATE_TYPE,
                TemplateCommand::CreateTemplate(CreateTemplate {
                    template_id,
                    name: "Timepris montør".to_string(),
                    unit_price: Money::from_nok(890),
                    occurred_at: Utc::now(),
                }),
                |id| ItemTemplate::empty(TemplateId::new(id)),
            )
            .unwrap();

        assert_eq!(committed[0].event_type, "templates.template.created");
    }
}
