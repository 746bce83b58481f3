//! Offer list read model.
//!
//! Maintains the rows the dashboard list shows: title, customer, status and
//! totals per offer. Totals are recomputed from the current line items via
//! `tilbud_pricing::compute_totals` on every change, never accumulated, so a
//! row can never drift from its line items.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use tilbud_events::EventEnvelope;
use tilbud_offers::{LineItem, OfferEvent, OfferId, OfferStatus};
use tilbud_pricing::{compute_totals, Totals};

/// Aggregate type this projection consumes.
pub const OFFER_AGGREGATE_TYPE: &str = "offers.offer";

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferListRow {
    pub offer_id: OfferId,
    pub title: String,
    pub customer: String,
    pub status: OfferStatus,
    pub totals: Totals,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize offer event: {0}")]
    Deserialize(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
    #[error("projection state lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
struct OfferState {
    title: String,
    customer: String,
    status: OfferStatus,
    items: Vec<LineItem>,
    updated_at: DateTime<Utc>,
    last_sequence: u64,
}

/// In-memory projection of offer events into dashboard rows.
#[derive(Debug, Default)]
pub struct OfferListProjection {
    offers: RwLock<HashMap<OfferId, OfferState>>,
}

impl OfferListProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one committed envelope.
    ///
    /// Envelopes for other aggregate types are skipped (with a warning);
    /// out-of-order delivery within an offer stream is an error.
    pub fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != OFFER_AGGREGATE_TYPE {
            tracing::warn!(
                aggregate_type = envelope.aggregate_type(),
                "offer list projection skipping foreign envelope"
            );
            return Ok(());
        }

        let event: OfferEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let mut offers = self.offers.write().map_err(|_| ProjectionError::Poisoned)?;

        let offer_id = OfferId::new(envelope.aggregate_id());
        let sequence = envelope.sequence_number();

        if let Some(state) = offers.get(&offer_id) {
            if sequence <= state.last_sequence {
                return Err(ProjectionError::NonMonotonicSequence {
                    last: state.last_sequence,
                    found: sequence,
                });
            }
        }

        match event {
            OfferEvent::OfferCreated(e) => {
                offers.insert(
                    offer_id,
                    OfferState {
                        title: e.title,
                        customer: e.customer,
                        status: OfferStatus::Draft,
                        items: Vec::new(),
                        updated_at: e.occurred_at,
                        last_sequence: sequence,
                    },
                );
            }
            OfferEvent::OfferDeleted(_) => {
                offers.remove(&offer_id);
            }
            other => {
                if let Some(state) = offers.get_mut(&offer_id) {
                    apply_to_state(state, &other);
                    state.last_sequence = sequence;
                }
            }
        }

        Ok(())
    }

    /// Row for a single offer, if it exists and is not deleted.
    pub fn get(&self, offer_id: OfferId) -> Option<OfferListRow> {
        let offers = self.offers.read().ok()?;
        offers.get(&offer_id).map(|state| make_row(offer_id, state))
    }

    /// All rows, most recently updated first.
    pub fn rows(&self) -> Vec<OfferListRow> {
        let offers = match self.offers.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        let mut rows: Vec<OfferListRow> = offers
            .iter()
            .map(|(&offer_id, state)| make_row(offer_id, state))
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows
    }

    /// Rows matching a status filter.
    pub fn rows_with_status(&self, status: OfferStatus) -> Vec<OfferListRow> {
        let mut rows = self.rows();
        rows.retain(|row| row.status == status);
        rows
    }
}

fn make_row(offer_id: OfferId, state: &OfferState) -> OfferListRow {
    OfferListRow {
        offer_id,
        title: state.title.clone(),
        customer: state.customer.clone(),
        status: state.status,
        totals: compute_totals(&state.items),
        updated_at: state.updated_at,
    }
}

fn apply_to_state(state: &mut OfferState, event: &OfferEvent) {
    match event {
        OfferEvent::OfferDetailsUpdated(e) => {
            state.title = e.title.clone();
            state.customer = e.customer.clone();
            state.updated_at = e.occurred_at;
        }
        OfferEvent::LineItemAdded(e) => {
            state.items.push(LineItem {
                id: e.item_id,
                line_no: e.line_no,
                template_id: e.template_id,
                name: e.name.clone(),
                unit_price: e.unit_price,
                quantity: e.quantity,
            });
            state.updated_at = e.occurred_at;
        }
        OfferEvent::LineItemQuantityChanged(e) => {
            if let Some(item) = state.items.iter_mut().find(|item| item.id == e.item_id) {
                item.quantity = e.quantity;
            }
            state.updated_at = e.occurred_at;
        }
        OfferEvent::LineItemRemoved(e) => {
            state.items.retain(|item| item.id != e.item_id);
            state.updated_at = e.occurred_at;
        }
        OfferEvent::StatusChanged(e) => {
            state.status = e.to;
            state.updated_at = e.occurred_at;
        }
        OfferEvent::OfferCreated(_) | OfferEvent::OfferDeleted(_) => {
            // Handled by the caller before reaching here.
        }
    }
}
