//! Offer history timeline.
//!
//! Turns an offer's event stream into the chronological rows the history
//! screen shows. Pure function over events; no storage concerns.

use chrono::{DateTime, Utc};

use tilbud_events::Event;

use crate::offer::OfferEvent;

/// One row in the history view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub summary: String,
}

/// Build the history timeline for an offer from its events, oldest first.
pub fn history(events: &[OfferEvent]) -> Vec<HistoryEntry> {
    events
        .iter()
        .map(|event| HistoryEntry {
            at: event.occurred_at(),
            summary: summarize(event),
        })
        .collect()
}

fn summarize(event: &OfferEvent) -> String {
    match event {
        OfferEvent::OfferCreated(e) => format!("Tilbud opprettet for {}", e.customer),
        OfferEvent::OfferDetailsUpdated(_) => "Detaljer oppdatert".to_string(),
        OfferEvent::LineItemAdded(e) => {
            format!("Varelinje lagt til: {} ({} stk)", e.name, e.quantity)
        }
        OfferEvent::LineItemQuantityChanged(e) => {
            format!("Antall endret til {}", e.quantity)
        }
        OfferEvent::LineItemRemoved(_) => "Varelinje fjernet".to_string(),
        OfferEvent::StatusChanged(e) => format!(
            "Status endret fra {} til {}",
            e.from.display().label,
            e.to.display().label
        ),
        OfferEvent::OfferDeleted(_) => "Tilbud slettet".to_string(),
    }
}
