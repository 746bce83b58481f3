//! Offer status lifecycle: canonical set, transition guard, display metadata.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tilbud_core::DomainError;

/// Offer status lifecycle (canonical set, no dynamic extension).
///
/// The wire form is SCREAMING_SNAKE_CASE (`"DRAFT"`, ...). The deprecated
/// four-value lowercase set some stored records still carry is accepted on
/// the way in via [`OfferStatus::from_legacy`] and never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Draft,
    Pending,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl OfferStatus {
    pub const ALL: [OfferStatus; 6] = [
        OfferStatus::Draft,
        OfferStatus::Pending,
        OfferStatus::Accepted,
        OfferStatus::Rejected,
        OfferStatus::Expired,
        OfferStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Draft => "DRAFT",
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Expired => "EXPIRED",
            OfferStatus::Completed => "COMPLETED",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Completed)
    }

    /// Label + color metadata for status chips and filters.
    pub fn display(&self) -> StatusDisplay {
        match self {
            OfferStatus::Draft => StatusDisplay::new("Utkast", ColorToken::Default),
            OfferStatus::Pending => StatusDisplay::new("Avventer", ColorToken::Warning),
            OfferStatus::Accepted => StatusDisplay::new("Akseptert", ColorToken::Success),
            OfferStatus::Rejected => StatusDisplay::new("Avslått", ColorToken::Error),
            OfferStatus::Expired => StatusDisplay::new("Utløpt", ColorToken::Default),
            OfferStatus::Completed => StatusDisplay::new("Fullført", ColorToken::Info),
        }
    }

    /// Map a value from the deprecated lowercase status set.
    ///
    /// `"sent"` had no counterpart when the canonical set was introduced;
    /// a sent offer is one awaiting an answer, hence `Pending`.
    pub fn from_legacy(value: &str) -> Option<OfferStatus> {
        match value {
            "draft" => Some(OfferStatus::Draft),
            "sent" => Some(OfferStatus::Pending),
            "accepted" => Some(OfferStatus::Accepted),
            "rejected" => Some(OfferStatus::Rejected),
            _ => None,
        }
    }

    /// Parse canonical form first, then the legacy set.
    pub fn parse_lenient(value: &str) -> Option<OfferStatus> {
        value
            .parse()
            .ok()
            .or_else(|| OfferStatus::from_legacy(value))
    }
}

impl core::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OfferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(OfferStatus::Draft),
            "PENDING" => Ok(OfferStatus::Pending),
            "ACCEPTED" => Ok(OfferStatus::Accepted),
            "REJECTED" => Ok(OfferStatus::Rejected),
            "EXPIRED" => Ok(OfferStatus::Expired),
            "COMPLETED" => Ok(OfferStatus::Completed),
            other => Err(DomainError::validation(format!(
                "unknown offer status: {other:?}"
            ))),
        }
    }
}

/// Semantic color category for a status chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Success,
    Warning,
    Error,
    Info,
    Default,
}

/// Display metadata for one status: localized label + color token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub color: ColorToken,
}

impl StatusDisplay {
    /// Fallback row for raw values no status matches.
    pub const UNKNOWN: StatusDisplay = StatusDisplay {
        label: "Ukjent",
        color: ColorToken::Default,
    };

    const fn new(label: &'static str, color: ColorToken) -> Self {
        Self { label, color }
    }

    /// Display metadata for a raw status string from the boundary.
    ///
    /// Unrecognized values render as "Ukjent" rather than failing; stored
    /// records predating the canonical set must still display.
    pub fn for_raw(value: &str) -> StatusDisplay {
        OfferStatus::parse_lenient(value)
            .map(|s| s.display())
            .unwrap_or(StatusDisplay::UNKNOWN)
    }
}

/// Rejected status change: the requested transition is not legal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal status transition {from} -> {to}: {reason}")]
pub struct TransitionError {
    pub from: OfferStatus,
    pub to: OfferStatus,
    pub reason: &'static str,
}

impl From<TransitionError> for DomainError {
    fn from(value: TransitionError) -> Self {
        DomainError::invariant(value.to_string())
    }
}

/// Validate a requested status change against the transition rules.
///
/// Rules: `Completed` is terminal, and an offer only completes from
/// `Accepted`. Every other pair is legal, self-transitions included.
pub fn validate_transition(
    current: OfferStatus,
    requested: OfferStatus,
) -> Result<OfferStatus, TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError {
            from: current,
            to: requested,
            reason: "completed offers are final",
        });
    }
    if requested == OfferStatus::Completed && current != OfferStatus::Accepted {
        return Err(TransitionError {
            from: current,
            to: requested,
            reason: "only accepted offers can be completed",
        });
    }
    Ok(requested)
}
