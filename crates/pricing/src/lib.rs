//! Offer pricing module.
//!
//! The single place offer totals are computed. Every reader of an offer's
//! numbers (summary screen, export, dashboard rows) goes through
//! [`compute_totals`] so stored and displayed amounts cannot diverge.

pub mod totals;

pub use totals::{compute_totals, vat_of, Totals, VAT_RATE_PERCENT};
