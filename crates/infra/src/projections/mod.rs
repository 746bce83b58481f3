//! Read-model projections built from committed event envelopes.

pub mod offer_list;
