//! Item templates domain module (event-sourced).
//!
//! Reusable predefined items (name + unit price) that users instantiate into
//! offer line items. Implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod template;

pub use template::{
    ArchiveTemplate, CreateTemplate, ItemTemplate, TemplateArchived, TemplateCommand,
    TemplateCreated, TemplateEvent, TemplateId, TemplateSnapshot, TemplateStatus,
    TemplateUpdated, UpdateTemplate,
};
