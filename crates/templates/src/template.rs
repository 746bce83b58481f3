use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tilbud_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money};
use tilbud_events::Event;

/// Template identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub AggregateId);

impl TemplateId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Template status lifecycle.
///
/// Templates are usable the moment they are created; archiving retires them
/// without touching offers that were built from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Archived,
}

/// The fields an offer line is built from when instantiating a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    pub template_id: TemplateId,
    pub name: String,
    pub unit_price: Money,
}

/// Aggregate root: ItemTemplate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTemplate {
    id: TemplateId,
    name: String,
    unit_price: Money,
    status: TemplateStatus,
    version: u64,
    created: bool,
}

impl ItemTemplate {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: TemplateId) -> Self {
        Self {
            id,
            name: String::new(),
            unit_price: Money::ZERO,
            status: TemplateStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn status(&self) -> TemplateStatus {
        self.status
    }

    pub fn can_be_instantiated(&self) -> bool {
        self.status == TemplateStatus::Active
    }

    /// Snapshot the fields a new offer line is built from.
    ///
    /// Archived templates cannot be instantiated; lines created earlier keep
    /// their own copy of name and price and are unaffected.
    pub fn snapshot(&self) -> Result<TemplateSnapshot, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if !self.can_be_instantiated() {
            return Err(DomainError::invariant(
                "archived templates cannot be instantiated",
            ));
        }
        Ok(TemplateSnapshot {
            template_id: self.id,
            name: self.name.clone(),
            unit_price: self.unit_price,
        })
    }
}

impl AggregateRoot for ItemTemplate {
    type Id = TemplateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateTemplate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub template_id: TemplateId,
    pub name: String,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateTemplate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTemplate {
    pub template_id: TemplateId,
    pub name: String,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveTemplate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTemplate {
    pub template_id: TemplateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateCommand {
    CreateTemplate(CreateTemplate),
    UpdateTemplate(UpdateTemplate),
    ArchiveTemplate(ArchiveTemplate),
}

/// Event: TemplateCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCreated {
    pub template_id: TemplateId,
    pub name: String,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TemplateUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUpdated {
    pub template_id: TemplateId,
    pub name: String,
    pub unit_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TemplateArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateArchived {
    pub template_id: TemplateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateEvent {
    TemplateCreated(TemplateCreated),
    TemplateUpdated(TemplateUpdated),
    TemplateArchived(TemplateArchived),
}

impl Event for TemplateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TemplateEvent::TemplateCreated(_) => "templates.template.created",
            TemplateEvent::TemplateUpdated(_) => "templates.template.updated",
            TemplateEvent::TemplateArchived(_) => "templates.template.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TemplateEvent::TemplateCreated(e) => e.occurred_at,
            TemplateEvent::TemplateUpdated(e) => e.occurred_at,
            TemplateEvent::TemplateArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ItemTemplate {
    type Command = TemplateCommand;
    type Event = TemplateEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TemplateEvent::TemplateCreated(e) => {
                self.id = e.template_id;
                self.name = e.name.clone();
                self.unit_price = e.unit_price;
                self.status = TemplateStatus::Active;
                self.created = true;
            }
            TemplateEvent::TemplateUpdated(e) => {
                self.name = e.name.clone();
                self.unit_price = e.unit_price;
            }
            TemplateEvent::TemplateArchived(_) => {
                self.status = TemplateStatus::Archived;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TemplateCommand::CreateTemplate(cmd) => self.handle_create(cmd),
            TemplateCommand::UpdateTemplate(cmd) => self.handle_update(cmd),
            TemplateCommand::ArchiveTemplate(cmd) => self.handle_archive(cmd),
        }
    }
}

impl ItemTemplate {
    fn ensure_template_id(&self, template_id: TemplateId) -> Result<(), DomainError> {
        if self.id != template_id {
            return Err(DomainError::invariant("template_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateTemplate) -> Result<Vec<TemplateEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("template already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![TemplateEvent::TemplateCreated(TemplateCreated {
            template_id: cmd.template_id,
            name: cmd.name.clone(),
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateTemplate) -> Result<Vec<TemplateEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_template_id(cmd.template_id)?;

        if self.status == TemplateStatus::Archived {
            return Err(DomainError::invariant("archived templates cannot be updated"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![TemplateEvent::TemplateUpdated(TemplateUpdated {
            template_id: cmd.template_id,
            name: cmd.name.clone(),
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveTemplate) -> Result<Vec<TemplateEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_template_id(cmd.template_id)?;

        if self.status == TemplateStatus::Archived {
            return Err(DomainError::conflict("template is already archived"));
        }

        Ok(vec![TemplateEvent::TemplateArchived(TemplateArchived {
            template_id: cmd.template_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
