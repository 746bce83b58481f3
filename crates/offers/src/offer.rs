use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tilbud_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Entity, Money};
use tilbud_events::Event;
use tilbud_templates::{TemplateId, TemplateSnapshot};

use crate::status::{validate_transition, OfferStatus};

/// Offer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub AggregateId);

impl OfferId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OfferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub AggregateId);

impl LineItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LineItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One row of an offer: a named item, its unit price, and quantity.
///
/// `line_no` records insertion order; it is stable for display and carries no
/// other meaning. `template_id` is set when the row was instantiated from an
/// item template, which keeps its own copy of name and price from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub line_no: u32,
    pub template_id: Option<TemplateId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    id: OfferId,
    title: String,
    customer: String,
    status: OfferStatus,
    items: Vec<LineItem>,
    /// Highest line_no ever assigned; freed numbers are never reused.
    line_seq: u32,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Offer {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OfferId) -> Self {
        Self {
            id,
            title: String::new(),
            customer: String::new(),
            status: OfferStatus::Draft,
            items: Vec::new(),
            line_seq: 0,
            created_at: None,
            updated_at: None,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OfferId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn status(&self) -> OfferStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Line items and details may only change while the offer is undecided.
    pub fn is_modifiable(&self) -> bool {
        !self.deleted && matches!(self.status, OfferStatus::Draft | OfferStatus::Pending)
    }

    pub fn find_item(&self, item_id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

impl AggregateRoot for Offer {
    type Id = OfferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOffer {
    pub offer_id: OfferId,
    pub title: String,
    pub customer: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateOfferDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOfferDetails {
    pub offer_id: OfferId,
    pub title: String,
    pub customer: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub template_id: Option<TemplateId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

impl AddLineItem {
    /// Build the command from an item template snapshot.
    pub fn from_template(
        offer_id: OfferId,
        item_id: LineItemId,
        snapshot: TemplateSnapshot,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            offer_id,
            item_id,
            template_id: Some(snapshot.template_id),
            name: snapshot.name,
            unit_price: snapshot.unit_price,
            quantity,
            occurred_at,
        }
    }
}

/// Command: ChangeItemQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItemQuantity {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLineItem {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub offer_id: OfferId,
    pub to: OfferStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteOffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOffer {
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferCommand {
    CreateOffer(CreateOffer),
    UpdateOfferDetails(UpdateOfferDetails),
    AddLineItem(AddLineItem),
    ChangeItemQuantity(ChangeItemQuantity),
    RemoveLineItem(RemoveLineItem),
    ChangeStatus(ChangeStatus),
    DeleteOffer(DeleteOffer),
}

/// Event: OfferCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCreated {
    pub offer_id: OfferId,
    pub title: String,
    pub customer: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDetailsUpdated {
    pub offer_id: OfferId,
    pub title: String,
    pub customer: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAdded {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub line_no: u32,
    pub template_id: Option<TemplateId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemQuantityChanged {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRemoved {
    pub offer_id: OfferId,
    pub item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub offer_id: OfferId,
    pub from: OfferStatus,
    pub to: OfferStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDeleted {
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferEvent {
    OfferCreated(OfferCreated),
    OfferDetailsUpdated(OfferDetailsUpdated),
    LineItemAdded(LineItemAdded),
    LineItemQuantityChanged(LineItemQuantityChanged),
    LineItemRemoved(LineItemRemoved),
    StatusChanged(StatusChanged),
    OfferDeleted(OfferDeleted),
}

impl Event for OfferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OfferEvent::OfferCreated(_) => "offers.offer.created",
            OfferEvent::OfferDetailsUpdated(_) => "offers.offer.details_updated",
            OfferEvent::LineItemAdded(_) => "offers.offer.line_item_added",
            OfferEvent::LineItemQuantityChanged(_) => "offers.offer.line_item_quantity_changed",
            OfferEvent::LineItemRemoved(_) => "offers.offer.line_item_removed",
            OfferEvent::StatusChanged(_) => "offers.offer.status_changed",
            OfferEvent::OfferDeleted(_) => "offers.offer.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OfferEvent::OfferCreated(e) => e.occurred_at,
            OfferEvent::OfferDetailsUpdated(e) => e.occurred_at,
            OfferEvent::LineItemAdded(e) => e.occurred_at,
            OfferEvent::LineItemQuantityChanged(e) => e.occurred_at,
            OfferEvent::LineItemRemoved(e) => e.occurred_at,
            OfferEvent::StatusChanged(e) => e.occurred_at,
            OfferEvent::OfferDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Offer {
    type Command = OfferCommand;
    type Event = OfferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        let occurred_at = event.occurred_at();
        match event {
            OfferEvent::OfferCreated(e) => {
                self.id = e.offer_id;
                self.title = e.title.clone();
                self.customer = e.customer.clone();
                self.status = OfferStatus::Draft;
                self.items.clear();
                self.line_seq = 0;
                self.created_at = Some(occurred_at);
                self.deleted = false;
                self.created = true;
            }
            OfferEvent::OfferDetailsUpdated(e) => {
                self.title = e.title.clone();
                self.customer = e.customer.clone();
            }
            OfferEvent::LineItemAdded(e) => {
                self.line_seq = self.line_seq.max(e.line_no);
                self.items.push(LineItem {
                    id: e.item_id,
                    line_no: e.line_no,
                    template_id: e.template_id,
                    name: e.name.clone(),
                    unit_price: e.unit_price,
                    quantity: e.quantity,
                });
            }
            OfferEvent::LineItemQuantityChanged(e) => {
                if let Some(item) = self.items.iter_mut().find(|item| item.id == e.item_id) {
                    item.quantity = e.quantity;
                }
            }
            OfferEvent::LineItemRemoved(e) => {
                self.items.retain(|item| item.id != e.item_id);
            }
            OfferEvent::StatusChanged(e) => {
                self.status = e.to;
            }
            OfferEvent::OfferDeleted(_) => {
                self.deleted = true;
            }
        }

        self.updated_at = Some(occurred_at);

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OfferCommand::CreateOffer(cmd) => self.handle_create(cmd),
            OfferCommand::UpdateOfferDetails(cmd) => self.handle_update_details(cmd),
            OfferCommand::AddLineItem(cmd) => self.handle_add_line_item(cmd),
            OfferCommand::ChangeItemQuantity(cmd) => self.handle_change_quantity(cmd),
            OfferCommand::RemoveLineItem(cmd) => self.handle_remove_line_item(cmd),
            OfferCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            OfferCommand::DeleteOffer(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Offer {
    fn ensure_offer_id(&self, offer_id: OfferId) -> Result<(), DomainError> {
        if self.id != offer_id {
            return Err(DomainError::invariant("offer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self, offer_id: OfferId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offer_id(offer_id)?;
        if self.deleted {
            return Err(DomainError::invariant("offer has been deleted"));
        }
        Ok(())
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "offer can no longer be edited in its current status",
            ));
        }
        Ok(())
    }

    fn next_line_no(&self) -> u32 {
        self.line_seq + 1
    }

    fn handle_create(&self, cmd: &CreateOffer) -> Result<Vec<OfferEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("offer already exists"));
        }

        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        if cmd.customer.trim().is_empty() {
            return Err(DomainError::validation("customer cannot be empty"));
        }

        Ok(vec![OfferEvent::OfferCreated(OfferCreated {
            offer_id: cmd.offer_id,
            title: cmd.title.clone(),
            customer: cmd.customer.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateOfferDetails,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;
        self.ensure_modifiable()?;

        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        if cmd.customer.trim().is_empty() {
            return Err(DomainError::validation("customer cannot be empty"));
        }

        Ok(vec![OfferEvent::OfferDetailsUpdated(OfferDetailsUpdated {
            offer_id: cmd.offer_id,
            title: cmd.title.clone(),
            customer: cmd.customer.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line_item(&self, cmd: &AddLineItem) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;
        self.ensure_modifiable()?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        if self.find_item(cmd.item_id).is_some() {
            return Err(DomainError::conflict("line item already exists"));
        }

        Ok(vec![OfferEvent::LineItemAdded(LineItemAdded {
            offer_id: cmd.offer_id,
            item_id: cmd.item_id,
            line_no: self.next_line_no(),
            template_id: cmd.template_id,
            name: cmd.name.clone(),
            unit_price: cmd.unit_price,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_quantity(
        &self,
        cmd: &ChangeItemQuantity,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        if self.find_item(cmd.item_id).is_none() {
            return Err(DomainError::validation("line item not found"));
        }

        Ok(vec![OfferEvent::LineItemQuantityChanged(
            LineItemQuantityChanged {
                offer_id: cmd.offer_id,
                item_id: cmd.item_id,
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_remove_line_item(
        &self,
        cmd: &RemoveLineItem,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;
        self.ensure_modifiable()?;

        if self.find_item(cmd.item_id).is_none() {
            return Err(DomainError::validation("line item not found"));
        }

        Ok(vec![OfferEvent::LineItemRemoved(LineItemRemoved {
            offer_id: cmd.offer_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;

        let to = validate_transition(self.status, cmd.to)?;

        Ok(vec![OfferEvent::StatusChanged(StatusChanged {
            offer_id: cmd.offer_id,
            from: self.status,
            to,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteOffer) -> Result<Vec<OfferEvent>, DomainError> {
        self.ensure_exists(cmd.offer_id)?;

        Ok(vec![OfferEvent::OfferDeleted(OfferDeleted {
            offer_id: cmd.offer_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
