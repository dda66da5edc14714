use serde::{Deserialize, Serialize};

use stockroom_core::{ItemId, UserId};
use stockroom_inventory::{Item, MovementRequest, MovementType};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /movements`. The acting user comes from the bearer token.
#[derive(Debug, Deserialize)]
pub struct RecordMovementRequest {
    pub item_id: ItemId,
    #[serde(rename = "type")]
    pub kind: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
}

impl RecordMovementRequest {
    pub fn into_request(self, user_id: UserId) -> MovementRequest {
        MovementRequest {
            item_id: self.item_id,
            user_id,
            kind: self.kind,
            quantity: self.quantity,
            destination: self.destination,
            observation: self.observation,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub item_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub category_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Item as returned by the API: the record plus its derived low-stock flag.
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub low_stock: bool,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        let low_stock = item.is_low_stock();
        Self { item, low_stock }
    }
}

pub fn item_views(items: Vec<Item>) -> Vec<ItemView> {
    items.into_iter().map(ItemView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
}
