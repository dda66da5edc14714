//! Stock movements: the append-only log behind every item's `current_stock`.
//!
//! A movement is created once, with an immutable `previous_stock`/`new_stock`
//! snapshot, and never updated or deleted. Per item, movements form a chain:
//! movement `k` starts from the stock movement `k - 1` ended with (0 for the
//! first), so the current stock can always be re-derived with [`replay`].

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, ItemId, MovementId, UserId};

use crate::category::non_blank;
use crate::item::Item;

const MAX_NOTE_LEN: usize = 500;

/// Direction of a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Inflow,
    Outflow,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inflow => "inflow",
            MovementType::Outflow => "outflow",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inflow" => Ok(MovementType::Inflow),
            "outflow" => Ok(MovementType::Outflow),
            _ => Err(DomainError::validation(format!(
                "movement type must be inflow or outflow (got '{s}')"
            ))),
        }
    }
}

/// Before/after stock of a single movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub previous_stock: i64,
    pub new_stock: i64,
}

impl StockChange {
    /// Decide the stock after moving `quantity` units from `current`.
    ///
    /// Pure decision logic: outflows beyond the available stock are rejected with
    /// `InsufficientStock` (never clamped), and the result is never negative.
    pub fn plan(current: i64, kind: MovementType, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }
        if current < 0 {
            return Err(DomainError::invariant(format!(
                "item stock is negative ({current})"
            )));
        }

        let new_stock = match kind {
            MovementType::Inflow => current
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("inflow would overflow the stock counter"))?,
            MovementType::Outflow => {
                if quantity > current {
                    return Err(DomainError::insufficient_stock(current, quantity));
                }
                current - quantity
            }
        };

        Ok(Self {
            previous_stock: current,
            new_stock,
        })
    }
}

/// A request to move stock, as submitted by an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub item_id: ItemId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
}

impl MovementRequest {
    pub fn new(item_id: ItemId, user_id: UserId, kind: MovementType, quantity: i64) -> Self {
        Self {
            item_id,
            user_id,
            kind,
            quantity,
            destination: None,
            observation: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    /// Input checks that do not depend on the item's stock.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }
        for (field, value) in [("destination", &self.destination), ("observation", &self.observation)] {
            if value.as_ref().is_some_and(|v| v.chars().count() > MAX_NOTE_LEN) {
                return Err(DomainError::validation(format!(
                    "{field} cannot exceed {MAX_NOTE_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable audit record of one stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub item_id: ItemId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: MovementType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// 1-based position in the item's movement chain.
    pub sequence: u64,
    pub destination: Option<String>,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Materialize a validated request once its stock change has been decided.
    pub fn record(
        request: &MovementRequest,
        change: StockChange,
        sequence: u64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            item_id: request.item_id,
            user_id: request.user_id,
            kind: request.kind,
            quantity: request.quantity,
            previous_stock: change.previous_stock,
            new_stock: change.new_stock,
            sequence,
            destination: non_blank(request.destination.clone()),
            observation: non_blank(request.observation.clone()),
            created_at: at,
        }
    }

    /// The inflow that accounts for an item's opening stock, if it has any.
    pub fn opening(item: &Item, user_id: UserId, observation: &str) -> Option<Self> {
        if item.current_stock <= 0 {
            return None;
        }
        Some(Self {
            id: MovementId::new(),
            item_id: item.id,
            user_id,
            kind: MovementType::Inflow,
            quantity: item.current_stock,
            previous_stock: 0,
            new_stock: item.current_stock,
            sequence: 1,
            destination: None,
            observation: non_blank(Some(observation.to_string())),
            created_at: item.created_at,
        })
    }

    /// Signed effect on stock.
    pub fn delta(&self) -> i64 {
        match self.kind {
            MovementType::Inflow => self.quantity,
            MovementType::Outflow => -self.quantity,
        }
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }
}

/// Re-derive an item's stock from its movement history.
///
/// Movements may be passed in any order; they are applied by `sequence` starting
/// from zero stock. Every snapshot is checked against the running total, so a
/// broken chain (gap, tampered snapshot, negative stock) is reported as an
/// invariant violation instead of producing a number.
pub fn replay(movements: &[Movement]) -> DomainResult<i64> {
    let mut ordered: Vec<&Movement> = movements.iter().collect();
    ordered.sort_by_key(|m| m.sequence);

    let mut stock = 0i64;
    for (idx, movement) in ordered.iter().enumerate() {
        let expected_sequence = idx as u64 + 1;
        if movement.sequence != expected_sequence {
            return Err(DomainError::invariant(format!(
                "movement chain gap: expected sequence {expected_sequence}, found {}",
                movement.sequence
            )));
        }
        if movement.previous_stock != stock {
            return Err(DomainError::invariant(format!(
                "movement {} starts at {} but the chain is at {stock}",
                movement.sequence, movement.previous_stock
            )));
        }

        let change = StockChange::plan(stock, movement.kind, movement.quantity)
            .map_err(|e| DomainError::invariant(format!("movement {} is invalid: {e}", movement.sequence)))?;
        if change.new_stock != movement.new_stock {
            return Err(DomainError::invariant(format!(
                "movement {} records {} but applies to {}",
                movement.sequence, movement.new_stock, change.new_stock
            )));
        }
        stock = change.new_stock;
    }

    Ok(stock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: MovementType, quantity: i64) -> MovementRequest {
        MovementRequest::new(ItemId::new(), UserId::new(), kind, quantity)
    }

    fn chain(steps: &[(MovementType, i64)]) -> Vec<Movement> {
        let item_id = ItemId::new();
        let user_id = UserId::new();
        let mut stock = 0;
        let mut out = Vec::new();
        for (idx, (kind, qty)) in steps.iter().enumerate() {
            let req = MovementRequest::new(item_id, user_id, *kind, *qty);
            let change = StockChange::plan(stock, *kind, *qty).unwrap();
            stock = change.new_stock;
            out.push(Movement::record(&req, change, idx as u64 + 1, Utc::now()));
        }
        out
    }

    #[test]
    fn outflow_of_everything_then_one_more() {
        let drained = StockChange::plan(5, MovementType::Outflow, 5).unwrap();
        assert_eq!(drained.previous_stock, 5);
        assert_eq!(drained.new_stock, 0);

        let err = StockChange::plan(drained.new_stock, MovementType::Outflow, 1).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(0, 1));
    }

    #[test]
    fn inflow_adds_quantity() {
        let change = StockChange::plan(12, MovementType::Inflow, 3).unwrap();
        assert_eq!((change.previous_stock, change.new_stock), (12, 15));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        for qty in [0, -4] {
            assert!(matches!(
                StockChange::plan(10, MovementType::Inflow, qty),
                Err(DomainError::Validation(_))
            ));
            assert!(request(MovementType::Outflow, qty).validate().is_err());
        }
    }

    #[test]
    fn inflow_overflow_is_a_validation_error() {
        let err = StockChange::plan(i64::MAX, MovementType::Inflow, 1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn record_copies_snapshot_and_trims_notes() {
        let req = request(MovementType::Outflow, 3)
            .with_destination("  Floor 2 helpdesk ")
            .with_observation("   ");
        let change = StockChange::plan(12, req.kind, req.quantity).unwrap();
        let movement = Movement::record(&req, change, 4, Utc::now());

        assert_eq!(movement.previous_stock, 12);
        assert_eq!(movement.new_stock, 9);
        assert_eq!(movement.sequence, 4);
        assert_eq!(movement.destination.as_deref(), Some("Floor 2 helpdesk"));
        assert_eq!(movement.observation, None);
        assert_eq!(movement.delta(), -3);
    }

    #[test]
    fn replay_reproduces_final_stock_regardless_of_input_order() {
        let mut movements = chain(&[
            (MovementType::Inflow, 10),
            (MovementType::Outflow, 4),
            (MovementType::Inflow, 2),
            (MovementType::Outflow, 8),
        ]);
        movements.reverse();
        assert_eq!(replay(&movements).unwrap(), 0);
    }

    #[test]
    fn replay_detects_tampered_snapshot() {
        let mut movements = chain(&[(MovementType::Inflow, 10), (MovementType::Outflow, 4)]);
        movements[1].previous_stock = 9;
        assert!(matches!(replay(&movements), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn replay_detects_sequence_gap() {
        let mut movements = chain(&[(MovementType::Inflow, 10), (MovementType::Inflow, 1)]);
        movements[1].sequence = 3;
        assert!(matches!(replay(&movements), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn movement_type_serializes_lowercase_under_type_key() {
        let req = request(MovementType::Inflow, 1);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "inflow");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn step() -> impl Strategy<Value = (bool, i64)> {
            (any::<bool>(), 1i64..50)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: whatever sequence is attempted, accepted movements never
            /// take stock below zero and rejected outflows leave it untouched.
            #[test]
            fn stock_never_goes_negative(steps in prop::collection::vec(step(), 0..60)) {
                let mut stock = 0i64;
                for (inflow, qty) in steps {
                    let kind = if inflow { MovementType::Inflow } else { MovementType::Outflow };
                    match StockChange::plan(stock, kind, qty) {
                        Ok(change) => {
                            prop_assert_eq!(change.previous_stock, stock);
                            prop_assert!(change.new_stock >= 0);
                            stock = change.new_stock;
                        }
                        Err(DomainError::InsufficientStock { available, requested }) => {
                            prop_assert_eq!(available, stock);
                            prop_assert_eq!(requested, qty);
                            prop_assert!(qty > stock);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                    }
                }
            }

            /// Property: replaying the accepted movements reproduces the stock.
            #[test]
            fn replay_matches_running_stock(steps in prop::collection::vec(step(), 0..60)) {
                let item_id = ItemId::new();
                let user_id = UserId::new();
                let mut stock = 0i64;
                let mut log = Vec::new();
                for (inflow, qty) in steps {
                    let kind = if inflow { MovementType::Inflow } else { MovementType::Outflow };
                    let req = MovementRequest::new(item_id, user_id, kind, qty);
                    if let Ok(change) = StockChange::plan(stock, kind, qty) {
                        stock = change.new_stock;
                        log.push(Movement::record(&req, change, log.len() as u64 + 1, Utc::now()));
                    }
                }
                prop_assert_eq!(replay(&log).unwrap(), stock);
            }
        }
    }
}
