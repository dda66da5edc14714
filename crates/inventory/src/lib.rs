//! Inventory domain module.
//!
//! This crate contains the business rules of the stock ledger, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - `code`: per-year internal item codes (`YYYY-NNNN`)
//! - `item` / `category`: catalog records and their validation
//! - `movement`: stock movements, the stock arithmetic and history replay
//! - `csv`: reading, shape detection and export of catalog spreadsheets

pub mod category;
pub mod code;
pub mod csv;
pub mod item;
pub mod movement;

pub use category::{Category, CategoryPatch, NewCategory};
pub use code::InternalCode;
pub use item::{Item, ItemPatch, ItemStatus, NewItem};
pub use movement::{replay, Movement, MovementRequest, MovementType, StockChange};
