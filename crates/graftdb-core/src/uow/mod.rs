//! In-memory persistence behind the gateway seam.
//!
//! `MemoryStore` holds committed rows; a `UnitOfWork` attaches rows as
//! mutable records, tracks new and removed entities, and writes everything
//! back in one `flush`. Dropping a unit of work without flushing discards it.

mod store;
mod unit_of_work;


pub use store::{MemoryStore, RowRef, StoredRecord};
pub use unit_of_work::{EntityState, FlushReport, UnitOfWork};
