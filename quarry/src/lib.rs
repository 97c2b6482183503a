//! Quarry builds document-database commands from fluent query, pipeline and
//! map-reduce builders, and hands them to an execution engine.
//!
//! The crate does not talk to a server itself. It turns builder state into
//! immutable descriptors ([`operation`]) and submits them through the
//! [`Executor`] trait, which the surrounding driver implements.
//!
//! ## Example
//!
//! ```ignore
//! // Define an entity
//! #[derive(Serialize, Deserialize, Entity)]
//! struct Order {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     id: Option<ObjectId>,
//!     status: String,
//!     amount: i64,
//! }
//!
//! let db = Database::new("shop", executor);
//! let orders = db.collection::<Order>("orders");
//!
//! // Insert, generating an `_id`
//! let mut order = Order { id: None, status: "A".into(), amount: 40 };
//! orders.insert(&mut order).await?;
//!
//! // Query
//! let mut pending = orders.find(doc! { "status": "A" });
//! pending.sort(doc! { "amount": -1 }).limit(10);
//! let biggest: Vec<Order> = pending.to_vec().await?;
//!
//! // Remove a single match
//! orders.find(doc! { "status": "X" }).limit(1).remove().await?;
//!
//! // Aggregate, decoding results as plain documents
//! let totals = db
//!     .collection::<Document>("orders")
//!     .pipe()
//!     .filter(doc! { "status": "A" })
//!     .group(doc! { "_id": "$customer", "total": { "$sum": "$amount" } });
//! totals.for_each(|total| { println!("{total}"); Ok(()) }).await?;
//!
//! // Map-reduce into a collection, then read the output
//! let mut totals = orders.map_reduce::<Document>(MAP, REDUCE);
//! totals.collection_name("order_totals");
//! let first = totals.first().await?;
//! ```
//!
//! See [`guides`] for more.

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate self as quarry;

pub use mongodb::bson;
pub use quarry_macros::{Entity, Fields};

pub use collection::{Collection, CollectionOptions, Database};
pub use cursor::{Cursor, Iterable, Mapped};
pub use entity::{Entity, Identifiable, Order, projection_document, sort_document};
pub use error::{BoxError, Error, Result};
pub use executor::{BatchCursor, Executor, InlineCursor, ReadReply, WriteReply};
pub use map_reduce::{MapReduce, MapReduceResults};
pub use pipeline::Pipeline;
pub use view::View;

mod collection;
mod cursor;
mod entity;
mod error;
mod executor;
pub mod guides;
mod map_reduce;
pub mod operation;
mod pipeline;
mod view;
