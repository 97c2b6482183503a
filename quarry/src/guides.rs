/// ## Getting started
///
/// A [`Collection`](crate::Collection) maps a Rust type to a collection. The type must
/// implement [`Entity`](crate::Entity), which is usually derived:
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
/// use quarry::{Entity, bson::oid::ObjectId};
///
/// #[derive(Serialize, Deserialize, Entity)]
/// struct User {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     name: String,
///     password: String,
/// }
/// ```
///
/// If the struct has an `id` field renamed to `_id`, the derive also implements
/// [`Identifiable`](crate::Identifiable): inserts generate a fresh
/// [`ObjectId`](mongodb::bson::oid::ObjectId) for documents without one, and
/// [`save`](crate::View::save) becomes available. The field must be an `Option`
/// so that "no identity yet" can be expressed. Structs without such a field
/// still derive `Entity`, but `save` on them fails with
/// [`Error::UnsupportedOperation`](crate::Error::UnsupportedOperation).
///
/// Plain [`Document`](mongodb::bson::Document)s are entities with identity too.
///
/// ### Creating a `Database`
///
/// [`Database`](crate::Database) pairs a database name with an
/// [`Executor`](crate::Executor), the engine that actually talks to the server:
///
/// ```ignore
/// let db = Database::new("app", Arc::new(engine));
/// let users = db.collection::<User>("users");
/// ```
///
/// ### Method overview
///
/// | Method                         | Command submitted                                                  |
/// |--------------------------------|--------------------------------------------------------------------|
/// | `Collection::insert`           | `insert` with one document                                         |
/// | `Collection::insert_many`      | `insert` with every document, in order                             |
/// | `Collection::save`             | `insert`, or an upserting `update` replacing the document by `_id` |
/// | `View::get`, `Iterable::*`     | `find`                                                             |
/// | `View::get_one`                | `find` returning a single batch                                    |
/// | `View::count`                  | `count`                                                            |
/// | `View::remove`                 | `delete`, every match unless the limit is 1                        |
/// | `View::remove_one`             | `delete`, one match                                                |
/// | `View::update`                 | `update`, every match unless the limit is 1                        |
/// | `View::update_one`             | `update`, one match                                                |
/// | `View::replace`                | `update` replacing one match                                       |
/// | `View::update_one_and_get`     | `findAndModify` returning the updated document                     |
/// | `View::get_one_and_update`     | `findAndModify` returning the original document                    |
/// | `View::replace_one_and_get`    | `findAndModify` returning the replacement                          |
/// | `View::get_one_and_replace`    | `findAndModify` returning the original document                    |
/// | `View::get_one_and_remove`     | `findAndModify` removing the document                              |
/// | `Pipeline`, `Iterable::*`      | `aggregate`                                                        |
/// | `MapReduce`, `Iterable::*`     | `mapReduce`, then `find` on the output collection if there is one  |
pub mod getting_started {}

/// ## Views
///
/// [`Collection::find`](crate::Collection::find) returns a [`View`](crate::View),
/// a query under construction. Configuration methods take `&mut self` and
/// return it, so they chain:
///
/// ```ignore
/// let mut recent = users.find(doc! { "active": true });
/// recent
///     .sort_by([(user::Fields::CreatedAt, Order::Desc)])
///     .fields_only(&["name", "created_at"])
///     .limit(20);
///
/// let count = recent.count().await?;
/// let page = recent.to_vec().await?;
/// ```
///
/// Each terminal call builds its own descriptor from the current state, so a
/// view can be counted and then fetched, or tweaked between calls.
///
/// ### Limits on removes and updates
///
/// The plural [`remove`](crate::View::remove) and [`update`](crate::View::update)
/// read the view's limit to decide how many documents they touch:
///
/// - no limit set, or a limit of `0`: every match
/// - a limit of `1`: a single match
/// - anything else: [`Error::InvalidLimit`](crate::Error::InvalidLimit), before
///   anything is sent
///
/// ### Overriding defaults
///
/// Write concern, read preference and read concern come from the collection's
/// [`CollectionOptions`](crate::CollectionOptions) unless the view overrides them
/// with `with_write_concern`, `with_read_preference` or `with_read_concern`.
///
/// ### Typed field names
///
/// `#[derive(Fields)]` generates a `Fields` enum in a module named after the
/// struct. It implements `Display` using the serialized field names, and can
/// be passed to [`View::sort_by`](crate::View::sort_by) or used as keys in
/// [`doc!`](mongodb::bson::doc).
pub mod views {}

/// ## Pipelines
///
/// [`Collection::pipe`](crate::Collection::pipe) starts an empty aggregation
/// pipeline. Unlike views, pipelines never change: each stage method returns
/// a new pipeline, and the old one stays usable.
///
/// ```ignore
/// let adults = users.pipe().filter(doc! { "age": { "$gte": 18 } });
///
/// let by_country = adults.group(doc! { "_id": "$country", "n": { "$sum": 1 } });
/// let oldest = adults.sort(doc! { "age": -1 }).limit(3);
/// ```
///
/// `adults` still has one stage; `by_country` and `oldest` share it.
pub mod pipelines {}

/// ## Map-reduce
///
/// A [`MapReduce`](crate::MapReduce) returns its results inline until an output
/// collection is named with
/// [`collection_name`](crate::MapReduce::collection_name). From then on,
/// reading results first runs the map-reduce as a write and, once it has
/// succeeded, reads the output collection. If the write fails, the error is
/// returned and the output is never read.
///
/// ```ignore
/// let mut totals = orders.map_reduce::<Document>(MAP, REDUCE);
/// totals.collection_name("totals").action(MapReduceAction::Merge);
///
/// // Only writes:
/// let statistics = totals.to_collection().await?;
///
/// // Writes, then reads back:
/// let all = totals.to_vec().await?;
/// ```
///
/// [`to_collection`](crate::MapReduce::to_collection) on an inline map-reduce
/// fails with [`Error::InlineMapReduce`](crate::Error::InlineMapReduce).
pub mod map_reduce {}

/// ## Implementing an executor
///
/// [`Executor`](crate::Executor) receives finished descriptors from
/// [`operation`](crate::operation) and answers each with exactly one reply or
/// error. Reads that produce documents answer with a
/// [`BatchCursor`](crate::BatchCursor); [`InlineCursor`](crate::InlineCursor)
/// covers results that arrive with the reply.
///
/// A blocking engine can implement the trait by returning ready futures:
///
/// ```ignore
/// impl Executor for Blocking {
///     fn write(&self, operation: WriteOperation) -> BoxFuture<'_, Result<WriteReply>> {
///         future::ready(self.run_write(operation)).boxed()
///     }
///     // ...
/// }
/// ```
pub mod executors {}
