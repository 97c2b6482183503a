use crate::{
    Collection, Entity, Result,
    cursor::{Cursor, Iterable},
    executor,
    operation::{AggregateOperation, ReadOperation},
};
use futures_util::{FutureExt, future::BoxFuture};
use mongodb::bson::{Document, doc};
use std::{fmt, sync::Arc};

#[derive(Debug)]
struct Stage {
    document: Document,
    previous: Option<Arc<Stage>>,
}

/// An aggregation pipeline.
///
/// Pipelines are immutable: every stage method returns a new pipeline made of
/// the receiver's stages plus one more, sharing the receiver's stages instead
/// of copying them. A common prefix can therefore branch freely:
///
/// ```ignore
/// let active = orders.pipe().filter(doc! { "status": "A" });
/// let by_customer = active.group(doc! { "_id": "$customer", "total": { "$sum": "$amount" } });
/// let newest = active.sort(doc! { "placed_at": -1 }).limit(5);
/// ```
pub struct Pipeline<T> {
    collection: Collection<T>,
    last: Option<Arc<Stage>>,
    len: usize,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            last: self.last.clone(),
            len: self.len,
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("namespace", self.collection.namespace())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> Pipeline<T> {
    pub(crate) fn new(collection: Collection<T>) -> Self {
        Self {
            collection,
            last: None,
            len: 0,
        }
    }

    /// Appends an arbitrary stage document.
    pub fn stage(&self, stage: Document) -> Self {
        Self {
            collection: self.collection.clone(),
            last: Some(Arc::new(Stage {
                document: stage,
                previous: self.last.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Appends a `$match` stage.
    pub fn filter(&self, criteria: Document) -> Self {
        self.stage(doc! { "$match": criteria })
    }

    pub fn sort(&self, sort: Document) -> Self {
        self.stage(doc! { "$sort": sort })
    }

    pub fn skip(&self, skip: i64) -> Self {
        self.stage(doc! { "$skip": skip })
    }

    pub fn limit(&self, limit: i64) -> Self {
        self.stage(doc! { "$limit": limit })
    }

    pub fn project(&self, projection: Document) -> Self {
        self.stage(doc! { "$project": projection })
    }

    pub fn group(&self, group: Document) -> Self {
        self.stage(doc! { "$group": group })
    }

    /// `field` is a field path such as `"$tags"`.
    pub fn unwind(&self, field: impl Into<String>) -> Self {
        self.stage(doc! { "$unwind": field.into() })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The stages in the order they run.
    pub fn stages(&self) -> Vec<Document> {
        let mut stages = Vec::with_capacity(self.len);
        let mut next = self.last.as_deref();

        while let Some(stage) = next {
            stages.push(stage.document.clone());
            next = stage.previous.as_deref();
        }

        stages.reverse();
        stages
    }

    pub fn aggregate_operation(&self) -> AggregateOperation {
        AggregateOperation {
            namespace: self.collection.namespace().clone(),
            pipeline: self.stages(),
            read_concern: self.collection.options().read_concern.clone(),
        }
    }
}

impl<T: Entity> Iterable for Pipeline<T> {
    type Item = T;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<T>>> {
        async move {
            executor::open_cursor(
                self.collection.executor(),
                ReadOperation::Aggregate(self.aggregate_operation()),
                self.collection.options().read_preference.clone(),
            )
            .await
        }
        .boxed()
    }
}
