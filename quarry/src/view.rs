use crate::{
    Collection, Entity, Error, MapReduce, Result,
    cursor::{Cursor, Iterable},
    entity::{Order, projection_document, sort_document},
    executor,
    operation::{
        CountOperation, CursorFlag, FindAndModifyOperation, FindOperation, InsertRequest,
        Modification, ReadOperation, RemoveRequest, ReplaceRequest, ReturnDocument,
        SINGLE_BATCH, UpdateRequest, WriteBatch, WriteOperation, WriteResult,
    },
};
use futures_util::{FutureExt, future::BoxFuture};
use mongodb::{
    bson::{self, Document, doc},
    options::{ReadConcern, ReadPreference, WriteConcern},
};
use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    time::Duration,
};

/// Everything a view accumulates before it is turned into a descriptor.
#[derive(Clone, Debug, Default)]
struct QueryContext {
    criteria: Document,
    projection: Option<Document>,
    sort: Option<Document>,
    modifiers: Option<Document>,
    skip: u64,
    /// `None` until a limit is set explicitly.
    limit: Option<i64>,
    batch_size: i32,
    max_time: Option<Duration>,
    cursor_flags: BTreeSet<CursorFlag>,
    upsert: bool,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
    read_concern: Option<ReadConcern>,
}

/// A query under construction.
///
/// Configuration methods mutate the view and return it for chaining. Every
/// terminal operation snapshots the current configuration into a fresh
/// descriptor, so one view can serve several terminal calls:
///
/// ```ignore
/// let mut active = orders.find(doc! { "status": "A" });
/// active.sort(doc! { "placed_at": -1 }).limit(10);
///
/// let total = active.count().await?;
/// let latest = active.to_vec().await?;
/// ```
///
/// A view is owned by one caller; share descriptors, not views.
pub struct View<T> {
    collection: Collection<T>,
    context: QueryContext,
}

impl<T> Clone for View<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T> fmt::Debug for View<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("namespace", self.collection.namespace())
            .field("context", &self.context)
            .finish()
    }
}

impl<T: Entity> View<T> {
    pub(crate) fn new(collection: Collection<T>) -> Self {
        Self {
            collection,
            context: QueryContext::default(),
        }
    }

    pub fn filter(&mut self, criteria: Document) -> &mut Self {
        self.context.criteria = criteria;
        self
    }

    pub fn sort(&mut self, sort: Document) -> &mut Self {
        self.context.sort = Some(sort);
        self
    }

    pub fn sort_by<F: Display>(
        &mut self,
        fields: impl IntoIterator<Item = (F, Order)>,
    ) -> &mut Self {
        self.sort(sort_document(fields))
    }

    pub fn projection(&mut self, projection: Document) -> &mut Self {
        self.context.projection = Some(projection);
        self
    }

    /// Returns only `fields`, leaving out `_id` unless it is listed.
    pub fn fields_only(&mut self, fields: &'static [&'static str]) -> &mut Self {
        self.projection(projection_document(fields))
    }

    pub fn modifiers(&mut self, modifiers: Document) -> &mut Self {
        self.context.modifiers = Some(modifiers);
        self
    }

    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.context.skip = skip;
        self
    }

    /// `0` means no limit. Plural removes and updates only accept `0` or `1`.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.context.limit = Some(limit);
        self
    }

    pub fn batch_size(&mut self, batch_size: i32) -> &mut Self {
        self.context.batch_size = batch_size;
        self
    }

    pub fn max_time(&mut self, max_time: Duration) -> &mut Self {
        self.context.max_time = Some(max_time);
        self
    }

    pub fn cursor_flags(&mut self, flags: impl IntoIterator<Item = CursorFlag>) -> &mut Self {
        self.context.cursor_flags = flags.into_iter().collect();
        self
    }

    pub fn cursor_flag(&mut self, flag: CursorFlag) -> &mut Self {
        self.context.cursor_flags.insert(flag);
        self
    }

    /// Makes updates and replacements insert when nothing matches.
    pub fn upsert(&mut self) -> &mut Self {
        self.context.upsert = true;
        self
    }

    pub fn with_read_preference(&mut self, read_preference: ReadPreference) -> &mut Self {
        self.context.read_preference = Some(read_preference);
        self
    }

    pub fn with_write_concern(&mut self, write_concern: WriteConcern) -> &mut Self {
        self.context.write_concern = Some(write_concern);
        self
    }

    pub fn with_read_concern(&mut self, read_concern: ReadConcern) -> &mut Self {
        self.context.read_concern = Some(read_concern);
        self
    }

    pub fn read_preference(&self) -> ReadPreference {
        self.context
            .read_preference
            .clone()
            .unwrap_or_else(|| self.collection.options().read_preference.clone())
    }

    pub fn write_concern(&self) -> WriteConcern {
        self.context
            .write_concern
            .clone()
            .unwrap_or_else(|| self.collection.options().write_concern.clone())
    }

    pub fn read_concern(&self) -> Option<ReadConcern> {
        self.context
            .read_concern
            .clone()
            .or_else(|| self.collection.options().read_concern.clone())
    }

    pub fn find_operation(&self) -> FindOperation {
        let context = &self.context;

        FindOperation {
            namespace: self.collection.namespace().clone(),
            criteria: context.criteria.clone(),
            projection: context.projection.clone(),
            sort: context.sort.clone(),
            modifiers: context.modifiers.clone(),
            skip: context.skip,
            limit: context.limit.unwrap_or(0),
            batch_size: context.batch_size,
            max_time: context.max_time,
            cursor_flags: context.cursor_flags.clone(),
            read_concern: self.read_concern(),
        }
    }

    /// Projection and sort do not affect a count.
    pub fn count_operation(&self) -> CountOperation {
        CountOperation {
            namespace: self.collection.namespace().clone(),
            criteria: self.context.criteria.clone(),
            skip: self.context.skip,
            limit: self.context.limit.unwrap_or(0),
            max_time: self.context.max_time,
            read_concern: self.read_concern(),
        }
    }

    fn find_and_modify_operation(
        &self,
        modification: Modification,
        return_document: ReturnDocument,
    ) -> FindAndModifyOperation {
        let upsert = self.context.upsert && !matches!(modification, Modification::Remove);

        FindAndModifyOperation {
            namespace: self.collection.namespace().clone(),
            filter: self.context.criteria.clone(),
            projection: self.context.projection.clone(),
            sort: self.context.sort.clone(),
            modification,
            upsert,
            return_document,
        }
    }

    fn batch<R>(&self, requests: Vec<R>) -> WriteBatch<R> {
        WriteBatch::ordered(
            self.collection.namespace().clone(),
            self.write_concern(),
            requests,
        )
    }

    /// Whether a plural remove or update applies to every match.
    fn multi_from_limit(&self) -> Result<bool> {
        match self.context.limit {
            None | Some(0) => Ok(true),
            Some(1) => Ok(false),
            Some(limit) => Err(Error::InvalidLimit(limit)),
        }
    }

    pub fn get(&self) -> BoxFuture<'_, Result<Cursor<T>>> {
        async move {
            executor::open_cursor(
                self.collection.executor(),
                ReadOperation::Find(self.find_operation()),
                self.read_preference(),
            )
            .await
        }
        .boxed()
    }

    /// Fetches the first match without keeping a cursor open.
    pub fn get_one(&self) -> BoxFuture<'_, Result<Option<T>>> {
        async move {
            let mut operation = self.find_operation();
            operation.batch_size = SINGLE_BATCH;

            let cursor: Cursor<T> = executor::open_cursor(
                self.collection.executor(),
                ReadOperation::Find(operation),
                self.read_preference(),
            )
            .await?;

            cursor.first().await
        }
        .boxed()
    }

    pub fn count(&self) -> BoxFuture<'_, Result<u64>> {
        async move {
            executor::count(
                self.collection.executor(),
                ReadOperation::Count(self.count_operation()),
                self.read_preference(),
            )
            .await
        }
        .boxed()
    }

    /// Inserts `document`, generating an `_id` first if it has none.
    pub fn insert<'a>(&'a self, document: &'a mut T) -> BoxFuture<'a, Result<WriteResult>> {
        async move {
            let request = insert_request(document)?;

            executor::acknowledged(
                self.collection.executor(),
                WriteOperation::Insert(self.batch(vec![request])),
            )
            .await
        }
        .boxed()
    }

    pub fn insert_many<'a>(
        &'a self,
        documents: &'a mut [T],
    ) -> BoxFuture<'a, Result<WriteResult>> {
        async move {
            let requests = documents
                .iter_mut()
                .map(insert_request)
                .collect::<Result<Vec<_>>>()?;

            executor::acknowledged(
                self.collection.executor(),
                WriteOperation::Insert(self.batch(requests)),
            )
            .await
        }
        .boxed()
    }

    /// Inserts `document` if it has no `_id`, otherwise upserts it by `_id`.
    pub fn save<'a>(&'a self, document: &'a mut T) -> BoxFuture<'a, Result<WriteResult>> {
        async move {
            let id = document
                .identity()
                .ok_or(Error::UnsupportedOperation)?
                .document_id();

            match id {
                None => self.insert(document).await,
                Some(id) => {
                    let mut by_id = self.clone();
                    by_id.filter(doc! { "_id": id }).upsert();
                    by_id.replace(document).await
                }
            }
        }
        .boxed()
    }

    /// Removes every match, or a single one if the limit is `1`.
    pub fn remove(&self) -> BoxFuture<'_, Result<WriteResult>> {
        async move {
            let multi = self.multi_from_limit()?;
            self.submit_remove(multi).await
        }
        .boxed()
    }

    pub fn remove_one(&self) -> BoxFuture<'_, Result<WriteResult>> {
        self.submit_remove(false)
    }

    fn submit_remove(&self, multi: bool) -> BoxFuture<'_, Result<WriteResult>> {
        async move {
            let request = RemoveRequest {
                filter: self.context.criteria.clone(),
                multi,
            };

            executor::acknowledged(
                self.collection.executor(),
                WriteOperation::Remove(self.batch(vec![request])),
            )
            .await
        }
        .boxed()
    }

    /// Applies `update` to every match, or to a single one if the limit is `1`.
    pub fn update(&self, update: Document) -> BoxFuture<'_, Result<WriteResult>> {
        async move {
            let multi = self.multi_from_limit()?;
            self.submit_update(update, multi).await
        }
        .boxed()
    }

    pub fn update_one(&self, update: Document) -> BoxFuture<'_, Result<WriteResult>> {
        self.submit_update(update, false)
    }

    fn submit_update(&self, update: Document, multi: bool) -> BoxFuture<'_, Result<WriteResult>> {
        async move {
            let request = UpdateRequest {
                filter: self.context.criteria.clone(),
                update,
                upsert: self.context.upsert,
                multi,
            };

            executor::acknowledged(
                self.collection.executor(),
                WriteOperation::Update(self.batch(vec![request])),
            )
            .await
        }
        .boxed()
    }

    /// Replaces a single match with `replacement`.
    pub fn replace<'a>(&'a self, replacement: &'a T) -> BoxFuture<'a, Result<WriteResult>> {
        async move {
            let request = ReplaceRequest {
                filter: self.context.criteria.clone(),
                replacement: bson::to_document(replacement)?,
                upsert: self.context.upsert,
            };

            executor::acknowledged(
                self.collection.executor(),
                WriteOperation::Replace(self.batch(vec![request])),
            )
            .await
        }
        .boxed()
    }

    pub fn find_one_and_update(
        &self,
        update: Document,
        return_document: ReturnDocument,
    ) -> BoxFuture<'_, Result<Option<T>>> {
        self.find_and_modify(Modification::Update(update), return_document)
    }

    pub fn update_one_and_get(&self, update: Document) -> BoxFuture<'_, Result<Option<T>>> {
        self.find_one_and_update(update, ReturnDocument::After)
    }

    pub fn get_one_and_update(&self, update: Document) -> BoxFuture<'_, Result<Option<T>>> {
        self.find_one_and_update(update, ReturnDocument::Before)
    }

    pub fn find_one_and_replace<'a>(
        &'a self,
        replacement: &'a T,
        return_document: ReturnDocument,
    ) -> BoxFuture<'a, Result<Option<T>>> {
        async move {
            let replacement = bson::to_document(replacement)?;
            self.find_and_modify(Modification::Replace(replacement), return_document)
                .await
        }
        .boxed()
    }

    pub fn replace_one_and_get<'a>(
        &'a self,
        replacement: &'a T,
    ) -> BoxFuture<'a, Result<Option<T>>> {
        self.find_one_and_replace(replacement, ReturnDocument::After)
    }

    pub fn get_one_and_replace<'a>(
        &'a self,
        replacement: &'a T,
    ) -> BoxFuture<'a, Result<Option<T>>> {
        self.find_one_and_replace(replacement, ReturnDocument::Before)
    }

    /// Removes the first match and returns it.
    pub fn get_one_and_remove(&self) -> BoxFuture<'_, Result<Option<T>>> {
        self.find_and_modify(Modification::Remove, ReturnDocument::Before)
    }

    fn find_and_modify(
        &self,
        modification: Modification,
        return_document: ReturnDocument,
    ) -> BoxFuture<'_, Result<Option<T>>> {
        async move {
            let operation = self.find_and_modify_operation(modification, return_document);

            let document = executor::modified_document(
                self.collection.executor(),
                WriteOperation::FindAndModify(operation),
            )
            .await?;

            Ok(document.map(bson::from_document::<T>).transpose()?)
        }
        .boxed()
    }

    /// A map-reduce over the documents this view matches, up to its limit.
    pub fn map_reduce(
        &self,
        map: impl Into<String>,
        reduce: impl Into<String>,
    ) -> MapReduce<Document> {
        let mut map_reduce = MapReduce::new(
            self.collection.namespace().clone(),
            self.collection.shared_executor(),
            self.read_preference(),
            self.read_concern(),
            map.into(),
            reduce.into(),
        );

        map_reduce
            .filter(self.context.criteria.clone())
            .limit(self.context.limit.unwrap_or(0));
        map_reduce
    }
}

fn insert_request<T: Entity>(document: &mut T) -> Result<InsertRequest> {
    if let Some(identity) = document.identity_mut() {
        identity.generate_id_if_absent();
    }

    Ok(InsertRequest {
        document: bson::to_document(&*document)?,
    })
}

impl<T: Entity> Iterable for View<T> {
    type Item = T;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<T>>> {
        self.get()
    }
}
