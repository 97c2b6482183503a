use crate::{Entity, Executor, MapReduce, Pipeline, Result, View, operation::WriteResult};
use futures_util::{FutureExt, future::BoxFuture};
use mongodb::{
    Namespace,
    bson::Document,
    options::{ReadConcern, ReadPreference, WriteConcern},
};
use std::{fmt, marker::PhantomData, sync::Arc};

/// Defaults applied to every query and write issued through a collection.
#[derive(Clone, Debug)]
pub struct CollectionOptions {
    pub write_concern: WriteConcern,
    pub read_preference: ReadPreference,
    pub read_concern: Option<ReadConcern>,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            write_concern: WriteConcern::default(),
            read_preference: ReadPreference::Primary,
            read_concern: None,
        }
    }
}

impl CollectionOptions {
    pub fn with_write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = write_concern;
        self
    }

    pub fn with_read_preference(mut self, read_preference: ReadPreference) -> Self {
        self.read_preference = read_preference;
        self
    }

    pub fn with_read_concern(mut self, read_concern: ReadConcern) -> Self {
        self.read_concern = Some(read_concern);
        self
    }
}

#[derive(Clone)]
pub struct Database {
    name: String,
    executor: Arc<dyn Executor>,
    options: CollectionOptions,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self::with_options(name, executor, CollectionOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
        options: CollectionOptions,
    ) -> Self {
        Self {
            name: name.into(),
            executor,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection<T: Entity>(&self, name: impl Into<String>) -> Collection<T> {
        self.collection_with_options(name, self.options.clone())
    }

    pub fn collection_with_options<T: Entity>(
        &self,
        name: impl Into<String>,
        options: CollectionOptions,
    ) -> Collection<T> {
        Collection::new(
            Namespace {
                db: self.name.clone(),
                coll: name.into(),
            },
            Arc::clone(&self.executor),
            options,
        )
    }
}

/// A typed handle to one collection. Cheap to clone.
pub struct Collection<T> {
    namespace: Namespace,
    executor: Arc<dyn Executor>,
    options: CollectionOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            executor: Arc::clone(&self.executor),
            options: self.options.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T> Collection<T> {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub(crate) fn shared_executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.executor)
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(
        namespace: Namespace,
        executor: Arc<dyn Executor>,
        options: CollectionOptions,
    ) -> Self {
        Self {
            namespace,
            executor,
            options,
            _marker: PhantomData,
        }
    }

    /// A view over every document in the collection.
    pub fn find_all(&self) -> View<T> {
        View::new(self.clone())
    }

    pub fn find(&self, filter: Document) -> View<T> {
        let mut view = self.find_all();
        view.filter(filter);
        view
    }

    pub fn with_write_concern(&self, write_concern: WriteConcern) -> View<T> {
        let mut view = self.find_all();
        view.with_write_concern(write_concern);
        view
    }

    pub fn insert<'a>(&'a self, document: &'a mut T) -> BoxFuture<'a, Result<WriteResult>> {
        async move { self.find_all().insert(document).await }.boxed()
    }

    pub fn insert_many<'a>(
        &'a self,
        documents: &'a mut [T],
    ) -> BoxFuture<'a, Result<WriteResult>> {
        async move { self.find_all().insert_many(documents).await }.boxed()
    }

    pub fn save<'a>(&'a self, document: &'a mut T) -> BoxFuture<'a, Result<WriteResult>> {
        async move { self.find_all().save(document).await }.boxed()
    }

    /// An empty aggregation pipeline over this collection.
    pub fn pipe(&self) -> Pipeline<T> {
        Pipeline::new(self.clone())
    }

    /// A map-reduce over the whole collection, decoding results as `R`.
    pub fn map_reduce<R: Entity>(
        &self,
        map: impl Into<String>,
        reduce: impl Into<String>,
    ) -> MapReduce<R> {
        MapReduce::new(
            self.namespace.clone(),
            self.shared_executor(),
            self.options.read_preference.clone(),
            self.options.read_concern.clone(),
            map.into(),
            reduce.into(),
        )
    }
}
