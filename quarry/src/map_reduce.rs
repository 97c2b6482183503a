//! Map-reduce planning.
//!
//! A [`MapReduce`] starts out producing inline results: one command, whose
//! reply is the result cursor. Naming an output collection switches it, for
//! good, to writing its results into that collection. Reading them then
//! takes two steps: the map-reduce runs as a write command, and only once
//! it has completed successfully is a plain find issued against the output
//! collection.

use crate::{
    Collection, CollectionOptions, Entity, Error, Executor, Result,
    cursor::{Cursor, Iterable},
    executor,
    operation::{
        MapReduceAction, MapReduceOperation, MapReduceOutput, MapReduceStatistics,
        OutputCollection, ReadOperation, WriteOperation,
    },
};
use futures_util::{FutureExt, future::BoxFuture};
use mongodb::{
    Namespace,
    bson::Document,
    options::{ReadConcern, ReadPreference},
};
use std::{fmt, marker::PhantomData, sync::Arc, time::Duration};
use tracing::debug;

/// Map-reduce configuration.
///
/// Implements [`Iterable`]: every accessor (`first`, `for_each`,
/// `collect_into`, `cursor`) goes through [`MapReduce::execute`].
pub struct MapReduce<R> {
    namespace: Namespace,
    executor: Arc<dyn Executor>,
    read_preference: ReadPreference,
    read_concern: Option<ReadConcern>,
    map: String,
    reduce: String,
    finalize: Option<String>,
    scope: Option<Document>,
    filter: Option<Document>,
    sort: Option<Document>,
    limit: i64,
    js_mode: bool,
    verbose: bool,
    max_time: Option<Duration>,
    collection_name: Option<String>,
    database_name: Option<String>,
    action: MapReduceAction,
    sharded: bool,
    non_atomic: bool,
    bypass_document_validation: Option<bool>,
    batch_size: i32,
    _marker: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for MapReduce<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduce")
            .field("namespace", &self.namespace)
            .field("collection_name", &self.collection_name)
            .field("database_name", &self.database_name)
            .field("action", &self.action)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<R: Entity> MapReduce<R> {
    pub(crate) fn new(
        namespace: Namespace,
        executor: Arc<dyn Executor>,
        read_preference: ReadPreference,
        read_concern: Option<ReadConcern>,
        map: String,
        reduce: String,
    ) -> Self {
        Self {
            namespace,
            executor,
            read_preference,
            read_concern,
            map,
            reduce,
            finalize: None,
            scope: None,
            filter: None,
            sort: None,
            limit: 0,
            js_mode: false,
            verbose: true,
            max_time: None,
            collection_name: None,
            database_name: None,
            action: MapReduceAction::Replace,
            sharded: false,
            non_atomic: false,
            bypass_document_validation: None,
            batch_size: 0,
            _marker: PhantomData,
        }
    }

    /// Writes the results into `collection_name` instead of returning them inline.
    pub fn collection_name(&mut self, collection_name: impl Into<String>) -> &mut Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    pub fn finalize(&mut self, finalize: impl Into<String>) -> &mut Self {
        self.finalize = Some(finalize.into());
        self
    }

    pub fn scope(&mut self, scope: Document) -> &mut Self {
        self.scope = Some(scope);
        self
    }

    pub fn filter(&mut self, filter: Document) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(&mut self, sort: Document) -> &mut Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn js_mode(&mut self, js_mode: bool) -> &mut Self {
        self.js_mode = js_mode;
        self
    }

    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    pub fn max_time(&mut self, max_time: Duration) -> &mut Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn action(&mut self, action: MapReduceAction) -> &mut Self {
        self.action = action;
        self
    }

    /// Database of the output collection. Defaults to the source database.
    pub fn database_name(&mut self, database_name: impl Into<String>) -> &mut Self {
        self.database_name = Some(database_name.into());
        self
    }

    pub fn sharded(&mut self, sharded: bool) -> &mut Self {
        self.sharded = sharded;
        self
    }

    pub fn non_atomic(&mut self, non_atomic: bool) -> &mut Self {
        self.non_atomic = non_atomic;
        self
    }

    pub fn bypass_document_validation(&mut self, bypass: bool) -> &mut Self {
        self.bypass_document_validation = Some(bypass);
        self
    }

    /// Batch size of the find reading back an output collection.
    pub fn batch_size(&mut self, batch_size: i32) -> &mut Self {
        self.batch_size = batch_size;
        self
    }

    pub fn is_inline(&self) -> bool {
        self.collection_name.is_none()
    }

    /// The command this configuration currently describes.
    pub fn operation(&self) -> MapReduceOperation {
        let output = match &self.collection_name {
            None => MapReduceOutput::Inline,
            Some(collection) => MapReduceOutput::Collection(OutputCollection {
                collection: collection.clone(),
                database: self.database_name.clone(),
                action: self.action,
                sharded: self.sharded,
                non_atomic: self.non_atomic,
                bypass_document_validation: self.bypass_document_validation,
            }),
        };

        MapReduceOperation {
            namespace: self.namespace.clone(),
            map: self.map.clone(),
            reduce: self.reduce.clone(),
            finalize: self.finalize.clone(),
            scope: self.scope.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            js_mode: self.js_mode,
            verbose: self.verbose,
            max_time: self.max_time,
            read_concern: self.read_concern.clone(),
            output,
        }
    }

    /// Plans how the results will be obtained. Nothing is submitted until
    /// the returned value is iterated.
    pub fn execute(&self) -> MapReduceResults<R> {
        let operation = self.operation();

        let plan = match operation.output_namespace() {
            None => Plan::Inline {
                operation,
                read_preference: self.read_preference.clone(),
            },
            Some(output) => Plan::AwaitingWrite {
                operation,
                output,
                batch_size: self.batch_size,
                read_concern: self.read_concern.clone(),
            },
        };

        MapReduceResults {
            executor: Arc::clone(&self.executor),
            plan,
            _marker: PhantomData,
        }
    }

    /// Runs the map-reduce into its output collection without reading the
    /// results back.
    pub fn to_collection(&self) -> BoxFuture<'_, Result<MapReduceStatistics>> {
        async move {
            if self.is_inline() {
                return Err(Error::InlineMapReduce);
            }

            executor::map_reduce_statistics(
                self.executor.as_ref(),
                WriteOperation::MapReduce(self.operation()),
            )
            .await
        }
        .boxed()
    }
}

impl<R: Entity> Iterable for MapReduce<R> {
    type Item = R;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<R>>> {
        async move { self.execute().cursor().await }.boxed()
    }
}

#[derive(Debug)]
enum Plan {
    Inline {
        operation: MapReduceOperation,
        read_preference: ReadPreference,
    },
    AwaitingWrite {
        operation: MapReduceOperation,
        output: Namespace,
        batch_size: i32,
        read_concern: Option<ReadConcern>,
    },
}

/// The planned result source of a [`MapReduce`].
pub struct MapReduceResults<R> {
    executor: Arc<dyn Executor>,
    plan: Plan,
    _marker: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for MapReduceResults<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduceResults")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl<R> MapReduceResults<R> {
    pub fn is_inline(&self) -> bool {
        matches!(self.plan, Plan::Inline { .. })
    }

    pub fn operation(&self) -> &MapReduceOperation {
        match &self.plan {
            Plan::Inline { operation, .. } | Plan::AwaitingWrite { operation, .. } => operation,
        }
    }
}

impl<R: Entity> Iterable for MapReduceResults<R> {
    type Item = R;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<R>>> {
        async move {
            match &self.plan {
                Plan::Inline {
                    operation,
                    read_preference,
                } => {
                    executor::open_cursor(
                        self.executor.as_ref(),
                        ReadOperation::MapReduce(operation.clone()),
                        read_preference.clone(),
                    )
                    .await
                }
                Plan::AwaitingWrite {
                    operation,
                    output,
                    batch_size,
                    read_concern,
                } => {
                    let statistics = executor::map_reduce_statistics(
                        self.executor.as_ref(),
                        WriteOperation::MapReduce(operation.clone()),
                    )
                    .await?;

                    debug!(
                        output = %output,
                        output_count = statistics.output_count,
                        "map-reduce output written, reading results"
                    );

                    let mut options = CollectionOptions::default();
                    options.read_concern.clone_from(read_concern);

                    let results: Collection<R> =
                        Collection::new(output.clone(), Arc::clone(&self.executor), options);
                    let mut view = results.find_all();
                    view.batch_size(*batch_size);

                    view.get().await
                }
            }
        }
        .boxed()
    }
}
