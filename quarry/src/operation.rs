//! Command descriptors.
//!
//! Every type in this module is plain data describing exactly one server
//! interaction. Descriptors own copies of everything they were built from and
//! can be cloned, shared across tasks and resubmitted freely.

use mongodb::{
    Namespace,
    bson::{Bson, Document},
    options::{ReadConcern, WriteConcern},
};
use std::{collections::BTreeSet, time::Duration};

/// Batch size telling the server to return a single batch and close the cursor.
pub const SINGLE_BATCH: i32 = -1;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CursorFlag {
    Tailable,
    SlaveOk,
    OplogReplay,
    NoCursorTimeout,
    AwaitData,
    Exhaust,
    Partial,
}

#[derive(Clone, Debug)]
pub struct FindOperation {
    pub namespace: Namespace,
    pub criteria: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub modifiers: Option<Document>,
    pub skip: u64,
    /// `0` means no limit.
    pub limit: i64,
    /// `0` lets the server pick; see [`SINGLE_BATCH`].
    pub batch_size: i32,
    pub max_time: Option<Duration>,
    pub cursor_flags: BTreeSet<CursorFlag>,
    pub read_concern: Option<ReadConcern>,
}

#[derive(Clone, Debug)]
pub struct CountOperation {
    pub namespace: Namespace,
    pub criteria: Document,
    pub skip: u64,
    pub limit: i64,
    pub max_time: Option<Duration>,
    pub read_concern: Option<ReadConcern>,
}

#[derive(Clone, Debug)]
pub struct AggregateOperation {
    pub namespace: Namespace,
    pub pipeline: Vec<Document>,
    pub read_concern: Option<ReadConcern>,
}

#[derive(Clone, Debug)]
pub struct WriteBatch<R> {
    pub namespace: Namespace,
    /// Stop at the first failing request.
    pub ordered: bool,
    pub write_concern: WriteConcern,
    pub requests: Vec<R>,
}

impl<R> WriteBatch<R> {
    pub fn ordered(namespace: Namespace, write_concern: WriteConcern, requests: Vec<R>) -> Self {
        Self {
            namespace,
            ordered: true,
            write_concern,
            requests,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertRequest {
    pub document: Document,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateRequest {
    pub filter: Document,
    pub update: Document,
    pub upsert: bool,
    pub multi: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReplaceRequest {
    pub filter: Document,
    pub replacement: Document,
    pub upsert: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveRequest {
    pub filter: Document,
    pub multi: bool,
}

/// Which image of the document a find-and-modify returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    Before,
    #[default]
    After,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Modification {
    Update(Document),
    Replace(Document),
    Remove,
}

#[derive(Clone, Debug)]
pub struct FindAndModifyOperation {
    pub namespace: Namespace,
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub modification: Modification,
    /// Ignored for [`Modification::Remove`].
    pub upsert: bool,
    /// Always [`ReturnDocument::Before`] for [`Modification::Remove`].
    pub return_document: ReturnDocument,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapReduceAction {
    #[default]
    Replace,
    Merge,
    Reduce,
}

impl MapReduceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
            Self::Reduce => "reduce",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputCollection {
    pub collection: String,
    /// Defaults to the source collection's database.
    pub database: Option<String>,
    pub action: MapReduceAction,
    pub sharded: bool,
    pub non_atomic: bool,
    pub bypass_document_validation: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapReduceOutput {
    Inline,
    Collection(OutputCollection),
}

#[derive(Clone, Debug)]
pub struct MapReduceOperation {
    pub namespace: Namespace,
    pub map: String,
    pub reduce: String,
    pub finalize: Option<String>,
    pub scope: Option<Document>,
    pub filter: Option<Document>,
    pub sort: Option<Document>,
    pub limit: i64,
    pub js_mode: bool,
    pub verbose: bool,
    pub max_time: Option<Duration>,
    pub read_concern: Option<ReadConcern>,
    pub output: MapReduceOutput,
}

impl MapReduceOperation {
    /// Namespace the results are written to, if the output is a collection.
    pub fn output_namespace(&self) -> Option<Namespace> {
        match &self.output {
            MapReduceOutput::Inline => None,
            MapReduceOutput::Collection(output) => Some(Namespace {
                db: output
                    .database
                    .clone()
                    .unwrap_or_else(|| self.namespace.db.clone()),
                coll: output.collection.clone(),
            }),
        }
    }
}

/// Descriptors submitted through [`Executor::read`](crate::Executor::read).
#[derive(Clone, Debug)]
pub enum ReadOperation {
    Find(FindOperation),
    Count(CountOperation),
    Aggregate(AggregateOperation),
    MapReduce(MapReduceOperation),
}

impl ReadOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Find(_) => "find",
            Self::Count(_) => "count",
            Self::Aggregate(_) => "aggregate",
            Self::MapReduce(_) => "mapReduce",
        }
    }

    pub fn namespace(&self) -> &Namespace {
        match self {
            Self::Find(op) => &op.namespace,
            Self::Count(op) => &op.namespace,
            Self::Aggregate(op) => &op.namespace,
            Self::MapReduce(op) => &op.namespace,
        }
    }
}

/// Descriptors submitted through [`Executor::write`](crate::Executor::write).
#[derive(Clone, Debug)]
pub enum WriteOperation {
    Insert(WriteBatch<InsertRequest>),
    Update(WriteBatch<UpdateRequest>),
    Replace(WriteBatch<ReplaceRequest>),
    Remove(WriteBatch<RemoveRequest>),
    FindAndModify(FindAndModifyOperation),
    MapReduce(MapReduceOperation),
}

impl WriteOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Replace(_) => "replace",
            Self::Remove(_) => "delete",
            Self::FindAndModify(_) => "findAndModify",
            Self::MapReduce(_) => "mapReduce",
        }
    }

    pub fn namespace(&self) -> &Namespace {
        match self {
            Self::Insert(batch) => &batch.namespace,
            Self::Update(batch) => &batch.namespace,
            Self::Replace(batch) => &batch.namespace,
            Self::Remove(batch) => &batch.namespace,
            Self::FindAndModify(op) => &op.namespace,
            Self::MapReduce(op) => &op.namespace,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteResult {
    /// Documents inserted, matched or removed.
    pub count: u64,
    pub updated_existing: bool,
    pub upserted_id: Option<Bson>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapReduceStatistics {
    pub input_count: u64,
    pub output_count: u64,
    pub emit_count: u64,
    pub duration: Duration,
}
