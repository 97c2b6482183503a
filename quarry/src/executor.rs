//! The contract through which descriptors reach the execution engine.
//!
//! The engine itself (connections, wire protocol, server selection) lives
//! outside this crate. Anything able to run a [`ReadOperation`] or a
//! [`WriteOperation`] and report exactly one outcome can implement
//! [`Executor`]; a blocking engine simply returns ready futures.

use crate::{
    Error, Result,
    cursor::Cursor,
    operation::{MapReduceStatistics, ReadOperation, WriteOperation, WriteResult},
};
use futures_util::{
    FutureExt,
    future::{self, BoxFuture},
};
use mongodb::{bson::Document, options::ReadPreference};
use serde::de::DeserializeOwned;
use std::{collections::VecDeque, fmt};
use tracing::debug;

pub enum ReadReply {
    Cursor(Box<dyn BatchCursor>),
    Count(u64),
}

impl fmt::Debug for ReadReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor(_) => f.write_str("Cursor(..)"),
            Self::Count(count) => f.debug_tuple("Count").field(count).finish(),
        }
    }
}

#[derive(Debug)]
pub enum WriteReply {
    Acknowledged(WriteResult),
    /// The image returned by a find-and-modify, if a document matched.
    Document(Option<Document>),
    MapReduce(MapReduceStatistics),
}

pub trait Executor: Send + Sync {
    fn read(
        &self,
        operation: ReadOperation,
        read_preference: ReadPreference,
    ) -> BoxFuture<'_, Result<ReadReply>>;

    fn write(&self, operation: WriteOperation) -> BoxFuture<'_, Result<WriteReply>>;
}

/// A server-side cursor, fetched batch by batch.
pub trait BatchCursor: Send {
    /// Returns `None` once the cursor is exhausted.
    fn next_batch(&mut self) -> BoxFuture<'_, Result<Option<Vec<Document>>>>;

    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// A cursor over results that arrived with the command reply.
#[derive(Debug)]
pub struct InlineCursor {
    documents: VecDeque<Document>,
    batch_size: usize,
}

impl InlineCursor {
    /// A `batch_size` of zero hands out everything in one batch.
    pub fn new(documents: impl IntoIterator<Item = Document>, batch_size: usize) -> Self {
        Self {
            documents: documents.into_iter().collect(),
            batch_size,
        }
    }
}

impl BatchCursor for InlineCursor {
    fn next_batch(&mut self) -> BoxFuture<'_, Result<Option<Vec<Document>>>> {
        let batch = if self.documents.is_empty() {
            None
        } else {
            let size = match self.batch_size {
                0 => self.documents.len(),
                size => size.min(self.documents.len()),
            };
            Some(self.documents.drain(..size).collect())
        };

        future::ready(Ok(batch)).boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        self.documents.clear();
        future::ready(Ok(())).boxed()
    }
}

pub(crate) async fn open_cursor<T: DeserializeOwned + Send + 'static>(
    executor: &dyn Executor,
    operation: ReadOperation,
    read_preference: ReadPreference,
) -> Result<Cursor<T>> {
    let name = operation.name();
    debug!(operation = name, namespace = %operation.namespace(), "submitting read");

    match executor.read(operation, read_preference).await? {
        ReadReply::Cursor(cursor) => Ok(Cursor::new(cursor)),
        ReadReply::Count(_) => Err(Error::UnexpectedReply { operation: name }),
    }
}

pub(crate) async fn count(
    executor: &dyn Executor,
    operation: ReadOperation,
    read_preference: ReadPreference,
) -> Result<u64> {
    let name = operation.name();
    debug!(operation = name, namespace = %operation.namespace(), "submitting read");

    match executor.read(operation, read_preference).await? {
        ReadReply::Count(count) => Ok(count),
        ReadReply::Cursor(_) => Err(Error::UnexpectedReply { operation: name }),
    }
}

pub(crate) async fn write(
    executor: &dyn Executor,
    operation: WriteOperation,
) -> Result<WriteReply> {
    debug!(
        operation = operation.name(),
        namespace = %operation.namespace(),
        "submitting write"
    );

    executor.write(operation).await
}

pub(crate) async fn acknowledged(
    executor: &dyn Executor,
    operation: WriteOperation,
) -> Result<WriteResult> {
    let name = operation.name();

    match write(executor, operation).await? {
        WriteReply::Acknowledged(result) => Ok(result),
        _ => Err(Error::UnexpectedReply { operation: name }),
    }
}

pub(crate) async fn modified_document(
    executor: &dyn Executor,
    operation: WriteOperation,
) -> Result<Option<Document>> {
    let name = operation.name();

    match write(executor, operation).await? {
        WriteReply::Document(document) => Ok(document),
        _ => Err(Error::UnexpectedReply { operation: name }),
    }
}

pub(crate) async fn map_reduce_statistics(
    executor: &dyn Executor,
    operation: WriteOperation,
) -> Result<MapReduceStatistics> {
    let name = operation.name();

    match write(executor, operation).await? {
        WriteReply::MapReduce(statistics) => Ok(statistics),
        _ => Err(Error::UnexpectedReply { operation: name }),
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchCursor, InlineCursor};
    use futures_util::FutureExt;
    use mongodb::bson::doc;

    #[test]
    fn inline_cursor_splits_into_batches() {
        let mut cursor = InlineCursor::new((0..5).map(|n| doc! { "n": n }), 2);

        let sizes: Vec<usize> = std::iter::from_fn(|| {
            cursor
                .next_batch()
                .now_or_never()
                .and_then(Result::ok)
                .flatten()
                .map(|batch| batch.len())
        })
        .collect();

        assert_eq!(sizes, [2, 2, 1]);
    }

    #[test]
    fn inline_cursor_without_batch_size_returns_everything() {
        let mut cursor = InlineCursor::new((0..3).map(|n| doc! { "n": n }), 0);

        let batch = cursor.next_batch().now_or_never().unwrap().unwrap();
        assert_eq!(batch.map(|batch| batch.len()), Some(3));

        let next = cursor.next_batch().now_or_never().unwrap().unwrap();
        assert!(next.is_none());
    }
}
