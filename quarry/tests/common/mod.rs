#![allow(dead_code)]

use futures_util::{
    FutureExt,
    future::{self, BoxFuture},
};
use mongodb::options::ReadPreference;
use quarry::{
    BatchCursor, Database, Entity, Error, Executor, Fields, InlineCursor, ReadReply, Result,
    WriteReply,
    bson::{Document, oid::ObjectId},
    operation::{MapReduceStatistics, ReadOperation, WriteOperation, WriteResult},
};
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity, Fields)]
pub struct Purchase {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub status: String,
    #[serde(rename = "amt")]
    pub amount: i64,
}

impl Purchase {
    pub fn new(status: &str, amount: i64) -> Self {
        Self {
            id: None,
            status: status.to_owned(),
            amount,
        }
    }
}

/// An entity without identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
pub struct Event {
    pub kind: String,
}

#[derive(Clone, Debug)]
pub enum Submission {
    Read(ReadOperation, ReadPreference),
    Write(WriteOperation),
}

impl Submission {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read(operation, _) => operation.name(),
            Self::Write(operation) => operation.name(),
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}

#[derive(Default)]
struct State {
    submissions: Vec<Submission>,
    documents: Vec<Document>,
    count: u64,
    modified: Option<Document>,
    statistics: MapReduceStatistics,
    fail_writes: bool,
    fail_close: bool,
}

/// An executor that records every descriptor it receives and answers from
/// scripted data.
#[derive(Default)]
pub struct Recorder {
    state: Mutex<State>,
    closes: Arc<AtomicUsize>,
    write_gate: Option<Arc<Notify>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every write waits for `gate` to be notified before replying.
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            write_gate: Some(gate),
            ..Self::default()
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_documents(self: &Arc<Self>, documents: impl IntoIterator<Item = Document>) {
        self.state().documents = documents.into_iter().collect();
    }

    pub fn with_count(self: &Arc<Self>, count: u64) {
        self.state().count = count;
    }

    pub fn with_modified(self: &Arc<Self>, document: Document) {
        self.state().modified = Some(document);
    }

    pub fn with_statistics(self: &Arc<Self>, statistics: MapReduceStatistics) {
        self.state().statistics = statistics;
    }

    pub fn failing_writes(self: &Arc<Self>) {
        self.state().fail_writes = true;
    }

    pub fn failing_close(self: &Arc<Self>) {
        self.state().fail_close = true;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.state().submissions.iter().map(Submission::name).collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_read(&self) -> (ReadOperation, ReadPreference) {
        self.state()
            .submissions
            .iter()
            .rev()
            .find_map(|submission| match submission {
                Submission::Read(operation, read_preference) => {
                    Some((operation.clone(), read_preference.clone()))
                }
                Submission::Write(_) => None,
            })
            .expect("no read was submitted")
    }

    pub fn last_write(&self) -> WriteOperation {
        self.state()
            .submissions
            .iter()
            .rev()
            .find_map(|submission| match submission {
                Submission::Write(operation) => Some(operation.clone()),
                Submission::Read(..) => None,
            })
            .expect("no write was submitted")
    }
}

impl Executor for Recorder {
    fn read(
        &self,
        operation: ReadOperation,
        read_preference: ReadPreference,
    ) -> BoxFuture<'_, Result<ReadReply>> {
        let mut state = self.state();

        let reply = match &operation {
            ReadOperation::Count(_) => ReadReply::Count(state.count),
            _ => ReadReply::Cursor(Box::new(TrackedCursor {
                inner: InlineCursor::new(state.documents.clone(), 2),
                closes: Arc::clone(&self.closes),
                fail_close: state.fail_close,
            })),
        };

        state
            .submissions
            .push(Submission::Read(operation, read_preference));

        future::ready(Ok(reply)).boxed()
    }

    fn write(&self, operation: WriteOperation) -> BoxFuture<'_, Result<WriteReply>> {
        let reply = {
            let mut state = self.state();

            let reply = if state.fail_writes {
                Err(Error::execution("write rejected"))
            } else {
                Ok(match &operation {
                    WriteOperation::Insert(batch) => WriteReply::Acknowledged(WriteResult {
                        count: batch.requests.len() as u64,
                        ..WriteResult::default()
                    }),
                    WriteOperation::FindAndModify(_) => {
                        WriteReply::Document(state.modified.clone())
                    }
                    WriteOperation::MapReduce(_) => {
                        WriteReply::MapReduce(state.statistics.clone())
                    }
                    _ => WriteReply::Acknowledged(WriteResult {
                        count: 1,
                        ..WriteResult::default()
                    }),
                })
            };

            state.submissions.push(Submission::Write(operation));
            reply
        };

        let gate = self.write_gate.clone();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            reply
        }
        .boxed()
    }
}

struct TrackedCursor {
    inner: InlineCursor,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl BatchCursor for TrackedCursor {
    fn next_batch(&mut self) -> BoxFuture<'_, Result<Option<Vec<Document>>>> {
        self.inner.next_batch()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        self.closes.fetch_add(1, Ordering::SeqCst);

        if self.fail_close {
            future::ready(Err(Error::execution("connection reset"))).boxed()
        } else {
            self.inner.close()
        }
    }
}

pub fn database(recorder: &Arc<Recorder>) -> Database {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Database::new("shop", Arc::clone(recorder) as Arc<dyn Executor>)
}
