use crate::{Error, Result, executor::BatchCursor};
use futures_util::{
    FutureExt, Stream,
    future::BoxFuture,
    stream,
};
use mongodb::bson::{self, Document};
use serde::de::DeserializeOwned;
use std::{collections::VecDeque, fmt, sync::Arc};
use tracing::{trace, warn};

type Decode<T> = Box<dyn Fn(Document) -> Result<T> + Send + Sync>;

/// Typed view over a [`BatchCursor`].
///
/// The underlying cursor is closed at most once, no matter how many times
/// [`Cursor::close`] is called. [`Cursor::for_each`] and
/// [`Cursor::collect_into`] always close it before returning.
pub struct Cursor<T> {
    inner: Box<dyn BatchCursor>,
    buffer: VecDeque<Document>,
    exhausted: bool,
    closed: bool,
    decode: Decode<T>,
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned + Send + 'static> Cursor<T> {
    pub fn new(inner: Box<dyn BatchCursor>) -> Self {
        Self {
            inner,
            buffer: VecDeque::new(),
            exhausted: false,
            closed: false,
            decode: Box::new(|document: Document| {
                bson::from_document(document).map_err(Error::from)
            }),
        }
    }
}

impl<T: Send + 'static> Cursor<T> {
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(document) = self.buffer.pop_front() {
                return (self.decode)(document).map(Some);
            }

            if self.exhausted || self.closed {
                return Ok(None);
            }

            match self.inner.next_batch().await? {
                Some(batch) => {
                    trace!(size = batch.len(), "received batch");
                    self.buffer.extend(batch);
                }
                None => self.exhausted = true,
            }
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.buffer.clear();
        self.inner.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reads the next item and closes the cursor.
    pub async fn first(mut self) -> Result<Option<T>> {
        let first = self.next().await;
        let closed = self.close().await;

        match (first, closed) {
            (Err(error), Err(close_error)) => {
                warn!(error = %close_error, "failed to close cursor after read error");
                Err(error)
            }
            (Err(error), Ok(())) => Err(error),
            (Ok(item), closed) => closed.map(|()| item),
        }
    }

    /// Applies `action` to every remaining item, then closes the cursor.
    ///
    /// If `action` fails, iteration stops and that error is returned even if
    /// closing the cursor fails as well.
    pub async fn for_each<F>(mut self, mut action: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()> + Send,
    {
        let outcome = self.drain(&mut action).await;

        let closed = self.close().await;

        match (outcome, closed) {
            (Err(error), Err(close_error)) => {
                warn!(error = %close_error, "failed to close cursor after iteration error");
                Err(error)
            }
            (Err(error), Ok(())) => Err(error),
            (Ok(()), closed) => closed,
        }
    }

    async fn drain<F>(&mut self, action: &mut F) -> Result<()>
    where
        F: FnMut(T) -> Result<()> + Send,
    {
        while let Some(item) = self.next().await? {
            action(item)?;
        }

        Ok(())
    }

    pub async fn collect_into<C>(self, target: &mut C) -> Result<()>
    where
        C: Extend<T> + Send,
    {
        self.for_each(|item| {
            target.extend(Some(item));
            Ok(())
        })
        .await
    }

    pub fn map<U, F>(self, mapper: F) -> Cursor<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let decode = self.decode;

        Cursor {
            inner: self.inner,
            buffer: self.buffer,
            exhausted: self.exhausted,
            closed: self.closed,
            decode: Box::new(move |document: Document| decode(document).map(&mapper)),
        }
    }

    /// Streams the remaining items.
    ///
    /// The cursor is closed once the stream reaches its end or yields an
    /// error. A stream dropped early leaves the server cursor to time out.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        stream::try_unfold(self, Self::step)
    }

    async fn step(mut self) -> Result<Option<(T, Self)>> {
        match self.next().await {
            Ok(Some(item)) => Ok(Some((item, self))),
            Ok(None) => self.close().await.map(|()| None),
            Err(error) => {
                if let Err(close_error) = self.close().await {
                    warn!(error = %close_error, "failed to close cursor after stream error");
                }
                Err(error)
            }
        }
    }
}

/// A source of results that can be iterated more than once.
///
/// Each accessor opens a fresh cursor through [`Iterable::cursor`]; the bulk
/// accessors close it before they resolve.
pub trait Iterable: Send + Sync {
    type Item: Send + 'static;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<Self::Item>>>;

    fn first(&self) -> BoxFuture<'_, Result<Option<Self::Item>>> {
        async move { self.cursor().await?.first().await }.boxed()
    }

    fn for_each<'a, F>(&'a self, action: F) -> BoxFuture<'a, Result<()>>
    where
        F: FnMut(Self::Item) -> Result<()> + Send + 'a,
    {
        async move { self.cursor().await?.for_each(action).await }.boxed()
    }

    fn collect_into<'a, C>(&'a self, target: &'a mut C) -> BoxFuture<'a, Result<()>>
    where
        C: Extend<Self::Item> + Send,
    {
        async move { self.cursor().await?.collect_into(target).await }.boxed()
    }

    fn to_vec(&self) -> BoxFuture<'_, Result<Vec<Self::Item>>> {
        async move {
            let mut items = Vec::new();
            self.collect_into(&mut items).await?;
            Ok(items)
        }
        .boxed()
    }

    fn map<U, F>(self, mapper: F) -> Mapped<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Item) -> U + Send + Sync + 'static,
    {
        Mapped {
            source: self,
            mapper: Arc::new(mapper),
        }
    }
}

#[derive(Debug)]
pub struct Mapped<I, F> {
    source: I,
    mapper: Arc<F>,
}

impl<I, F, U> Iterable for Mapped<I, F>
where
    I: Iterable,
    F: Fn(I::Item) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    type Item = U;

    fn cursor(&self) -> BoxFuture<'_, Result<Cursor<U>>> {
        async move {
            let mapper = Arc::clone(&self.mapper);
            let cursor = self.source.cursor().await?;
            Ok(cursor.map(move |item| mapper(item)))
        }
        .boxed()
    }
}
