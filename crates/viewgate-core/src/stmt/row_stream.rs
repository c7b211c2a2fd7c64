use super::Row;

use std::{
    collections::VecDeque,
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::{Stream, StreamExt};

/// A source of rows: a buffered prefix plus an optional live stream.
///
/// Drivers that materialize results eagerly use [`RowStream::from_vec`];
/// streaming drivers box their stream with [`RowStream::from_stream`].
#[derive(Default)]
pub struct RowStream {
    buffer: VecDeque<Row>,
    stream: Option<DynStream>,
}

type DynStream = Pin<Box<dyn Stream<Item = crate::Result<Row>> + Send + 'static>>;

impl RowStream {
    pub fn from_vec(rows: Vec<Row>) -> Self {
        Self {
            buffer: rows.into(),
            stream: None,
        }
    }

    pub fn from_stream<T>(stream: T) -> Self
    where
        T: Stream<Item = crate::Result<Row>> + Send + 'static,
    {
        Self {
            buffer: VecDeque::new(),
            stream: Some(Box::pin(stream)),
        }
    }

    /// Returns the next row in the stream
    pub async fn next(&mut self) -> Option<crate::Result<Row>> {
        StreamExt::next(self).await
    }

    /// Drain the stream into a vector.
    pub async fn collect(mut self) -> crate::Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(self.buffer.len());
        while let Some(row) = self.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl Stream for RowStream {
    type Item = crate::Result<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(row) = self.buffer.pop_front() {
            return Poll::Ready(Some(Ok(row)));
        }

        match &mut self.stream {
            Some(stream) => Pin::new(stream).poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl From<Vec<Row>> for RowStream {
    fn from(rows: Vec<Row>) -> Self {
        Self::from_vec(rows)
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("buffer", &self.buffer)
            .field("streaming", &self.stream.is_some())
            .finish()
    }
}
