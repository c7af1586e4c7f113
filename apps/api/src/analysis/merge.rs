//! Stream merger: fan-in of independent fragment sources.
//!
//! Algorithm:
//! 1. Keep one pending "fetch next item" future per live source.
//! 2. Wait for whichever completes first.
//!    - item → emit it tagged with the source index, then queue that source's next fetch
//!    - end → drop the source
//!    - error → drop every pending fetch and surface the error with the source index
//! 3. Finish when no fetches remain.
//!
//! Order is FIFO within a source and unspecified across sources. A source is
//! only asked for its next item after the previous one has been handed to the
//! consumer, so a slow consumer throttles every source.

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, FuturesUnordered};
use futures::{FutureExt, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::LlmError;

pub type SourceStream<T> = BoxStream<'static, Result<T, LlmError>>;

/// Items tagged with the index of the source that produced them.
pub type MergedStream<T> = BoxStream<'static, Result<(T, usize), MergeError>>;

/// A source failed mid-stream. Items already yielded stay valid.
#[derive(Debug, Error)]
#[error("Error in stream {index}: {source}")]
pub struct MergeError {
    pub index: usize,
    #[source]
    pub source: LlmError,
}

type PendingFetch<T> = BoxFuture<'static, (usize, SourceStream<T>, Option<Result<T, LlmError>>)>;

fn fetch_next<T: Send + 'static>(index: usize, mut source: SourceStream<T>) -> PendingFetch<T> {
    async move {
        let item = source.next().await;
        (index, source, item)
    }
    .boxed()
}

/// Merges `sources` into one stream, yielding from whichever is ready first.
pub fn merge_streams<T: Send + 'static>(sources: Vec<SourceStream<T>>) -> MergedStream<T> {
    let pending: FuturesUnordered<PendingFetch<T>> = sources
        .into_iter()
        .enumerate()
        .map(|(index, source)| fetch_next(index, source))
        .collect();

    // `None` state: a source failed and the merge is over.
    stream::unfold(Some(pending), |state| async move {
        let mut pending = state?;
        loop {
            let (index, source, item) = pending.next().await?;
            match item {
                Some(Ok(value)) => {
                    pending.push(fetch_next(index, source));
                    return Some((Ok((value, index)), Some(pending)));
                }
                Some(Err(e)) => {
                    warn!(
                        "Stream {} failed, abandoning {} other source(s): {}",
                        index,
                        pending.len(),
                        e
                    );
                    return Some((Err(MergeError { index, source: e }), None));
                }
                None => debug!("Stream {} exhausted", index),
            }
        }
    })
    .boxed()
}
