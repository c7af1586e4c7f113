//! Batch scheduler: bounds how many section pipelines are in flight at once.
//!
//! Pipelines are split into consecutive batches of at most `batch_size` and
//! each batch is merged on its own. A batch's pipelines are only turned into
//! merge sources when the batch starts, and the next batch starts only after
//! the current merge has drained. Since pipelines open their upstream request
//! lazily, at most `batch_size` generation requests are ever open together.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::{debug, info};

use crate::analysis::merge::{merge_streams, MergedStream};
use crate::analysis::pipeline::SectionPipeline;
use crate::analysis::AnalysisError;
use crate::models::analysis::Section;

/// One fragment out of a batched run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub fragment: String,
    pub section: Section,
    /// Position of the pipeline inside its batch.
    pub local_index: usize,
    /// Zero-based batch number.
    pub batch: usize,
}

pub type BatchStream = BoxStream<'static, Result<BatchItem, AnalysisError>>;

/// Splits `items` into consecutive chunks of at most `size`, preserving order.
/// A size of zero is treated as one.
pub fn partition<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

struct ActiveBatch {
    number: usize,
    sections: Vec<Section>,
    merged: MergedStream<(String, Section)>,
}

struct Scheduler {
    pending: VecDeque<Vec<SectionPipeline>>,
    active: Option<ActiveBatch>,
    started: usize,
    total: usize,
}

impl Scheduler {
    fn start_next(&mut self) -> Option<()> {
        let batch = self.pending.pop_front()?;
        let number = self.started;
        self.started += 1;

        let sections: Vec<Section> = batch.iter().map(SectionPipeline::section).collect();
        info!(
            "Starting batch {}/{}: {}",
            number + 1,
            self.total,
            sections
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let sources = batch.into_iter().map(SectionPipeline::into_tagged).collect();
        self.active = Some(ActiveBatch {
            number,
            sections,
            merged: merge_streams(sources),
        });
        Some(())
    }
}

/// Runs `pipelines` in sequential batches of `batch_size`, yielding fragments
/// as they arrive. The first failure ends the stream; later batches never start.
pub fn run_batched(pipelines: Vec<SectionPipeline>, batch_size: usize) -> BatchStream {
    let pending: VecDeque<_> = partition(pipelines, batch_size).into();
    let scheduler = Scheduler {
        total: pending.len(),
        pending,
        active: None,
        started: 0,
    };

    stream::unfold(scheduler, |mut scheduler| async move {
        loop {
            if scheduler.active.is_none() {
                scheduler.start_next()?;
            }
            let active = scheduler.active.as_mut()?;

            match active.merged.next().await {
                Some(Ok(((fragment, section), local_index))) => {
                    let item = BatchItem {
                        fragment,
                        section,
                        local_index,
                        batch: active.number,
                    };
                    return Some((Ok(item), scheduler));
                }
                Some(Err(e)) => {
                    let section = active.sections[e.index];
                    scheduler.active = None;
                    scheduler.pending.clear();
                    let error = AnalysisError::SectionStream {
                        section,
                        index: e.index,
                        source: e.source,
                    };
                    return Some((Err(error), scheduler));
                }
                None => {
                    debug!("Batch {} drained", active.number + 1);
                    scheduler.active = None;
                }
            }
        }
    })
    .boxed()
}
