//! Day-by-day batch grouping.
//!
//! For every scan window the runner counts and scans the documents that
//! still lack a group, signs them in parallel, resolves their groups against
//! the shared store with bounded concurrency, and pushes the annotations to
//! the sink in `batch_size` chunks.

use crate::clustering::{Hashing, StreamClustering};
use crate::config::RunConfig;
use crate::io::{DateRange, Document, DocumentSink, DocumentSource, GroupAnnotation, IoError};
use crate::preprocess::Preprocessor;
use futures::stream::{self, StreamExt, TryStreamExt};
use rayon::prelude::*;
use serde::Serialize;
use simgroup_core::{KvStore, SimgroupError};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a grouping run.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error(transparent)]
    Core(#[from] SimgroupError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Result type for grouping runs.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Statistics of a grouping run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Documents grouped.
    pub total: usize,
    /// Documents assigned to another document's group.
    pub duplicates: usize,
    /// Documents that started their own group.
    pub groups: usize,
    /// Annotations accepted by the sink.
    pub updated: usize,
    /// Annotations rejected by the sink.
    pub failed: usize,
    /// Scan windows visited.
    pub windows: usize,
    /// Processing time in seconds.
    pub elapsed_secs: f64,
}

impl RunStats {
    /// Throughput in documents per second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Share of documents flagged as duplicates.
    #[must_use]
    pub fn duplicate_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.duplicates as f64 / self.total as f64
        }
    }

    fn record(&mut self, annotations: &[GroupAnnotation]) {
        self.total += annotations.len();
        let duplicates = annotations.iter().filter(|a| a.is_duplicate).count();
        self.duplicates += duplicates;
        self.groups += annotations.len() - duplicates;
    }
}

/// Drives a [`StreamClustering`] engine over a document index.
pub struct GroupingRunner<P, H, S> {
    preprocessor: P,
    engine: StreamClustering<H, S>,
    config: RunConfig,
}

impl<P, H, S> GroupingRunner<P, H, S>
where
    P: Preprocessor,
    H: Hashing,
    S: KvStore,
{
    /// Create a runner.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(preprocessor: P, engine: StreamClustering<H, S>, config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor,
            engine,
            config,
        })
    }

    /// The clustering engine.
    pub fn engine(&self) -> &StreamClustering<H, S> {
        &self.engine
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Group every pending document of the configured range.
    ///
    /// Store and source failures abort the run; rejected sink updates are
    /// only counted.
    pub async fn run<D>(&self, index: &mut D) -> Result<RunStats>
    where
        D: DocumentSource + DocumentSink,
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        if self.config.reset_state {
            info!("Resetting clustering state");
            self.engine.reset().await?;
        }

        for window in self.config.windows() {
            self.run_window(index, window.as_ref(), &mut stats).await?;
        }

        stats.elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            total = stats.total,
            duplicates = stats.duplicates,
            groups = stats.groups,
            updated = stats.updated,
            failed = stats.failed,
            elapsed_secs = stats.elapsed_secs,
            "Grouping finished"
        );
        Ok(stats)
    }

    /// Group the pending documents of one window.
    pub async fn run_window<D>(
        &self,
        index: &mut D,
        window: Option<&DateRange>,
        stats: &mut RunStats,
    ) -> Result<()>
    where
        D: DocumentSource + DocumentSink,
    {
        stats.windows += 1;
        let day = window.map(|w| w.from.to_string()).unwrap_or_else(|| "all".to_string());

        let pending = index.count(window).await?;
        info!(day = %day, pending, "Scanning documents");
        if pending == 0 {
            return Ok(());
        }

        let docs = index.scan(window).await?;
        for batch in docs.chunks(self.config.batch_size) {
            let before = stats.total;
            let annotations = self.group_batch(batch).await?;
            stats.record(&annotations);

            let report = index.bulk_update(&annotations).await?;
            stats.updated += report.succeeded;
            stats.failed += report.failed;
            if report.failed > 0 {
                warn!(
                    day = %day,
                    failed = report.failed,
                    "Some annotations were rejected by the sink"
                );
            }

            let interval = self.config.report_interval;
            if stats.total / interval > before / interval {
                info!(
                    day = %day,
                    "sim docs {}/{}, groups {}/{}, indexed success {}/{}",
                    stats.duplicates,
                    stats.total,
                    stats.groups,
                    stats.total,
                    stats.updated,
                    stats.total
                );
            }
        }

        Ok(())
    }

    /// Group a batch of documents, in input order.
    ///
    /// Signing runs on the rayon pool; store lookups run with up to
    /// `workers` requests in flight. With more than one worker, documents of
    /// the same batch race for buckets; the store picks each owner and the
    /// losers join it.
    pub async fn group_batch(&self, docs: &[Document]) -> Result<Vec<GroupAnnotation>> {
        let keys = docs
            .par_iter()
            .map(|doc| {
                let tokens = self.preprocessor.hashing_tokens(&doc.text);
                let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
                self.engine.hasher().hash(&tokens)
            })
            .collect::<simgroup_core::Result<Vec<_>>>()?;

        let groups: Vec<String> = stream::iter(docs.iter().zip(&keys))
            .map(|(doc, keys)| self.engine.find_group_by_keys(&doc.id, keys))
            .buffered(self.config.workers)
            .try_collect()
            .await?;

        debug!(batch = docs.len(), "Grouped batch");

        Ok(docs
            .iter()
            .zip(groups)
            .map(|(doc, group_id)| GroupAnnotation::new(doc.id.clone(), group_id))
            .collect())
    }
}
