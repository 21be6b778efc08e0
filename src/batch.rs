//! Batch controller.
//!
//! Processes a document list in fixed-size groups with a delay between
//! groups so provider rate limits are respected. One failing document never
//! stops the run; errors are reported and counted, and progress is reported
//! after every document. Idle provider handles are swept between groups.

use std::thread;
use std::time::Duration;

use crate::pipeline::TagGenerationPipeline;
use crate::progress::ProgressReporter;
use crate::vault::{Document, VaultStore};

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Runs the tagging pipeline over a document list in rate-limited groups.
pub struct BatchController {
    group_size: usize,
    group_delay: Duration,
}

impl BatchController {
    #[must_use]
    pub fn new(group_size: usize, group_delay: Duration) -> Self {
        BatchController {
            // A zero group size would loop forever.
            group_size: group_size.max(1),
            group_delay,
        }
    }

    /// Processes every document, in order. The inter-group delay is applied
    /// before each group except the first, so a run whose documents fit in
    /// one group never sleeps.
    pub fn run(
        &self,
        pipeline: &mut TagGenerationPipeline<'_>,
        store: &dyn VaultStore,
        documents: &[Document],
        reporter: &dyn ProgressReporter,
    ) -> BatchProgress {
        let total = documents.len();
        if total == 0 {
            reporter.summary("no documents to process");
            return BatchProgress {
                total: 0,
                processed: 0,
                errors: 0,
            };
        }

        let mut processed = 0usize;
        let mut failed = 0usize;

        for (group_index, group) in documents.chunks(self.group_size).enumerate() {
            if group_index > 0 {
                thread::sleep(self.group_delay);
                pipeline.sweep_idle();
            }

            for doc in group {
                match pipeline.process(store, doc) {
                    Ok(_) => processed += 1,
                    Err(e) => {
                        failed += 1;
                        reporter.error(&doc.id, &e.to_string());
                    }
                }
                reporter.report(processed + failed, total);
            }
        }

        reporter.summary(&format!(
            "tagged {processed} of {total} documents ({failed} failed)"
        ));
        BatchProgress {
            total,
            processed,
            errors: failed,
        }
    }
}
