//! Shared work queue with cooperative cancellation.
//!
//! Workers pull one image at a time; cancellation is checked between
//! images, never mid-computation, so an in-flight pipeline invocation
//! always runs to completion. A failed image is reported and the batch
//! moves on.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use segmentation::{Pipeline, SegmentationResult};
use tracing::{error, info};

use crate::CliError;

/// FIFO image queue shared by the processing workers.
pub struct JobQueue {
    jobs: Mutex<VecDeque<PathBuf>>,
    cancelled: AtomicBool,
}

impl JobQueue {
    pub fn new(jobs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into_iter().collect()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Next queued image, or `None` once the queue is drained or
    /// cancellation was requested. Cancelled work stays in the queue
    /// and is reported as skipped.
    pub fn next(&self) -> Option<PathBuf> {
        if self.is_cancelled() {
            return None;
        }
        self.jobs.lock().expect("job queue lock poisoned").pop_front()
    }

    /// Request cooperative cancellation; workers stop before starting
    /// their next image.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.jobs.lock().expect("job queue lock poisoned").len()
    }
}

/// What happened to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    /// Images still queued when cancellation hit.
    pub skipped: usize,
}

/// Drain the queue with `workers` threads over a shared pipeline.
///
/// Each invocation owns its buffers, so workers share nothing mutable
/// beyond the queue and the tallies.
pub fn run_batch(
    queue: &JobQueue,
    pipeline: &Pipeline,
    workers: usize,
    output_dir: Option<&Path>,
) -> BatchReport {
    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            scope.spawn(|| {
                while let Some(path) = queue.next() {
                    match pipeline.process(&path) {
                        Ok(result) => {
                            processed.fetch_add(1, Ordering::SeqCst);
                            report_image(&path, &result);
                            if let Some(dir) = output_dir {
                                if let Err(write_error) = write_result(dir, &path, &result) {
                                    error!(
                                        path = %path.display(),
                                        error = %write_error,
                                        "failed to write result"
                                    );
                                }
                            }
                        }
                        Err(process_error) => {
                            failed.fetch_add(1, Ordering::SeqCst);
                            error!(
                                path = %path.display(),
                                error = %process_error,
                                "image failed"
                            );
                        }
                    }
                }
            });
        }
    });

    BatchReport {
        processed: processed.into_inner(),
        failed: failed.into_inner(),
        skipped: queue.remaining(),
    }
}

fn report_image(path: &Path, result: &SegmentationResult) {
    let fusion = match result.fusion_index() {
        Some(index) => format!("{index:.3}"),
        None => "n/a".to_string(),
    };
    info!(
        path = %path.display(),
        nuclei = result.total_nuclei(),
        positive = result.positives.len(),
        fibers = result.fiber_centers.len(),
        fusion_index = %fusion,
        area = %format!("{:.1}%", result.area_ratio * 100.0),
        "done"
    );
}

/// Write `<stem>.json` next to the other results.
fn write_result(dir: &Path, image: &Path, result: &SegmentationResult) -> Result<(), CliError> {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let file = File::create(dir.join(format!("{stem}.json")))?;
    serde_json::to_writer_pretty(BufWriter::new(file), result)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn queue_drains_in_order() {
        let queue = JobQueue::new(paths(&["a.png", "b.png", "c.png"]));
        assert_eq!(queue.next(), Some(PathBuf::from("a.png")));
        assert_eq!(queue.next(), Some(PathBuf::from("b.png")));
        assert_eq!(queue.next(), Some(PathBuf::from("c.png")));
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn cancellation_discards_queued_work() {
        let queue = JobQueue::new(paths(&["a.png", "b.png", "c.png"]));
        assert!(queue.next().is_some());
        queue.cancel();
        assert_eq!(queue.next(), None);
        assert_eq!(queue.remaining(), 2);
        assert!(queue.is_cancelled());
    }

    #[test]
    fn concurrent_workers_see_each_job_once() {
        use std::collections::HashSet;

        let jobs: Vec<PathBuf> = (0..100).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let queue = JobQueue::new(jobs);
        let taken = Mutex::new(HashSet::new());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while let Some(path) = queue.next() {
                        assert!(taken.lock().unwrap().insert(path));
                    }
                });
            }
        });

        assert_eq!(taken.into_inner().unwrap().len(), 100);
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn batch_counts_successes_failures_and_writes_results() {
        use image::{Rgb, RgbImage};
        use segmentation::PipelineConfig;

        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        // One processable image, one missing file.
        let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        let good = dir.path().join("culture.png");
        image.save(&good).unwrap();
        let missing = dir.path().join("missing.png");

        let pipeline = Pipeline::builder()
            .config(PipelineConfig::default())
            .build()
            .unwrap();
        let queue = JobQueue::new(vec![good, missing]);

        let report = run_batch(&queue, &pipeline, 2, Some(out.path()));
        assert_eq!(
            report,
            BatchReport {
                processed: 1,
                failed: 1,
                skipped: 0
            }
        );

        let written = out.path().join("culture.json");
        let parsed: SegmentationResult =
            serde_json::from_reader(File::open(written).unwrap()).unwrap();
        assert_eq!(parsed.total_nuclei(), 0);
        assert_eq!(parsed.area_ratio, 0.0);
    }
}
