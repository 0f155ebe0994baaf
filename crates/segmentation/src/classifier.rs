//! Nucleus classification against the fiber mask.

use detection::LabelImage;
use image::GrayImage;
use tracing::debug;

use crate::regions::FiberRegions;
use crate::types::{FiberMask, NucleusRecord};

/// Classifies detected nuclei as fiber-resident or not.
#[derive(Debug, Clone)]
pub struct NucleusClassifier {
    /// Fraction of a nucleus's pixels that must fall inside the fiber
    /// mask for it to count as fiber-resident (`>=` comparison).
    pub overlap_threshold: f64,
    /// Acceptance window for mean nucleus-channel intensity, inclusive
    /// on both bounds. Instances outside it are dropped entirely.
    pub min_intensity: u8,
    pub max_intensity: u8,
    /// Fiber regions that end up with fewer accepted positives than
    /// this have all their nuclei demoted to negative.
    pub min_nuclei_per_fiber: u32,
}

impl Default for NucleusClassifier {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.75,
            min_intensity: 25,
            max_intensity: 255,
            min_nuclei_per_fiber: 3,
        }
    }
}

/// Outcome of a classification pass.
#[derive(Debug, Clone)]
pub struct Classification {
    /// One record per accepted nucleus; intensity-rejected instances
    /// are absent.
    pub records: Vec<NucleusRecord>,
    /// Accepted-positive tallies per fiber region, before the
    /// minimum-nuclei rule is applied.
    pub positive_counts: Vec<u32>,
}

impl Classification {
    pub fn negatives(&self) -> Vec<[f64; 2]> {
        self.records
            .iter()
            .filter(|r| !r.positive)
            .map(|r| r.centroid)
            .collect()
    }

    pub fn positives(&self) -> Vec<[f64; 2]> {
        self.records
            .iter()
            .filter(|r| r.positive)
            .map(|r| r.centroid)
            .collect()
    }
}

#[derive(Clone, Default)]
struct Accumulator {
    count: u64,
    sum_x: f64,
    sum_y: f64,
    intensity: u64,
    mask_hits: u64,
    region: Option<usize>,
}

impl NucleusClassifier {
    /// Classify every instance in the label image.
    ///
    /// The overlap fraction is measured against the mask itself; the
    /// owning region is looked up through [`FiberRegions`], where
    /// enclosed holes still belong to their fiber.
    pub fn classify(
        &self,
        labels: &LabelImage,
        mask: &FiberMask,
        nuclei: &GrayImage,
    ) -> Classification {
        let regions = FiberRegions::from_mask(mask);

        let mut accumulators = vec![Accumulator::default(); labels.max_label() as usize];
        for (x, y, label) in labels.labeled_pixels() {
            let acc = &mut accumulators[label as usize - 1];
            acc.count += 1;
            acc.sum_x += x as f64;
            acc.sum_y += y as f64;
            acc.intensity += nuclei.get_pixel(x, y).0[0] as u64;
            if mask.contains(x, y) {
                acc.mask_hits += 1;
            }
            if let Some(region) = regions.region_at(x, y) {
                // Lowest region index wins, so ownership does not
                // depend on pixel scan order.
                acc.region = Some(acc.region.map_or(region, |r| r.min(region)));
            }
        }

        let mut positive_counts = vec![0u32; regions.len()];
        let mut records = Vec::new();
        let mut rejected = 0usize;

        for acc in accumulators {
            if acc.count == 0 {
                // Gap in the label numbering; tolerated.
                continue;
            }
            let mean_intensity = acc.intensity as f64 / acc.count as f64;
            if mean_intensity < self.min_intensity as f64
                || mean_intensity > self.max_intensity as f64
            {
                rejected += 1;
                continue;
            }

            let overlap = acc.mask_hits as f64 / acc.count as f64;
            let positive = overlap >= self.overlap_threshold;
            let fiber = if positive { acc.region } else { None };
            if let Some(region) = fiber {
                positive_counts[region] += 1;
            }

            records.push(NucleusRecord {
                centroid: [
                    acc.sum_x / acc.count as f64,
                    acc.sum_y / acc.count as f64,
                ],
                pixel_count: acc.count as u32,
                mean_intensity,
                positive,
                fiber,
            });
        }

        // A region with too few corroborating nuclei is not trusted to
        // be a fiber hit; demote everything it claimed.
        let mut demoted = 0usize;
        for record in &mut records {
            if let (true, Some(region)) = (record.positive, record.fiber) {
                if positive_counts[region] < self.min_nuclei_per_fiber {
                    record.positive = false;
                    record.fiber = None;
                    demoted += 1;
                }
            }
        }

        debug!(
            accepted = records.len(),
            rejected, demoted, "nuclei classified"
        );

        Classification {
            records,
            positive_counts,
        }
    }
}
