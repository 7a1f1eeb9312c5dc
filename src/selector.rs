use std::collections::BinaryHeap;

use crate::attributes::Attributes;
use crate::cluster::Cluster;
use crate::colormap::Colormap;
use crate::histogram::HistogramEntry;
use crate::quantize::quality_from_mse;

/// The palette-selection step of quantization.
///
/// Implementations pick at most `max_colors` representative colors for the
/// weighted histogram entries, minimizing weighted squared RGBA distance.
/// The orchestration layer handles fixed colors, the reserved transparent
/// slot and quality gating, so selectors only cluster. Selection must be
/// deterministic for identical inputs and attributes.
pub trait PaletteSelector {
    fn select(
        &self,
        entries: &[HistogramEntry],
        max_colors: usize,
        attr: &Attributes,
    ) -> Vec<[f32; 4]>;
}

/// The built-in selector: median-cut over a priority heap of clusters, with
/// optional Lloyd refinement at the slowest speeds.
#[derive(Default)]
pub struct MedianCut;

impl PaletteSelector for MedianCut {
    fn select(
        &self,
        entries: &[HistogramEntry],
        max_colors: usize,
        attr: &Attributes,
    ) -> Vec<[f32; 4]> {
        if entries.is_empty() || max_colors == 0 {
            return Vec::new();
        }

        if entries.len() <= max_colors {
            return entries.iter().map(|e| color_to_f32(e.color)).collect();
        }

        let root = Cluster::new(entries.to_vec());
        let total_weight = root.weight as f64;
        let mut total_error = root.error_sum;

        let mut heap = BinaryHeap::with_capacity(max_colors);
        heap.push(root);

        while heap.len() < max_colors {
            // More colors are wasted once the running cluster variance
            // already satisfies the quality ceiling.
            if quality_from_mse(total_error / total_weight) >= attr.max_quality() as f64 {
                break;
            }

            // The top cluster has the highest priority; if it cannot be
            // split, none can.
            let Some(cluster) = heap.pop() else { break };
            if !cluster.is_splittable() {
                heap.push(cluster);
                break;
            }

            total_error -= cluster.error_sum;
            let (a, b) = cluster.split();
            total_error += a.error_sum + b.error_sum;

            heap.push(a);
            heap.push(b);
        }

        let mut colors: Vec<[f32; 4]> = heap
            .into_sorted_vec()
            .iter()
            .map(|c| color_to_f32(c.mean))
            .collect();

        let passes = (4 - attr.speed()).max(0) as usize;
        if passes > 0 {
            refine(entries, &mut colors, passes);
        }

        colors
    }
}

/// Lloyd iteration: reassign every histogram entry to its nearest selected
/// color and move each color to the weighted mean of its assignees.
fn refine(entries: &[HistogramEntry], colors: &mut [[f32; 4]], passes: usize) {
    for _ in 0..passes {
        let map = Colormap::new(colors);
        let mut sums = vec![[0f64; 4]; colors.len()];
        let mut weights = vec![0u64; colors.len()];

        for e in entries {
            let (ind, _) = map.nearest_ind(&color_to_f32(e.color));
            let weight = e.weight as u64;

            for ch in 0..4 {
                sums[ind][ch] += e.color[ch] as f64 * weight as f64;
            }
            weights[ind] += weight;
        }

        let mut moved = false;
        for (i, color) in colors.iter_mut().enumerate() {
            if weights[i] == 0 {
                continue;
            }

            for ch in 0..4 {
                let mean = (sums[i][ch] / weights[i] as f64) as f32;
                if (mean - color[ch]).abs() > 0.5 {
                    moved = true;
                }
                color[ch] = mean;
            }
        }

        if !moved {
            break;
        }
    }
}

fn color_to_f32(c: [u8; 4]) -> [f32; 4] {
    [c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(color: [u8; 4], weight: u32) -> HistogramEntry {
        HistogramEntry { color, weight }
    }

    #[test]
    fn small_histograms_pass_through() {
        let attr = Attributes::default();
        let entries = vec![entry([1, 2, 3, 255], 5), entry([4, 5, 6, 255], 1)];

        let colors = MedianCut.select(&entries, 16, &attr);
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn budget_caps_selection() {
        let attr = Attributes::default();
        let entries: Vec<HistogramEntry> = (0u8..=255)
            .map(|v| entry([v, v.wrapping_mul(3), v.wrapping_mul(7), 255], 1))
            .collect();

        let colors = MedianCut.select(&entries, 8, &attr);
        assert!(colors.len() <= 8);
        assert!(colors.len() > 1);
    }

    #[test]
    fn quality_ceiling_stops_splitting_early() {
        let mut attr = Attributes::default();
        // Two nearly identical colors already satisfy any modest ceiling
        // after one split of a three-color histogram.
        attr.set_quality(0, 1).unwrap();

        let entries = vec![
            entry([0, 0, 0, 255], 1),
            entry([3, 0, 0, 255], 1),
            entry([255, 255, 255, 255], 1),
        ];

        let colors = MedianCut.select(&entries, 3, &attr);
        assert!(colors.len() < 3);
    }
}
