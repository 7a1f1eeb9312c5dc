use std::cmp::{Ord, Ordering};

use crate::histogram::HistogramEntry;

/// A box of histogram entries under median-cut splitting.
///
/// `priority` ranks clusters for the split heap: the weighted mean deviation
/// along the widest channel, scaled by the square root of the cluster
/// weight, so large and spread-out clusters are split first.
pub(crate) struct Cluster {
    pub entries: Vec<HistogramEntry>,
    pub mean: [u8; 4],
    pub weight: u64,
    pub priority: u64,
    /// Sum of weight * squared distance to the mean, for the running error
    pub error_sum: f64,
    widest_chan: usize,
}

impl Ord for Cluster {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

impl PartialOrd for Cluster {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Cluster {}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Cluster {
    pub fn new(entries: Vec<HistogramEntry>) -> Self {
        let mut cluster = Self {
            entries,
            mean: [0; 4],
            weight: 0,
            priority: 0,
            error_sum: 0.0,
            widest_chan: 0,
        };
        cluster.calc_stats();
        cluster
    }

    /// Recomputes mean, weight, widest channel, priority and error sum.
    fn calc_stats(&mut self) {
        self.weight = 0;
        self.priority = 0;
        self.error_sum = 0.0;

        if self.entries.is_empty() {
            self.mean = [0; 4];
            return;
        }

        let mut sums = [0u64; 4];
        for e in self.entries.iter() {
            let weight = e.weight as u64;
            for ch in 0..4 {
                sums[ch] += e.color[ch] as u64 * weight;
            }
            self.weight += weight;
        }
        for ch in 0..4 {
            self.mean[ch] = (sums[ch] / self.weight) as u8;
        }

        let mut diff_sum = [0u64; 4];
        for e in self.entries.iter() {
            let weight = e.weight as u64;
            for ch in 0..4 {
                let d = diff(e.color[ch], self.mean[ch]) as u64;
                diff_sum[ch] += d * weight;
                self.error_sum += (d * d) as f64 * weight as f64;
            }
        }

        let mut chan = 0;
        let mut max_diff_sum = 0;
        for (ch, &d) in diff_sum.iter().enumerate() {
            if d > max_diff_sum {
                chan = ch;
                max_diff_sum = d;
            }
        }
        self.widest_chan = chan;

        // A cluster with a single distinct color has nothing left to split.
        if max_diff_sum > 0 && self.entries.len() > 1 {
            let chan_diff = max_diff_sum as f64 / self.weight as f64;
            self.priority = (chan_diff * (self.weight as f64).sqrt()) as u64;
            self.priority = self.priority.max(1);
        }
    }

    pub fn is_splittable(&self) -> bool {
        self.priority > 0
    }

    /// Splits at the widest channel's mean: entries below the mean go left,
    /// above go right, and the band equal to the mean joins the lighter
    /// side.
    pub fn split(mut self) -> (Cluster, Cluster) {
        let chan = self.widest_chan;
        let split_val = self.mean[chan];

        let mut i = 0;
        let mut lt = 0;
        let mut gt = self.entries.len() - 1;
        let mut lt_weight = 0u64;
        let mut gt_weight = 0u64;

        while i <= gt {
            let val = self.entries[i].color[chan];

            if val < split_val {
                lt_weight += self.entries[i].weight as u64;
                self.entries.swap(lt, i);
                lt += 1;
                i += 1;
            } else if val > split_val {
                gt_weight += self.entries[i].weight as u64;
                self.entries.swap(gt, i);
                if gt == 0 {
                    break;
                }
                gt -= 1;
            } else {
                i += 1;
            }
        }

        // i is where the greater-than partition starts; lt ends the
        // less-than one. Entries equal to the mean sit in between.
        let split_pos = if lt_weight < gt_weight { i } else { lt };
        let split_pos = split_pos.clamp(1, self.entries.len() - 1);

        let right = self.entries.split_off(split_pos);

        (Self::new(self.entries), Self::new(right))
    }
}

fn diff(a: u8, b: u8) -> u8 {
    if a > b { a - b } else { b - a }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(color: [u8; 4], weight: u32) -> HistogramEntry {
        HistogramEntry { color, weight }
    }

    #[test]
    fn stats_of_uniform_cluster() {
        let cluster = Cluster::new(vec![entry([10, 20, 30, 255], 7)]);

        assert_eq!(cluster.mean, [10, 20, 30, 255]);
        assert_eq!(cluster.weight, 7);
        assert_eq!(cluster.error_sum, 0.0);
        assert!(!cluster.is_splittable());
    }

    #[test]
    fn split_separates_widest_channel() {
        let cluster = Cluster::new(vec![
            entry([0, 0, 0, 255], 2),
            entry([250, 0, 0, 255], 1),
            entry([255, 0, 0, 255], 1),
        ]);
        assert!(cluster.is_splittable());

        let (a, b) = cluster.split();
        let (low, high) = if a.mean[0] < b.mean[0] { (a, b) } else { (b, a) };

        assert_eq!(low.entries.len(), 1);
        assert_eq!(low.mean[0], 0);
        assert_eq!(high.entries.len(), 2);
        assert!(high.mean[0] >= 250);
    }

    #[test]
    fn split_reduces_error() {
        let cluster = Cluster::new(vec![
            entry([0, 0, 0, 255], 1),
            entry([100, 0, 0, 255], 1),
            entry([200, 0, 0, 255], 1),
        ]);
        let before = cluster.error_sum;

        let (a, b) = cluster.split();
        assert!(a.error_sum + b.error_sum < before);
    }
}
