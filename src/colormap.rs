use crate::palette::Palette;

macro_rules! color_dist {
    ($c1: expr, $c2: expr) => {
        ($c1[0] - $c2[0]).powi(2)
            + ($c1[1] - $c2[1]).powi(2)
            + ($c1[2] - $c2[2]).powi(2)
            + ($c1[3] - $c2[3]).powi(2)
    };
}

struct ColormapEntry {
    color: [f32; 4],
    /// A quarter of the squared distance to the closest other entry. A
    /// query within half the plain distance of this entry cannot have a
    /// closer neighbor, and (d/2)^2 is d^2/4 in squared space, so the scan
    /// can stop early below this bound.
    radius: f32,
}

/// Nearest-palette-entry lookup over f32 RGBA colors.
pub(crate) struct Colormap(Vec<ColormapEntry>);

impl Colormap {
    pub fn new(colors: &[[f32; 4]]) -> Self {
        let count = colors.len();
        assert!(count <= 256);

        let mut entries: Vec<ColormapEntry> = colors
            .iter()
            .map(|&color| ColormapEntry { color, radius: 0.0 })
            .collect();

        let mut cache = vec![0f32; count * count];

        for i in 0..count {
            let mut nearest = f32::MAX;

            for j in 0..count {
                if i == j {
                    continue;
                }

                let dist = if i < j {
                    let d = color_dist!(entries[i].color, entries[j].color);
                    cache[i + j * count] = d;
                    d
                } else {
                    cache[j + i * count]
                };

                nearest = nearest.min(dist);
            }

            entries[i].radius = nearest / 4.0;
        }

        Self(entries)
    }

    pub fn from_palette(palette: &Palette) -> Self {
        let colors: Vec<[f32; 4]> = palette.as_slice().iter().map(|c| c.to_f32()).collect();
        Self::new(&colors)
    }

    /// Returns the index of the entry closest to `color` and the squared
    /// distance to it.
    pub fn nearest_ind(&self, color: &[f32; 4]) -> (usize, f32) {
        let mut best_ind = 0;
        let mut best_dist = f32::MAX;

        for (i, e) in self.0.iter().enumerate() {
            let dist = color_dist!(e.color, color);

            if dist <= e.radius {
                return (i, dist);
            }

            if dist < best_dist {
                best_dist = dist;
                best_ind = i;
            }
        }

        (best_ind, best_dist)
    }

    pub fn color(&self, ind: usize) -> [f32; 4] {
        self.0[ind].color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_picks_closest_entry() {
        let map = Colormap::new(&[
            [0.0, 0.0, 0.0, 255.0],
            [255.0, 0.0, 0.0, 255.0],
            [0.0, 255.0, 0.0, 255.0],
        ]);

        let (ind, dist) = map.nearest_ind(&[250.0, 10.0, 0.0, 255.0]);
        assert_eq!(ind, 1);
        assert_eq!(dist, 5.0f32.powi(2) + 10.0f32.powi(2));

        let (ind, dist) = map.nearest_ind(&[0.0, 255.0, 0.0, 255.0]);
        assert_eq!(ind, 2);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn early_exit_bound_never_hides_a_closer_entry() {
        // Entries 10 apart; a query at 7 sits 49 squared units from the
        // first entry and 9 from the second. Any exclusion bound looser
        // than d^2/4 = 25 would wrongly stop the scan at the first entry.
        let map = Colormap::new(&[[0.0, 0.0, 0.0, 255.0], [10.0, 0.0, 0.0, 255.0]]);

        let (ind, dist) = map.nearest_ind(&[7.0, 0.0, 0.0, 255.0]);
        assert_eq!(ind, 1);
        assert_eq!(dist, 9.0);
    }
}
