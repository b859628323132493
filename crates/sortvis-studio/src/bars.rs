//! Bar chart model and its triangle geometry.

/// Fraction of each bar slot left empty on either side.
const GAP: f32 = 0.12;
/// Tallest bar, as a fraction of the surface height.
const HEADROOM: f32 = 0.9;

const BASE: [f32; 3] = [0.25, 0.55, 0.85];
const TOP: [f32; 3] = [0.55, 0.85, 1.0];
const HIGHLIGHT: [f32; 3] = [0.95, 0.45, 0.25];

/// A row of bars with heights in `(0, 1]`.
#[derive(Debug, Clone)]
pub struct Bars {
    heights: Vec<f32>,
    highlight: Option<usize>,
}

impl Bars {
    /// `count` bars of distinct heights in a scrambled but fixed order.
    pub fn new(count: usize) -> Self {
        let stride = scramble_stride(count);
        let heights = (0..count)
            .map(|i| ((i * stride) % count + 1) as f32 / count as f32)
            .collect();
        Self {
            heights,
            highlight: None,
        }
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    /// Moves the first bar to the end and highlights it.
    pub fn step(&mut self) {
        if self.heights.is_empty() {
            return;
        }
        self.heights.rotate_left(1);
        self.highlight = Some(self.heights.len() - 1);
    }

    /// Two triangles per bar in clip space: positions (x, y) and colors (r, g, b).
    pub fn geometry(&self) -> (Vec<[f32; 2]>, Vec<[f32; 3]>) {
        let n = self.heights.len();
        let mut positions = Vec::with_capacity(n * 6);
        let mut colors = Vec::with_capacity(n * 6);
        if n == 0 {
            return (positions, colors);
        }

        let slot = 2.0 / n as f32;
        for (i, &h) in self.heights.iter().enumerate() {
            let x0 = -1.0 + slot * (i as f32 + GAP);
            let x1 = -1.0 + slot * (i as f32 + 1.0 - GAP);
            let y0 = -1.0;
            let y1 = -1.0 + 2.0 * HEADROOM * h;

            positions.extend_from_slice(&[
                [x0, y0],
                [x1, y0],
                [x1, y1],
                [x0, y0],
                [x1, y1],
                [x0, y1],
            ]);

            let color = if self.highlight == Some(i) {
                HIGHLIGHT
            } else {
                lerp(BASE, TOP, h)
            };
            colors.extend(std::iter::repeat_n(color, 6));
        }

        (positions, colors)
    }
}

/// Smallest stride > 1 coprime with `count`, so `i * stride % count` is a permutation.
fn scramble_stride(count: usize) -> usize {
    (2..count).find(|s| gcd(*s, count) == 1).unwrap_or(1)
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lerp(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        v.sort_by(f32::total_cmp);
        v
    }

    #[test]
    fn heights_are_a_scrambled_permutation() {
        let bars = Bars::new(8);
        let expected: Vec<f32> = (1..=8).map(|i| i as f32 / 8.0).collect();
        assert_eq!(sorted(bars.heights()), expected);
        assert_ne!(bars.heights(), expected.as_slice());
    }

    #[test]
    fn step_rotates_and_highlights_last() {
        let mut bars = Bars::new(5);
        let first = bars.heights()[0];
        bars.step();
        assert_eq!(bars.heights()[4], first);
        assert_eq!(bars.highlight(), Some(4));
    }

    #[test]
    fn full_cycle_restores_order() {
        let mut bars = Bars::new(6);
        let start = bars.heights().to_vec();
        for _ in 0..6 {
            bars.step();
        }
        assert_eq!(bars.heights(), start.as_slice());
    }

    #[test]
    fn geometry_is_six_vertices_per_bar_in_clip_space() {
        let bars = Bars::new(4);
        let (positions, colors) = bars.geometry();
        assert_eq!(positions.len(), 24);
        assert_eq!(colors.len(), 24);
        for [x, y] in positions {
            assert!((-1.0..=1.0).contains(&x));
            assert!((-1.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn empty_chart_has_no_geometry() {
        let mut bars = Bars::new(0);
        bars.step();
        let (positions, colors) = bars.geometry();
        assert!(positions.is_empty() && colors.is_empty());
    }
}
