//! Coarse occupancy bitmaps used by the template fallback.
//!
//! Player strokes and the rendered target glyph are both reduced to a small
//! grid, cropped to their ink, rescaled into a common box and thinned to
//! one-cell-wide skeletons. Each skeleton must then lie along the other one.
//! Cropping and rescaling make the score independent of where on the canvas and
//! how large the child drew; thinning makes it independent of pen width, so a
//! scribble that merely covers the glyph's box does not pass.

use serde::{Deserialize, Serialize};

/// Canvas-space point (CSS pixels relative to the canvas' top-left corner).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub type Stroke = Vec<Point>;

/// Default resolution for rasterizing canvas content.
pub const GRID: usize = 32;
/// Side of the normalized comparison box.
pub const NORMALIZED: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    cells: Vec<bool>, // row-major
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = true;
        }
    }

    pub fn ink_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    pub fn is_blank(&self) -> bool {
        !self.cells.iter().any(|c| *c)
    }

    /// Rasterize thick polylines. A cell is inked when its center lies within the
    /// pen radius of a segment; the radius never drops below half a cell so thin
    /// pens still leave a trace.
    pub fn from_strokes(
        strokes: &[Stroke],
        canvas_w: f64,
        canvas_h: f64,
        grid: usize,
        pen_radius: f64,
    ) -> Bitmap {
        let mut bmp = Bitmap::new(grid, grid);
        if grid == 0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return bmp;
        }
        let cell_w = canvas_w / grid as f64;
        let cell_h = canvas_h / grid as f64;
        let reach = pen_radius.max(cell_w.max(cell_h) * 0.5);

        for stroke in strokes {
            match stroke.len() {
                0 => {}
                1 => bmp.stamp_segment(stroke[0], stroke[0], reach, cell_w, cell_h),
                _ => {
                    for pair in stroke.windows(2) {
                        bmp.stamp_segment(pair[0], pair[1], reach, cell_w, cell_h);
                    }
                }
            }
        }
        bmp
    }

    fn stamp_segment(&mut self, a: Point, b: Point, reach: f64, cell_w: f64, cell_h: f64) {
        let min_x = a.x.min(b.x) - reach;
        let max_x = a.x.max(b.x) + reach;
        let min_y = a.y.min(b.y) - reach;
        let max_y = a.y.max(b.y) + reach;
        let gx0 = ((min_x / cell_w).floor().max(0.0)) as usize;
        let gy0 = ((min_y / cell_h).floor().max(0.0)) as usize;
        let gx1 = ((max_x / cell_w).ceil().max(0.0) as usize).min(self.width);
        let gy1 = ((max_y / cell_h).ceil().max(0.0) as usize).min(self.height);
        for gy in gy0..gy1 {
            for gx in gx0..gx1 {
                let center = Point::new((gx as f64 + 0.5) * cell_w, (gy as f64 + 0.5) * cell_h);
                if distance_to_segment(center, a, b) <= reach {
                    self.set(gx, gy);
                }
            }
        }
    }

    /// Downsample RGBA pixel data (as returned by `getImageData`). A cell is inked
    /// when at least an eighth of its pixels reach `alpha_cutoff`.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8], grid: usize, alpha_cutoff: u8) -> Bitmap {
        let mut bmp = Bitmap::new(grid, grid);
        if grid == 0 || width == 0 || height == 0 || rgba.len() < width * height * 4 {
            return bmp;
        }
        let mut hits = vec![0u32; grid * grid];
        let mut totals = vec![0u32; grid * grid];
        for py in 0..height {
            let gy = py * grid / height;
            for px in 0..width {
                let gx = px * grid / width;
                let idx = gy * grid + gx;
                totals[idx] += 1;
                if rgba[(py * width + px) * 4 + 3] >= alpha_cutoff {
                    hits[idx] += 1;
                }
            }
        }
        for (i, (h, t)) in hits.iter().zip(totals.iter()).enumerate() {
            if *t > 0 && h * 8 >= *t && *h > 0 {
                bmp.cells[i] = true;
            }
        }
        bmp
    }

    /// Inclusive (x0, y0, x1, y1) of the inked area.
    pub fn bounding_box(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y) {
                    continue;
                }
                bbox = Some(match bbox {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bbox
    }

    /// Crop to ink and rescale (aspect preserved, centered) into `size × size`.
    pub fn normalized(&self, size: usize) -> Bitmap {
        let mut out = Bitmap::new(size, size);
        let Some((x0, y0, x1, y1)) = self.bounding_box() else {
            return out;
        };
        let bw = (x1 - x0 + 1) as f64;
        let bh = (y1 - y0 + 1) as f64;
        let scale = size as f64 / bw.max(bh);
        let ox = (size as f64 - bw * scale) / 2.0;
        let oy = (size as f64 - bh * scale) / 2.0;

        // Forward-map every source cell onto the span of target cells it covers so
        // thin lines survive downscaling.
        for y in y0..=y1 {
            for x in x0..=x1 {
                if !self.get(x, y) {
                    continue;
                }
                let fx0 = ox + (x - x0) as f64 * scale;
                let fy0 = oy + (y - y0) as f64 * scale;
                let tx0 = fx0.floor() as usize;
                let ty0 = fy0.floor() as usize;
                let tx1 = ((fx0 + scale).ceil() as usize).max(tx0 + 1).min(size);
                let ty1 = ((fy0 + scale).ceil() as usize).max(ty0 + 1).min(size);
                for ty in ty0..ty1 {
                    for tx in tx0..tx1 {
                        out.set(tx, ty);
                    }
                }
            }
        }
        out
    }

    /// 4-neighborhood dilation.
    pub fn dilate(&self) -> Bitmap {
        let mut out = Bitmap::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let on = self.get(x, y)
                    || (x > 0 && self.get(x - 1, y))
                    || self.get(x + 1, y)
                    || (y > 0 && self.get(x, y - 1))
                    || self.get(x, y + 1);
                if on {
                    out.set(x, y);
                }
            }
        }
        out
    }

    /// Zhang-Suen thinning: peel boundary cells until every stroke is one cell wide.
    pub fn thinned(&self) -> Bitmap {
        let (w, h) = (self.width, self.height);
        let mut out = self.clone();
        loop {
            let mut changed = false;
            for step in 0..2 {
                let doomed: Vec<usize> = (0..h)
                    .flat_map(|y| (0..w).map(move |x| (x, y)))
                    .filter(|&(x, y)| out.get(x, y) && out.peelable(x, y, step))
                    .map(|(x, y)| y * w + x)
                    .collect();
                changed |= !doomed.is_empty();
                for i in doomed {
                    out.cells[i] = false;
                }
            }
            if !changed {
                return out;
            }
        }
    }

    fn peelable(&self, x: usize, y: usize, step: usize) -> bool {
        let at = |dx: isize, dy: isize| -> u8 {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            u8::from(nx >= 0 && ny >= 0 && self.get(nx as usize, ny as usize))
        };
        // Clockwise from north.
        let p = [
            at(0, -1),
            at(1, -1),
            at(1, 0),
            at(1, 1),
            at(0, 1),
            at(-1, 1),
            at(-1, 0),
            at(-1, -1),
        ];
        let neighbours: u8 = p.iter().sum();
        if !(2..=6).contains(&neighbours) {
            return false;
        }
        let transitions = (0..8).filter(|&i| p[i] == 0 && p[(i + 1) % 8] == 1).count();
        if transitions != 1 {
            return false;
        }
        if step == 0 {
            p[0] * p[2] * p[4] == 0 && p[2] * p[4] * p[6] == 0
        } else {
            p[0] * p[2] * p[6] == 0 && p[0] * p[4] * p[6] == 0
        }
    }

    #[cfg(test)]
    fn to_ascii(&self) -> String {
        let mut s = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                s.push(if self.get(x, y) { '#' } else { '.' });
            }
            s.push('\n');
        }
        s
    }
}

/// Two-way skeleton agreement in 0..=1: the smaller of "share of `a` within one
/// cell of `b`" and the reverse. 0.0 when either is blank.
pub fn similarity(a: &Bitmap, b: &Bitmap) -> f64 {
    let sa = skeleton(a);
    let sb = skeleton(b);
    let (ca, cb) = (sa.ink_count(), sb.ink_count());
    if ca == 0 || cb == 0 {
        return 0.0;
    }
    let a_along_b = overlap(&sa, &sb.dilate()) as f64 / ca as f64;
    let b_along_a = overlap(&sb, &sa.dilate()) as f64 / cb as f64;
    a_along_b.min(b_along_a)
}

fn skeleton(bmp: &Bitmap) -> Bitmap {
    let boxed = bmp.normalized(NORMALIZED);
    let thin = boxed.thinned();
    // Tiny blobs can thin away entirely.
    if thin.is_blank() { boxed } else { thin }
}

fn overlap(a: &Bitmap, b: &Bitmap) -> usize {
    a.cells
        .iter()
        .zip(b.cells.iter())
        .filter(|(p, q)| **p && **q)
        .count()
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    };
    let cx = a.x + t * dx;
    let cy = a.y + t * dy;
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Stroke {
        vec![Point::new(x0, y0), Point::new(x1, y1)]
    }

    fn circle(cx: f64, cy: f64, r: f64) -> Stroke {
        (0..=48)
            .map(|i| {
                let a = i as f64 / 48.0 * std::f64::consts::TAU;
                Point::new(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect()
    }

    #[test]
    fn blank_inputs_score_zero() {
        let blank = Bitmap::new(GRID, GRID);
        let ink = Bitmap::from_strokes(&[line(200.0, 50.0, 200.0, 350.0)], 400.0, 400.0, GRID, 7.5);
        assert!(blank.is_blank());
        assert!(!ink.is_blank());
        assert_eq!(similarity(&blank, &ink), 0.0);
        assert_eq!(similarity(&blank, &blank), 0.0);
    }

    #[test]
    fn identical_drawings_score_one() {
        let ink = Bitmap::from_strokes(&[circle(200.0, 200.0, 120.0)], 400.0, 400.0, GRID, 7.5);
        assert!((similarity(&ink, &ink) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn translation_does_not_matter() {
        // Shift by a whole number of cells (400 / 32 = 12.5px per cell).
        let a = Bitmap::from_strokes(
            &[line(50.0, 50.0, 50.0, 150.0), line(50.0, 150.0, 120.0, 150.0)],
            400.0,
            400.0,
            GRID,
            7.5,
        );
        let b = Bitmap::from_strokes(
            &[line(150.0, 250.0, 150.0, 350.0), line(150.0, 350.0, 220.0, 350.0)],
            400.0,
            400.0,
            GRID,
            7.5,
        );
        assert!(similarity(&a, &b) > 0.95, "{}", similarity(&a, &b));
    }

    #[test]
    fn scale_roughly_invariant() {
        let small = Bitmap::from_strokes(&[circle(100.0, 100.0, 60.0)], 400.0, 400.0, GRID, 7.5);
        let large = Bitmap::from_strokes(&[circle(200.0, 200.0, 150.0)], 400.0, 400.0, GRID, 7.5);
        assert!(similarity(&small, &large) > 0.6, "{}", similarity(&small, &large));
    }

    #[test]
    fn different_shapes_score_low() {
        let one = Bitmap::from_strokes(&[line(200.0, 50.0, 200.0, 350.0)], 400.0, 400.0, GRID, 7.5);
        let zero = Bitmap::from_strokes(&[circle(200.0, 200.0, 150.0)], 400.0, 400.0, GRID, 7.5);
        assert!(similarity(&one, &zero) < 0.4, "{}", similarity(&one, &zero));
    }

    fn zig_zag(x0: f64, x1: f64, y0: f64, y1: f64) -> Stroke {
        let mut pts = Vec::new();
        let mut y = y0;
        while y < y1 {
            pts.push(Point::new(x0, y));
            pts.push(Point::new(x1, y + 10.0));
            y += 20.0;
        }
        pts
    }

    fn canvas(strokes: &[Stroke]) -> Bitmap {
        Bitmap::from_strokes(strokes, 400.0, 400.0, GRID, 7.5)
    }

    #[test]
    fn scribble_matches_no_dense_glyph() {
        let scribble = canvas(&[zig_zag(120.0, 280.0, 60.0, 340.0)]);
        let eight = canvas(&[circle(200.0, 140.0, 60.0), circle(200.0, 260.0, 60.0)]);
        let zero = canvas(&[circle(200.0, 200.0, 100.0)]);
        let b = canvas(&[
            line(150.0, 60.0, 150.0, 340.0),
            circle(150.0, 130.0, 70.0),
            circle(150.0, 270.0, 70.0),
        ]);
        for (name, glyph) in [("8", &eight), ("0", &zero), ("B", &b)] {
            let score = similarity(&scribble, glyph);
            assert!(score < 0.3, "scribble vs {name}: {score}");
        }
        assert!(similarity(&zero, &eight) < 0.45, "{}", similarity(&zero, &eight));
    }

    #[test]
    fn wobbly_eight_still_matches() {
        let eight = canvas(&[circle(200.0, 140.0, 60.0), circle(200.0, 260.0, 60.0)]);
        let drawn = canvas(&[circle(210.0, 150.0, 50.0), circle(195.0, 265.0, 70.0)]);
        assert!(similarity(&drawn, &eight) > 0.6, "{}", similarity(&drawn, &eight));
    }

    #[test]
    fn thinning_leaves_a_single_row() {
        let mut bar = Bitmap::new(12, 12);
        for y in 4..7 {
            for x in 1..11 {
                bar.set(x, y);
            }
        }
        let thin = bar.thinned();
        assert!(!thin.is_blank());
        assert!(thin.ink_count() < 10);
        for y in (0..12).filter(|&y| y != 5) {
            for x in 0..12 {
                assert!(!thin.get(x, y), "ink left at ({x}, {y})");
            }
        }
    }

    #[test]
    fn single_tap_leaves_a_dot() {
        let dot = Bitmap::from_strokes(&[vec![Point::new(5.0, 5.0)]], 400.0, 400.0, GRID, 1.0);
        assert!(dot.get(0, 0));
        assert_eq!(dot.ink_count(), 1);
    }

    #[test]
    fn rgba_downsample_uses_alpha() {
        // 4x4 image, only the top-left 2x2 opaque.
        let mut rgba = vec![0u8; 4 * 4 * 4];
        for y in 0..2 {
            for x in 0..2 {
                rgba[(y * 4 + x) * 4 + 3] = 255;
            }
        }
        let bmp = Bitmap::from_rgba(4, 4, &rgba, 2, 128);
        assert!(bmp.get(0, 0));
        assert!(!bmp.get(1, 0));
        assert!(!bmp.get(0, 1));
        assert!(!bmp.get(1, 1));
        assert_eq!(bmp.bounding_box(), Some((0, 0, 0, 0)));
    }

    #[test]
    fn normalized_fills_box_and_dilate_grows() {
        let mut bmp = Bitmap::new(8, 8);
        bmp.set(3, 3);
        let n = bmp.normalized(4);
        assert_eq!(n.ink_count(), 16);
        let mut single = Bitmap::new(3, 3);
        single.set(1, 1);
        assert_eq!(single.dilate().ink_count(), 5);
        assert_eq!(single.to_ascii(), "...\n.#.\n...\n");
    }
}
