use std::collections::BTreeSet;

use scene::picking::rgba_to_id;

/// RGBA8 color attachment with a depth attachment.
///
/// Depth is view-space distance; a fragment is kept only if it is strictly
/// nearer than what is stored, so the first of two coplanar fragments wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    color: Vec<[u8; 4]>,
    depth: Vec<f64>,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32, clear: [u8; 4]) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![clear; n],
            depth: vec![f64::INFINITY; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, rgba: [u8; 4]) {
        self.color.fill(rgba);
        self.depth.fill(f64::INFINITY);
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.offset(x as i64, y as i64).map(|i| self.color[i])
    }

    /// Depth-tested write. Returns whether the fragment was kept.
    pub fn write(&mut self, x: i64, y: i64, depth: f64, rgba: [u8; 4]) -> bool {
        let Some(i) = self.offset(x, y) else {
            return false;
        };
        if depth.is_nan() || depth >= self.depth[i] {
            return false;
        }
        self.depth[i] = depth;
        self.color[i] = rgba;
        true
    }

    /// Binary PPM (P6) encoding of the color attachment; alpha is dropped.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.reserve(self.color.len() * 3);
        for px in &self.color {
            out.extend_from_slice(&px[..3]);
        }
        out
    }

    pub fn covered_pixels(&self) -> usize {
        self.depth.iter().filter(|d| d.is_finite()).count()
    }
}

/// Offscreen target of a picking pass. Pixels hold packed pick ids.
#[derive(Debug, Clone, PartialEq)]
pub struct PickBuffer {
    target: RenderTarget,
}

impl PickBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: RenderTarget::new(width, height, [0; 4]),
        }
    }

    pub fn clear(&mut self) {
        self.target.clear([0; 4]);
    }

    pub fn target_mut(&mut self) -> &mut RenderTarget {
        &mut self.target
    }

    /// Pick id at `(x, y)`; outside the buffer reads as background.
    pub fn read_pixel(&self, x: u32, y: u32) -> u32 {
        self.target.pixel(x, y).map(rgba_to_id).unwrap_or(0)
    }

    /// Distinct non-background ids inside the inclusive rectangle, ascending.
    pub fn read_rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<u32> {
        let (xa, xb) = (x0.min(x1), x0.max(x1).min(self.target.width.saturating_sub(1)));
        let (ya, yb) = (y0.min(y1), y0.max(y1).min(self.target.height.saturating_sub(1)));
        let mut ids = BTreeSet::new();
        for y in ya..=yb {
            for x in xa..=xb {
                let id = self.read_pixel(x, y);
                if id != 0 {
                    ids.insert(id);
                }
            }
        }
        ids.into_iter().collect()
    }
}
