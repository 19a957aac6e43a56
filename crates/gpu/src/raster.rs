//! Scan conversion for the software pipeline.
//!
//! Vertices arrive in pixel space with their view depth. Attributes are
//! interpolated perspective-correctly through `1 / depth`; the depth test
//! itself also compares interpolated view depth.

use crate::targets::RenderTarget;

/// A projected vertex carrying one scalar attribute.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenVertex {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    pub value: f64,
}

/// Interpolated inputs handed to a fragment shader.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FragmentInput {
    pub value: f64,
    pub depth: f64,
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Fill a triangle, sampling at pixel centers. Returns fragments written.
pub fn fill_triangle(
    target: &mut RenderTarget,
    v: [ScreenVertex; 3],
    mut shade: impl FnMut(FragmentInput) -> [u8; 4],
) -> usize {
    let p = v.map(|v| (v.x, v.y));
    let area = edge(p[0], p[1], p[2]);
    if area.abs() < 1e-12 || !area.is_finite() {
        return 0;
    }

    let min_x = p.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let min_y = p.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let max_x = p
        .iter()
        .map(|p| p.0)
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil()
        .min(target.width() as f64 - 1.0);
    let max_y = p
        .iter()
        .map(|p| p.1)
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil()
        .min(target.height() as f64 - 1.0);
    if min_x > max_x || min_y > max_y {
        return 0;
    }

    let inv_z = v.map(|v| 1.0 / v.depth);
    let mut written = 0;
    for y in min_y as i64..=max_y as i64 {
        for x in min_x as i64..=max_x as i64 {
            let c = (x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge(p[1], p[2], c) / area;
            let w1 = edge(p[2], p[0], c) / area;
            let w2 = edge(p[0], p[1], c) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let iz = w0 * inv_z[0] + w1 * inv_z[1] + w2 * inv_z[2];
            let depth = 1.0 / iz;
            let value = (w0 * v[0].value * inv_z[0]
                + w1 * v[1].value * inv_z[1]
                + w2 * v[2].value * inv_z[2])
                * depth;
            let rgba = shade(FragmentInput { value, depth });
            if target.write(x, y, depth, rgba) {
                written += 1;
            }
        }
    }
    written
}

/// Clip segment `a b` to the rectangle `[0, w] x [0, h]` (Liang-Barsky).
///
/// Returns the parameter interval of the visible part.
fn clip_segment(a: (f64, f64), b: (f64, f64), w: f64, h: f64) -> Option<(f64, f64)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [(-dx, a.0), (dx, w - a.0), (-dy, a.1), (dy, h - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Draw a one-pixel line with Bresenham stepping. Returns fragments written.
pub fn draw_line(
    target: &mut RenderTarget,
    a: ScreenVertex,
    b: ScreenVertex,
    mut shade: impl FnMut(FragmentInput) -> [u8; 4],
) -> usize {
    let (w, h) = (target.width() as f64, target.height() as f64);
    let Some((t0, t1)) = clip_segment((a.x, a.y), (b.x, b.y), w, h) else {
        return 0;
    };
    let at = |t: f64| (a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
    let (sx, sy) = at(t0);
    let (ex, ey) = at(t1);

    let (mut x, mut y) = (sx.floor() as i64, sy.floor() as i64);
    let (x1, y1) = (ex.floor() as i64, ey.floor() as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let step_x = if x < x1 { 1 } else { -1 };
    let step_y = if y < y1 { 1 } else { -1 };
    let steps = dx.max(-dy).max(1) as f64;
    let mut err = dx + dy;

    let (iza, izb) = (1.0 / a.depth, 1.0 / b.depth);
    let mut written = 0;
    let mut i = 0.0;
    loop {
        // Position along the clipped span mapped back onto the full segment.
        let t = t0 + (t1 - t0) * (i / steps);
        let iz = iza + (izb - iza) * t;
        let depth = 1.0 / iz;
        let value = (a.value * iza + (b.value * izb - a.value * iza) * t) * depth;
        let rgba = shade(FragmentInput { value, depth });
        if target.write(x, y, depth, rgba) {
            written += 1;
        }

        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += step_x;
        }
        if e2 <= dx {
            err += dx;
            y += step_y;
        }
        i += 1.0;
    }
    written
}

/// Draw a square point of `size` pixels centered on `v`.
pub fn draw_point(
    target: &mut RenderTarget,
    v: ScreenVertex,
    size: u32,
    mut shade: impl FnMut(FragmentInput) -> [u8; 4],
) -> usize {
    let size = size.max(1) as i64;
    let x0 = (v.x - size as f64 / 2.0).round() as i64;
    let y0 = (v.y - size as f64 / 2.0).round() as i64;
    let input = FragmentInput {
        value: v.value,
        depth: v.depth,
    };
    let mut written = 0;
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            if target.write(x, y, v.depth, shade(input)) {
                written += 1;
            }
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::{ScreenVertex, draw_line, draw_point, fill_triangle};
    use crate::targets::RenderTarget;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn sv(x: f64, y: f64, depth: f64) -> ScreenVertex {
        ScreenVertex {
            x,
            y,
            depth,
            value: 0.0,
        }
    }

    #[test]
    fn triangle_covers_interior_only() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        let n = fill_triangle(&mut t, [sv(0.0, 0.0, 1.0), sv(10.0, 0.0, 1.0), sv(0.0, 10.0, 1.0)], |_| RED);
        assert!(n > 0);
        assert_eq!(t.pixel(1, 1), Some(RED));
        assert_eq!(t.pixel(9, 9), Some([0; 4]));
    }

    #[test]
    fn winding_does_not_matter() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        fill_triangle(&mut t, [sv(0.0, 0.0, 1.0), sv(0.0, 10.0, 1.0), sv(10.0, 0.0, 1.0)], |_| RED);
        assert_eq!(t.pixel(1, 1), Some(RED));
    }

    #[test]
    fn nearer_triangle_wins_regardless_of_order() {
        let tri = |d| [sv(0.0, 0.0, d), sv(10.0, 0.0, d), sv(0.0, 10.0, d)];
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        fill_triangle(&mut t, tri(1.0), |_| RED);
        fill_triangle(&mut t, tri(2.0), |_| BLUE);
        assert_eq!(t.pixel(2, 2), Some(RED));

        let mut t = RenderTarget::new(10, 10, [0; 4]);
        fill_triangle(&mut t, tri(2.0), |_| BLUE);
        fill_triangle(&mut t, tri(1.0), |_| RED);
        assert_eq!(t.pixel(2, 2), Some(RED));
    }

    #[test]
    fn offscreen_triangle_writes_nothing() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        let n = fill_triangle(&mut t, [sv(20.0, 20.0, 1.0), sv(30.0, 20.0, 1.0), sv(20.0, 30.0, 1.0)], |_| RED);
        assert_eq!(n, 0);
    }

    #[test]
    fn values_interpolate_across_triangle() {
        let mut t = RenderTarget::new(100, 1, [0; 4]);
        let mut seen = Vec::new();
        let a = ScreenVertex { value: 0.0, ..sv(0.0, -1.0, 1.0) };
        let b = ScreenVertex { value: 1.0, ..sv(100.0, -1.0, 1.0) };
        let c = ScreenVertex { value: 0.0, ..sv(0.0, 3.0, 1.0) };
        fill_triangle(&mut t, [a, b, c], |f| {
            seen.push(f.value);
            RED
        });
        assert!(seen.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(seen.iter().any(|v| *v > 0.5));
    }

    #[test]
    fn line_hits_both_endpoints() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        let n = draw_line(&mut t, sv(0.5, 0.5, 1.0), sv(9.5, 4.5, 1.0), |_| RED);
        assert_eq!(n, 10);
        assert_eq!(t.pixel(0, 0), Some(RED));
        assert_eq!(t.pixel(9, 4), Some(RED));
    }

    #[test]
    fn long_lines_are_clipped_to_the_target() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        let n = draw_line(&mut t, sv(-1e7, 5.5, 1.0), sv(1e7, 5.5, 1.0), |_| RED);
        assert!(n >= 10 && n <= 11, "{n}");
        assert_eq!(t.pixel(0, 5), Some(RED));
        assert_eq!(t.pixel(9, 5), Some(RED));
        assert_eq!(draw_line(&mut t, sv(-5.0, -5.0, 1.0), sv(-1.0, -9.0, 1.0), |_| RED), 0);
    }

    #[test]
    fn points_are_squares() {
        let mut t = RenderTarget::new(10, 10, [0; 4]);
        assert_eq!(draw_point(&mut t, sv(5.0, 5.0, 1.0), 3, |_| RED), 9);
        assert_eq!(draw_point(&mut t, sv(0.0, 0.0, 0.5), 2, |_| BLUE), 1);
    }
}
