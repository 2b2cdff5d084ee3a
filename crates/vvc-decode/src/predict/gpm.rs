//! GPM (Geometric Partitioning Mode, §4.7): blend two uni-predicted
//! partitions along a synthesized split line, using the angle/distance
//! parameters from [`crate::tables::GpmSplit`].

use crate::tables::GpmSplit;

/// Per-sample blend weight for partition 0 (partition 1 gets `8 -
/// weight`), derived from the signed perpendicular distance of `(x, y)`
/// from the split line, clamped to the spec's 3-sample transition band.
fn sample_weight(split: &GpmSplit, x: i32, y: i32, w: i32, h: i32) -> i32 {
    let (cos_a, sin_a) = crate::tables::gpm_angle_trig(split.angle_idx);
    let cx = x as f64 - w as f64 / 2.0 + 0.5;
    let cy = y as f64 - h as f64 / 2.0 + 0.5;
    let distance = cx * cos_a + cy * sin_a - split.distance_offset() * w.max(h) as f64;
    let scaled = (distance * 2.0).clamp(-4.0, 4.0);
    (4.0 + scaled).round() as i32
}

/// Blend two partition predictions into `out` using the GPM split mask.
pub fn blend_gpm(split: &GpmSplit, p0: &[i32], p1: &[i32], w: usize, h: usize, out: &mut [i32]) {
    for y in 0..h {
        for x in 0..w {
            let weight0 = sample_weight(split, x as i32, y as i32, w as i32, h as i32).clamp(0, 8);
            let weight1 = 8 - weight0;
            let idx = y * w + x;
            out[idx] = (p0[idx] * weight0 + p1[idx] * weight1 + 4) >> 3;
        }
    }
}
