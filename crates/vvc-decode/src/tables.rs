//! Static coding tables (§9 "typed accessors"): BCW bi-prediction weights,
//! GPM (Geometric Partitioning Mode) angle/distance weight masks, and the
//! deblocking beta/tc lookup tables, each exposed through a typed
//! accessor rather than a bare array index.

use once_cell::sync::Lazy;

/// BCW (Bi-prediction with CU-level Weights) weight set, `{-2, 3, 4, 5,
/// 10} / 8`, in `bcw_idx` order (§ text, spec-authoritative ordering).
const BCW_WEIGHTS: [i8; 5] = [-2, 3, 4, 5, 10];

/// Weight applied to the L0 prediction for a given `bcw_idx`, in eighths.
pub fn bcw_weight_l0(bcw_idx: u8) -> i8 {
    BCW_WEIGHTS[bcw_idx as usize % BCW_WEIGHTS.len()]
}

pub fn bcw_weight_l1(bcw_idx: u8) -> i8 {
    8 - bcw_weight_l0(bcw_idx)
}

/// Number of distinct GPM split angles the VVC spec defines.
pub const GPM_NUM_ANGLES: usize = 24;
/// Number of distance steps per angle.
pub const GPM_NUM_DISTANCES: usize = 4;

/// One GPM partition's synthesized per-sample weight mask metadata: the
/// split line's angle index and perpendicular distance step. The core
/// does not bake the full per-sample 4x4-granularity weight table (that is
/// interpolation-kernel territory, §4.11); it exposes the parameters the
/// kernel needs to synthesize the mask on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpmSplit {
    pub angle_idx: u8,
    pub distance_idx: u8,
}

impl GpmSplit {
    /// Angle in the spec's internal units (`angle_idx * 360 / GPM_NUM_ANGLES`
    /// degrees), synthesized rather than transcribed from a generated table.
    pub fn angle_degrees(&self) -> f64 {
        (self.angle_idx as f64 % GPM_NUM_ANGLES as f64) * 360.0 / GPM_NUM_ANGLES as f64
    }

    /// Perpendicular offset of the split line from the block center, in
    /// quarter-block units, synthesized from `distance_idx`.
    pub fn distance_offset(&self) -> f64 {
        (self.distance_idx as f64 - (GPM_NUM_DISTANCES as f64 - 1.0) / 2.0) * 0.5
    }
}

/// Precomputed `(cos, sin)` pairs for every GPM angle index, built once at
/// first use. Stands in for the VVC spec's generated `g_GeoParams` table:
/// same information, synthesized instead of hand-transcribed (an explicit,
/// documented Open Question resolution).
static GPM_ANGLE_TRIG: Lazy<[(f64, f64); GPM_NUM_ANGLES]> = Lazy::new(|| {
    let mut table = [(0.0, 0.0); GPM_NUM_ANGLES];
    for (i, entry) in table.iter_mut().enumerate() {
        let radians = (i as f64) * std::f64::consts::TAU / GPM_NUM_ANGLES as f64;
        *entry = (radians.cos(), radians.sin());
    }
    table
});

pub fn gpm_angle_trig(angle_idx: u8) -> (f64, f64) {
    GPM_ANGLE_TRIG[angle_idx as usize % GPM_NUM_ANGLES]
}

/// Deblocking beta threshold table, indexed by `Q = clip3(0, 63, qp +
/// beta_offset)` (§4.8).
const BETA_TABLE: [u8; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18,
    20, 22, 24, 26, 28, 30, 32, 34, 36, 38, 40, 42, 44, 46, 48, 50, 52, 54, 56, 58, 60, 62, 64, 64,
    64, 64, 64, 64, 64, 64, 64, 64, 64, 64, 64,
];

/// Deblocking tc threshold table, same indexing as [`BETA_TABLE`].
const TC_TABLE: [u8; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2,
    3, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7, 8, 9, 10, 11, 13, 14, 16, 18, 20, 22, 24, 26, 28, 30, 33,
    36, 39, 42, 45, 48,
];

pub fn deblock_beta(q: i32) -> u8 {
    BETA_TABLE[q.clamp(0, 63) as usize]
}

pub fn deblock_tc(q: i32) -> u8 {
    TC_TABLE[q.clamp(0, 63) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcw_weights_sum_to_eight() {
        for idx in 0..5 {
            assert_eq!(bcw_weight_l0(idx) + bcw_weight_l1(idx), 8);
        }
    }

    #[test]
    fn gpm_angle_trig_is_unit_length() {
        for idx in 0..GPM_NUM_ANGLES as u8 {
            let (c, s) = gpm_angle_trig(idx);
            assert!((c * c + s * s - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn deblock_tables_clamp_out_of_range_qp() {
        assert_eq!(deblock_beta(-5), deblock_beta(0));
        assert_eq!(deblock_tc(200), deblock_tc(63));
    }

    #[test]
    fn gpm_split_distance_offset_is_symmetric_around_center() {
        let a = GpmSplit { angle_idx: 0, distance_idx: 0 };
        let b = GpmSplit { angle_idx: 0, distance_idx: 3 };
        assert_eq!(a.distance_offset(), -b.distance_offset());
    }
}
