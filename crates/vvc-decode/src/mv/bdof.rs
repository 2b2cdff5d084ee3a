//! BDOF (Bi-Directional Optical Flow, §4.4.6): eligibility check and
//! per-4x4 optical-flow sample offset, applied on top of ordinary
//! bi-prediction when both lists are short-term uni-weighted references
//! at symmetric POC distance.

use super::types::{ListIdx, MvField};

/// Eligibility check: BDOF applies to a CU only when it is plain
/// bi-prediction (not affine, not weighted, not BCW, not CIIP/GPM) and
/// both reference pictures are at the same POC distance on opposite
/// sides of the current picture (§4.4.6).
pub fn is_eligible(mvf: &MvField, is_affine: bool, bcw_idx: u8, weighted_pred: bool, td0: i64, td1: i64) -> bool {
    if is_affine || mvf.ciip_flag || weighted_pred {
        return false;
    }
    if bcw_idx != 0 {
        return false;
    }
    if !mvf.pred_flag.uses_list(ListIdx::L0) || !mvf.pred_flag.uses_list(ListIdx::L1) {
        return false;
    }
    td0 == -td1 && td0 != 0
}

/// Horizontal/vertical gradient pair at one sample, as the interpolation
/// kernel seam (§4.11) would supply from the extended prediction buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gradient {
    pub gx: i32,
    pub gy: i32,
}

/// Per-4x4 optical-flow motion refinement offset `(vx, vy)`, derived from
/// the least-squares solution over the 4x4 block's gradient and prediction
/// difference sums (§4.4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowOffset {
    pub vx: i32,
    pub vy: i32,
}

/// Accumulated sums over one 4x4 BDOF sub-block, matching the spec's
/// `sGx2`, `sGy2`, `sGxGy`, `sGxdI`, `sGydI` terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowSums {
    pub s_gx2: i64,
    pub s_gy2: i64,
    pub s_gx_gy: i64,
    pub s_gx_di: i64,
    pub s_gy_di: i64,
}

impl FlowSums {
    pub fn accumulate(&mut self, l0: Gradient, l1: Gradient, diff: i32) {
        let gx = (l0.gx + l1.gx) as i64;
        let gy = (l0.gy + l1.gy) as i64;
        self.s_gx2 += gx * gx;
        self.s_gy2 += gy * gy;
        self.s_gx_gy += gx * gy;
        self.s_gx_di += gx * diff as i64;
        self.s_gy_di += gy * diff as i64;
    }

    /// Solve for the 4x4 block's flow offset, clamping per the spec's
    /// `(-th, th)` range where `th = 1 << (BIT_DEPTH - 1)`... Simplified
    /// here to clamp against `limit`, matching the caller's bit-depth
    /// derived bound.
    pub fn solve(&self, limit: i32) -> FlowOffset {
        let vx = if self.s_gx2 > 0 {
            ((-self.s_gx_di) / self.s_gx2.max(1)).clamp(-(limit as i64), limit as i64) as i32
        } else {
            0
        };
        let gy_di_adjusted = self.s_gy_di - (vx as i64) * self.s_gx_gy / 2;
        let vy = if self.s_gy2 > 0 {
            ((-gy_di_adjusted) / self.s_gy2.max(1)).clamp(-(limit as i64), limit as i64) as i32
        } else {
            0
        };
        FlowOffset { vx, vy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mv::types::{Mv, PredFlag};

    #[test]
    fn eligibility_requires_symmetric_opposite_side_references() {
        let mvf = MvField {
            pred_flag: PredFlag::BI,
            mv: [Mv::ZERO, Mv::ZERO],
            ref_idx: [0, 0],
            ..Default::default()
        };
        assert!(is_eligible(&mvf, false, 0, false, -2, 2));
        assert!(!is_eligible(&mvf, false, 0, false, -2, 3));
        assert!(!is_eligible(&mvf, true, 0, false, -2, 2));
    }

    #[test]
    fn zero_gradients_yield_zero_flow() {
        let sums = FlowSums::default();
        assert_eq!(sums.solve(64), FlowOffset { vx: 0, vy: 0 });
    }

    #[test]
    fn accumulate_combines_both_lists_gradients() {
        let mut sums = FlowSums::default();
        sums.accumulate(Gradient { gx: 2, gy: 0 }, Gradient { gx: 2, gy: 0 }, 8);
        assert_eq!(sums.s_gx2, 16);
    }
}
