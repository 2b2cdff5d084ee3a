//! Deblocking filter (§4.8): boundary strength derivation and the edge
//! filter applied vertically then horizontally, against
//! [`crate::dsp::FilterKernels`].

use crate::dsp::FilterKernels;
use crate::mv::types::MvField;
use crate::tables::{deblock_beta, deblock_tc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Vertical,
    Horizontal,
}

/// Boundary strength at one 4-sample edge segment (§4.8 BS derivation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoundaryStrength {
    None = 0,
    Weak = 1,
    Strong = 2,
}

/// Derive boundary strength from the two sides' coding modes and motion,
/// per the spec's three-tier rule: intra on either side is always strong;
/// a coded-residual TU edge is weak; otherwise compare motion.
pub fn boundary_strength(
    p_is_intra: bool,
    q_is_intra: bool,
    p_has_coded_residual: bool,
    q_has_coded_residual: bool,
    p_motion: &MvField,
    q_motion: &MvField,
) -> BoundaryStrength {
    if p_is_intra || q_is_intra {
        return BoundaryStrength::Strong;
    }
    if p_has_coded_residual || q_has_coded_residual {
        return BoundaryStrength::Weak;
    }
    if p_motion.duplicates(q_motion) {
        BoundaryStrength::None
    } else {
        BoundaryStrength::Weak
    }
}

/// Apply the deblocking filter across one luma edge segment using `bs`,
/// `qp`, and the PPS beta/tc offsets.
pub fn deblock_edge(
    kernels: &impl FilterKernels,
    p: &mut [i32; 4],
    q: &mut [i32; 4],
    bs: BoundaryStrength,
    qp: i32,
    beta_offset_div2: i32,
    tc_offset_div2: i32,
) {
    if bs == BoundaryStrength::None {
        return;
    }
    let beta = deblock_beta(qp + 2 * beta_offset_div2) as i32;
    let tc_shift = if bs == BoundaryStrength::Strong { 2 } else { 0 };
    let tc = (deblock_tc(qp + 2 * tc_offset_div2) as i32) << tc_shift >> 2;
    let d = (p[0] - 2 * p[1] + p[2]).abs() + (q[0] - 2 * q[1] + q[2]).abs();
    if d >= beta {
        return;
    }
    let strong = bs == BoundaryStrength::Strong && d < beta / 4;
    kernels.deblock_luma_edge(p, q, beta, tc.max(1), strong);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::ScalarFilterKernels;
    use crate::mv::types::{Mv, PredFlag};

    #[test]
    fn intra_neighbour_always_yields_strong_boundary() {
        let m = MvField::intra();
        assert_eq!(
            boundary_strength(true, false, false, false, &m, &m),
            BoundaryStrength::Strong
        );
    }

    #[test]
    fn identical_motion_and_no_residual_yields_no_filtering() {
        let m = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::new(4, 4), Mv::ZERO],
            ref_idx: [0, -1],
            ..Default::default()
        };
        assert_eq!(boundary_strength(false, false, false, false, &m, &m), BoundaryStrength::None);
    }

    #[test]
    fn none_boundary_strength_leaves_samples_untouched() {
        let kernels = ScalarFilterKernels;
        let mut p = [100, 100, 100, 100];
        let mut q = [100, 100, 100, 100];
        deblock_edge(&kernels, &mut p, &mut q, BoundaryStrength::None, 32, 0, 0);
        assert_eq!(p, [100, 100, 100, 100]);
    }

    #[test]
    fn high_activity_edge_skips_filtering() {
        let kernels = ScalarFilterKernels;
        let mut p = [0, 200, 0, 200];
        let mut q = [200, 0, 200, 0];
        let before = p;
        deblock_edge(&kernels, &mut p, &mut q, BoundaryStrength::Weak, 32, 0, 0);
        assert_eq!(p, before);
    }
}
