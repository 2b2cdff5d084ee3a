//! Inter (motion-compensated) prediction (§4.7): combine the L0/L1
//! interpolated predictors with BCW weighting or default averaging, built
//! against [`crate::dsp::InterpolationKernels`].

use crate::dsp::InterpolationKernels;
use crate::mv::types::{ListIdx, MvField};
use crate::tables::{bcw_weight_l0, bcw_weight_l1};

/// Predict one inter block's samples into `out`, using `kernels` for
/// fractional-sample interpolation and BCW/default weighting to combine
/// L0/L1 when both are present.
#[allow(clippy::too_many_arguments)]
pub fn predict_inter_block(
    kernels: &impl InterpolationKernels,
    motion: &MvField,
    ref0: Option<(&[u16], usize)>,
    ref1: Option<(&[u16], usize)>,
    w: usize,
    h: usize,
    bit_depth: u8,
    out: &mut [i32],
) {
    let mut buf0 = vec![0i32; w * h];
    let mut buf1 = vec![0i32; w * h];

    if let Some(mv0) = motion.mv_for(ListIdx::L0) {
        if let Some((src, stride)) = ref0 {
            let (fx, fy) = frac_parts(mv0.x, mv0.y);
            kernels.interpolate_luma(src, stride, &mut buf0, w, h, fx, fy);
        }
    }
    if let Some(mv1) = motion.mv_for(ListIdx::L1) {
        if let Some((src, stride)) = ref1 {
            let (fx, fy) = frac_parts(mv1.x, mv1.y);
            kernels.interpolate_luma(src, stride, &mut buf1, w, h, fx, fy);
        }
    }

    let bi = motion.pred_flag.is_bi();
    let (w0, w1) = if bi && motion.bcw_idx != 0 {
        (bcw_weight_l0(motion.bcw_idx) as i32, bcw_weight_l1(motion.bcw_idx) as i32)
    } else {
        (4, 4)
    };

    // Clip3(0, (1<<bitDepth)-1, ...): BCW weights are not guaranteed convex
    // (one list can carry a negative weight), so the combined sample can
    // fall outside the representable range before this final clip.
    let max_sample = (1i32 << bit_depth) - 1;
    for i in 0..w * h {
        let combined = if bi {
            (buf0[i] * w0 + buf1[i] * w1) >> 3
        } else if motion.pred_flag.uses_list(ListIdx::L0) {
            buf0[i]
        } else {
            buf1[i]
        };
        out[i] = combined.clamp(0, max_sample);
    }
}

fn frac_parts(x: i32, y: i32) -> (u8, u8) {
    ((x & 0b11) as u8 * 4, (y & 0b11) as u8 * 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::ScalarInterpolationKernels;
    use crate::mv::types::{Mv, PredFlag};

    #[test]
    fn uni_l0_prediction_copies_interpolated_samples() {
        let kernels = ScalarInterpolationKernels;
        let motion = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::ZERO, Mv::ZERO],
            ref_idx: [0, -1],
            ..Default::default()
        };
        let src = vec![50u16; 16];
        let mut out = vec![0i32; 4];
        predict_inter_block(&kernels, &motion, Some((&src, 4)), None, 2, 2, 8, &mut out);
        assert!(out.iter().all(|&v| v == 50));
    }

    #[test]
    fn bi_prediction_with_equal_weight_averages_lists() {
        let kernels = ScalarInterpolationKernels;
        let motion = MvField {
            pred_flag: PredFlag::BI,
            mv: [Mv::ZERO, Mv::ZERO],
            ref_idx: [0, 0],
            ..Default::default()
        };
        let src0 = vec![0u16; 16];
        let src1 = vec![100u16; 16];
        let mut out = vec![0i32; 4];
        predict_inter_block(&kernels, &motion, Some((&src0, 4)), Some((&src1, 4)), 2, 2, 8, &mut out);
        assert!(out.iter().all(|&v| v == 50));
    }
}
