//! Residual / transform-coefficient decoding (§4.6): per-TU/TB coded
//! flags, QP resolution, the 4x4 sub-block diagonal coefficient scan, and
//! the MTS/LFNST applicability invariants, against the [`CabacReader`]
//! trait seam.

use crate::cabac::CabacReader;
use crate::cu::TransformBlock;
use crate::error::Result;

/// Diagonal (up-right) scan order within one 4x4 coefficient sub-block,
/// the VVC residual coding scan for every transform size (§4.6).
pub const DIAGONAL_SCAN_4X4: [(u8, u8); 16] = [
    (0, 0),
    (0, 1),
    (1, 0),
    (0, 2),
    (1, 1),
    (2, 0),
    (0, 3),
    (1, 2),
    (2, 1),
    (3, 0),
    (1, 3),
    (2, 2),
    (3, 1),
    (2, 3),
    (3, 2),
    (3, 3),
];

/// Resolve the QP used for dequantization of one transform block, given
/// the predicted (CU-level) luma QP and the block's chroma offsets
/// (§4.6 "QP resolution").
pub fn resolve_qp(luma_qp: i16, component: u8, cb_offset: i8, cr_offset: i8, joint_cbcr_offset: i8, joint_cbcr: bool) -> i16 {
    match component {
        0 => luma_qp,
        1 => luma_qp + cb_offset as i16,
        2 => luma_qp + cr_offset as i16,
        _ if joint_cbcr => luma_qp + joint_cbcr_offset as i16,
        _ => luma_qp,
    }
}

/// MTS (Multiple Transform Selection) is only signalled for luma
/// transform blocks at or below 32x32 that are not using LFNST and whose
/// CU is not skip/IBC (§4.6 "MTS/LFNST invariants").
pub fn mts_applicable(component: u8, w: u32, h: u32, lfnst_idx: u8, sps_mts_enabled: bool) -> bool {
    sps_mts_enabled && component == 0 && w <= 32 && h <= 32 && lfnst_idx == 0
}

/// LFNST (Low-Frequency Non-Separable Transform) requires an intra CU
/// with at least one non-DC coefficient area and is mutually exclusive
/// with a non-zero MTS index.
pub fn lfnst_applicable(is_intra: bool, mts_idx: u8, sps_lfnst_enabled: bool) -> bool {
    sps_lfnst_enabled && is_intra && mts_idx == 0
}

/// Decode the coded sub-block flag and coefficient magnitudes for one
/// transform block, returning the coefficient array in scan order
/// (zero-filled where `cbf` is false).
pub fn decode_transform_block(cabac: &mut impl CabacReader, tb: &TransformBlock) -> Result<Vec<i32>> {
    let n = (tb.width * tb.height) as usize;
    let mut coeffs = vec![0i32; n];
    if !tb.cbf {
        return Ok(coeffs);
    }

    let sub_blocks_x = (tb.width as usize).div_ceil(4);
    let sub_blocks_y = (tb.height as usize).div_ceil(4);
    for sb_y in 0..sub_blocks_y {
        for sb_x in 0..sub_blocks_x {
            if !cabac.decode_bin(100)? {
                continue;
            }
            for &(dx, dy) in &DIAGONAL_SCAN_4X4 {
                let x = sb_x * 4 + dx as usize;
                let y = sb_y * 4 + dy as usize;
                if x >= tb.width as usize || y >= tb.height as usize {
                    continue;
                }
                if !cabac.decode_bin(101)? {
                    continue;
                }
                let sign = cabac.decode_bypass()?;
                let magnitude = 1 + cabac.decode_truncated_rice(0, 4)? as i32;
                coeffs[y * tb.width as usize + x] = if sign { -magnitude } else { magnitude };
            }
        }
    }
    Ok(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cabac::{NullCabacReader, ScriptedCabacReader};

    #[test]
    fn zero_cbf_block_decodes_to_all_zero_coefficients() {
        let tb = TransformBlock { width: 8, height: 8, cbf: false, ..Default::default() };
        let mut cabac = NullCabacReader;
        let coeffs = decode_transform_block(&mut cabac, &tb).unwrap();
        assert!(coeffs.iter().all(|&c| c == 0));
    }

    #[test]
    fn coded_sub_block_with_no_significant_coeff_stays_zero() {
        // coded_sub_block_flag=1, every sig_coeff_flag=0.
        let mut cabac = ScriptedCabacReader::new([true]);
        let tb = TransformBlock { width: 4, height: 4, cbf: true, ..Default::default() };
        let coeffs = decode_transform_block(&mut cabac, &tb).unwrap();
        assert!(coeffs.iter().all(|&c| c == 0));
    }

    #[test]
    fn mts_not_applicable_above_32x32_or_with_lfnst() {
        assert!(mts_applicable(0, 32, 32, 0, true));
        assert!(!mts_applicable(0, 64, 32, 0, true));
        assert!(!mts_applicable(0, 16, 16, 1, true));
        assert!(!mts_applicable(1, 16, 16, 0, true));
    }

    #[test]
    fn qp_resolution_applies_component_offsets() {
        assert_eq!(resolve_qp(32, 0, 2, -2, 0, false), 32);
        assert_eq!(resolve_qp(32, 1, 2, -2, 0, false), 34);
        assert_eq!(resolve_qp(32, 2, 2, -2, 0, false), 30);
    }
}
