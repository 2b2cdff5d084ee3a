//! IBC (Intra Block Copy) block-vector candidate list (§4.4.4): spatial
//! A1/B1, then HMVP-IBC history, then zero; plus the CTB-row/adjacent-CTB
//! bound validation a decoded block vector must satisfy.

use crate::availability::{neighbour, NeighbourPos};
use crate::context::{EntryPointContext, FrameParseState};
use crate::error::{Result, VvcError};

use super::types::Mv;

const MAX_IBC_CAND: usize = 2;
const SPATIAL_ORDER: [NeighbourPos; 2] = [NeighbourPos::A1, NeighbourPos::B1];

/// Derive the IBC block-vector merge/AMVP candidate list for a block at
/// `(x0, y0, w, h)`.
pub fn derive_ibc_candidates(
    state: &FrameParseState,
    ep: &EntryPointContext,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
) -> Vec<Mv> {
    let mut list: Vec<Mv> = Vec::with_capacity(MAX_IBC_CAND);

    for pos in SPATIAL_ORDER {
        if list.len() >= MAX_IBC_CAND {
            break;
        }
        if let Some((nx, ny)) = neighbour(state, x0, y0, w, h, pos) {
            let mvf = *state.mvf.get((nx / 4) as usize, (ny / 4) as usize);
            if mvf.pred_flag == super::types::PredFlag::IBC && !list.contains(&mvf.mv[0]) {
                list.push(mvf.mv[0]);
            }
        }
    }

    for bv in ep.hmvp_ibc.iter_newest_first() {
        if list.len() >= MAX_IBC_CAND {
            break;
        }
        if !list.contains(bv) {
            list.push(*bv);
        }
    }

    while list.len() < MAX_IBC_CAND {
        list.push(Mv::ZERO);
    }

    list
}

/// Validate a decoded block vector against the CTB-row / adjacent-CTB
/// reference area constraint (§4.4.4 "CTB-row/adjacent-CTB bound
/// validation"): the referenced area must lie within the current CTU row,
/// the CTU to its left, or already-reconstructed samples of the current
/// CTU, and must not reference samples that have not yet been
/// reconstructed.
pub fn validate_block_vector(
    state: &FrameParseState,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    bv: Mv,
) -> Result<()> {
    let ref_x0 = x0 + bv.x as i64;
    let ref_y0 = y0 + bv.y as i64;
    let ref_x1 = ref_x0 + w - 1;
    let ref_y1 = ref_y0 + h - 1;

    if ref_x0 < 0 || ref_y0 < 0 {
        return Err(VvcError::InvalidBitstream(
            "IBC block vector references samples outside the picture".into(),
        ));
    }

    let ctb_size = state.ctb_size() as i64;
    let cur_ctb_row = y0 / ctb_size;
    let ref_ctb_row0 = ref_y0 / ctb_size;
    let ref_ctb_row1 = ref_y1 / ctb_size;
    if ref_ctb_row0 != cur_ctb_row || ref_ctb_row1 != cur_ctb_row {
        return Err(VvcError::InvalidBitstream(
            "IBC block vector crosses a CTB row boundary".into(),
        ));
    }

    let cur_ctb_col = x0 / ctb_size;
    let ref_ctb_col0 = ref_x0 / ctb_size;
    let ref_ctb_col1 = ref_x1 / ctb_size;
    if ref_ctb_col1 > cur_ctb_col || cur_ctb_col - ref_ctb_col0 > 1 {
        return Err(VvcError::InvalidBitstream(
            "IBC block vector references samples outside the current or immediately left CTB".into(),
        ));
    }

    if !state.is_parsed(ref_x0, ref_y0) || !state.is_parsed(ref_x1.min(ref_x0), ref_y1.min(ref_y0)) {
        return Err(VvcError::InvalidBitstream(
            "IBC block vector references not-yet-reconstructed samples".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Pps, Sps};

    fn state_with(size: u32) -> FrameParseState {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        let mut state = FrameParseState::new(&sps, &Pps::default());
        state.mark_parsed(0, 0, size, size);
        state
    }

    #[test]
    fn empty_neighbourhood_fills_with_zero_bv() {
        let state = state_with(64);
        let ep = EntryPointContext::default();
        let list = derive_ibc_candidates(&state, &ep, 64, 64, 8, 8);
        assert_eq!(list, vec![Mv::ZERO, Mv::ZERO]);
    }

    #[test]
    fn block_vector_crossing_ctb_row_is_rejected() {
        let state = state_with(256);
        let bv = Mv::new(0, -state.ctb_size() as i32 * 2);
        let err = validate_block_vector(&state, 0, 192, 8, 8, bv).unwrap_err();
        assert!(matches!(err, VvcError::InvalidBitstream(_)));
    }

    #[test]
    fn block_vector_to_already_parsed_left_ctb_is_valid() {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        let mut state = FrameParseState::new(&sps, &Pps::default());
        let ctb = state.ctb_size() as i64;
        state.mark_parsed(0, 0, (ctb * 2) as u32, ctb as u32);
        let bv = Mv::new(-(ctb as i32), 0);
        assert!(validate_block_vector(&state, ctb, 0, 8, 8, bv).is_ok());
    }
}
