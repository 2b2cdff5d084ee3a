//! Luma merge candidate list construction (§4.4.1).
//!
//! Grounded on `libavcodec/vvc/mvs.c`: `derive_spatial_merge_candidates`,
//! `derive_temporal_merge_candidate`, `derive_history_merge_candidates`,
//! `mv_merge_pairwise_candidate` and `mv_merge_zero_motion_candidate`, in
//! that derivation order.

use crate::availability::{merge_neighbour, same_merge_estimation_region, NeighbourPos};
use crate::context::{EntryPointContext, FrameParseState};
use crate::params::RplEntry;
use crate::picture::Picture;

use super::types::{ListIdx, Mv, MvField, PredFlag};

/// Scale a collocated motion vector by the ratio of the current
/// reference's POC distance to the collocated reference's POC distance
/// (§4.4.1 step 2, the TMVP scaling formula).
pub fn scale_mv(mv: Mv, td: i64, tb: i64) -> Mv {
    if td == 0 || td == tb {
        return mv;
    }
    let td = td.clamp(-128, 127);
    let tb = tb.clamp(-128, 127);
    let tx = (16384 + (td.abs() / 2)) / td;
    let dist_scale_factor = ((tb * tx + 32) >> 6).clamp(-4096, 4095);
    // Sign-correct rounding per the VVC spec's `Clip3`-free scaling formula.
    let round = |v: i32| -> i32 {
        let v = v as i64;
        let prod = dist_scale_factor * v;
        let rounded = if prod >= 0 {
            (prod + 127) >> 8
        } else {
            -((-prod + 127) >> 8)
        };
        rounded as i32
    };
    Mv::new(round(mv.x), round(mv.y)).clip()
}

/// Maximum spatial candidates considered before temporal/history/pairwise
/// fill, per the canonical B1/A1/B0/A0/B2 order.
const SPATIAL_ORDER: [NeighbourPos; 5] = [
    NeighbourPos::B1,
    NeighbourPos::A1,
    NeighbourPos::B0,
    NeighbourPos::A0,
    NeighbourPos::B2,
];

fn push_if_new(list: &mut Vec<MvField>, candidate: MvField) {
    if !list.iter().any(|c| c.duplicates(&candidate)) {
        list.push(candidate);
    }
}

/// Force uni-prediction (L0 only) for the small-block bi-pred restriction
/// (§4.4.1 "bi-pred degeneracy for w+h==12"): 4x8 and 8x4 CUs never use
/// bi-directional merge candidates.
fn degenerate_small_block(mut mvf: MvField, w: i64, h: i64) -> MvField {
    if w + h == 12 && mvf.pred_flag.is_bi() {
        mvf.pred_flag = PredFlag::L0;
        mvf.mv[1] = Mv::ZERO;
        mvf.ref_idx[1] = -1;
    }
    mvf
}

/// Derive the luma merge candidate list for a PU at `(x0, y0)` of size
/// `(w, h)`. `max_cand` is `sps_max_num_merge_cand` (already resolved by the
/// caller, e.g. reduced for GPM via `Sps::max_num_gpm_cand`).
#[allow(clippy::too_many_arguments)]
pub fn derive_luma_merge_list(
    state: &FrameParseState,
    ep: &EntryPointContext,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    max_cand: u8,
    collocated: Option<&Picture>,
    cur_poc: i64,
    l0_ref_pocs: &[RplEntry],
    l1_ref_pocs: &[RplEntry],
) -> Vec<MvField> {
    let max_cand = max_cand as usize;
    let mut list: Vec<MvField> = Vec::with_capacity(max_cand);

    // Step 1: spatial candidates, B2 only consulted while fewer than 4.
    for (i, pos) in SPATIAL_ORDER.iter().enumerate() {
        if list.len() >= max_cand {
            break;
        }
        if *pos == NeighbourPos::B2 && list.len() >= 4 {
            continue;
        }
        if let Some((nx, ny)) = merge_neighbour(state, x0, y0, w, h, *pos) {
            let mvf = *state.mvf.get((nx / 4) as usize, (ny / 4) as usize);
            if mvf.pred_flag.is_inter() {
                // Standard A1/B1/B0/A0-against-B2 pruning, expressed as
                // "skip if it would duplicate the candidate already taken
                // from the position it shadows".
                let shadow_dup = match i {
                    1 | 2 => list.last().is_some_and(|prev| prev.duplicates(&mvf)),
                    3 => list
                        .first()
                        .is_some_and(|prev| prev.duplicates(&mvf)),
                    4 => list.iter().any(|prev| prev.duplicates(&mvf)),
                    _ => false,
                };
                if !shadow_dup {
                    push_if_new(&mut list, degenerate_small_block(mvf, w, h));
                }
            }
        }
    }

    // Step 2: temporal (TMVP), scaled to the current slice's L0/L1[0]
    // reference, or copied unscaled for long-term references.
    if list.len() < max_cand {
        if let Some(col_pic) = collocated {
            if let Some(cand) = derive_temporal_candidate(state, col_pic, x0, y0, w, h, cur_poc, l0_ref_pocs, l1_ref_pocs) {
                push_if_new(&mut list, cand);
            }
        }
    }

    // Step 3: history (HMVP), newest first.
    if list.len() < max_cand.saturating_sub(1) {
        for hmvp in ep.hmvp.iter_newest_first() {
            if list.len() >= max_cand {
                break;
            }
            push_if_new(&mut list, *hmvp);
        }
    }

    // Step 4: pairwise average of the first two candidates.
    if list.len() >= 2 && list.len() < max_cand {
        if let Some(pair) = pairwise_average(&list[0], &list[1]) {
            list.push(pair);
        }
    }

    // Step 5: zero-motion fill, cycling ref_idx 0, 1, 2, ... as needed.
    let mut zero_ref_idx = 0i8;
    let has_l1 = !l1_ref_pocs.is_empty();
    while list.len() < max_cand {
        let n_refs_l0 = l0_ref_pocs.len() as i8;
        let ref_idx_l0 = if n_refs_l0 > 0 { zero_ref_idx % n_refs_l0 } else { 0 };
        let mvf = MvField {
            pred_flag: if has_l1 { PredFlag::BI } else { PredFlag::L0 },
            mv: [Mv::ZERO, Mv::ZERO],
            ref_idx: [ref_idx_l0, if has_l1 { ref_idx_l0.min((l1_ref_pocs.len().max(1) - 1) as i8) } else { -1 }],
            ..Default::default()
        };
        list.push(degenerate_small_block(mvf, w, h));
        zero_ref_idx += 1;
    }

    list
}

fn derive_temporal_candidate(
    state: &FrameParseState,
    col_pic: &Picture,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    cur_poc: i64,
    l0_ref_pocs: &[RplEntry],
    l1_ref_pocs: &[RplEntry],
) -> Option<MvField> {
    // Bottom-right collocated position, else centre, per §4.4.1 step 2.
    let br_x = x0 + w;
    let br_y = y0 + h;
    let (cx, cy) = if state.parsed.in_bounds(br_x / 4, br_y / 4)
        && (br_y / (state.ctb_size() as i64)) == (y0 / (state.ctb_size() as i64))
    {
        (br_x, br_y)
    } else {
        (x0 + w / 2, y0 + h / 2)
    };
    let col_mvf_grid = col_pic.mvf.lock();
    if !col_mvf_grid.in_bounds(cx / 4, cy / 4) {
        return None;
    }
    let col_mvf = *col_mvf_grid.get((cx / 4) as usize, (cy / 4) as usize);
    drop(col_mvf_grid);
    if !col_mvf.pred_flag.is_inter() {
        return None;
    }

    let mut out = MvField::default();
    let mut any = false;
    for (lx, refs) in [(ListIdx::L0, l0_ref_pocs), (ListIdx::L1, l1_ref_pocs)] {
        if refs.is_empty() {
            continue;
        }
        // Prefer the list matching `lx`, falling back to the other.
        let (mv, col_ref_poc) = if let Some(mv) = col_mvf.mv_for(lx) {
            (mv, col_pic.poc)
        } else if let Some(mv) = col_mvf.mv_for(match lx {
            ListIdx::L0 => ListIdx::L1,
            ListIdx::L1 => ListIdx::L0,
        }) {
            (mv, col_pic.poc)
        } else {
            continue;
        };
        let target = refs[0];
        let scaled = if target.is_long_term {
            mv
        } else {
            let td = col_pic.poc - col_ref_poc;
            let tb = cur_poc - target.poc;
            scale_mv(mv, td, tb)
        };
        out.mv[lx as usize] = scaled;
        out.ref_idx[lx as usize] = 0;
        out.pred_flag = PredFlag(out.pred_flag.raw() | match lx {
            ListIdx::L0 => PredFlag::L0.raw(),
            ListIdx::L1 => PredFlag::L1.raw(),
        });
        any = true;
    }
    any.then_some(out)
}

fn pairwise_average(a: &MvField, b: &MvField) -> Option<MvField> {
    let mut out = MvField::default();
    let mut any = false;
    for lx in [ListIdx::L0, ListIdx::L1] {
        match (a.mv_for(lx), b.mv_for(lx)) {
            (Some(ma), Some(mb)) => {
                out.mv[lx as usize] = Mv::new((ma.x + mb.x + 1) >> 1, (ma.y + mb.y + 1) >> 1);
                out.ref_idx[lx as usize] = a.ref_idx_for(lx).unwrap_or(0);
                out.pred_flag = PredFlag(out.pred_flag.raw() | match lx {
                    ListIdx::L0 => PredFlag::L0.raw(),
                    ListIdx::L1 => PredFlag::L1.raw(),
                });
                any = true;
            }
            (Some(m), None) | (None, Some(m)) => {
                out.mv[lx as usize] = m;
                out.ref_idx[lx as usize] = a.ref_idx_for(lx).or(b.ref_idx_for(lx)).unwrap_or(0);
                out.pred_flag = PredFlag(out.pred_flag.raw() | match lx {
                    ListIdx::L0 => PredFlag::L0.raw(),
                    ListIdx::L1 => PredFlag::L1.raw(),
                });
                any = true;
            }
            (None, None) => {}
        }
    }
    any.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FrameParseState;
    use crate::params::{ChromaFormat, Pps, Sps};

    fn empty_state() -> FrameParseState {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        FrameParseState::new(&sps, &Pps::default())
    }

    #[test]
    fn empty_neighbourhood_fills_with_zero_motion() {
        let state = empty_state();
        let ep = EntryPointContext::default();
        let l0 = vec![RplEntry { poc: -1, is_long_term: false, is_scaled: false }];
        let list = derive_luma_merge_list(&state, &ep, 64, 64, 8, 8, 6, None, 0, &l0, &[]);
        assert_eq!(list.len(), 6);
        assert!(list.iter().all(|m| m.mv[0] == Mv::ZERO));
    }

    #[test]
    fn small_block_bi_candidate_is_degenerated_to_uni() {
        let w = 4i64;
        let h = 8i64;
        let mvf = MvField {
            pred_flag: PredFlag::BI,
            mv: [Mv::new(1, 1), Mv::new(2, 2)],
            ref_idx: [0, 0],
            ..Default::default()
        };
        let out = degenerate_small_block(mvf, w, h);
        assert_eq!(out.pred_flag, PredFlag::L0);
        assert_eq!(out.ref_idx[1], -1);
    }

    #[test]
    fn pairwise_average_rounds_to_nearest() {
        let a = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::new(1, 1), Mv::ZERO],
            ref_idx: [0, -1],
            ..Default::default()
        };
        let b = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::new(2, 2), Mv::ZERO],
            ref_idx: [0, -1],
            ..Default::default()
        };
        let avg = pairwise_average(&a, &b).unwrap();
        assert_eq!(avg.mv[0], Mv::new(2, 2));
    }

    #[test]
    fn scale_mv_identity_when_td_equals_tb() {
        let mv = Mv::new(8, -4);
        assert_eq!(scale_mv(mv, 4, 4), mv);
    }

    #[test]
    fn same_merge_estimation_region_exposed_for_callers() {
        let state = empty_state();
        assert!(!same_merge_estimation_region(&state, 0, 0, 1, 1));
    }
}
