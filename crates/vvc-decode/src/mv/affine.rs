//! Affine control-point motion vector (CPMV) candidate derivation
//! (§4.4.3): inherited candidates from an affine-coded neighbour,
//! constructed candidates from up-to-three independent corner neighbours,
//! and zero-motion fallback.

use crate::availability::{neighbour, NeighbourPos};
use crate::context::FrameParseState;

use super::types::{AffineModel, ListIdx, Mv, MvField};

/// Up to three control-point motion vectors (top-left, top-right,
/// bottom-left), plus the model degree they describe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpmvCandidate {
    pub model: AffineModel,
    pub cpmv: [Mv; 3],
    pub ref_idx: i8,
}

/// Neighbour groups for each control point, in scan order, per the VVC
/// spec's Figure for affine merge/AMVP derivation.
const TOP_LEFT: [NeighbourPos; 3] = [NeighbourPos::B2, NeighbourPos::B3, NeighbourPos::A2];
const TOP_RIGHT: [NeighbourPos; 2] = [NeighbourPos::B1, NeighbourPos::B0];
const BOTTOM_LEFT: [NeighbourPos; 2] = [NeighbourPos::A1, NeighbourPos::A0];

/// Inherited candidate: a neighbour already coded as affine contributes
/// its whole model, extrapolated to the current block's control points.
pub fn inherited_candidate(
    state: &FrameParseState,
    affine_model_at: impl Fn(i64, i64) -> Option<(AffineModel, [Mv; 3], i8)>,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    lx: ListIdx,
) -> Option<CpmvCandidate> {
    let _ = lx;
    for pos in TOP_LEFT.iter().chain(BOTTOM_LEFT.iter()).chain(TOP_RIGHT.iter()) {
        if let Some((nx, ny)) = neighbour(state, x0, y0, w, h, *pos) {
            if let Some((model, cpmv, ref_idx)) = affine_model_at(nx, ny) {
                return Some(CpmvCandidate { model, cpmv, ref_idx });
            }
        }
    }
    None
}

/// Constructed candidate: combine independent translational MVs found at
/// each corner's neighbour group. Requires at least the top-left and one
/// of top-right/bottom-left to produce a 4-parameter model; all three
/// yield a 6-parameter model.
pub fn constructed_candidate(state: &FrameParseState, x0: i64, y0: i64, w: i64, h: i64, lx: ListIdx) -> Option<CpmvCandidate> {
    let at = |positions: &[NeighbourPos]| -> Option<MvField> {
        positions.iter().find_map(|pos| {
            neighbour(state, x0, y0, w, h, *pos)
                .map(|(nx, ny)| *state.mvf.get((nx / 4) as usize, (ny / 4) as usize))
                .filter(|mvf| mvf.pred_flag.is_inter())
        })
    };

    let tl = at(&TOP_LEFT)?;
    let tl_mv = tl.mv_for(lx)?;
    let tr = at(&TOP_RIGHT);
    let bl = at(&BOTTOM_LEFT);

    match (tr, bl) {
        (Some(tr), Some(bl)) if tr.mv_for(lx).is_some() && bl.mv_for(lx).is_some() => {
            Some(CpmvCandidate {
                model: AffineModel::SixParam,
                cpmv: [tl_mv, tr.mv_for(lx).unwrap(), bl.mv_for(lx).unwrap()],
                ref_idx: tl.ref_idx_for(lx).unwrap_or(0),
            })
        }
        (Some(tr), _) if tr.mv_for(lx).is_some() => Some(CpmvCandidate {
            model: AffineModel::FourParam,
            cpmv: [tl_mv, tr.mv_for(lx).unwrap(), tl_mv],
            ref_idx: tl.ref_idx_for(lx).unwrap_or(0),
        }),
        (_, Some(bl)) if bl.mv_for(lx).is_some() => Some(CpmvCandidate {
            model: AffineModel::FourParam,
            cpmv: [tl_mv, tl_mv, bl.mv_for(lx).unwrap()],
            ref_idx: tl.ref_idx_for(lx).unwrap_or(0),
        }),
        _ => None,
    }
}

/// Zero-motion fallback candidate for the given model degree.
pub fn zero_candidate(model: AffineModel) -> CpmvCandidate {
    CpmvCandidate {
        model,
        cpmv: [Mv::ZERO; 3],
        ref_idx: 0,
    }
}

/// Derive the per-4x4 sub-block MV from a control-point model, per §4.4.3
/// "sub-block MV derivation with fallback flag". Falls back to the
/// top-left CPMV (as if the model were translational) when `w`/`h` are too
/// small to carry the affine parameters (sub-block size below 4x4).
pub fn subblock_mv(cand: &CpmvCandidate, block_w: i64, block_h: i64, sub_x: i64, sub_y: i64) -> Mv {
    if block_w < 4 || block_h < 4 {
        return cand.cpmv[0];
    }
    let (v0x, v0y) = (cand.cpmv[0].x as i64, cand.cpmv[0].y as i64);
    let (v1x, v1y) = (cand.cpmv[1].x as i64, cand.cpmv[1].y as i64);
    let (v2x, v2y) = if cand.model == AffineModel::SixParam {
        (cand.cpmv[2].x as i64, cand.cpmv[2].y as i64)
    } else {
        (v0x - (v1y - v0y) * block_h / block_w, v0y + (v1x - v0x) * block_h / block_w)
    };

    let dhx = (v1x - v0x) * 512 / block_w;
    let dhy = (v1y - v0y) * 512 / block_w;
    let dvx = (v2x - v0x) * 512 / block_h;
    let dvy = (v2y - v0y) * 512 / block_h;

    let cx = sub_x + 2;
    let cy = sub_y + 2;
    let mx = (v0x * 512 + dhx * cx + dvx * cy) / 512;
    let my = (v0y * 512 + dhy * cx + dvy * cy) / 512;
    Mv::new(mx as i32, my as i32).clip()
}
