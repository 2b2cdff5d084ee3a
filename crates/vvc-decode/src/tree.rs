//! CU Parser / Tree Walker (§4.5): the `coding_tree` recursive
//! split-legality/dispatch logic. Recursion follows the coding tree's own
//! structure rather than nested parser call frames, per the design notes
//! (§9) — each call handles one square or rectangular region and either
//! splits again or dispatches to `parse_coding_unit`.

use crate::availability::{neighbour, NeighbourPos};
use crate::cabac::CabacReader;
use crate::context::{EntryPointContext, FrameParseState};
use crate::cu::{CodingUnit, CtuArena, PredMode, PredictionUnit, TreeType};
use crate::error::Result;
use crate::mv::affine::{constructed_candidate, subblock_mv, zero_candidate};
use crate::mv::amvp::derive_amvp_list;
use crate::mv::ibc::{derive_ibc_candidates, validate_block_vector};
use crate::mv::merge::derive_luma_merge_list;
use crate::mv::types::{AffineModel, ListIdx, Mv, MvField, PredFlag};
use crate::params::{MttDepthLimits, Pps, RplEntry, SliceHeader, Sps};

/// Split decision the CABAC-coded `split_cu_flag`/`mtt_split_cu_*` syntax
/// maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    None,
    Quad,
    BinaryHorizontal,
    BinaryVertical,
    TernaryHorizontal,
    TernaryVertical,
}

impl Split {
    /// Resulting child footprints for a region of size `(w, h)`.
    fn children(&self, x0: u32, y0: u32, w: u32, h: u32) -> Vec<(u32, u32, u32, u32)> {
        match self {
            Split::None => vec![(x0, y0, w, h)],
            Split::Quad => {
                let hw = w / 2;
                let hh = h / 2;
                vec![
                    (x0, y0, hw, hh),
                    (x0 + hw, y0, hw, hh),
                    (x0, y0 + hh, hw, hh),
                    (x0 + hw, y0 + hh, hw, hh),
                ]
            }
            Split::BinaryHorizontal => {
                let hh = h / 2;
                vec![(x0, y0, w, hh), (x0, y0 + hh, w, hh)]
            }
            Split::BinaryVertical => {
                let hw = w / 2;
                vec![(x0, y0, hw, h), (x0 + hw, y0, hw, h)]
            }
            Split::TernaryHorizontal => {
                let q = h / 4;
                vec![(x0, y0, w, q), (x0, y0 + q, w, h - 2 * q), (x0, y0 + h - q, w, q)]
            }
            Split::TernaryVertical => {
                let q = w / 4;
                vec![(x0, y0, q, h), (x0 + q, y0, w - 2 * q, h), (x0 + w - q, y0, q, h)]
            }
        }
    }
}

/// True if splitting a `(w, h)` region further at `depth` is legal under
/// the slice-class MTT limits (§4.5 "split-legality").
fn split_allowed(limits: &MttDepthLimits, w: u32, h: u32, depth: u8) -> bool {
    let log2_size = 32 - (w.max(h)).leading_zeros() as u8 - 1;
    depth < limits.max_mtt_hierarchy_depth && log2_size > limits.log2_min_qt_size.min(limits.log2_max_bt_size)
}

/// Decode the split decision for one region via the CABAC seam. A real
/// grammar reads `split_cu_flag`, then (if set) `split_qt_flag` or the
/// `mtt_split_cu_vertical_flag`/`mtt_split_cu_binary_flag` pair; this
/// mirrors that shape against the trait seam rather than a concrete
/// engine.
fn decode_split(cabac: &mut impl CabacReader, limits: &MttDepthLimits, w: u32, h: u32, depth: u8) -> Result<Split> {
    if !split_allowed(limits, w, h, depth) {
        return Ok(Split::None);
    }
    if !cabac.decode_bin(0)? {
        return Ok(Split::None);
    }
    let log2_size = 32 - (w.max(h)).leading_zeros() as u8 - 1;
    if log2_size > limits.log2_min_qt_size && cabac.decode_bin(1)? {
        return Ok(Split::Quad);
    }
    let vertical = cabac.decode_bin(2)?;
    let ternary = cabac.decode_bin(3)?;
    Ok(match (vertical, ternary) {
        (false, false) => Split::BinaryHorizontal,
        (true, false) => Split::BinaryVertical,
        (false, true) => Split::TernaryHorizontal,
        (true, true) => Split::TernaryVertical,
    })
}

/// Decode `pred_mode_flag`/`cu_skip_flag` plus the IBC/palette alternatives
/// (§4.5 "4x4 CUs are intra-only in I-slices; 128x... CUs can't be IBC or
/// PLT"). Gated so a CU that cannot possibly reach IBC/palette (the common
/// case when the SPS has both disabled) never spends a bin on syntax
/// elements that are not actually present in the bitstream.
fn decode_pred_mode(cabac: &mut impl CabacReader, sps: &Sps, sh: &SliceHeader, w: u32, h: u32) -> Result<(bool, PredMode)> {
    let is_intra_slice = sh.is_intra();
    let max_dim = w.max(h);
    let ibc_allowed = sps.sps_ibc_enabled_flag && max_dim < 128;
    let palette_allowed = sps.sps_palette_enabled_flag && max_dim < 128 && !(w == 4 && h == 4);
    let forced_intra = is_intra_slice && w == 4 && h == 4;

    if is_intra_slice {
        if forced_intra || !ibc_allowed {
            if !forced_intra && palette_allowed && cabac.decode_bin(14)? {
                return Ok((false, PredMode::Palette));
            }
            return Ok((false, PredMode::Intra));
        }
        let skip_flag = cabac.decode_bin(10)?;
        if skip_flag {
            return Ok((true, PredMode::Ibc));
        }
        if cabac.decode_bin(11)? {
            return Ok((false, PredMode::Ibc));
        }
        if palette_allowed && cabac.decode_bin(14)? {
            return Ok((false, PredMode::Palette));
        }
        return Ok((false, PredMode::Intra));
    }

    let skip_flag = cabac.decode_bin(10)?;
    if skip_flag {
        return Ok((true, PredMode::Inter));
    }
    if !cabac.decode_bin(11)? {
        return Ok((false, PredMode::Intra));
    }
    if ibc_allowed && cabac.decode_bin(13)? {
        return Ok((false, PredMode::Ibc));
    }
    Ok((false, PredMode::Inter))
}

/// Derive the 3-entry MPM (most probable mode) candidate list for the
/// luma intra mode at `(x0, y0, w, h)` from the left (A1) and above (B1)
/// neighbours' already-decoded modes (§4.5 "MPM derivation").
fn derive_mpm_list(state: &FrameParseState, x0: i64, y0: i64, w: i64, h: i64) -> [u8; 3] {
    let mode_at = |pos: NeighbourPos| -> u8 {
        neighbour(state, x0, y0, w, h, pos)
            .map(|(nx, ny)| *state.intra_mode.get((nx / 4) as usize, (ny / 4) as usize))
            .unwrap_or(0)
    };
    let left = mode_at(NeighbourPos::A1);
    let above = mode_at(NeighbourPos::B1);

    if left == above {
        if left < 2 {
            [0, 1, 34]
        } else {
            let offset = left as i32 - 2;
            let plus1 = 2 + (offset + 1).rem_euclid(65) as u8;
            let minus1 = 2 + (offset - 1).rem_euclid(65) as u8;
            [left, plus1, minus1]
        }
    } else {
        let third = if left != 0 && above != 0 {
            0
        } else if left != 1 && above != 1 {
            1
        } else {
            34
        };
        [left, above, third]
    }
}

/// Decode `intra_luma_mpm_flag`/`intra_luma_mpm_idx` (MPM hit) or
/// `intra_luma_mpm_remainder` (MPM miss) against the derived MPM list
/// (§4.5).
fn decode_intra_luma_mode(cabac: &mut impl CabacReader, state: &FrameParseState, x0: i64, y0: i64, w: i64, h: i64) -> Result<u8> {
    let mpm = derive_mpm_list(state, x0, y0, w, h);
    if cabac.decode_bin(20)? {
        let idx = (cabac.decode_bypass_bits(2)? as usize).min(2);
        return Ok(mpm[idx]);
    }
    let mut sorted = mpm;
    sorted.sort_unstable();
    let mut rem = cabac.decode_bypass_bits(5)? as u8;
    for &m in &sorted {
        if rem >= m {
            rem += 1;
        }
    }
    Ok(rem)
}

/// Decode one MVD component: `abs_mvd_greater0_flag`,
/// `abs_mvd_greater1_flag` (+ Exp-Golomb remainder), then sign (§4.5).
fn decode_mvd_component(cabac: &mut impl CabacReader) -> Result<i32> {
    if !cabac.decode_bin(37)? {
        return Ok(0);
    }
    let mut abs = 1i32;
    if cabac.decode_bin(38)? {
        abs += 1 + cabac.decode_exp_golomb(1)? as i32;
    }
    if abs > 0 && cabac.decode_bypass()? {
        abs = -abs;
    }
    Ok(abs)
}

fn decode_mvd(cabac: &mut impl CabacReader) -> Result<Mv> {
    Ok(Mv::new(decode_mvd_component(cabac)?, decode_mvd_component(cabac)?))
}

/// Shared truncated-unary shape for `merge_idx`/`ref_idx`/`ibc_merge_idx`:
/// a single context-coded bin, then bypass bins up to `max - 1`.
fn decode_truncated_unary_idx(cabac: &mut impl CabacReader, ctx: crate::cabac::CtxIdx, max: u8) -> Result<u8> {
    if max <= 1 {
        return Ok(0);
    }
    if !cabac.decode_bin(ctx)? {
        return Ok(0);
    }
    let mut idx = 1u8;
    while idx < max - 1 {
        if !cabac.decode_bypass()? {
            break;
        }
        idx += 1;
    }
    Ok(idx)
}

fn decode_merge_idx(cabac: &mut impl CabacReader, max_cand: u8) -> Result<u8> {
    decode_truncated_unary_idx(cabac, 42, max_cand)
}

fn decode_ref_idx(cabac: &mut impl CabacReader, num_ref: u8) -> Result<i8> {
    Ok(decode_truncated_unary_idx(cabac, 41, num_ref)? as i8)
}

fn decode_ibc_merge_idx(cabac: &mut impl CabacReader, max_cand: u8) -> Result<u8> {
    decode_truncated_unary_idx(cabac, 43, max_cand)
}

/// Decode one list's uni-prediction motion: `ref_idx`, `mvp_idx`, `mvd`
/// (§4.5/§4.4.2). Returns `None` when `refs` is empty (the list is not
/// active for this slice).
#[allow(clippy::too_many_arguments)]
fn decode_uni_motion(
    cabac: &mut impl CabacReader,
    state: &FrameParseState,
    ep: &EntryPointContext,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    lx: ListIdx,
    cur_poc: i64,
    refs: &[RplEntry],
) -> Result<Option<(Mv, i8)>> {
    let _ = cur_poc;
    if refs.is_empty() {
        return Ok(None);
    }
    let ref_idx = decode_ref_idx(cabac, refs.len() as u8)?;
    let target = refs[ref_idx as usize];
    let mvp_list = derive_amvp_list(state, ep, x0, y0, w, h, lx, cur_poc, target, None, None);
    let mvp_idx = if cabac.decode_bin(35)? { 1 } else { 0 };
    let mvd = decode_mvd(cabac)?;
    let mv = mvp_list[mvp_idx].add(mvd).clip();
    Ok(Some((mv, ref_idx)))
}

/// Decode affine/merge/uni-bi inter motion for a non-IBC, non-intra CU
/// (§4.5 "inter_data"). Affine uses a single representative CPMV-derived
/// MV rather than storing per-subblock motion, a documented scope
/// simplification (DESIGN.md).
#[allow(clippy::too_many_arguments)]
fn decode_inter_motion(
    cabac: &mut impl CabacReader,
    state: &FrameParseState,
    ep: &EntryPointContext,
    sps: &Sps,
    sh: &SliceHeader,
    x0: u32,
    y0: u32,
    w: u32,
    h: u32,
    skip_flag: bool,
    cur_poc: i64,
) -> Result<(MvField, AffineModel)> {
    let (x0i, y0i, wi, hi) = (x0 as i64, y0 as i64, w as i64, h as i64);
    let l0 = &sh.rpl[0];
    let l1 = &sh.rpl[1];

    let affine_allowed = sps.sps_affine_enabled_flag && w >= 8 && h >= 8;
    if affine_allowed && cabac.decode_bin(31)? {
        let model = if sps.sps_6param_affine_enabled_flag && cabac.decode_bin(32)? {
            AffineModel::SixParam
        } else {
            AffineModel::FourParam
        };
        let merge_flag = skip_flag || cabac.decode_bin(30)?;
        if merge_flag && !skip_flag {
            let _ = decode_merge_idx(cabac, sps.sps_max_num_subblock_merge_cand)?;
        }
        let candidate = constructed_candidate(state, x0i, y0i, wi, hi, ListIdx::L0).unwrap_or_else(|| zero_candidate(model));
        let base_mv = subblock_mv(&candidate, wi, hi, 0, 0);
        let mut mvf = MvField {
            pred_flag: PredFlag::L0,
            mv: [base_mv, Mv::ZERO],
            ref_idx: [candidate.ref_idx, -1],
            ..Default::default()
        };
        if !merge_flag {
            let mvd = decode_mvd(cabac)?;
            mvf.mv[0] = base_mv.add(mvd).clip();
        }
        return Ok((mvf, model));
    }

    let merge_flag = skip_flag || cabac.decode_bin(30)?;
    if merge_flag {
        let max_cand = sps.sps_max_num_merge_cand;
        let idx = if skip_flag { 0 } else { decode_merge_idx(cabac, max_cand)? };
        let list = derive_luma_merge_list(state, ep, x0i, y0i, wi, hi, max_cand, None, cur_poc, l0, l1);
        let mvf = list.get(idx as usize).copied().unwrap_or_default();
        return Ok((mvf, AffineModel::None));
    }

    let inter_pred_bi = !l1.is_empty() && cabac.decode_bin(33)?;
    let uses_l1_only = !inter_pred_bi && !l0.is_empty() && cabac.decode_bin(34)?;

    let mut mvf = MvField::default();
    if inter_pred_bi || !uses_l1_only {
        if let Some((mv, ref_idx)) = decode_uni_motion(cabac, state, ep, x0i, y0i, wi, hi, ListIdx::L0, cur_poc, l0)? {
            mvf.mv[0] = mv;
            mvf.ref_idx[0] = ref_idx;
        }
    }
    if inter_pred_bi || uses_l1_only {
        if let Some((mv, ref_idx)) = decode_uni_motion(cabac, state, ep, x0i, y0i, wi, hi, ListIdx::L1, cur_poc, l1)? {
            mvf.mv[1] = mv;
            mvf.ref_idx[1] = ref_idx;
        }
    }
    mvf.pred_flag = match (mvf.ref_idx[0] >= 0, mvf.ref_idx[1] >= 0) {
        (true, true) => PredFlag::BI,
        (true, false) => PredFlag::L0,
        (false, true) => PredFlag::L1,
        (false, false) => PredFlag::L0,
    };
    if mvf.pred_flag.is_bi() && sps.sps_bcw_enabled_flag {
        mvf.bcw_idx = cabac.decode_bypass_bits(3)? as u8;
    }
    Ok((mvf, AffineModel::None))
}

/// Decode an IBC CU's block vector: merge from spatial/HMVP-IBC
/// candidates, or AMVP-style predictor plus `bvd` (§4.4.4). The decoded
/// vector's bound check is propagated via `?` rather than silently
/// substituted with a zero vector, matching the rest of the core's
/// no-silent-swallow error handling.
fn decode_ibc_motion(
    cabac: &mut impl CabacReader,
    state: &FrameParseState,
    ep: &EntryPointContext,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    skip_flag: bool,
) -> Result<MvField> {
    let candidates = derive_ibc_candidates(state, ep, x0, y0, w, h);
    let merge_flag = skip_flag || cabac.decode_bin(40)?;
    let bv = if merge_flag {
        let idx = if skip_flag { 0 } else { decode_ibc_merge_idx(cabac, candidates.len() as u8)? };
        candidates.get(idx as usize).copied().unwrap_or(Mv::ZERO)
    } else {
        let predictor = candidates.first().copied().unwrap_or(Mv::ZERO);
        let mvd = decode_mvd(cabac)?;
        predictor.add(mvd).clip()
    };
    validate_block_vector(state, x0, y0, w, h, bv)?;
    Ok(MvField::ibc(bv))
}

fn decode_signed_qp_delta(cabac: &mut impl CabacReader) -> Result<i16> {
    let mut abs = 0i16;
    while cabac.decode_bin(12)? && abs < 4 {
        abs += 1;
    }
    if abs == 4 {
        abs += cabac.decode_exp_golomb(0)? as i16;
    }
    if abs > 0 && cabac.decode_bypass()? {
        abs = -abs;
    }
    Ok(abs)
}

/// Parse one transform unit's per-component coded-block flags and
/// residual coefficients (§4.6 "transform_tree"/"residual_coding"),
/// pushing the decoded coefficients into `arena.coeffs` in the same
/// stream order the CABAC reader consumed them, since coefficient
/// decoding is bitstream-position-dependent and cannot be deferred to
/// reconstruction time.
#[allow(clippy::too_many_arguments)]
fn parse_transform_unit(
    cabac: &mut impl CabacReader,
    arena: &mut CtuArena,
    x0: u32,
    y0: u32,
    w: u32,
    h: u32,
    qp: i16,
    chroma_format: crate::params::ChromaFormat,
    tree_type: TreeType,
) -> Result<()> {
    use crate::cu::{TransformBlock, TransformUnit};
    use crate::residual::decode_transform_block;

    let mut tu = TransformUnit {
        x0,
        y0,
        width: w,
        height: h,
        ..Default::default()
    };

    let components: &[u8] = match tree_type {
        TreeType::DualChroma => &[1, 2],
        _ if chroma_format == crate::params::ChromaFormat::Monochrome => &[0],
        _ => &[0, 1, 2],
    };

    for &component in components {
        let (cw, ch) = if component == 0 {
            (w, h)
        } else {
            (w / chroma_format.sub_width_c(), h / chroma_format.sub_height_c())
        };
        if cw == 0 || ch == 0 {
            continue;
        }
        let ctx = 50 + component as u16;
        let cbf = cabac.decode_bin(ctx)?;
        let mut tb = TransformBlock {
            x0,
            y0,
            width: cw,
            height: ch,
            component,
            cbf,
            qp,
            first_coeff: arena.coeffs.len() as u32,
            num_coeff: cw * ch,
        };
        let coeffs = decode_transform_block(cabac, &tb)?;
        tb.num_coeff = coeffs.len() as u32;
        arena.coeffs.extend_from_slice(&coeffs);
        tu.blocks[component as usize] = tb;
    }

    arena.push_tu(tu);
    Ok(())
}

/// Parse one coding unit's header (skip/pred-mode/qp), its motion or
/// intra-mode payload, and its transform unit, per §4.5/§4.6.
#[allow(clippy::too_many_arguments)]
fn parse_coding_unit(
    cabac: &mut impl CabacReader,
    state: &mut FrameParseState,
    ep: &mut EntryPointContext,
    arena: &mut CtuArena,
    sps: &Sps,
    pps: &Pps,
    sh: &SliceHeader,
    x0: u32,
    y0: u32,
    w: u32,
    h: u32,
    tree_type: TreeType,
    qp_pred: i16,
    cur_poc: i64,
) -> Result<u32> {
    let (skip_flag, pred_mode) = decode_pred_mode(cabac, sps, sh, w, h)?;

    let qp_delta = if matches!(pred_mode, PredMode::Intra | PredMode::Palette) && !skip_flag {
        decode_signed_qp_delta(cabac)?
    } else {
        0
    };
    let qp = (qp_pred + qp_delta).clamp(-64, 63);

    let mut affine_model = AffineModel::None;
    let motion = match pred_mode {
        PredMode::Intra => MvField::intra(),
        PredMode::Palette => MvField::palette(),
        PredMode::Ibc => decode_ibc_motion(cabac, state, ep, x0 as i64, y0 as i64, w as i64, h as i64, skip_flag)?,
        PredMode::Inter => {
            let (mvf, model) = decode_inter_motion(cabac, state, ep, sps, sh, x0, y0, w, h, skip_flag, cur_poc)?;
            affine_model = model;
            mvf
        }
    };

    let intra_luma_mode = if matches!(pred_mode, PredMode::Intra) {
        decode_intra_luma_mode(cabac, state, x0 as i64, y0 as i64, w as i64, h as i64)?
    } else {
        0
    };

    let first_pu = arena.pus.len() as u32;
    arena.push_pu(PredictionUnit {
        x0,
        y0,
        width: w,
        height: h,
        motion,
        intra_luma_mode,
        merge_flag: skip_flag,
        ..Default::default()
    });
    let num_pu = 1;

    let first_tu = arena.tus.len() as u32;
    let num_tu = if skip_flag || matches!(pred_mode, PredMode::Palette) {
        0
    } else {
        parse_transform_unit(cabac, arena, x0, y0, w, h, qp, sps.sps_chroma_format_idc, tree_type)?;
        1
    };

    state.mark_parsed(x0, y0, w, h);
    let (gx, gy, gw, gh) = ((x0 / 4) as usize, (y0 / 4) as usize, (w / 4).max(1) as usize, (h / 4).max(1) as usize);
    state.qp.fill_rect(gx, gy, gw, gh, qp);
    state.mvf.fill_rect(gx, gy, gw, gh, motion);
    if matches!(pred_mode, PredMode::Intra) {
        state.intra_mode.fill_rect(gx, gy, gw, gh, intra_luma_mode);
    }

    let idx = arena.push_cu(CodingUnit {
        x0,
        y0,
        width: w,
        height: h,
        tree_type,
        pred_mode,
        qp,
        skip_flag,
        affine: affine_model,
        first_pu,
        num_pu,
        first_tu,
        num_tu,
    });

    match pred_mode {
        PredMode::Inter => ep.hmvp.push(motion),
        PredMode::Ibc => ep.hmvp_ibc.push(motion.mv[0]),
        _ => {}
    }
    let _ = pps;

    Ok(idx)
}

/// Recursively walk the coding tree for one region, pushing every leaf CU
/// into `arena`.
#[allow(clippy::too_many_arguments)]
pub fn parse_coding_tree(
    cabac: &mut impl CabacReader,
    state: &mut FrameParseState,
    ep: &mut EntryPointContext,
    arena: &mut CtuArena,
    sps: &Sps,
    pps: &Pps,
    sh: &SliceHeader,
    x0: u32,
    y0: u32,
    w: u32,
    h: u32,
    tree_type: TreeType,
    depth: u8,
    qp_pred: i16,
    cur_poc: i64,
) -> Result<()> {
    let limits = match tree_type {
        TreeType::DualChroma => &sps.dual_tree.intra_chroma,
        TreeType::DualLuma if sps.has_dual_tree_intra() => &sps.dual_tree.intra_luma,
        _ => &sps.inter,
    };
    let split = decode_split(cabac, limits, w, h, depth)?;
    if split == Split::None {
        parse_coding_unit(cabac, state, ep, arena, sps, pps, sh, x0, y0, w, h, tree_type, qp_pred, cur_poc)?;
        return Ok(());
    }
    for (cx, cy, cw, ch) in split.children(x0, y0, w, h) {
        parse_coding_tree(cabac, state, ep, arena, sps, pps, sh, cx, cy, cw, ch, tree_type, depth + 1, qp_pred, cur_poc)?;
    }
    Ok(())
}
