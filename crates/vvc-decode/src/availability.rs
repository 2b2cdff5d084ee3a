//! Neighbour / Availability Oracle (§4.3): the single place that decides
//! whether a spatial position can be used as a prediction candidate.
//!
//! Grounded on `libavcodec/vvc/mvs.c`'s `ff_vvc_ctb_neighbour_available`-
//! style checks and FFmpeg's `derive_spatial_merge_candidates`: a neighbour
//! is usable only if it lies inside the picture, has already been parsed in
//! z-scan order, belongs to the same slice and tile as the current block,
//! and is not separated from it by a virtual (GDR) boundary.

use crate::context::FrameParseState;

/// One of the seven canonical spatial positions the merge list (A0, A1, B0,
/// B1, B2), the IBC candidate list (A1, B1), and the affine control-point
/// derivation (A0, A1, A2, B0, B1, B2, B3) are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighbourPos {
    /// Bottom-left corner, one row below the block.
    A0,
    /// Left column, bottom-most 4x4 unit.
    A1,
    /// Left column, top-most 4x4 unit (used by affine CPMV0 inheritance).
    A2,
    /// Above-right corner, one column right of the block.
    B0,
    /// Above row, right-most 4x4 unit.
    B1,
    /// Above-left corner.
    B2,
    /// Above row, left-most 4x4 unit (used by affine CPMV0 inheritance).
    B3,
}

impl NeighbourPos {
    /// Offset, in luma samples, of this position's representative sample
    /// from the current block's top-left corner `(x0, y0)` with size
    /// `(w, h)`.
    pub fn offset(&self, w: i64, h: i64) -> (i64, i64) {
        match self {
            NeighbourPos::A0 => (-1, h),
            NeighbourPos::A1 => (-1, h - 1),
            NeighbourPos::A2 => (-1, 0),
            NeighbourPos::B0 => (w, -1),
            NeighbourPos::B1 => (w - 1, -1),
            NeighbourPos::B2 => (-1, -1),
            NeighbourPos::B3 => (0, -1),
        }
    }
}

/// Absolute picture-sample position of `pos` relative to the current
/// block, without checking availability.
pub fn position_of(x0: i64, y0: i64, w: i64, h: i64, pos: NeighbourPos) -> (i64, i64) {
    let (dx, dy) = pos.offset(w, h);
    (x0 + dx, y0 + dy)
}

/// True if the sample at `(nx, ny)` can be used as a prediction neighbour
/// of the current block at `(x0, y0)`.
///
/// Matches FFmpeg's layered check: picture bounds, z-scan causality (the
/// `parsed` grid only marks units already walked by the tree parser),
/// same slice, same tile, and no intervening virtual boundary.
pub fn is_available(state: &FrameParseState, x0: i64, y0: i64, nx: i64, ny: i64) -> bool {
    if nx < 0 || ny < 0 {
        return false;
    }
    if !state.parsed.in_bounds(nx / 4, ny / 4) {
        return false;
    }
    if !state.is_parsed(nx, ny) {
        return false;
    }
    if state.slice_id_of(nx, ny) != state.slice_id_of(x0, y0) {
        return false;
    }
    if state.tile_id_of(nx, ny) != state.tile_id_of(x0, y0) {
        return false;
    }
    if state.vertical_boundary_between(x0, nx) {
        return false;
    }
    if state.horizontal_boundary_between(y0, ny) {
        return false;
    }
    true
}

/// Resolve one canonical neighbour position to its sample coordinates if
/// it is available, or `None` otherwise.
pub fn neighbour(
    state: &FrameParseState,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    pos: NeighbourPos,
) -> Option<(i64, i64)> {
    let (nx, ny) = position_of(x0, y0, w, h, pos);
    if is_available(state, x0, y0, nx, ny) {
        Some((nx, ny))
    } else {
        None
    }
}

/// Merge Estimation Region equivalence (§4.3, §4.4.1 step 0): two positions
/// inside the same MER must not be used as each other's merge candidate,
/// since they are estimated in parallel and neither has "seen" the other's
/// final motion yet. A neighbour in the same MER as the current block is
/// therefore treated as unavailable for merge/skip candidate derivation
/// even if it has otherwise already been parsed.
pub fn same_merge_estimation_region(
    state: &FrameParseState,
    x0: i64,
    y0: i64,
    nx: i64,
    ny: i64,
) -> bool {
    let level = state.log2_parallel_merge_level as i64;
    if level <= 2 {
        return false;
    }
    (x0 >> level) == (nx >> level) && (y0 >> level) == (ny >> level)
}

/// Spatial candidate availability for merge/skip derivation: available per
/// [`is_available`] and not inside the same MER as the current block.
pub fn merge_neighbour(
    state: &FrameParseState,
    x0: i64,
    y0: i64,
    w: i64,
    h: i64,
    pos: NeighbourPos,
) -> Option<(i64, i64)> {
    let (nx, ny) = position_of(x0, y0, w, h, pos);
    if same_merge_estimation_region(state, x0, y0, nx, ny) {
        return None;
    }
    if is_available(state, x0, y0, nx, ny) {
        Some((nx, ny))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Pps, Sps};

    fn state_with_parsed_square(size: u32) -> FrameParseState {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        let pps = Pps::default();
        let mut state = FrameParseState::new(&sps, &pps);
        state.mark_parsed(0, 0, size, size);
        state
    }

    #[test]
    fn left_neighbour_of_origin_is_unavailable() {
        let state = state_with_parsed_square(64);
        assert!(neighbour(&state, 0, 0, 8, 8, NeighbourPos::A1).is_none());
    }

    #[test]
    fn above_left_of_parsed_block_is_available() {
        let state = state_with_parsed_square(16);
        // Current block at (16, 16), its above-left (B2) is (15, 15),
        // inside the already-parsed 16x16 square.
        let pos = neighbour(&state, 16, 16, 8, 8, NeighbourPos::B2);
        assert_eq!(pos, Some((15, 15)));
    }

    #[test]
    fn below_left_past_picture_is_unavailable() {
        let state = state_with_parsed_square(256);
        assert!(neighbour(&state, 0, 248, 8, 8, NeighbourPos::A0).is_none());
    }

    #[test]
    fn virtual_boundary_blocks_otherwise_available_neighbour() {
        let sps = Sps {
            sps_pic_width_max_in_luma_samples: 256,
            sps_pic_height_max_in_luma_samples: 256,
            ..Default::default()
        };
        let pps = Pps::default();
        let mut state = FrameParseState::new(&sps, &pps);
        state.mark_parsed(0, 0, 64, 64);
        state.virtual_boundaries_x = vec![32];
        assert!(neighbour(&state, 33, 0, 8, 8, NeighbourPos::A1).is_none());
    }

    #[test]
    fn same_mer_rejects_spatial_merge_candidate() {
        let state = state_with_parsed_square(64);
        // log2_parallel_merge_level defaults to 2 (4x4 MER), so no
        // suppression; bump it synthetically to exercise the check.
        let mut state = state;
        state.log2_parallel_merge_level = 4; // 16x16 MER
        assert!(same_merge_estimation_region(&state, 16, 16, 15, 15));
        assert!(merge_neighbour(&state, 16, 16, 8, 8, NeighbourPos::B2).is_none());
    }
}
