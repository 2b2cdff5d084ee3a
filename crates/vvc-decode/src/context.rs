//! Per-frame parse state threaded through the tree walker, and the
//! `ParseContext` shape the design notes (§9) call for instead of modelling
//! the deep `hls_coding_tree -> hls_coding_unit -> inter_data -> ...` call
//! chain as nested stack frames: recursion happens over the coding tree
//! itself, not over parser call depth.

use crate::grid::Grid;
use crate::mv::hmvp::{HmvpBuffer, HmvpIbcBuffer};
use crate::mv::types::MvField;
use crate::params::{PicHeader, Pps, SliceHeader, Sps};

/// Per-frame tables owned by the PARSE thread for that frame, then frozen
/// (§5 "Shared state"): the motion field under construction, which 4x4
/// units have been parsed (for the availability oracle), and the running
/// luma QP map (for predictive QP coding and later deblocking).
pub struct FrameParseState {
    pub mvf: Grid<MvField>,
    pub parsed: Grid<bool>,
    pub qp: Grid<i16>,
    /// Per-4x4-luma-unit derived intra luma mode, written by the tree
    /// walker's MPM derivation and read back by reconstruction.
    pub intra_mode: Grid<u8>,
    pub log2_ctu_size: u32,
    pub width_in_ctus: u32,
    pub height_in_ctus: u32,
    pub tile_col_bounds: Vec<u32>,
    pub tile_row_bounds: Vec<u32>,
    /// Slice id per CTU, raster order; slices partition at CTU
    /// granularity.
    pub slice_id_per_ctu: Vec<u32>,
    pub subpic_id_per_ctu: Vec<u32>,
    pub virtual_boundaries_x: Vec<u32>,
    pub virtual_boundaries_y: Vec<u32>,
    pub entropy_coding_sync: bool,
    pub log2_parallel_merge_level: u32,
}

impl FrameParseState {
    pub fn new(sps: &Sps, pps: &Pps) -> Self {
        let grid_w = (sps.sps_pic_width_max_in_luma_samples.div_ceil(4)) as usize;
        let grid_h = (sps.sps_pic_height_max_in_luma_samples.div_ceil(4)) as usize;
        let width_in_ctus = sps.pic_width_in_ctus();
        let height_in_ctus = sps.pic_height_in_ctus();
        let n_ctus = (width_in_ctus * height_in_ctus) as usize;
        Self {
            mvf: Grid::new(grid_w, grid_h),
            parsed: Grid::new(grid_w, grid_h),
            qp: Grid::new(grid_w, grid_h),
            intra_mode: Grid::new(grid_w, grid_h),
            log2_ctu_size: sps.sps_log2_ctu_size_minus5 as u32 + 5,
            width_in_ctus,
            height_in_ctus,
            tile_col_bounds: if pps.tile_col_bounds.len() >= 2 {
                pps.tile_col_bounds.clone()
            } else {
                vec![0, width_in_ctus]
            },
            tile_row_bounds: if pps.tile_row_bounds.len() >= 2 {
                pps.tile_row_bounds.clone()
            } else {
                vec![0, height_in_ctus]
            },
            slice_id_per_ctu: vec![0; n_ctus],
            subpic_id_per_ctu: vec![0; n_ctus],
            virtual_boundaries_x: Vec::new(),
            virtual_boundaries_y: Vec::new(),
            entropy_coding_sync: sps.sps_entropy_coding_sync_enabled_flag,
            log2_parallel_merge_level: sps.log2_parallel_merge_level(),
        }
    }

    pub fn ctb_size(&self) -> u32 {
        1 << self.log2_ctu_size
    }

    /// CTB address (col, row) containing luma sample `(x, y)`.
    pub fn ctb_of(&self, x: i64, y: i64) -> (u32, u32) {
        let size = self.ctb_size() as i64;
        ((x / size) as u32, (y / size) as u32)
    }

    fn ctu_addr(&self, col: u32, row: u32) -> usize {
        (row * self.width_in_ctus + col) as usize
    }

    pub fn tile_col_of_ctu(&self, col: u32) -> usize {
        self.tile_col_bounds
            .windows(2)
            .position(|w| col >= w[0] && col < w[1])
            .unwrap_or(0)
    }

    pub fn tile_row_of_ctu(&self, row: u32) -> usize {
        self.tile_row_bounds
            .windows(2)
            .position(|w| row >= w[0] && row < w[1])
            .unwrap_or(0)
    }

    /// Combined tile id, distinct per (tile_col, tile_row) pair.
    pub fn tile_id_of(&self, x: i64, y: i64) -> u32 {
        let (col, row) = self.ctb_of(x, y);
        let tc = self.tile_col_of_ctu(col) as u32;
        let tr = self.tile_row_of_ctu(row) as u32;
        tr * (self.tile_col_bounds.len() as u32) + tc
    }

    pub fn slice_id_of(&self, x: i64, y: i64) -> u32 {
        let (col, row) = self.ctb_of(x, y);
        let idx = self.ctu_addr(col, row);
        self.slice_id_per_ctu.get(idx).copied().unwrap_or(0)
    }

    pub fn subpic_id_of(&self, x: i64, y: i64) -> u32 {
        let (col, row) = self.ctb_of(x, y);
        let idx = self.ctu_addr(col, row);
        self.subpic_id_per_ctu.get(idx).copied().unwrap_or(0)
    }

    /// True if a virtual boundary lies strictly between `a` and `b` on the
    /// x axis.
    pub fn vertical_boundary_between(&self, ax: i64, bx: i64) -> bool {
        let (lo, hi) = if ax <= bx { (ax, bx) } else { (bx, ax) };
        self.virtual_boundaries_x
            .iter()
            .any(|&vb| (vb as i64) > lo && (vb as i64) <= hi)
    }

    /// True if a virtual boundary lies strictly between `a` and `b` on the
    /// y axis.
    pub fn horizontal_boundary_between(&self, ay: i64, by: i64) -> bool {
        let (lo, hi) = if ay <= by { (ay, by) } else { (by, ay) };
        self.virtual_boundaries_y
            .iter()
            .any(|&vb| (vb as i64) > lo && (vb as i64) <= hi)
    }

    pub fn is_parsed(&self, x: i64, y: i64) -> bool {
        if !self.parsed.in_bounds(x / 4, y / 4) {
            return false;
        }
        *self.parsed.get((x / 4) as usize, (y / 4) as usize)
    }

    pub fn mark_parsed(&mut self, x0: u32, y0: u32, w: u32, h: u32) {
        self.parsed
            .fill_rect((x0 / 4) as usize, (y0 / 4) as usize, (w / 4).max(1) as usize, (h / 4).max(1) as usize, true);
    }
}

/// Slice-scoped context (`sc` in the design notes): immutable parameter
/// sets plus the mutable per-frame tables for the frame this slice belongs
/// to.
pub struct SliceContext<'a> {
    pub sps: &'a Sps,
    pub pps: &'a Pps,
    pub ph: &'a PicHeader,
    pub sh: &'a SliceHeader,
    pub state: &'a mut FrameParseState,
}

/// Entry-point-scoped context (`ep`): HMVP and palette predictor state,
/// owned by the parse task and not shared across entry points (§5).
#[derive(Default)]
pub struct EntryPointContext {
    pub hmvp: HmvpBuffer,
    pub hmvp_ibc: HmvpIbcBuffer,
    pub palette_predictor: [Vec<[u16; 3]>; 2],
}

impl EntryPointContext {
    /// Reset at a new CTU row (wavefront), new tile, or new slice (§3).
    pub fn reset(&mut self) {
        self.hmvp.reset();
        self.hmvp_ibc.reset();
        self.palette_predictor[0].clear();
        self.palette_predictor[1].clear();
    }
}
