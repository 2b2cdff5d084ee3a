//! Coding/prediction/transform unit types (§4.5, §9 "arena-style
//! allocation"): flat `Vec`-backed arenas rather than a tree of boxed
//! nodes, since the tree walker only ever needs parent-to-child traversal
//! during parsing and a flat per-CTU list during reconstruction/filtering.

use crate::mv::types::{AffineModel, MvField};
use crate::params::ChromaFormat;

/// Partition tree type for this CU's region (§4.5): single tree covers
/// luma+chroma together, dual tree codes them with independent trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    Single,
    DualLuma,
    DualChroma,
}

/// Prediction mode of a coding unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredMode {
    Intra,
    Inter,
    Ibc,
    Palette,
}

/// One coding unit's parsed state, indexed by position into the arena
/// `Vec` the tree walker appends to.
#[derive(Debug, Clone)]
pub struct CodingUnit {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub tree_type: TreeType,
    pub pred_mode: PredMode,
    pub qp: i16,
    pub skip_flag: bool,
    pub affine: AffineModel,
    pub first_pu: u32,
    pub num_pu: u32,
    pub first_tu: u32,
    pub num_tu: u32,
}

impl CodingUnit {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x0 + self.width && y >= self.y0 && y < self.y0 + self.height
    }
}

/// One prediction unit's motion/intra-mode payload. For non-affine inter
/// CUs there is exactly one PU per CU; affine and GPM/CIIP CUs may have
/// sub-partitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionUnit {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub motion: MvField,
    pub intra_luma_mode: u8,
    pub intra_chroma_mode: u8,
    pub merge_flag: bool,
    pub merge_idx: u8,
    pub gpm_split: Option<(u8, u8, u8)>,
}

/// One coded transform block (one component of a transform unit).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformBlock {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub component: u8,
    pub cbf: bool,
    pub qp: i16,
    pub first_coeff: u32,
    pub num_coeff: u32,
}

/// One transform unit: up to three transform blocks (Y, Cb, Cr), plus the
/// MTS/LFNST selection that applies across them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformUnit {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub blocks: [TransformBlock; 3],
    pub mts_idx: u8,
    pub lfnst_idx: u8,
    pub joint_cbcr: bool,
}

/// Per-CTU arena: every CU/PU/TU the tree walker produced while parsing
/// one CTU, plus the coefficient arena they index into.
#[derive(Debug, Clone, Default)]
pub struct CtuArena {
    pub cus: Vec<CodingUnit>,
    pub pus: Vec<PredictionUnit>,
    pub tus: Vec<TransformUnit>,
    pub coeffs: Vec<i32>,
    pub chroma_format: Option<ChromaFormat>,
}

impl CtuArena {
    pub fn reset(&mut self) {
        self.cus.clear();
        self.pus.clear();
        self.tus.clear();
        self.coeffs.clear();
    }

    pub fn push_cu(&mut self, cu: CodingUnit) -> u32 {
        self.cus.push(cu);
        (self.cus.len() - 1) as u32
    }

    pub fn push_pu(&mut self, pu: PredictionUnit) -> u32 {
        self.pus.push(pu);
        (self.pus.len() - 1) as u32
    }

    pub fn push_tu(&mut self, tu: TransformUnit) -> u32 {
        self.tus.push(tu);
        (self.tus.len() - 1) as u32
    }

    pub fn pus_of(&self, cu: &CodingUnit) -> &[PredictionUnit] {
        &self.pus[cu.first_pu as usize..(cu.first_pu + cu.num_pu) as usize]
    }

    pub fn tus_of(&self, cu: &CodingUnit) -> &[TransformUnit] {
        &self.tus[cu.first_tu as usize..(cu.first_tu + cu.num_tu) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cu_contains_checks_half_open_footprint() {
        let cu = CodingUnit {
            x0: 16,
            y0: 16,
            width: 8,
            height: 8,
            tree_type: TreeType::Single,
            pred_mode: PredMode::Intra,
            qp: 32,
            skip_flag: false,
            affine: AffineModel::None,
            first_pu: 0,
            num_pu: 0,
            first_tu: 0,
            num_tu: 0,
        };
        assert!(cu.contains(16, 16));
        assert!(cu.contains(23, 23));
        assert!(!cu.contains(24, 16));
    }

    #[test]
    fn arena_slices_respect_first_and_count() {
        let mut arena = CtuArena::default();
        arena.push_pu(PredictionUnit { x0: 0, ..Default::default() });
        arena.push_pu(PredictionUnit { x0: 4, ..Default::default() });
        let cu = CodingUnit {
            x0: 0,
            y0: 0,
            width: 8,
            height: 4,
            tree_type: TreeType::Single,
            pred_mode: PredMode::Inter,
            qp: 32,
            skip_flag: false,
            affine: AffineModel::None,
            first_pu: 0,
            num_pu: 2,
            first_tu: 0,
            num_tu: 0,
        };
        let pus = arena.pus_of(&cu);
        assert_eq!(pus.len(), 2);
        assert_eq!(pus[1].x0, 4);
    }

    #[test]
    fn reset_clears_every_arena() {
        let mut arena = CtuArena::default();
        arena.push_pu(PredictionUnit::default());
        arena.coeffs.push(7);
        arena.reset();
        assert!(arena.pus.is_empty());
        assert!(arena.coeffs.is_empty());
    }
}
