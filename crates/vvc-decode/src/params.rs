//! Parameter-set surface the core reads.
//!
//! The NAL-unit demuxer and the VPS/SPS/PPS/PH/SH syntax parsers are
//! external collaborators (§1): they hand the core immutable structs built
//! here. Field names follow the VVC specification and the subset the
//! teacher's `bitvue-vvc::sps`/`pps` modules already expose, extended with
//! the coding-tree, merge-candidate and in-loop-filter toggles the
//! distillation's core actually consults.

use serde::{Deserialize, Serialize};

/// Chroma subsampling format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaFormat {
    Monochrome,
    Chroma420,
    Chroma422,
    Chroma444,
}

impl From<u8> for ChromaFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Monochrome,
            1 => Self::Chroma420,
            2 => Self::Chroma422,
            3 => Self::Chroma444,
            _ => Self::Chroma420,
        }
    }
}

impl ChromaFormat {
    /// Horizontal chroma subsampling factor (`SubWidthC`).
    pub fn sub_width_c(&self) -> u32 {
        match self {
            ChromaFormat::Chroma420 | ChromaFormat::Chroma422 => 2,
            _ => 1,
        }
    }

    /// Vertical chroma subsampling factor (`SubHeightC`).
    pub fn sub_height_c(&self) -> u32 {
        match self {
            ChromaFormat::Chroma420 => 2,
            _ => 1,
        }
    }

    /// Number of coded components (1 for monochrome, 3 otherwise).
    pub fn num_components(&self) -> usize {
        if *self == ChromaFormat::Monochrome {
            1
        } else {
            3
        }
    }
}

/// MTT (quad/binary/ternary) depth limits for one slice class
/// (intra-luma, intra-chroma when dual tree, or inter).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MttDepthLimits {
    pub max_mtt_hierarchy_depth: u8,
    pub log2_min_qt_size: u8,
    pub log2_max_bt_size: u8,
    pub log2_max_tt_size: u8,
}

/// Dual-tree configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DualTreeConfig {
    pub qtbtt_dual_tree_intra_flag: bool,
    pub intra_luma: MttDepthLimits,
    pub intra_chroma: MttDepthLimits,
}

/// ALF (Adaptive Loop Filter) configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AlfConfig {
    pub alf_enabled_flag: bool,
    pub ccalf_enabled_flag: bool,
}

/// LMCS (Luma Mapping with Chroma Scaling) configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LmcsConfig {
    pub lmcs_enabled_flag: bool,
}

/// VVC Sequence Parameter Set: the subset the core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sps {
    pub sps_seq_parameter_set_id: u8,
    pub sps_chroma_format_idc: ChromaFormat,
    pub sps_log2_ctu_size_minus5: u8,
    pub sps_log2_min_luma_coding_block_size_minus2: u8,
    pub sps_pic_width_max_in_luma_samples: u32,
    pub sps_pic_height_max_in_luma_samples: u32,
    pub sps_bitdepth_minus8: u8,
    pub sps_log2_max_pic_order_cnt_lsb_minus4: u8,

    pub inter: MttDepthLimits,
    pub dual_tree: DualTreeConfig,

    pub sps_gdr_enabled_flag: bool,
    pub sps_ref_pic_resampling_enabled_flag: bool,
    pub sps_entropy_coding_sync_enabled_flag: bool,
    pub sps_max_num_merge_cand: u8,
    pub sps_max_num_merge_cand_minus_max_num_gpm_cand: u8,
    pub sps_log2_parallel_merge_level_minus2: u8,
    pub sps_max_num_subblock_merge_cand: u8,

    pub sps_transform_skip_enabled_flag: bool,
    pub sps_bdpcm_enabled_flag: bool,
    pub sps_mts_enabled_flag: bool,
    pub sps_lfnst_enabled_flag: bool,
    pub sps_joint_cbcr_enabled_flag: bool,
    pub sps_sao_enabled_flag: bool,
    pub sps_deblocking_filter_control_present_flag: bool,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub sps_sbtmvp_enabled_flag: bool,
    pub sps_amvr_enabled_flag: bool,
    pub sps_bdof_enabled_flag: bool,
    pub sps_dmvr_enabled_flag: bool,
    pub sps_mmvd_enabled_flag: bool,
    pub sps_sbt_enabled_flag: bool,
    pub sps_affine_enabled_flag: bool,
    pub sps_6param_affine_enabled_flag: bool,
    pub sps_affine_amvr_enabled_flag: bool,
    pub sps_bcw_enabled_flag: bool,
    pub sps_ibc_enabled_flag: bool,
    pub sps_ciip_enabled_flag: bool,
    pub sps_gpm_enabled_flag: bool,
    pub sps_isp_enabled_flag: bool,
    pub sps_mrl_enabled_flag: bool,
    pub sps_mip_enabled_flag: bool,
    pub sps_cclm_enabled_flag: bool,
    pub sps_palette_enabled_flag: bool,
    pub sps_weighted_pred_flag: bool,
    pub sps_weighted_bipred_flag: bool,

    pub alf: AlfConfig,
    pub lmcs: LmcsConfig,

    pub max_dec_pic_buffering_minus1: u8,
}

impl Default for Sps {
    fn default() -> Self {
        Self {
            sps_seq_parameter_set_id: 0,
            sps_chroma_format_idc: ChromaFormat::Chroma420,
            sps_log2_ctu_size_minus5: 2,
            sps_log2_min_luma_coding_block_size_minus2: 0,
            sps_pic_width_max_in_luma_samples: 0,
            sps_pic_height_max_in_luma_samples: 0,
            sps_bitdepth_minus8: 2,
            sps_log2_max_pic_order_cnt_lsb_minus4: 4,
            inter: MttDepthLimits {
                max_mtt_hierarchy_depth: 3,
                log2_min_qt_size: 3,
                log2_max_bt_size: 6,
                log2_max_tt_size: 6,
            },
            dual_tree: DualTreeConfig::default(),
            sps_gdr_enabled_flag: false,
            sps_ref_pic_resampling_enabled_flag: false,
            sps_entropy_coding_sync_enabled_flag: false,
            sps_max_num_merge_cand: 6,
            sps_max_num_merge_cand_minus_max_num_gpm_cand: 1,
            sps_log2_parallel_merge_level_minus2: 0,
            sps_max_num_subblock_merge_cand: 5,
            sps_transform_skip_enabled_flag: false,
            sps_bdpcm_enabled_flag: false,
            sps_mts_enabled_flag: false,
            sps_lfnst_enabled_flag: false,
            sps_joint_cbcr_enabled_flag: false,
            sps_sao_enabled_flag: true,
            sps_deblocking_filter_control_present_flag: false,
            sps_temporal_mvp_enabled_flag: true,
            sps_sbtmvp_enabled_flag: false,
            sps_amvr_enabled_flag: false,
            sps_bdof_enabled_flag: false,
            sps_dmvr_enabled_flag: false,
            sps_mmvd_enabled_flag: false,
            sps_sbt_enabled_flag: false,
            sps_affine_enabled_flag: false,
            sps_6param_affine_enabled_flag: false,
            sps_affine_amvr_enabled_flag: false,
            sps_bcw_enabled_flag: false,
            sps_ibc_enabled_flag: false,
            sps_ciip_enabled_flag: false,
            sps_gpm_enabled_flag: false,
            sps_isp_enabled_flag: false,
            sps_mrl_enabled_flag: false,
            sps_mip_enabled_flag: false,
            sps_cclm_enabled_flag: false,
            sps_palette_enabled_flag: false,
            sps_weighted_pred_flag: false,
            sps_weighted_bipred_flag: false,
            alf: AlfConfig::default(),
            lmcs: LmcsConfig::default(),
            max_dec_pic_buffering_minus1: 5,
        }
    }
}

impl Sps {
    pub fn bit_depth(&self) -> u8 {
        self.sps_bitdepth_minus8 + 8
    }

    pub fn ctu_size(&self) -> u32 {
        1 << (self.sps_log2_ctu_size_minus5 + 5)
    }

    pub fn min_cb_size(&self) -> u32 {
        1 << (self.sps_log2_min_luma_coding_block_size_minus2 + 2)
    }

    pub fn pic_width_in_ctus(&self) -> u32 {
        self.sps_pic_width_max_in_luma_samples
            .div_ceil(self.ctu_size())
    }

    pub fn pic_height_in_ctus(&self) -> u32 {
        self.sps_pic_height_max_in_luma_samples
            .div_ceil(self.ctu_size())
    }

    pub fn max_poc_lsb(&self) -> u32 {
        1 << (self.sps_log2_max_pic_order_cnt_lsb_minus4 + 4)
    }

    pub fn has_dual_tree_intra(&self) -> bool {
        self.dual_tree.qtbtt_dual_tree_intra_flag
    }

    /// `log2_parallel_merge_level` used by the MER equivalence check (§4.3).
    pub fn log2_parallel_merge_level(&self) -> u32 {
        (self.sps_log2_parallel_merge_level_minus2 + 2) as u32
    }

    pub fn max_num_gpm_cand(&self) -> u8 {
        self.sps_max_num_merge_cand
            .saturating_sub(self.sps_max_num_merge_cand_minus_max_num_gpm_cand)
    }
}

/// VVC Picture Parameter Set: the subset the core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pps {
    pub pps_pic_parameter_set_id: u8,
    pub pps_seq_parameter_set_id: u8,
    pub pps_pic_width_in_luma_samples: u32,
    pub pps_pic_height_in_luma_samples: u32,
    pub pps_no_pic_partition_flag: bool,
    pub pps_loop_filter_across_tiles_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub pps_weighted_pred_flag: bool,
    pub pps_weighted_bipred_flag: bool,
    pub pps_ref_wraparound_enabled_flag: bool,
    pub pps_init_qp_minus26: i8,
    pub pps_cu_qp_delta_enabled_flag: bool,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub pps_joint_cbcr_qp_offset_value: i8,
    pub pps_chroma_qp_offset_list: Vec<(i8, i8)>,
    pub pps_deblocking_filter_control_present_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub pps_act_enabled_flag: bool,
    /// CTB x-boundaries of tile columns, in CTUs (strictly increasing,
    /// starts at 0, ends at `pic_width_in_ctus`).
    pub tile_col_bounds: Vec<u32>,
    /// CTB y-boundaries of tile rows, in CTUs.
    pub tile_row_bounds: Vec<u32>,
}

impl Default for Pps {
    fn default() -> Self {
        Self {
            pps_pic_parameter_set_id: 0,
            pps_seq_parameter_set_id: 0,
            pps_pic_width_in_luma_samples: 0,
            pps_pic_height_in_luma_samples: 0,
            pps_no_pic_partition_flag: true,
            pps_loop_filter_across_tiles_enabled_flag: true,
            pps_loop_filter_across_slices_enabled_flag: true,
            pps_weighted_pred_flag: false,
            pps_weighted_bipred_flag: false,
            pps_ref_wraparound_enabled_flag: false,
            pps_init_qp_minus26: 0,
            pps_cu_qp_delta_enabled_flag: false,
            pps_cb_qp_offset: 0,
            pps_cr_qp_offset: 0,
            pps_joint_cbcr_qp_offset_value: 0,
            pps_chroma_qp_offset_list: Vec::new(),
            pps_deblocking_filter_control_present_flag: false,
            pps_deblocking_filter_disabled_flag: false,
            pps_beta_offset_div2: 0,
            pps_tc_offset_div2: 0,
            pps_act_enabled_flag: false,
            tile_col_bounds: Vec::new(),
            tile_row_bounds: Vec::new(),
        }
    }
}

impl Pps {
    pub fn init_qp(&self) -> i32 {
        26 + self.pps_init_qp_minus26 as i32
    }

    /// Tile column index containing CTB column `ctb_x`.
    pub fn tile_col_of(&self, ctb_x: u32) -> usize {
        if self.tile_col_bounds.len() < 2 {
            return 0;
        }
        self.tile_col_bounds
            .windows(2)
            .position(|w| ctb_x >= w[0] && ctb_x < w[1])
            .unwrap_or(0)
    }

    /// Tile row index containing CTB row `ctb_y`.
    pub fn tile_row_of(&self, ctb_y: u32) -> usize {
        if self.tile_row_bounds.len() < 2 {
            return 0;
        }
        self.tile_row_bounds
            .windows(2)
            .position(|w| ctb_y >= w[0] && ctb_y < w[1])
            .unwrap_or(0)
    }
}

/// GDR / virtual boundary / per-picture QP-delta subset of the Picture
/// Header the core reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PicHeader {
    pub ph_gdr_pic_flag: bool,
    pub ph_pic_order_cnt_lsb: u32,
    pub ph_qp_delta: i32,
    /// Luma virtual boundary x-positions (in samples).
    pub virtual_boundaries_x: Vec<u32>,
    /// Luma virtual boundary y-positions (in samples).
    pub virtual_boundaries_y: Vec<u32>,
    pub alf_aps_ids_luma: Vec<u8>,
    pub alf_aps_id_chroma: Option<u8>,
    pub lmcs_aps_id: Option<u8>,
}

/// Slice type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceType {
    B,
    P,
    I,
}

/// One entry of a reference picture list as resolved by `slice_rpl` (§4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RplEntry {
    pub poc: i64,
    pub is_long_term: bool,
    pub is_scaled: bool,
}

/// Slice Header subset the core reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceHeader {
    pub sh_slice_type: SliceType,
    pub sh_slice_qp_delta: i32,
    pub sh_num_ref_idx_active: [u8; 2],
    pub rpl: [Vec<RplEntry>; 2],
    pub sh_deblocking_filter_disabled_flag: bool,
    pub sh_sao_luma_flag: bool,
    pub sh_sao_chroma_flag: bool,
    pub sh_alf_enabled_flag: bool,
    pub sh_cabac_init_flag: bool,
    pub sh_collocated_from_l0_flag: bool,
    pub sh_collocated_ref_idx: u8,
    pub sh_max_num_merge_cand_minus_max_num_triangle_cand: u8,
    /// True when L0/L1 reference a resolution-differing picture (RPR); per
    /// §4.4.5 this disables DMVR for the affected CU.
    pub sh_lmcs_used_flag: bool,
}

impl Default for SliceHeader {
    fn default() -> Self {
        Self {
            sh_slice_type: SliceType::I,
            sh_slice_qp_delta: 0,
            sh_num_ref_idx_active: [0, 0],
            rpl: [Vec::new(), Vec::new()],
            sh_deblocking_filter_disabled_flag: false,
            sh_sao_luma_flag: true,
            sh_sao_chroma_flag: true,
            sh_alf_enabled_flag: false,
            sh_cabac_init_flag: false,
            sh_collocated_from_l0_flag: true,
            sh_collocated_ref_idx: 0,
            sh_max_num_merge_cand_minus_max_num_triangle_cand: 0,
            sh_lmcs_used_flag: false,
        }
    }
}

impl SliceHeader {
    pub fn is_intra(&self) -> bool {
        self.sh_slice_type == SliceType::I
    }

    pub fn init_qp(&self, pps: &Pps) -> i32 {
        pps.init_qp() + self.sh_slice_qp_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sps_defaults_10bit_128ctu() {
        let sps = Sps::default();
        assert_eq!(sps.bit_depth(), 10);
        assert_eq!(sps.ctu_size(), 128);
    }

    #[test]
    fn ctu_grid_rounds_up() {
        let mut sps = Sps::default();
        sps.sps_pic_width_max_in_luma_samples = 1920;
        sps.sps_pic_height_max_in_luma_samples = 1080;
        assert_eq!(sps.pic_width_in_ctus(), 15);
        assert_eq!(sps.pic_height_in_ctus(), 9);
    }

    #[test]
    fn tile_col_of_finds_containing_range() {
        let mut pps = Pps::default();
        pps.tile_col_bounds = vec![0, 4, 10];
        assert_eq!(pps.tile_col_of(0), 0);
        assert_eq!(pps.tile_col_of(3), 0);
        assert_eq!(pps.tile_col_of(4), 1);
        assert_eq!(pps.tile_col_of(9), 1);
    }

    #[test]
    fn max_num_gpm_cand_subtracts_offset() {
        let sps = Sps::default();
        assert_eq!(sps.max_num_gpm_cand(), 5);
    }
}
