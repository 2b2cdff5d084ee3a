//! Motion vector / motion-field primitives shared by the tree walker, the
//! MV derivation engine, and the prediction applier.

use serde::{Deserialize, Serialize};

/// A quarter-luma-sample motion vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mv {
    pub x: i32,
    pub y: i32,
}

impl Mv {
    pub const ZERO: Mv = Mv { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn negate(&self) -> Mv {
        Mv::new(-self.x, -self.y)
    }

    pub fn add(&self, rhs: Mv) -> Mv {
        Mv::new(self.x + rhs.x, self.y + rhs.y)
    }

    /// Clip a motion vector to the 18-bit signed range the VVC spec uses
    /// for stored motion (`-2^17 .. 2^17-1`).
    pub fn clip(&self) -> Mv {
        const LO: i32 = -(1 << 17);
        const HI: i32 = (1 << 17) - 1;
        Mv::new(self.x.clamp(LO, HI), self.y.clamp(LO, HI))
    }

    /// Round to the precision used for HMVP/TMVP storage per §4.4.1(2)
    /// ("round collocated MV to 4x4-aligned precision").
    pub fn round_to(&self, shift: u32) -> Mv {
        let round = 1i32 << (shift - 1);
        let mask = !((1i32 << shift) - 1);
        Mv::new(
            (self.x + round) & mask,
            (self.y + round) & mask,
        )
    }
}

/// Reference list direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListIdx {
    L0 = 0,
    L1 = 1,
}

/// Bitmask prediction-direction flag, matching the distillation's `MvField`
/// layout (`pred_flag` is one of {INTRA, L0, L1, BI, IBC, PLT}) so the
/// per-4x4 grid can be stored compactly. [`Prediction`] below re-expresses
/// the same information as a sum type at the grid boundary per the design
/// notes (§9 "tagged variants").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredFlag(u8);

impl PredFlag {
    pub const NONE: PredFlag = PredFlag(0);
    pub const L0: PredFlag = PredFlag(1 << 0);
    pub const L1: PredFlag = PredFlag(1 << 1);
    pub const BI: PredFlag = PredFlag(Self::L0.0 | Self::L1.0);
    pub const IBC: PredFlag = PredFlag(1 << 2);
    pub const INTRA: PredFlag = PredFlag(1 << 3);
    pub const PLT: PredFlag = PredFlag(1 << 4);

    pub fn contains(&self, other: PredFlag) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn uses_list(&self, lx: ListIdx) -> bool {
        match lx {
            ListIdx::L0 => self.contains(PredFlag::L0),
            ListIdx::L1 => self.contains(PredFlag::L1),
        }
    }

    pub fn is_bi(&self) -> bool {
        self.contains(PredFlag::BI)
    }

    /// True if this is any inter mode (L0, L1 or BI) as opposed to
    /// intra/IBC/palette.
    pub fn is_inter(&self) -> bool {
        self.0 & (PredFlag::BI.0) != 0 && self.0 & !(PredFlag::BI.0) == 0 && self.0 != 0
    }

    pub fn raw(&self) -> u8 {
        self.0
    }
}

/// Per-4x4-luma-unit motion field entry. This is the grid cell read by the
/// availability oracle and the neighbour-based candidate constructors.
///
/// Invariant (§3): if `pred_flag == L0`, `mv[1]`/`ref_idx[1]` must not be
/// read; enforced here by [`MvField::mv_for`]/[`MvField::ref_idx_for`]
/// returning `None` rather than panicking, since malformed candidate
/// construction must degrade to "no information" rather than crash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MvField {
    pub pred_flag: PredFlag,
    pub mv: [Mv; 2],
    pub ref_idx: [i8; 2],
    pub bcw_idx: u8,
    pub hpel_if_idx: u8,
    pub ciip_flag: bool,
}

impl Default for MvField {
    fn default() -> Self {
        Self {
            pred_flag: PredFlag::NONE,
            mv: [Mv::ZERO; 2],
            ref_idx: [-1, -1],
            bcw_idx: 0,
            hpel_if_idx: 0,
            ciip_flag: false,
        }
    }
}

impl MvField {
    pub fn intra() -> Self {
        Self {
            pred_flag: PredFlag::INTRA,
            ..Default::default()
        }
    }

    pub fn ibc(bv: Mv) -> Self {
        Self {
            pred_flag: PredFlag::IBC,
            mv: [bv, Mv::ZERO],
            ref_idx: [-1, -1],
            ..Default::default()
        }
    }

    pub fn palette() -> Self {
        Self {
            pred_flag: PredFlag::PLT,
            ..Default::default()
        }
    }

    pub fn mv_for(&self, lx: ListIdx) -> Option<Mv> {
        self.pred_flag.uses_list(lx).then_some(self.mv[lx as usize])
    }

    pub fn ref_idx_for(&self, lx: ListIdx) -> Option<i8> {
        self.pred_flag
            .uses_list(lx)
            .then_some(self.ref_idx[lx as usize])
    }

    /// Equality used for merge/AMVP/HMVP dedup: same prediction direction,
    /// same ref_idx, same mv on every direction the entry uses (§4.4.1).
    pub fn duplicates(&self, other: &MvField) -> bool {
        if self.pred_flag != other.pred_flag {
            return false;
        }
        for lx in [ListIdx::L0, ListIdx::L1] {
            if self.pred_flag.uses_list(lx)
                && (self.mv[lx as usize] != other.mv[lx as usize]
                    || self.ref_idx[lx as usize] != other.ref_idx[lx as usize])
            {
                return false;
            }
        }
        true
    }
}

/// Affine motion model degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffineModel {
    /// Not affine.
    None,
    /// 4-parameter model, 2 control points.
    FourParam,
    /// 6-parameter model, 3 control points.
    SixParam,
}

impl AffineModel {
    pub fn num_control_points(&self) -> usize {
        match self {
            AffineModel::None => 0,
            AffineModel::FourParam => 2,
            AffineModel::SixParam => 3,
        }
    }
}

/// CU/PU-level motion candidate before expansion into the per-4x4
/// [`MvField`] grid: the `MotionInfo` of §3.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MotionInfo {
    pub pred_flag: PredFlagRepr,
    pub ref_idx: [i8; 2],
    pub mv: [Mv; 2],
    pub bcw_idx: u8,
    pub hpel_if_idx: u8,
}

/// `PredFlag` does not implement `Default`, so `MotionInfo` carries a
/// thin newtype that does, defaulting to [`PredFlag::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredFlagRepr(pub PredFlag);

impl Default for PredFlagRepr {
    fn default() -> Self {
        Self(PredFlag::NONE)
    }
}

impl MotionInfo {
    pub fn to_mv_field(self) -> MvField {
        MvField {
            pred_flag: self.pred_flag.0,
            mv: self.mv,
            ref_idx: self.ref_idx,
            bcw_idx: self.bcw_idx,
            hpel_if_idx: self.hpel_if_idx,
            ciip_flag: false,
        }
    }

    pub fn from_mv_field(mvf: &MvField) -> Self {
        Self {
            pred_flag: PredFlagRepr(mvf.pred_flag),
            ref_idx: mvf.ref_idx,
            mv: mvf.mv,
            bcw_idx: mvf.bcw_idx,
            hpel_if_idx: mvf.hpel_if_idx,
        }
    }
}

/// Sum-type re-expression of `pred_flag` at the grid boundary, per the
/// design notes (§9): callers that want to reason about "what kind of CU is
/// this" rather than "which lists are set" convert through here instead of
/// matching on the bitmask directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    Intra,
    Inter {
        l0: Option<(i8, Mv)>,
        l1: Option<(i8, Mv)>,
    },
    Ibc {
        bv: Mv,
    },
    Palette,
}

impl From<MvField> for Prediction {
    fn from(mvf: MvField) -> Self {
        match mvf.pred_flag {
            PredFlag::INTRA => Prediction::Intra,
            PredFlag::IBC => Prediction::Ibc { bv: mvf.mv[0] },
            PredFlag::PLT => Prediction::Palette,
            pf => Prediction::Inter {
                l0: pf
                    .uses_list(ListIdx::L0)
                    .then_some((mvf.ref_idx[0], mvf.mv[0])),
                l1: pf
                    .uses_list(ListIdx::L1)
                    .then_some((mvf.ref_idx[1], mvf.mv[1])),
            },
        }
    }
}

impl From<Prediction> for MvField {
    fn from(p: Prediction) -> Self {
        match p {
            Prediction::Intra => MvField::intra(),
            Prediction::Palette => MvField::palette(),
            Prediction::Ibc { bv } => MvField::ibc(bv),
            Prediction::Inter { l0, l1 } => {
                let mut pred_flag = PredFlag::NONE;
                let mut mv = [Mv::ZERO; 2];
                let mut ref_idx = [-1i8; 2];
                if let Some((ri, m)) = l0 {
                    pred_flag = PredFlag(pred_flag.raw() | PredFlag::L0.raw());
                    mv[0] = m;
                    ref_idx[0] = ri;
                }
                if let Some((ri, m)) = l1 {
                    pred_flag = PredFlag(pred_flag.raw() | PredFlag::L1.raw());
                    mv[1] = m;
                    ref_idx[1] = ri;
                }
                MvField {
                    pred_flag,
                    mv,
                    ref_idx,
                    bcw_idx: 0,
                    hpel_if_idx: 0,
                    ciip_flag: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l0_only_field_does_not_expose_l1() {
        let mvf = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::new(4, -2), Mv::new(99, 99)],
            ref_idx: [0, 7],
            ..Default::default()
        };
        assert_eq!(mvf.mv_for(ListIdx::L0), Some(Mv::new(4, -2)));
        assert_eq!(mvf.mv_for(ListIdx::L1), None);
        assert_eq!(mvf.ref_idx_for(ListIdx::L1), None);
    }

    #[test]
    fn bi_prediction_round_trips_through_sum_type() {
        let mvf = MvField {
            pred_flag: PredFlag::BI,
            mv: [Mv::new(1, 2), Mv::new(-1, -2)],
            ref_idx: [0, 1],
            ..Default::default()
        };
        let p: Prediction = mvf.into();
        assert_eq!(
            p,
            Prediction::Inter {
                l0: Some((0, Mv::new(1, 2))),
                l1: Some((1, Mv::new(-1, -2))),
            }
        );
        let back: MvField = p.into();
        assert_eq!(back.pred_flag, PredFlag::BI);
        assert_eq!(back.mv, mvf.mv);
    }

    #[test]
    fn duplicates_requires_same_direction_and_mv() {
        let a = MvField {
            pred_flag: PredFlag::L0,
            mv: [Mv::new(1, 1), Mv::ZERO],
            ref_idx: [0, -1],
            ..Default::default()
        };
        let b = a;
        let mut c = a;
        c.mv[0] = Mv::new(2, 2);
        assert!(a.duplicates(&b));
        assert!(!a.duplicates(&c));
    }

    #[test]
    fn round_to_aligns_to_4x4() {
        let mv = Mv::new(5, -5);
        let rounded = mv.round_to(2);
        assert_eq!(rounded.x % 4, 0);
        assert_eq!(rounded.y % 4, 0);
    }
}
