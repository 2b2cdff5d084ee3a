//! Motion Vector Derivation Engine (§4.4): spatial/temporal/history merge
//! and AMVP candidate construction, affine control-point derivation, IBC
//! block-vector candidates, DMVR refinement and BDOF.

pub mod affine;
pub mod amvp;
pub mod bdof;
pub mod dmvr;
pub mod hmvp;
pub mod ibc;
pub mod merge;
pub mod types;

pub use types::{AffineModel, ListIdx, Mv, MvField, PredFlag, Prediction};
