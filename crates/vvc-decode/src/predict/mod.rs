//! Prediction applier (§4.7): intra prediction, inter (motion-compensated)
//! prediction, GPM blending, CIIP combination, and LMCS sample mapping,
//! each built against the [`crate::dsp`] kernel seams.

pub mod ciip;
pub mod gpm;
pub mod inter;
pub mod intra;
pub mod lmcs;

pub use ciip::combine_ciip;
pub use gpm::blend_gpm;
pub use inter::predict_inter_block;
pub use intra::{predict_planar, predict_dc, IntraMode};
pub use lmcs::LmcsMapping;
