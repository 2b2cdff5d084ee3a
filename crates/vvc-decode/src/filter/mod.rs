//! In-loop filters (§4.8): deblocking, SAO, and ALF/CC-ALF, run in that
//! order per the CTU stage pipeline (`DEBLOCK_V -> DEBLOCK_H -> SAO ->
//! ALF`).

pub mod alf;
pub mod deblock;
pub mod sao;

pub use alf::apply_alf_luma;
pub use deblock::{boundary_strength, deblock_edge, BoundaryStrength, EdgeDirection};
pub use sao::{apply_sao, SaoParams, SaoType};
