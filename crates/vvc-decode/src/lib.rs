//! VVC/H.266 frame-level decoding core.
//!
//! This crate covers the CTU coding-tree walk, motion-vector derivation,
//! residual/coefficient decoding, prediction, and in-loop filter pipeline
//! for one picture at a time. NAL unit demultiplexing and SPS/PPS/picture-
//! header/slice-header parsing are a host/upstream concern: callers parse
//! the headers however they like and hand this crate the resulting
//! [`params::Sps`]/[`params::Pps`]/[`params::PicHeader`]/[`params::SliceHeader`]
//! values plus a [`cabac::CabacReader`] positioned at the slice payload.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vvc_decode::{Decoder, DecoderCallbacks, DecoderConfig};
//! use vvc_decode::dsp::{ScalarFilterKernels, ScalarInterpolationKernels, ScalarTransformKernels};
//!
//! struct Host;
//! impl DecoderCallbacks for Host {
//!     fn emit_frame(&self, frame: vvc_decode::picture::FrameHandle) {
//!         println!("decoded poc {}", frame.poc);
//!     }
//! }
//!
//! let decoder = Decoder::new(DecoderConfig::default(), &sps, Arc::new(Host));
//! decoder.decode_picture(
//!     &sps, &pps, &ph, &sh, &mut cabac,
//!     &ScalarTransformKernels, &ScalarInterpolationKernels, &ScalarFilterKernels,
//! )?;
//! ```

pub mod availability;
pub mod cabac;
pub mod config;
pub mod context;
pub mod cu;
pub mod decoder;
pub mod dpb;
pub mod dsp;
pub mod error;
pub mod filter;
pub mod grid;
pub mod mv;
pub mod params;
pub mod picture;
pub mod predict;
pub mod residual;
pub mod scheduler;
pub mod tables;
pub mod tree;

pub use cabac::CabacReader;
pub use config::{DecoderConfig, DecoderConfigBuilder, ErrorConcealment};
pub use decoder::{Decoder, DecoderCallbacks};
pub use dpb::Dpb;
pub use error::{Result, VvcError};
pub use params::{ChromaFormat, PicHeader, Pps, SliceHeader, Sps};
pub use picture::{FrameHandle, Picture, ProgressKind};
pub use scheduler::{CtuScheduler, CtuStage, StageRunner};
