//! Reference Pool & Decoded Picture Buffer (§4.2).
//!
//! Grounded on `libavcodec/vvc/refs.h`'s `VVCFrame` ref-flag bitfield
//! (`short_term_ref`/`long_term_ref`/`output_pending`) and on the
//! teacher's `bitvue-core::state_machine` for the "own a `Mutex`-guarded
//! slot list, expose narrow verbs" shape.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, VvcError};
use crate::params::{RplEntry, Sps};
use crate::picture::{FrameHandle, Picture};

/// Reference Picture Buffer: owns every picture still needed for either
/// future reference or future output, keyed by POC.
pub struct Dpb {
    slots: Mutex<Vec<FrameHandle>>,
    max_dec_pic_buffering: usize,
}

impl Dpb {
    pub fn new(sps: &Sps) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            max_dec_pic_buffering: sps.max_dec_pic_buffering_minus1 as usize + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Register a newly decoded picture as a short-term reference and
    /// pending output, per §4.2 `set_new_ref`.
    pub fn set_new_ref(&self, frame: FrameHandle) {
        {
            let mut flags = frame.flags.lock();
            flags.short_term_ref = true;
            flags.output_pending = true;
        }
        debug!(poc = frame.poc, "dpb: registered new reference");
        self.slots.lock().push(frame);
    }

    /// Drop reference/output status for a picture; once neither flag (nor
    /// `bumping`) is set the slot is reclaimed on the next sweep.
    pub fn unref_frame(&self, poc: i64) {
        let slots = self.slots.lock();
        if let Some(frame) = slots.iter().find(|f| f.poc == poc) {
            let mut flags = frame.flags.lock();
            flags.short_term_ref = false;
            flags.long_term_ref = false;
        }
    }

    /// Mark the oldest output-pending picture (by POC order, the bumping
    /// process of Annex C) as no longer needing output, returning it.
    pub fn bump_frame(&self) -> Option<FrameHandle> {
        let mut slots = self.slots.lock();
        let idx = slots
            .iter()
            .enumerate()
            .filter(|(_, f)| f.flags.lock().output_pending)
            .min_by_key(|(_, f)| f.poc)
            .map(|(i, _)| i)?;
        let frame = slots[idx].clone();
        {
            let mut flags = frame.flags.lock();
            flags.output_pending = false;
            flags.bumping = true;
        }
        self.sweep(&mut slots);
        Some(frame)
    }

    /// Remove slots whose ref flags have all cleared.
    fn sweep(&self, slots: &mut Vec<FrameHandle>) {
        slots.retain(|f| f.flags.lock().any_set());
    }

    pub fn find(&self, poc: i64) -> Option<FrameHandle> {
        self.slots.lock().iter().find(|f| f.poc == poc).cloned()
    }

    /// Resolve a slice's reference picture list: each `RplEntry` names a
    /// POC; a missing entry degrades to a grey placeholder picture rather
    /// than failing the whole slice, per `DecoderConfig::allow_missing_ref`
    /// and §4.2 "conformance-preserving placeholder pictures".
    pub fn slice_rpl(&self, entries: &[RplEntry], allow_missing: bool, width: u32, height: u32, bit_depth: u8, chroma: crate::params::ChromaFormat) -> Result<Vec<FrameHandle>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.find(entry.poc) {
                Some(frame) => out.push(frame),
                None if allow_missing => {
                    warn!(poc = entry.poc, "dpb: missing reference, substituting grey frame");
                    let placeholder = Picture::new(entry.poc, width, height, bit_depth, chroma);
                    placeholder.fill_grey();
                    out.push(FrameHandle::new(placeholder));
                }
                None => return Err(VvcError::MissingReference { poc: entry.poc }),
            }
        }
        Ok(out)
    }

    pub fn capacity(&self) -> usize {
        self.max_dec_pic_buffering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ChromaFormat;

    fn pic(poc: i64) -> FrameHandle {
        FrameHandle::new(Picture::new(poc, 16, 16, 8, ChromaFormat::Chroma420))
    }

    #[test]
    fn set_new_ref_marks_short_term_and_output_pending() {
        let dpb = Dpb::new(&Sps::default());
        dpb.set_new_ref(pic(0));
        let frame = dpb.find(0).unwrap();
        let flags = *frame.flags.lock();
        assert!(flags.short_term_ref);
        assert!(flags.output_pending);
    }

    #[test]
    fn bump_frame_returns_oldest_poc_first() {
        let dpb = Dpb::new(&Sps::default());
        dpb.set_new_ref(pic(5));
        dpb.set_new_ref(pic(1));
        dpb.set_new_ref(pic(3));
        assert_eq!(dpb.bump_frame().unwrap().poc, 1);
        assert_eq!(dpb.bump_frame().unwrap().poc, 3);
    }

    #[test]
    fn unref_and_bump_together_reclaim_slot() {
        let dpb = Dpb::new(&Sps::default());
        dpb.set_new_ref(pic(0));
        dpb.unref_frame(0);
        dpb.bump_frame();
        assert!(dpb.is_empty());
    }

    #[test]
    fn missing_reference_degrades_to_grey_when_allowed() {
        let dpb = Dpb::new(&Sps::default());
        let entries = [RplEntry { poc: 42, is_long_term: false, is_scaled: false }];
        let refs = dpb
            .slice_rpl(&entries, true, 16, 16, 8, ChromaFormat::Chroma420)
            .unwrap();
        assert_eq!(refs[0].planes[0].lock().get(0, 0), 128);
    }

    #[test]
    fn missing_reference_errors_when_not_allowed() {
        let dpb = Dpb::new(&Sps::default());
        let entries = [RplEntry { poc: 42, is_long_term: false, is_scaled: false }];
        let err = dpb
            .slice_rpl(&entries, false, 16, 16, 8, ChromaFormat::Chroma420)
            .unwrap_err();
        assert!(matches!(err, VvcError::MissingReference { poc: 42 }));
    }
}
