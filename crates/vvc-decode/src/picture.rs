//! Picture storage, reference-marking flags, and the progress/listener
//! protocol (§3 "Picture / Frame", §4.1, §6 "Progress protocol").

use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::grid::Grid;
use crate::mv::types::MvField;
use crate::params::ChromaFormat;

/// One progress axis a listener can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressKind {
    /// Motion field (`tab.mvf`) has been finalised up to row `y`.
    Mv,
    /// Reconstructed + filtered samples are final up to row `y`.
    Pixel,
}

/// Sample plane for one component.
#[derive(Debug, Clone)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub bit_depth: u8,
    pub samples: Vec<u16>,
}

impl Plane {
    pub fn new(width: u32, height: u32, bit_depth: u8) -> Self {
        Self {
            width,
            height,
            stride: width,
            bit_depth,
            samples: vec![0u16; (width * height) as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.samples[(y * self.stride + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u16) {
        self.samples[(y * self.stride + x) as usize] = value;
    }

    pub fn max_sample_value(&self) -> u16 {
        ((1u32 << self.bit_depth) - 1) as u16
    }

    pub fn fill(&mut self, value: u16) {
        self.samples.fill(value);
    }
}

/// A single-shot progress listener: fired exactly once, either because the
/// awaited `y` was reached or because the frame was cancelled.
struct Listener {
    y: u32,
    callback: Box<dyn FnOnce(bool) + Send>,
}

#[derive(Default)]
struct ProgressAxis {
    y: AtomicI64,
    listeners: Mutex<Vec<Listener>>,
}

impl ProgressAxis {
    fn report(&self, y: u32) {
        // Monotone: never move backwards (§8 property 2).
        let mut cur = self.y.load(Ordering::Acquire);
        while (cur as i64) < y as i64 {
            match self
                .y
                .compare_exchange_weak(cur, y as i64, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
        let y_now = self.y.load(Ordering::Acquire) as u32;
        let to_fire = {
            let mut listeners = self.listeners.lock();
            let (to_fire, to_keep): (Vec<_>, Vec<_>) =
                listeners.drain(..).partition(|l| l.y <= y_now);
            *listeners = to_keep;
            to_fire
        };
        for l in to_fire {
            (l.callback)(false);
        }
    }

    fn add_listener(&self, y: u32, callback: Box<dyn FnOnce(bool) + Send>) {
        let y_now = self.y.load(Ordering::Acquire) as u32;
        if y_now >= y {
            callback(false);
            return;
        }
        self.listeners.lock().push(Listener { y, callback });
    }

    fn cancel_all(&self) {
        let mut listeners = self.listeners.lock();
        let drained: Vec<_> = listeners.drain(..).collect();
        drop(listeners);
        for l in drained {
            (l.callback)(true);
        }
    }

    fn current(&self) -> u32 {
        self.y.load(Ordering::Acquire) as u32
    }
}

/// Progress tracking for one picture: two monotone counters plus listener
/// lists, one pair per [`ProgressKind`].
#[derive(Default)]
pub struct Progress {
    mv: ProgressAxis,
    pixel: ProgressAxis,
}

impl Progress {
    fn axis(&self, kind: ProgressKind) -> &ProgressAxis {
        match kind {
            ProgressKind::Mv => &self.mv,
            ProgressKind::Pixel => &self.pixel,
        }
    }

    /// Advance the named axis to `y` and fire any listeners now satisfied.
    /// Maintains `progress[MV] >= progress[PIXEL]` by construction: callers
    /// report `Mv` before `Pixel` for the same row, per the CTU stage order.
    pub fn report(&self, kind: ProgressKind, y: u32) {
        self.axis(kind).report(y);
    }

    pub fn current(&self, kind: ProgressKind) -> u32 {
        self.axis(kind).current()
    }

    /// Register a single-shot listener. `callback(cancelled)` fires exactly
    /// once, synchronously from whichever thread satisfies it (including
    /// this call, if `y` is already reached).
    pub fn add_listener(&self, kind: ProgressKind, y: u32, callback: impl FnOnce(bool) + Send + 'static) {
        self.axis(kind).add_listener(y, Box::new(callback));
    }

    /// Fire every outstanding listener with the cancellation indicator set,
    /// per §4.1 "Cancellation".
    pub fn cancel_all(&self) {
        self.mv.cancel_all();
        self.pixel.cancel_all();
    }
}

/// Reference-marking state for one decoded picture.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefFlags {
    pub output_pending: bool,
    pub short_term_ref: bool,
    pub long_term_ref: bool,
    pub bumping: bool,
}

impl RefFlags {
    pub fn any_set(&self) -> bool {
        self.output_pending || self.short_term_ref || self.long_term_ref || self.bumping
    }
}

/// A decoded picture: sample planes, per-4x4 motion metadata, reference
/// flags, and the progress/listener state other pictures wait on.
pub struct Picture {
    pub poc: i64,
    pub width: u32,
    pub height: u32,
    pub chroma_format: ChromaFormat,
    /// Sample planes, each behind its own lock so CTU rows belonging to
    /// different scheduler stages can write into the same picture
    /// concurrently (§4.1/§4.12) while it is still under construction, and
    /// so a finished picture can be shared read-only via [`FrameHandle`]
    /// without an extra copy.
    pub planes: [Mutex<Plane>; 3],
    /// Per-4x4-luma-unit motion field, read by neighbour candidate
    /// derivation and by TMVP from a collocated picture.
    pub mvf: Mutex<Grid<MvField>>,
    /// Pre-DMVR-refinement motion, read by spatial MV candidate derivation
    /// per §3 ("a *dmvr* grid holding pre-refinement MVs").
    pub dmvr_mvf: Mutex<Grid<MvField>>,
    pub flags: Mutex<RefFlags>,
    pub progress: Progress,
    /// POC of the picture used for TMVP in the current slice, if any.
    pub collocated_poc: Mutex<Option<i64>>,
}

impl Picture {
    pub fn new(poc: i64, width: u32, height: u32, bit_depth: u8, chroma_format: ChromaFormat) -> Self {
        let sub_w = chroma_format.sub_width_c();
        let sub_h = chroma_format.sub_height_c();
        let chroma_w = width.div_ceil(sub_w);
        let chroma_h = height.div_ceil(sub_h);
        let grid_w = width.div_ceil(4) as usize;
        let grid_h = height.div_ceil(4) as usize;
        Self {
            poc,
            width,
            height,
            chroma_format,
            planes: [
                Mutex::new(Plane::new(width, height, bit_depth)),
                Mutex::new(Plane::new(chroma_w, chroma_h, bit_depth)),
                Mutex::new(Plane::new(chroma_w, chroma_h, bit_depth)),
            ],
            mvf: Mutex::new(Grid::new(grid_w, grid_h)),
            dmvr_mvf: Mutex::new(Grid::new(grid_w, grid_h)),
            flags: Mutex::new(RefFlags::default()),
            progress: Progress::default(),
            collocated_poc: Mutex::new(None),
        }
    }

    /// Fill every plane with a mid-grey value, used for conformance-
    /// preserving placeholder pictures (§4.2 `slice_rpl`) and for
    /// `ErrorConcealment::GreyFrame`.
    pub fn fill_grey(&self) {
        for plane in &self.planes {
            let mut plane = plane.lock();
            let mid = 1u16 << (plane.bit_depth - 1);
            plane.fill(mid);
        }
    }

    pub fn height_in_rows(&self) -> u32 {
        self.height
    }
}

/// Non-owning, cheaply-cloneable handle to a DPB slot. Ownership transfer
/// happens only at `bump`/`unref` (§9 "Cyclic references"); holding a
/// handle never keeps the underlying picture alive beyond the DPB's own
/// bookkeeping.
pub type FrameHandle = Arc<Picture>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotone_and_fires_listeners() {
        let p = Progress::default();
        let fired = Arc::new(Mutex::new(false));
        let fired2 = fired.clone();
        p.add_listener(ProgressKind::Pixel, 32, move |cancelled| {
            *fired2.lock() = !cancelled;
        });
        assert!(!*fired.lock());
        p.report(ProgressKind::Pixel, 16);
        assert!(!*fired.lock());
        p.report(ProgressKind::Pixel, 32);
        assert!(*fired.lock());
        // Reporting a smaller y afterwards must not roll back.
        p.report(ProgressKind::Pixel, 8);
        assert_eq!(p.current(ProgressKind::Pixel), 32);
    }

    #[test]
    fn listener_registered_after_y_reached_fires_immediately() {
        let p = Progress::default();
        p.report(ProgressKind::Pixel, 64);
        let fired = Arc::new(Mutex::new(false));
        let fired2 = fired.clone();
        p.add_listener(ProgressKind::Pixel, 32, move |_| *fired2.lock() = true);
        assert!(*fired.lock());
    }

    #[test]
    fn cancellation_fires_all_listeners_with_indicator() {
        let p = Progress::default();
        let cancelled_seen = Arc::new(Mutex::new(false));
        let seen2 = cancelled_seen.clone();
        p.add_listener(ProgressKind::Pixel, 1000, move |cancelled| {
            *seen2.lock() = cancelled;
        });
        p.cancel_all();
        assert!(*cancelled_seen.lock());
    }

    #[test]
    fn grey_fill_sets_mid_value_per_bit_depth() {
        let pic = Picture::new(0, 16, 16, 10, ChromaFormat::Chroma420);
        pic.fill_grey();
        assert_eq!(pic.planes[0].lock().get(0, 0), 512);
    }
}
