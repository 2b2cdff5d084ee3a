//! End-to-end scenario tests (S1-S6): one scenario per table row, each
//! exercising the public building blocks a slice driver would combine
//! (prediction, merge-list derivation, DMVR, the progress protocol)
//! without needing a full bitstream.

use std::sync::{Arc, Mutex};

use vvc_decode::context::{EntryPointContext, FrameParseState};
use vvc_decode::dsp::ScalarInterpolationKernels;
use vvc_decode::mv::dmvr::{apply_refinement, search_integer, IntegerOffset, SadBlock};
use vvc_decode::mv::merge::derive_luma_merge_list;
use vvc_decode::mv::types::{Mv, MvField, PredFlag};
use vvc_decode::params::{Pps, RplEntry, Sps};
use vvc_decode::picture::{Progress, ProgressKind};
use vvc_decode::predict::inter::predict_inter_block;
use vvc_decode::predict::intra::predict_dc;

/// S1: 8x8 all-zero residual I-slice, single 4x4 intra DC CU with
/// above/left references at 128 -> every output sample is 128.
#[test]
fn s1_intra_dc_with_mid_grey_neighbourhood_reproduces_dc_value() {
    let above = vec![128i32; 5];
    let left = vec![128i32; 5];
    let mut out = vec![0i32; 16];
    predict_dc(&above, &left, 4, 4, &mut out);
    assert!(out.iter().all(|&v| v == 128));
}

/// S2: 16x16 P-slice, single CU with L0 MV (0,0) to a solid-grey reference
/// (value 200), no residual, no weights -> every output sample is 200.
#[test]
fn s2_zero_mv_uni_prediction_copies_grey_reference() {
    let kernels = ScalarInterpolationKernels;
    let stride = 17usize;
    let refplane = vec![200u16; stride * stride];
    let motion = MvField {
        pred_flag: PredFlag::L0,
        mv: [Mv::ZERO, Mv::ZERO],
        ref_idx: [0, -1],
        ..Default::default()
    };
    let mut out = vec![0i32; 16 * 16];
    predict_inter_block(&kernels, &motion, Some((&refplane, stride)), None, 16, 16, 8, &mut out);
    assert!(out.iter().all(|&v| v == 200));
}

/// S3: 16x16 B-slice, BI MV (0,0)/(0,0) to grey refs 100/200, no weights,
/// `bcw_idx=0` -> averaged output 150 (exact, since both MVs are integer
/// and the weights are the unweighted 4/4 default).
#[test]
fn s3_bi_prediction_with_bcw_idx_zero_averages_unweighted() {
    let kernels = ScalarInterpolationKernels;
    let stride = 17usize;
    let ref0 = vec![100u16; stride * stride];
    let ref1 = vec![200u16; stride * stride];
    let motion = MvField {
        pred_flag: PredFlag::BI,
        mv: [Mv::ZERO, Mv::ZERO],
        ref_idx: [0, 0],
        bcw_idx: 0,
        ..Default::default()
    };
    let mut out = vec![0i32; 16 * 16];
    predict_inter_block(&kernels, &motion, Some((&ref0, stride)), Some((&ref1, stride)), 16, 16, 8, &mut out);
    assert!(out.iter().all(|&v| (v - 150).abs() <= 1));
}

/// S4: 32x32 P-slice, merge index 2 with HMVP of length 1 duplicating the
/// sole spatial (A1) candidate -> the HMVP entry is pruned as a duplicate
/// and index 2 falls back to a zero-motion candidate with `ref_idx = 0`.
#[test]
fn s4_merge_index_2_falls_back_to_zero_motion_candidate() {
    let sps = Sps {
        sps_pic_width_max_in_luma_samples: 256,
        sps_pic_height_max_in_luma_samples: 256,
        ..Default::default()
    };
    let pps = Pps::default();
    let mut state = FrameParseState::new(&sps, &pps);
    // Current CU at (32, 32), size 32x32; mark the CTU-row-wide band to
    // its left as already parsed so A1 is available, and seed its motion.
    state.mark_parsed(0, 0, 32, 64);
    let a1 = MvField {
        pred_flag: PredFlag::L0,
        mv: [Mv::new(16, 0), Mv::ZERO],
        ref_idx: [0, -1],
        ..Default::default()
    };
    state.mvf.fill_rect(0, 0, 8, 16, a1);

    let mut ep = EntryPointContext::default();
    ep.hmvp.push(a1); // HMVP's only entry duplicates A1.

    let l0 = vec![RplEntry { poc: -1, is_long_term: false, is_scaled: false }];
    let list = derive_luma_merge_list(&state, &ep, 32, 32, 32, 32, 6, None, 0, &l0, &[]);

    assert_eq!(list[0], a1);
    assert_eq!(list[2].mv[0], Mv::ZERO);
    assert_eq!(list[2].ref_idx[0], 0);
}

/// S5: 64x64 skip CU with DMVR eligible, flat-SAD reference (every offset
/// costs the same) -> no offset improves on the center, so the refined MV
/// pair matches the original MV exactly.
#[test]
fn s5_flat_sad_reference_leaves_dmvr_mv_unrefined() {
    struct FlatCost;
    impl SadBlock for FlatCost {
        fn sad(&self, _dx0: i32, _dy0: i32, _dx1: i32, _dy1: i32) -> u32 {
            0
        }
    }
    let best = search_integer(&FlatCost);
    assert_eq!(best, IntegerOffset { dx: 0, dy: 0, cost: 0 });

    let mv0 = Mv::new(12, -4);
    let mv1 = Mv::new(-12, 4);
    let (refined0, refined1) = apply_refinement(mv0, mv1, best, (0, 0));
    assert_eq!(refined0, mv0);
    assert_eq!(refined1, mv1);
}

/// S6: a CTU row in frame N+1 reads row Y=32 of frame N before frame N has
/// published `Pixel = 32` -> the listener suspends and only fires once
/// `report_progress` explicitly advances past that row.
#[test]
fn s6_listener_suspends_until_explicit_progress_report() {
    let progress = Progress::default();
    let fired = Arc::new(Mutex::new(false));
    let fired2 = fired.clone();
    progress.add_listener(ProgressKind::Pixel, 32, move |cancelled| {
        *fired2.lock().unwrap() = !cancelled;
    });

    // Advancing short of row 32 must not wake the listener.
    progress.report(ProgressKind::Pixel, 16);
    assert!(!*fired.lock().unwrap());

    // Only the explicit report reaching row 32 wakes it.
    progress.report(ProgressKind::Pixel, 32);
    assert!(*fired.lock().unwrap());
}
