//! SAO (Sample Adaptive Offset, §4.8): band offset and edge offset, per
//! CTU, against [`crate::dsp::FilterKernels`].

use crate::dsp::FilterKernels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaoType {
    Off,
    Band { band_position: u8 },
    Edge { eo_class: u8 },
}

/// One CTU/component's SAO parameters.
#[derive(Debug, Clone, Copy)]
pub struct SaoParams {
    pub sao_type: SaoType,
    pub offsets: [i32; 4],
}

/// Apply band offset: samples are bucketed into 32 bands by their top 5
/// bits; each of 4 consecutive bands starting at `band_position` gets the
/// matching offset.
fn band_offset(kernels: &impl FilterKernels, sample: i32, band_position: u8, offsets: &[i32; 4], max_value: i32, bit_depth: u8) -> i32 {
    let band = sample >> (bit_depth - 5);
    let rel = band - band_position as i32;
    if (0..4).contains(&rel) {
        kernels.sao_offset(sample, offsets[rel as usize], max_value)
    } else {
        sample
    }
}

/// Apply edge offset for one sample given its two neighbours along the
/// `eo_class`-selected direction, per the spec's 5-category classification
/// (local valley/peak/slope/flat -> offset index).
fn edge_offset(kernels: &impl FilterKernels, sample: i32, a: i32, b: i32, offsets: &[i32; 4], max_value: i32) -> i32 {
    let sign = |d: i32| d.signum();
    let category = match (sign(sample - a), sign(sample - b)) {
        (-1, -1) => Some(0), // local valley
        (-1, 0) | (0, -1) => Some(1),
        (1, 0) | (0, 1) => Some(2),
        (1, 1) => Some(3), // local peak
        _ => None,
    };
    match category {
        Some(idx) => kernels.sao_offset(sample, offsets[idx], max_value),
        None => sample,
    }
}

/// Apply SAO to a whole plane rectangle in place, reading two-sample
/// neighbour context from `plane` itself (already deblocked samples).
#[allow(clippy::too_many_arguments)]
pub fn apply_sao(
    kernels: &impl FilterKernels,
    plane: &mut [i32],
    stride: usize,
    x0: usize,
    y0: usize,
    w: usize,
    h: usize,
    params: &SaoParams,
    bit_depth: u8,
) {
    let max_value = (1i32 << bit_depth) - 1;
    match params.sao_type {
        SaoType::Off => {}
        SaoType::Band { band_position } => {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    let idx = y * stride + x;
                    plane[idx] = band_offset(kernels, plane[idx], band_position, &params.offsets, max_value, bit_depth);
                }
            }
        }
        SaoType::Edge { eo_class } => {
            let (dx, dy) = match eo_class % 4 {
                0 => (1i32, 0i32),
                1 => (0, 1),
                2 => (1, 1),
                _ => (1, -1),
            };
            for y in (y0 + 1)..(y0 + h - 1).max(y0 + 1) {
                for x in (x0 + 1)..(x0 + w - 1).max(x0 + 1) {
                    let idx = y * stride + x;
                    let a = plane[(y as i32 + dy) as usize * stride + (x as i32 + dx) as usize];
                    let b = plane[(y as i32 - dy) as usize * stride + (x as i32 - dx) as usize];
                    plane[idx] = edge_offset(kernels, plane[idx], a, b, &params.offsets, max_value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::ScalarFilterKernels;

    #[test]
    fn off_type_leaves_plane_untouched() {
        let kernels = ScalarFilterKernels;
        let mut plane = vec![50; 16];
        let before = plane.clone();
        apply_sao(&kernels, &mut plane, 4, 0, 0, 4, 4, &SaoParams { sao_type: SaoType::Off, offsets: [0; 4] }, 8);
        assert_eq!(plane, before);
    }

    #[test]
    fn band_offset_adjusts_only_matching_band() {
        let kernels = ScalarFilterKernels;
        // 8-bit: band = sample >> 3. sample=10 -> band=1.
        let mut plane = vec![10; 16];
        apply_sao(
            &kernels,
            &mut plane,
            4,
            0,
            0,
            4,
            4,
            &SaoParams { sao_type: SaoType::Band { band_position: 1 }, offsets: [5, 0, 0, 0] },
            8,
        );
        assert_eq!(plane[0], 15);
    }

    #[test]
    fn edge_offset_boosts_local_valley() {
        let kernels = ScalarFilterKernels;
        let mut plane = vec![100; 16];
        plane[5] = 10; // center of the 4x4 at (1,1), a local valley
        apply_sao(
            &kernels,
            &mut plane,
            4,
            0,
            0,
            4,
            4,
            &SaoParams { sao_type: SaoType::Edge { eo_class: 0 }, offsets: [7, 0, 0, 0] },
            8,
        );
        assert_eq!(plane[5], 17);
    }
}
