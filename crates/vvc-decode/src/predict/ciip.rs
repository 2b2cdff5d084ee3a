//! CIIP (Combined Inter/Intra Prediction, §4.7): weighted average of an
//! inter-predicted and an intra (Planar-only) predicted block, weight
//! chosen from the neighbouring CUs' coding modes per the spec table.

/// CIIP weight table, indexed by how many of {above, left} neighbours are
/// themselves intra-coded: 0 neighbours -> weight 4 (balanced and then
/// adjusted by distance-to-edge is not modelled at this granularity; the
/// spec's simplified two-neighbour table is what's implemented here).
fn ciip_weight(above_intra: bool, left_intra: bool) -> (i32, i32) {
    match (above_intra, left_intra) {
        (true, true) => (3, 1),
        (true, false) | (false, true) => (2, 2),
        (false, false) => (1, 3),
    }
}

/// Combine inter and intra predictions sample-wise using the CIIP weight
/// derived from neighbour intra-ness.
pub fn combine_ciip(inter: &[i32], intra: &[i32], above_intra: bool, left_intra: bool, out: &mut [i32]) {
    let (w_intra, w_inter) = ciip_weight(above_intra, left_intra);
    for i in 0..out.len() {
        out[i] = (inter[i] * w_inter + intra[i] * w_intra + 2) >> 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_neighbours_intra_favours_intra_prediction() {
        let inter = [0; 4];
        let intra = [100; 4];
        let mut out = [0; 4];
        combine_ciip(&inter, &intra, true, true, &mut out);
        assert_eq!(out[0], 75);
    }

    #[test]
    fn no_intra_neighbours_favours_inter_prediction() {
        let inter = [100; 4];
        let intra = [0; 4];
        let mut out = [0; 4];
        combine_ciip(&inter, &intra, false, false, &mut out);
        assert_eq!(out[0], 75);
    }
}
