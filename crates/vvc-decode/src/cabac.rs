//! CABAC reader trait seam (§4.10): the arithmetic coder/engine is an
//! out-of-scope collaborator. The tree walker and residual coder consume
//! symbols through this trait, so the core is testable without wiring up a
//! real bitstream.

use crate::error::Result;

/// Binarization context index, opaque to the core: callers pass whichever
/// index the grammar table names, and the real engine maps it to a
/// probability state.
pub type CtxIdx = u16;

/// Narrow interface onto a CABAC decoding engine, covering every symbol
/// shape the coding-tree and residual grammar consume (§4.5, §4.6).
pub trait CabacReader {
    /// Decode one context-coded bin at `ctx`.
    fn decode_bin(&mut self, ctx: CtxIdx) -> Result<bool>;

    /// Decode one bypass (equiprobable) bin.
    fn decode_bypass(&mut self) -> Result<bool>;

    /// Decode `n` bypass bins as an unsigned integer, MSB first.
    fn decode_bypass_bits(&mut self, n: u32) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.decode_bypass()? as u32;
        }
        Ok(value)
    }

    /// Decode an Exp-Golomb-`k` bypass-coded value, as used by several
    /// residual-coding syntax elements.
    fn decode_exp_golomb(&mut self, k: u32) -> Result<u32> {
        let mut leading_ones = 0u32;
        while self.decode_bypass()? {
            leading_ones += 1;
            if leading_ones > 32 {
                break;
            }
        }
        let suffix_bits = k + leading_ones;
        let suffix = self.decode_bypass_bits(suffix_bits)?;
        Ok(((1u32 << leading_ones) - 1 << k) + suffix)
    }

    /// Decode a truncated-rice-coded value with Rice parameter `k` and the
    /// given bypass-coded prefix limit.
    fn decode_truncated_rice(&mut self, k: u32, max_prefix: u32) -> Result<u32> {
        let mut prefix = 0u32;
        while prefix < max_prefix && self.decode_bypass()? {
            prefix += 1;
        }
        let suffix = self.decode_bypass_bits(k)?;
        Ok((prefix << k) + suffix)
    }

    /// Byte-align and reset the engine at an entry point (tile / slice /
    /// wavefront-sync row) boundary.
    fn reinit(&mut self) -> Result<()>;
}

/// Deterministic reference [`CabacReader`] that always decodes zero bins,
/// used by unit tests exercising the tree walker and residual coder
/// without a real bitstream.
#[derive(Debug, Default)]
pub struct NullCabacReader;

impl CabacReader for NullCabacReader {
    fn decode_bin(&mut self, _ctx: CtxIdx) -> Result<bool> {
        Ok(false)
    }

    fn decode_bypass(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn reinit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [`CabacReader`] that replays a fixed sequence of bins, for
/// deterministic unit tests that need specific symbol sequences.
#[derive(Debug, Default)]
pub struct ScriptedCabacReader {
    bins: std::collections::VecDeque<bool>,
}

impl ScriptedCabacReader {
    pub fn new(bins: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bins: bins.into_iter().collect(),
        }
    }
}

impl CabacReader for ScriptedCabacReader {
    fn decode_bin(&mut self, _ctx: CtxIdx) -> Result<bool> {
        Ok(self.bins.pop_front().unwrap_or(false))
    }

    fn decode_bypass(&mut self) -> Result<bool> {
        Ok(self.bins.pop_front().unwrap_or(false))
    }

    fn reinit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reader_always_decodes_zero() {
        let mut r = NullCabacReader;
        assert!(!r.decode_bin(0).unwrap());
        assert_eq!(r.decode_bypass_bits(4).unwrap(), 0);
    }

    #[test]
    fn scripted_reader_replays_fixed_bins() {
        let mut r = ScriptedCabacReader::new([true, false, true, true]);
        assert_eq!(r.decode_bypass_bits(4).unwrap(), 0b1011);
    }

    #[test]
    fn exp_golomb_decodes_prefix_and_suffix() {
        // leading_ones=1, k=0 -> suffix_bits=1: bins [1,0,1] => (2^1-1)+1 = 2.
        let mut r = ScriptedCabacReader::new([true, false, true]);
        assert_eq!(r.decode_exp_golomb(0).unwrap(), 2);
    }
}
