//! Decoder-wide configuration, per §6 of the design.

/// What to do when reconstruction hits a recoverable error or a missing
/// optional reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorConcealment {
    /// Discard the affected slice/CTU and publish full progress so
    /// downstream waiters drain; leave the samples as allocated (zeroed).
    #[default]
    None,
    /// Copy the co-located samples from the previously decoded picture.
    CopyLast,
    /// Fill the affected region with a mid-grey placeholder.
    GreyFrame,
}

/// Decoder-wide configuration recognised by the core.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Worker pool size for parallel CTU-stage execution. `None` uses the
    /// host's reported CPU count.
    pub thread_count: Option<usize>,
    /// Reject non-conformant streams instead of warning and continuing.
    pub strict_standard_compliance: bool,
    /// Concealment strategy for recoverable errors.
    pub error_concealment: ErrorConcealment,
    /// Whether a `MissingReference` is downgraded to concealment instead of
    /// aborting the slice.
    pub allow_missing_ref: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            thread_count: None,
            strict_standard_compliance: false,
            error_concealment: ErrorConcealment::None,
            allow_missing_ref: true,
        }
    }
}

impl DecoderConfig {
    /// Resolve `thread_count` against the host, the way the teacher's
    /// worker pool sizing resolves `None` to `std::thread::available_parallelism`.
    pub fn resolved_thread_count(&self) -> usize {
        self.thread_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Builder for [`DecoderConfig`], matching the teacher's builder-style
/// construction of capability/config structs.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfigBuilder {
    config: DecoderConfig,
}

impl DecoderConfigBuilder {
    /// Start from defaults.
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
        }
    }

    /// Set the worker pool size.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.config.thread_count = Some(n);
        self
    }

    /// Reject non-conformant streams.
    pub fn strict_standard_compliance(mut self, strict: bool) -> Self {
        self.config.strict_standard_compliance = strict;
        self
    }

    /// Set the concealment strategy.
    pub fn error_concealment(mut self, mode: ErrorConcealment) -> Self {
        self.config.error_concealment = mode;
        self
    }

    /// Allow missing optional references.
    pub fn allow_missing_ref(mut self, allow: bool) -> Self {
        self.config.allow_missing_ref = allow;
        self
    }

    /// Finish building.
    pub fn build(self) -> DecoderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_allows_missing_ref_and_no_concealment() {
        let cfg = DecoderConfig::default();
        assert!(cfg.allow_missing_ref);
        assert_eq!(cfg.error_concealment, ErrorConcealment::None);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = DecoderConfigBuilder::new()
            .thread_count(4)
            .strict_standard_compliance(true)
            .error_concealment(ErrorConcealment::GreyFrame)
            .allow_missing_ref(false)
            .build();
        assert_eq!(cfg.resolved_thread_count(), 4);
        assert!(cfg.strict_standard_compliance);
        assert_eq!(cfg.error_concealment, ErrorConcealment::GreyFrame);
        assert!(!cfg.allow_missing_ref);
    }
}
