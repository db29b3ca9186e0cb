//! Alignment parameters

use serde::{Deserialize, Serialize};

/// Scores at or below this value count as a match
pub const DEFAULT_SCORE_TOLERANCE: f64 = 0.01;

/// Parameters for the alignment engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Score with the maximum absolute deviation instead of RMSD
    pub use_absolute_deviation: bool,

    /// Score at or below which a fit is considered a match
    /// Default: 0.01
    pub score_tolerance: f64,

    /// Number of anchor pairs a Kabsch fit is built from (≥ 3)
    /// Default: 3
    pub min_unique_points: usize,

    /// Largest ambiguous group usable for anchor disambiguation. Caps the
    /// candidate count at `max_group_complexity ^ missing`.
    /// Default: 6
    pub max_group_complexity: usize,

    /// Select the flavoured Kabsch result whenever it produced a score,
    /// even when bruteforce scored lower
    /// Default: true
    pub prefer_kabsch: bool,

    /// Return early when a score is already within tolerance (the
    /// translation-only shortcut and the bruteforce sweep early exit).
    /// Default: false, so full sweeps always run and results are
    /// reproducible.
    pub allow_shortcuts: bool,

    /// Escalate a failed bijection check from a warning to a hard error
    /// Default: false
    pub strict_bijection: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            use_absolute_deviation: false,
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            min_unique_points: 3,
            max_group_complexity: 6,
            prefer_kabsch: true,
            allow_shortcuts: false,
            strict_bijection: false,
        }
    }
}
