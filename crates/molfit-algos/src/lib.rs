//! Superposition algorithms for molfit
//!
//! This crate aligns two labelled point sets (two conformers of the same
//! molecule, possibly with permuted atom ordering) by rigid-body rotation:
//!
//! - Analytical 3×3 SVD decomposition
//! - Kabsch algorithm for optimal rigid-body superposition
//! - Nearest-neighbor RMSD / absolute-deviation scoring
//! - Anchor selection by canonical-label grouping, with combinatorial
//!   disambiguation when too few atoms are individually identifiable
//! - Three competing alignment strategies and the orchestrating
//!   [`align`] entry point

pub mod linalg;

mod align;
mod anchors;
mod config;
mod geometry;
mod kabsch;
mod scoring;
mod strategy;

pub use align::{align, Alignment};
pub use anchors::{group_by, select_anchors, Anchors};
pub use config::{AlignConfig, DEFAULT_SCORE_TOLERANCE};
pub use geometry::{angle_axis, centroid, rotation_about_axis, rotation_between, DistanceMatrix};
pub use kabsch::{kabsch_fit, KabschFit};
pub use scoring::{
    ad_from_matrix, count_contact_points, deviation, rmsd_from_matrix, CONTACT_THRESHOLD,
};
pub use strategy::{Method, StrategyResult};

/// Errors from the alignment engine
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Cross-structure or bonds-matrix sizes disagree
    #[error("{what} sizes do not agree: {left} vs {right}")]
    ShapeMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Sorted element multisets or flavour bucket sizes differ between
    /// the two structures
    #[error("{what} are not a one-to-one mapping between the two structures")]
    LabelSetMismatch { what: &'static str },

    /// Not enough points for the requested operation
    #[error("not enough points (need at least {needed}, got {got})")]
    TooFewPoints { needed: usize, got: usize },

    /// A 180 degree (or zero-length) rotation was requested; its axis is
    /// undefined
    #[error("rotation axis is undefined (180 degree or zero-length rotation)")]
    UnsupportedRotation,

    /// Disambiguation cannot produce enough anchors for a Kabsch fit
    #[error(
        "cannot disambiguate enough anchors: {unique} unique + {groups} \
         ambiguous groups < {needed} required"
    )]
    InsufficientAnchors {
        unique: usize,
        groups: usize,
        needed: usize,
    },

    /// Unique anchor labels fail to correspond across the structures
    #[error("unique anchor sets do not correspond between structures ({left} vs {right})")]
    AnchorMismatch { left: usize, right: usize },

    /// Several result points sit within the contact threshold of the same
    /// reference point; atom identity cannot be resolved
    #[error("{count} reference points are in contact with result point {row}")]
    ContactConflict { row: usize, count: usize },

    /// The final nearest-neighbor assignment is not one-to-one
    #[error("nearest-neighbor assignment is not a permutation of the point indices")]
    BijectionViolation,

    /// Every alignment strategy failed
    #[error("no alignment strategy produced a usable result")]
    NoStrategySucceeded,
}
