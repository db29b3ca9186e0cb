//! Labelled point data structure
//!
//! Provides the `Atom` struct: one coordinate of a structure together with
//! its chemical-identity labels. An `Atom` is a plain labelled record; it
//! carries no bonding, residue or display state.

use lin_alg::f64::Vec3;

/// A single labelled point of a [`Structure`](crate::Structure)
///
/// Atoms are immutable once constructed. The `canonical_label` is derived
/// by the owning structure when it is built and never changes afterwards.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Cartesian position (Angstroms)
    pub coord: Vec3,

    /// Position of this atom within its structure's ordering
    pub index: usize,

    /// Chemical element symbol (e.g. "C", "H"), when known
    pub element: Option<String>,

    /// Finer-than-element sub-type distinguishing chemically
    /// non-equivalent atoms of the same element
    pub flavour: Option<String>,

    /// Derived grouping key: the element symbol, suffixed with the size of
    /// this atom's flavour bucket when the structure carries flavours.
    /// `None` when the element is unknown.
    pub(crate) canonical_label: Option<String>,
}

impl Atom {
    /// The derived grouping key, if this atom has an element label
    #[inline]
    pub fn canonical_label(&self) -> Option<&str> {
        self.canonical_label.as_deref()
    }

    /// The element symbol, if known
    #[inline]
    pub fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    /// The flavour label, if present
    #[inline]
    pub fn flavour(&self) -> Option<&str> {
        self.flavour.as_deref()
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Atom(index={}, element={}, label={})",
            self.index,
            self.element.as_deref().unwrap_or("?"),
            self.canonical_label.as_deref().unwrap_or("?"),
        )
    }
}
