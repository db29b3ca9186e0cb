//! Ordered atom sequences
//!
//! A `Structure` is one snapshot of a labelled point set. It owns its
//! atoms, derives each atom's canonical label at construction time, and
//! exposes the label multisets the alignment engine validates against.

use ahash::AHashMap;
use lin_alg::f64::Vec3;

use crate::atom::Atom;
use crate::error::{MolError, MolResult};

/// An ordered sequence of labelled points
///
/// The atom count, the element multiset and the flavour bucket sizes are
/// all fixed at construction. Atom order encodes nothing semantically,
/// except that positional correspondence between two structures is what
/// the "lucky" alignment strategy bets on.
#[derive(Debug, Clone)]
pub struct Structure {
    atoms: Vec<Atom>,
    has_elements: bool,
    has_flavours: bool,
}

impl Structure {
    /// Build a structure from parallel coordinate and label lists.
    ///
    /// `elements` and `flavours`, when given, must have one entry per
    /// coordinate. Canonical labels are derived here: the element alone,
    /// or `element ++ flavour-bucket-size` when flavours are present
    /// (bucket = all atoms of this structure sharing the flavour).
    pub fn new(
        coords: Vec<Vec3>,
        elements: Option<Vec<String>>,
        flavours: Option<Vec<String>>,
    ) -> MolResult<Self> {
        if let Some(els) = &elements {
            if els.len() != coords.len() {
                return Err(MolError::ShapeMismatch {
                    what: "element list",
                    expected: coords.len(),
                    actual: els.len(),
                });
            }
        }
        if let Some(fls) = &flavours {
            if fls.len() != coords.len() {
                return Err(MolError::ShapeMismatch {
                    what: "flavour list",
                    expected: coords.len(),
                    actual: fls.len(),
                });
            }
        }

        // Flavour bucket sizes within this structure
        let bucket_sizes: Option<AHashMap<&str, usize>> = flavours.as_ref().map(|fls| {
            let mut sizes: AHashMap<&str, usize> = AHashMap::new();
            for fl in fls {
                *sizes.entry(fl.as_str()).or_insert(0) += 1;
            }
            sizes
        });

        let atoms = coords
            .iter()
            .enumerate()
            .map(|(index, &coord)| {
                let element = elements.as_ref().map(|e| e[index].clone());
                let flavour = flavours.as_ref().map(|f| f[index].clone());
                let canonical_label = element.as_ref().map(|el| {
                    match (&flavour, &bucket_sizes) {
                        (Some(fl), Some(sizes)) => {
                            let size = sizes.get(fl.as_str()).copied().unwrap_or(1);
                            format!("{el}{size}")
                        }
                        _ => el.clone(),
                    }
                });
                Atom {
                    coord,
                    index,
                    element,
                    flavour,
                    canonical_label,
                }
            })
            .collect();

        Ok(Structure {
            atoms,
            has_elements: elements.is_some(),
            has_flavours: flavours.is_some(),
        })
    }

    /// Build a structure from bare coordinates, with no identity labels
    pub fn unlabelled(coords: Vec<Vec3>) -> Self {
        Structure {
            atoms: coords
                .iter()
                .enumerate()
                .map(|(index, &coord)| Atom {
                    coord,
                    index,
                    element: None,
                    flavour: None,
                    canonical_label: None,
                })
                .collect(),
            has_elements: false,
            has_flavours: false,
        }
    }

    /// Number of atoms
    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the structure contains no atoms
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The atoms, in input order
    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// The coordinates, in input order
    pub fn coords(&self) -> Vec<Vec3> {
        self.atoms.iter().map(|a| a.coord).collect()
    }

    /// Whether every atom carries an element label
    #[inline]
    pub fn has_elements(&self) -> bool {
        self.has_elements
    }

    /// Whether every atom carries a flavour label
    #[inline]
    pub fn has_flavours(&self) -> bool {
        self.has_flavours
    }

    /// The element multiset, sorted, for cross-structure validation
    pub fn sorted_elements(&self) -> Vec<&str> {
        let mut elements: Vec<&str> = self
            .atoms
            .iter()
            .filter_map(|a| a.element.as_deref())
            .collect();
        elements.sort_unstable();
        elements
    }

    /// The sizes of the flavour buckets, sorted, for cross-structure
    /// validation
    pub fn sorted_flavour_bucket_sizes(&self) -> Vec<usize> {
        let mut sizes: AHashMap<&str, usize> = AHashMap::new();
        for fl in self.atoms.iter().filter_map(|a| a.flavour.as_deref()) {
            *sizes.entry(fl).or_insert(0) += 1;
        }
        let mut sizes: Vec<usize> = sizes.into_values().collect();
        sizes.sort_unstable();
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords4() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]
    }

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_label_without_flavours() {
        let s = Structure::new(coords4(), Some(strs(&["C", "H", "H", "H"])), None).unwrap();
        assert_eq!(s.atoms()[0].canonical_label(), Some("C"));
        assert_eq!(s.atoms()[1].canonical_label(), Some("H"));
    }

    #[test]
    fn test_canonical_label_with_flavours() {
        let s = Structure::new(
            coords4(),
            Some(strs(&["C", "H", "H", "H"])),
            Some(strs(&["a", "b", "b", "c"])),
        )
        .unwrap();
        // "b" bucket has two members, "a" and "c" one each
        assert_eq!(s.atoms()[0].canonical_label(), Some("C1"));
        assert_eq!(s.atoms()[1].canonical_label(), Some("H2"));
        assert_eq!(s.atoms()[2].canonical_label(), Some("H2"));
        assert_eq!(s.atoms()[3].canonical_label(), Some("H1"));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Structure::new(coords4(), Some(strs(&["C", "H"])), None).unwrap_err();
        assert!(matches!(err, MolError::ShapeMismatch { what: "element list", .. }));
    }

    #[test]
    fn test_sorted_multisets() {
        let s = Structure::new(
            coords4(),
            Some(strs(&["H", "C", "H", "O"])),
            Some(strs(&["x", "y", "x", "z"])),
        )
        .unwrap();
        assert_eq!(s.sorted_elements(), vec!["C", "H", "H", "O"]);
        assert_eq!(s.sorted_flavour_bucket_sizes(), vec![1, 1, 2]);
    }

    #[test]
    fn test_unlabelled() {
        let s = Structure::unlabelled(coords4());
        assert_eq!(s.len(), 4);
        assert!(!s.has_elements());
        assert!(s.atoms()[2].canonical_label().is_none());
        assert_eq!(s.atoms()[2].index, 2);
    }
}
