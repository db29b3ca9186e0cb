//! Anchor selection by canonical-label grouping
//!
//! Atoms are grouped by canonical label; a group of size one is a unique
//! anchor, unambiguously correspondable across structures by label
//! equality alone. When too few atoms are individually identifiable the
//! engine falls back to combinatorial disambiguation over small ambiguous
//! groups, bounded by `max_group_complexity ^ missing` candidates.

use ahash::AHashMap;
use lin_alg::f64::Vec3;
use molfit_mol::{Atom, Structure};

use crate::config::AlignConfig;
use crate::AlignError;

/// Group items by a derived key.
///
/// Groups appear in first-seen key order, and members keep their insertion
/// order within each group. Both orderings are load-bearing: the
/// disambiguation search picks the *first-listed* member of a group as its
/// fixed representative.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&T) -> K,
{
    let mut index: AHashMap<K, usize> = AHashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Anchor pairs selected for a Kabsch fit
#[derive(Debug, Clone)]
pub enum Anchors {
    /// Enough unique anchors on both sides; the pairs are fixed
    Unique { source: Vec<Vec3>, target: Vec<Vec3> },

    /// Unique anchors plus, per missing anchor, a set of candidate
    /// members on the reference side to enumerate over
    Disambiguate {
        /// Fixed candidate-side anchors: the unique anchors plus the
        /// first-listed representative of each selected ambiguous group
        source: Vec<Vec3>,
        /// Unique anchors on the reference side
        target_base: Vec<Vec3>,
        /// Candidate members of each corresponding reference-side group
        target_choices: Vec<Vec<Vec3>>,
    },
}

/// Select anchor points for the flavoured Kabsch strategy.
///
/// Flavour refinement is in effect only when *both* structures carry
/// flavours; otherwise atoms group by bare element on both sides.
pub fn select_anchors(
    source: &Structure,
    target: &Structure,
    config: &AlignConfig,
) -> Result<Anchors, AlignError> {
    let use_flavours = source.has_flavours() && target.has_flavours();
    let source_groups = label_groups(source, use_flavours);
    let target_groups = label_groups(target, use_flavours);

    // Unique anchors, label-sorted so equal labels pair up across sides
    let mut unique_source = unique_anchors(&source_groups);
    let mut unique_target = unique_anchors(&target_groups);
    unique_source.sort_by(|a, b| a.0.cmp(&b.0));
    unique_target.sort_by(|a, b| a.0.cmp(&b.0));

    if unique_source.len() != unique_target.len() {
        return Err(AlignError::AnchorMismatch {
            left: unique_source.len(),
            right: unique_target.len(),
        });
    }
    let labels_match = unique_source
        .iter()
        .zip(unique_target.iter())
        .all(|(a, b)| a.0 == b.0);
    if !labels_match {
        return Err(AlignError::AnchorMismatch {
            left: unique_source.len(),
            right: unique_target.len(),
        });
    }

    log::debug!(
        "{} unique anchor points, {} required",
        unique_source.len(),
        config.min_unique_points
    );

    if unique_source.len() >= config.min_unique_points {
        let n = config.min_unique_points;
        return Ok(Anchors::Unique {
            source: unique_source[..n].iter().map(|(_, c)| *c).collect(),
            target: unique_target[..n].iter().map(|(_, c)| *c).collect(),
        });
    }

    // Not enough unique anchors: disambiguate over small ambiguous groups
    let missing = config.min_unique_points - unique_source.len();
    let source_ambiguous = ambiguous_groups(source_groups, config.max_group_complexity);
    let target_ambiguous = ambiguous_groups(target_groups, config.max_group_complexity);

    if source_ambiguous.len() < missing || target_ambiguous.len() < missing {
        return Err(AlignError::InsufficientAnchors {
            unique: unique_source.len(),
            groups: source_ambiguous.len().min(target_ambiguous.len()),
            needed: config.min_unique_points,
        });
    }

    let mut anchors: Vec<Vec3> = unique_source.iter().map(|(_, c)| *c).collect();
    for group in &source_ambiguous[..missing] {
        anchors.push(group[0]);
    }

    Ok(Anchors::Disambiguate {
        source: anchors,
        target_base: unique_target.iter().map(|(_, c)| *c).collect(),
        target_choices: target_ambiguous[..missing].to_vec(),
    })
}

/// Atoms of one structure grouped by their effective label
fn label_groups(structure: &Structure, use_flavours: bool) -> Vec<(String, Vec<&Atom>)> {
    let labelled: Vec<(String, &Atom)> = structure
        .atoms()
        .iter()
        .filter_map(|atom| {
            let label = if use_flavours {
                atom.canonical_label()
            } else {
                atom.element()
            };
            label.map(|l| (l.to_string(), atom))
        })
        .collect();
    group_by(labelled, |(label, _)| label.clone())
        .into_iter()
        .map(|(label, members)| (label, members.into_iter().map(|(_, a)| a).collect()))
        .collect()
}

fn unique_anchors(groups: &[(String, Vec<&Atom>)]) -> Vec<(String, Vec3)> {
    groups
        .iter()
        .filter(|(_, members)| members.len() == 1)
        .map(|(label, members)| (label.clone(), members[0].coord))
        .collect()
}

/// Label groups usable for disambiguation: strictly more than one member,
/// at most `max_complexity`, stably sorted ascending by size
fn ambiguous_groups(groups: Vec<(String, Vec<&Atom>)>, max_complexity: usize) -> Vec<Vec<Vec3>> {
    let mut ambiguous: Vec<Vec<Vec3>> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1 && members.len() <= max_complexity)
        .map(|(_, members)| members.iter().map(|a| a.coord).collect())
        .collect();
    ambiguous.sort_by_key(Vec::len);
    ambiguous
}

/// Total number of Cartesian-product combinations over the given group
/// sizes
pub(crate) fn combination_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Decode combination `k` as one member index per group. The first group
/// is the most significant digit; the last group varies fastest.
pub(crate) fn combination(dims: &[usize], mut k: usize) -> Vec<usize> {
    let mut indices = vec![0usize; dims.len()];
    for i in (0..dims.len()).rev() {
        indices[i] = k % dims[i];
        k /= dims[i];
    }
    indices
}
