//! Alignment orchestration
//!
//! Validates a structure pair, races the alignment strategies, selects a
//! winner, re-centers it onto the reference centroid and verifies the
//! resulting correspondence.

use lin_alg::f64::Vec3;

use molfit_mol::{BondMatrix, Structure};

use crate::config::AlignConfig;
use crate::geometry::{centroid, DistanceMatrix};
use crate::scoring::{ad_from_matrix, count_contact_points, rmsd_from_matrix};
use crate::strategy::{Method, StrategyContext, StrategyResult};
use crate::AlignError;

/// The final alignment: the winning transform in the reference frame
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Transformed candidate coordinates, centered on the reference
    /// centroid
    pub points: Vec<Vec3>,
    /// Nearest-neighbor deviation of the reference into the transform
    pub score: f64,
    /// The winning method
    pub method: Method,
    /// For each transformed point, the index of its nearest reference
    /// point
    pub permutation: Vec<usize>,
    /// Whether the permutation is a bijection. Always true in strict
    /// mode; when false, atom identities could not be assigned one-to-one
    pub bijection_verified: bool,
}

/// Superimpose `source` onto `target`.
///
/// Runs the lucky and bruteforce strategies unconditionally and the
/// flavoured Kabsch strategy when both structures carry element labels,
/// then selects a winner, re-centers it onto the target centroid and
/// verifies the nearest-neighbor correspondence. `bonds` matrices are
/// validated for shape only.
pub fn align(
    source: &Structure,
    target: &Structure,
    bonds: Option<(&BondMatrix, &BondMatrix)>,
    config: &AlignConfig,
) -> Result<Alignment, AlignError> {
    validate(source, target, bonds)?;

    let source_coords = source.coords();
    let target_coords = target.coords();
    let target_centroid = centroid(&target_coords);

    let source_centroid = centroid(&source_coords);
    let centered_source: Vec<Vec3> = source_coords.iter().map(|&p| p - source_centroid).collect();
    let centered_target: Vec<Vec3> = target_coords.iter().map(|&p| p - target_centroid).collect();
    debug_assert!(centroid(&centered_source).magnitude() < 1e-9);
    debug_assert!(centroid(&centered_target).magnitude() < 1e-9);

    let ctx = StrategyContext {
        source,
        target,
        source_coords: &source_coords,
        target_coords: &target_coords,
        centered_source: &centered_source,
        centered_target: &centered_target,
    };

    // Translation-only shortcut: no rotational component to resolve
    if config.allow_shortcuts {
        if let Some(translation) = run(Method::Translation.evaluate(&ctx, config)) {
            if translation.score <= config.score_tolerance {
                log::debug!(
                    "translation alone matches the structures (score {})",
                    translation.score
                );
                return finalize(
                    translation.points,
                    translation.method,
                    &target_coords,
                    target_centroid,
                    config,
                );
            }
        }
    }

    let lucky = run(Method::Lucky.evaluate(&ctx, config));
    let bruteforce = run(Method::Bruteforce.evaluate(&ctx, config));
    let flavoured = if source.has_elements() && target.has_elements() {
        run(Method::Flavoured.evaluate(&ctx, config))
    } else {
        None
    };

    for result in [&lucky, &bruteforce, &flavoured].into_iter().flatten() {
        log::debug!("method {} scored {}", result.method, result.score);
    }

    let winner = select_winner(flavoured, bruteforce, lucky, config)?;
    log::debug!("best method: {}", winner.method);

    finalize(winner.points, winner.method, &target_coords, target_centroid, config)
}

/// Record a strategy failure as an absent score
fn run(result: Result<StrategyResult, AlignError>) -> Option<StrategyResult> {
    match result {
        Ok(result) => Some(result),
        Err(err) => {
            log::warn!("strategy failed: {err}");
            None
        }
    }
}

/// Winner policy: the flavoured result whenever it qualifies, then the
/// best-scoring of bruteforce and lucky.
///
/// Flavoured qualifies when it produced a score and either beats
/// bruteforce or `prefer_kabsch` is set. The lucky result can win only
/// when flavoured does not qualify, where it competes with bruteforce on
/// score alone; this keeps an order-preserved input pair solvable even
/// when neither anchor selection nor a single-vector sweep can express
/// the true rotation.
fn select_winner(
    flavoured: Option<StrategyResult>,
    bruteforce: Option<StrategyResult>,
    lucky: Option<StrategyResult>,
    config: &AlignConfig,
) -> Result<StrategyResult, AlignError> {
    if let Some(flavoured) = flavoured {
        let beats_bruteforce = bruteforce
            .as_ref()
            .map_or(true, |b| flavoured.score <= b.score);
        if beats_bruteforce || config.prefer_kabsch {
            return Ok(flavoured);
        }
    }
    match (bruteforce, lucky) {
        (Some(b), Some(l)) => Ok(if l.score < b.score { l } else { b }),
        (Some(b), None) => Ok(b),
        (None, Some(l)) => Ok(l),
        (None, None) => Err(AlignError::NoStrategySucceeded),
    }
}

/// Re-center the winning transform onto the reference centroid, then
/// verify it: contact conflicts are fatal, a broken bijection is a
/// warning (or an error in strict mode)
fn finalize(
    points: Vec<Vec3>,
    method: Method,
    target_coords: &[Vec3],
    target_centroid: Vec3,
    config: &AlignConfig,
) -> Result<Alignment, AlignError> {
    // Strategies may center differently; normalize unconditionally
    let own_centroid = centroid(&points);
    let points: Vec<Vec3> = points
        .iter()
        .map(|&p| p - own_centroid + target_centroid)
        .collect();
    debug_assert!((centroid(&points) - target_centroid).magnitude() < 1e-6);

    let matrix = DistanceMatrix::between(&points, target_coords);
    let contacts = count_contact_points(&matrix)?;
    log::trace!("{contacts} points in contact with the reference structure");

    let score = if config.use_absolute_deviation {
        ad_from_matrix(&matrix)
    } else {
        rmsd_from_matrix(&matrix)
    };
    log::debug!("final score: {score}");

    let permutation = nearest_assignment(&matrix);
    let bijection_verified = is_permutation(&permutation);
    if !bijection_verified {
        if config.strict_bijection {
            return Err(AlignError::BijectionViolation);
        }
        log::warn!(
            "nearest-neighbor assignment is not a permutation; \
             atom identities could not be resolved one-to-one"
        );
    }

    Ok(Alignment {
        points,
        score,
        method,
        permutation,
        bijection_verified,
    })
}

fn validate(
    source: &Structure,
    target: &Structure,
    bonds: Option<(&BondMatrix, &BondMatrix)>,
) -> Result<(), AlignError> {
    let n = source.len();
    if n != target.len() {
        return Err(AlignError::ShapeMismatch {
            what: "point lists",
            left: n,
            right: target.len(),
        });
    }
    if n == 0 {
        return Err(AlignError::TooFewPoints { needed: 1, got: 0 });
    }

    if source.has_elements() && target.has_elements() {
        if source.sorted_elements() != target.sorted_elements() {
            return Err(AlignError::LabelSetMismatch { what: "element sets" });
        }
    }
    if source.has_flavours() && target.has_flavours() {
        if source.sorted_flavour_bucket_sizes() != target.sorted_flavour_bucket_sizes() {
            return Err(AlignError::LabelSetMismatch {
                what: "flavour group sizes",
            });
        }
    }

    if let Some((first, second)) = bonds {
        for matrix in [first, second] {
            if matrix.rows() != n {
                return Err(AlignError::ShapeMismatch {
                    what: "bonds matrix rows",
                    left: matrix.rows(),
                    right: n,
                });
            }
            if matrix.cols() != n {
                return Err(AlignError::ShapeMismatch {
                    what: "bonds matrix columns",
                    left: matrix.cols(),
                    right: n,
                });
            }
        }
    }
    Ok(())
}

/// For each row point, the column index of its nearest neighbor. Exact
/// distance ties resolve to the later index.
fn nearest_assignment(matrix: &DistanceMatrix) -> Vec<usize> {
    (0..matrix.rows())
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (col, &distance) in matrix.row(row).iter().enumerate() {
                if distance <= best_distance {
                    best_distance = distance;
                    best = col;
                }
            }
            best
        })
        .collect()
}

/// Whether the assignment maps the indices one-to-one
fn is_permutation(assignment: &[usize]) -> bool {
    let mut sorted = assignment.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(i, &v)| i == v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1]));
        assert!(!is_permutation(&[0, 0, 1]));
        assert!(is_permutation(&[]));
    }

    #[test]
    fn test_nearest_assignment_prefers_later_on_ties() {
        let a = vec![Vec3::new(0.0, 0.0, 0.0)];
        let b = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)];
        let matrix = DistanceMatrix::between(&a, &b);
        assert_eq!(nearest_assignment(&matrix), vec![1]);
    }
}
