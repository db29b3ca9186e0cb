//! Alignment strategies
//!
//! Three competing methods, each producing a transformed candidate point
//! set and a nearest-neighbor deviation score. A strategy that cannot
//! attempt returns an error; the orchestrator records it as an absent
//! score and selects among the survivors.

use lin_alg::f64::Vec3;
use rayon::prelude::*;

use molfit_mol::Structure;

use crate::anchors::{self, select_anchors, Anchors};
use crate::config::AlignConfig;
use crate::geometry::{angle_axis, rotation_between};
use crate::kabsch::{kabsch_fit, KabschFit};
use crate::linalg::{rotate_vec, Mat3};
use crate::scoring::deviation;
use crate::AlignError;

/// The closed set of alignment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Kabsch on the structures as given, betting that the input ordering
    /// already encodes the correspondence
    Lucky,
    /// Single-vector rotation sweep over every reference point
    Bruteforce,
    /// Kabsch on anchors selected by canonical-label grouping
    Flavoured,
    /// No rotation at all: centroid translation was already a match
    /// (shortcut path only)
    Translation,
}

impl Method {
    /// Stable name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Method::Lucky => "lucky_kabsch",
            Method::Bruteforce => "bruteforce",
            Method::Flavoured => "kabsch",
            Method::Translation => "translation",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a strategy may read: the structures, their raw coordinates
/// and their centered copies. Strategies never mutate shared state; each
/// writes only its own result.
pub(crate) struct StrategyContext<'a> {
    pub source: &'a Structure,
    pub target: &'a Structure,
    pub source_coords: &'a [Vec3],
    pub target_coords: &'a [Vec3],
    pub centered_source: &'a [Vec3],
    pub centered_target: &'a [Vec3],
}

impl Method {
    /// Run this method against the given structures. An error means the
    /// method could not attempt; the orchestrator records it as an
    /// absent score.
    pub(crate) fn evaluate(
        self,
        ctx: &StrategyContext<'_>,
        config: &AlignConfig,
    ) -> Result<StrategyResult, AlignError> {
        match self {
            Method::Lucky => lucky_kabsch(ctx.source_coords, ctx.target_coords, config),
            Method::Bruteforce => {
                bruteforce_sweep(ctx.centered_source, ctx.centered_target, config)
            }
            Method::Flavoured => flavoured_kabsch(
                ctx.source,
                ctx.target,
                ctx.source_coords,
                ctx.target_coords,
                config,
            ),
            Method::Translation => {
                let score = deviation(
                    ctx.centered_source,
                    ctx.centered_target,
                    config.use_absolute_deviation,
                );
                log::debug!("translation-only score: {score}");
                Ok(StrategyResult {
                    points: ctx.centered_source.to_vec(),
                    score,
                    method: Method::Translation,
                })
            }
        }
    }
}

/// A transformed candidate point set and its score
#[derive(Debug, Clone)]
pub struct StrategyResult {
    /// The transformed candidate structure
    pub points: Vec<Vec3>,
    /// Nearest-neighbor deviation of the reference into the transform
    pub score: f64,
    /// The method that produced this result
    pub method: Method,
}

/// Kabsch on the full ordered structures, assuming positional
/// correspondence
fn lucky_kabsch(
    source: &[Vec3],
    target: &[Vec3],
    config: &AlignConfig,
) -> Result<StrategyResult, AlignError> {
    let fit = kabsch_fit(source, target)?;
    let points = fit.apply(source);
    let score = deviation(&points, target, config.use_absolute_deviation);
    log::debug!("lucky kabsch score: {score}");
    Ok(StrategyResult {
        points,
        score,
        method: Method::Lucky,
    })
}

/// Single-vector rotation sweep on the centered structures.
///
/// The first centered candidate point is the fixed reference vector; for
/// every centered reference point, the rotation mapping the fixed vector
/// onto it is applied to the whole candidate and scored. The minimum
/// score wins, later rotations winning ties. The untransformed candidate
/// participates as the baseline.
fn bruteforce_sweep(
    centered_source: &[Vec3],
    centered_target: &[Vec3],
    config: &AlignConfig,
) -> Result<StrategyResult, AlignError> {
    let Some(&reference) = centered_source.first() else {
        return Err(AlignError::TooFewPoints { needed: 1, got: 0 });
    };

    let baseline = deviation(centered_source, centered_target, config.use_absolute_deviation);

    let evaluate = |&point: &Vec3| -> Result<(f64, Mat3), AlignError> {
        let rotation = rotation_between(reference, point)?;
        let (angle, axis) = angle_axis(&rotation);
        log::debug!(
            "rotation parameters: {:.2} deg, axis ({:.3}, {:.3}, {:.3})",
            angle.to_degrees(),
            axis.x,
            axis.y,
            axis.z
        );
        let rotated: Vec<Vec3> = centered_source
            .iter()
            .map(|&p| rotate_vec(&rotation, p))
            .collect();
        debug_assert!(
            (rotated[0].to_normalized() - point.to_normalized()).magnitude() < 1e-6,
            "sweep rotation failed to put the reference vector onto its target"
        );
        let score = deviation(&rotated, centered_target, config.use_absolute_deviation);
        Ok((score, rotation))
    };

    // Scores for every rotation of the sweep, in reference-point order.
    // The early exit only runs when shortcuts are enabled; the default is
    // the full sweep, evaluated in parallel.
    let scored: Vec<(f64, Mat3)> = if config.allow_shortcuts {
        let mut scored = Vec::with_capacity(centered_target.len());
        for point in centered_target {
            let (score, rotation) = evaluate(point)?;
            scored.push((score, rotation));
            if score <= config.score_tolerance {
                log::debug!("sweep score {score} within tolerance, stopping early");
                break;
            }
        }
        scored
    } else {
        centered_target
            .par_iter()
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut best_score = baseline;
    let mut best_rotation: Option<Mat3> = None;
    for (score, rotation) in scored {
        if score <= best_score {
            best_score = score;
            best_rotation = Some(rotation);
        }
    }

    let points = match best_rotation {
        Some(rotation) => centered_source
            .iter()
            .map(|&p| rotate_vec(&rotation, p))
            .collect(),
        None => centered_source.to_vec(),
    };
    log::debug!("minimum bruteforce score: {best_score}");
    Ok(StrategyResult {
        points,
        score: best_score,
        method: Method::Bruteforce,
    })
}

/// Kabsch on anchors selected by canonical-label grouping, with
/// combinatorial disambiguation when unique anchors are scarce
fn flavoured_kabsch(
    source: &Structure,
    target: &Structure,
    source_coords: &[Vec3],
    target_coords: &[Vec3],
    config: &AlignConfig,
) -> Result<StrategyResult, AlignError> {
    match select_anchors(source, target, config)? {
        Anchors::Unique { source: p, target: q } => {
            let fit = kabsch_fit(&p, &q)?;
            let points = fit.apply(source_coords);
            let score = deviation(&points, target_coords, config.use_absolute_deviation);
            log::debug!("kabsch on unique anchors scored {score}");
            Ok(StrategyResult {
                points,
                score,
                method: Method::Flavoured,
            })
        }
        Anchors::Disambiguate {
            source: p,
            target_base,
            target_choices,
        } => {
            let dims: Vec<usize> = target_choices.iter().map(Vec::len).collect();
            let total = anchors::combination_count(&dims);
            log::debug!(
                "disambiguating {} anchors over {total} candidate combinations",
                dims.len()
            );

            let scored: Vec<(f64, KabschFit)> = (0..total)
                .into_par_iter()
                .map(|k| {
                    let choice = anchors::combination(&dims, k);
                    let mut q = target_base.clone();
                    for (group, &member) in target_choices.iter().zip(choice.iter()) {
                        q.push(group[member]);
                    }
                    let fit = kabsch_fit(&p, &q)?;
                    let points = fit.apply(source_coords);
                    let score = deviation(&points, target_coords, config.use_absolute_deviation);
                    Ok((score, fit))
                })
                .collect::<Result<Vec<_>, AlignError>>()?;

            // Minimum score wins; later combinations win ties, matching
            // the sequential enumeration order
            let mut best: Option<(f64, KabschFit)> = None;
            for (score, fit) in scored {
                if best.as_ref().map_or(true, |(b, _)| score <= *b) {
                    best = Some((score, fit));
                }
            }
            let (score, fit) = best.ok_or(AlignError::NoStrategySucceeded)?;
            let points = fit.apply(source_coords);
            log::debug!("best disambiguated kabsch score: {score}");
            Ok(StrategyResult {
                points,
                score,
                method: Method::Flavoured,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{centroid, rotation_about_axis};

    fn points(raw: &[[f64; 3]]) -> Vec<Vec3> {
        raw.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect()
    }

    fn centered(points: &[Vec3]) -> Vec<Vec3> {
        let c = centroid(points);
        points.iter().map(|&p| p - c).collect()
    }

    #[test]
    fn test_lucky_recovers_rigid_transform() {
        let source = points(&[
            [0.0, 0.0, 0.0],
            [1.5, 0.0, 0.0],
            [0.0, 1.5, 0.0],
            [0.0, 0.0, 1.5],
        ]);
        let r = rotation_about_axis(Vec3::new(0.0, 0.0, 1.0), 0.7);
        let shift = Vec3::new(3.0, -2.0, 1.0);
        let target: Vec<Vec3> = source.iter().map(|&p| rotate_vec(&r, p) + shift).collect();

        let result = lucky_kabsch(&source, &target, &AlignConfig::default()).unwrap();
        assert_eq!(result.method, Method::Lucky);
        assert!(result.score < 1e-9, "score {}", result.score);
    }

    #[test]
    fn test_bruteforce_identity_scores_zero() {
        let structure = centered(&points(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 3.0],
        ]));
        let result = bruteforce_sweep(&structure, &structure, &AlignConfig::default()).unwrap();
        assert!(result.score < 1e-9, "score {}", result.score);
    }

    #[test]
    fn test_bruteforce_recovers_planar_rotation() {
        // All points in the xy plane: single-vector rotations can solve
        // this exactly, since the true rotation axis is perpendicular to
        // every point vector
        let reference = centered(&points(&[
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [-3.0, 0.0, 0.0],
            [0.0, -4.0, 0.0],
        ]));
        let r = rotation_about_axis(Vec3::new(0.0, 0.0, 1.0), 1.1);
        let candidate: Vec<Vec3> = reference.iter().map(|&p| rotate_vec(&r, p)).collect();

        let result = bruteforce_sweep(&candidate, &reference, &AlignConfig::default()).unwrap();
        assert_eq!(result.method, Method::Bruteforce);
        assert!(result.score < 1e-9, "score {}", result.score);
    }

    #[test]
    fn test_bruteforce_parallel_and_sequential_agree() {
        let reference = centered(&points(&[
            [1.0, 0.2, 0.0],
            [0.3, 2.0, 0.5],
            [-3.0, 0.1, 1.0],
            [0.4, -4.0, -1.5],
        ]));
        let r = rotation_about_axis(Vec3::new(1.0, 1.0, 1.0).to_normalized(), 0.4);
        let candidate: Vec<Vec3> = reference.iter().map(|&p| rotate_vec(&r, p)).collect();

        let parallel = bruteforce_sweep(&candidate, &reference, &AlignConfig::default()).unwrap();
        let sequential = bruteforce_sweep(
            &candidate,
            &reference,
            &AlignConfig {
                // Shortcuts force the sequential path; a huge negative
                // tolerance keeps the early exit from ever firing
                allow_shortcuts: true,
                score_tolerance: -1.0,
                ..AlignConfig::default()
            },
        )
        .unwrap();
        assert!((parallel.score - sequential.score).abs() < 1e-12);
    }

    #[test]
    fn test_bruteforce_later_rotation_wins_ties() {
        // Two rotations score an exact zero: onto (0, 1, 0) and onto
        // (0, -1, 0). The sweep keeps the later one, so the first source
        // point ends up on the second target point.
        let source = points(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let target = points(&[[0.0, 1.0, 0.0], [0.0, -1.0, 0.0]]);

        let result = bruteforce_sweep(&source, &target, &AlignConfig::default()).unwrap();
        assert!(result.score < 1e-12, "score {}", result.score);
        assert!(
            (result.points[0] - Vec3::new(0.0, -1.0, 0.0)).magnitude() < 1e-12,
            "expected the later tied rotation, got {:?}",
            result.points[0]
        );
    }

    #[test]
    fn test_bruteforce_empty_input() {
        assert!(matches!(
            bruteforce_sweep(&[], &[], &AlignConfig::default()),
            Err(AlignError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn test_flavoured_unique_anchor_alignment() {
        let raw = [
            ([0.0, 0.0, 0.0], "C"),
            ([1.5, 0.0, 0.0], "N"),
            ([0.0, 1.5, 0.0], "O"),
            ([0.0, 0.0, 1.5], "S"),
        ];
        let coords: Vec<Vec3> = raw.iter().map(|(p, _)| Vec3::new(p[0], p[1], p[2])).collect();
        let elements: Vec<String> = raw.iter().map(|(_, e)| e.to_string()).collect();
        let source = Structure::new(coords.clone(), Some(elements.clone()), None).unwrap();

        let r = rotation_about_axis(Vec3::new(0.0, 1.0, 0.0), 0.9);
        let shift = Vec3::new(0.0, 5.0, 0.0);
        let moved: Vec<Vec3> = coords.iter().map(|&p| rotate_vec(&r, p) + shift).collect();
        let target = Structure::new(moved.clone(), Some(elements), None).unwrap();

        let result =
            flavoured_kabsch(&source, &target, &coords, &moved, &AlignConfig::default()).unwrap();
        assert_eq!(result.method, Method::Flavoured);
        assert!(result.score < 1e-9, "score {}", result.score);
    }

    #[test]
    fn test_flavoured_disambiguation_alignment() {
        // Two unique anchors (C, N) and one ambiguous H pair: the search
        // must try both H assignments and keep the consistent one
        let raw = [
            ([0.0, 0.0, 0.0], "C"),
            ([1.5, 0.0, 0.0], "N"),
            ([0.0, 1.2, 0.0], "H"),
            ([0.0, 0.0, 2.4], "H"),
        ];
        let coords: Vec<Vec3> = raw.iter().map(|(p, _)| Vec3::new(p[0], p[1], p[2])).collect();
        let elements: Vec<String> = raw.iter().map(|(_, e)| e.to_string()).collect();
        let source = Structure::new(coords.clone(), Some(elements.clone()), None).unwrap();

        let r = rotation_about_axis(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let moved: Vec<Vec3> = coords.iter().map(|&p| rotate_vec(&r, p)).collect();
        // Swap the two H atoms on the reference side so positional order
        // does not encode the correspondence
        let mut permuted = moved.clone();
        permuted.swap(2, 3);
        let target = Structure::new(permuted.clone(), Some(elements), None).unwrap();

        let result =
            flavoured_kabsch(&source, &target, &coords, &permuted, &AlignConfig::default())
                .unwrap();
        assert!(result.score < 1e-9, "score {}", result.score);
    }
}
