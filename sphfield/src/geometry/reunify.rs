use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::Error;
use super::SimulationBox;

/// Maximal number of centroid/shift passes used when reuniting a set of points
pub const MAX_REUNIFY_PASSES: usize = 10;

/// Result of [`SimulationBox::outcell`]
#[derive(Debug, Clone)]
pub struct Reunification {
    /// Unwrapped positions if `reunited` is true, and the original positions
    /// otherwise
    pub positions: Array2<f64>,
    /// Did the reunification reduce the spread of the points?
    pub reunited: bool,
    /// Number of centroid/shift passes that were performed
    pub passes: usize,
}

/// Sum of squared deviations of the points from their centroid, used as a
/// proxy for the moment of inertia of the points.
fn spread(points: &ArrayView2<f64>) -> Result<f64, Error> {
    let centroid = centroid(points)?;
    let mut spread = 0.0;
    for row in points.outer_iter() {
        spread += row.iter().zip(&centroid).map(|(x, c)| (x - c) * (x - c)).sum::<f64>();
    }
    return Ok(spread);
}

fn centroid(points: &ArrayView2<f64>) -> Result<Array1<f64>, Error> {
    points.mean_axis(Axis(0)).ok_or_else(|| Error::Internal(
        "can not compute the centroid of an empty set of points".into()
    ))
}

impl SimulationBox {
    /// Reconstruct a contiguous representation of a single object that might
    /// have been split by periodic wrapping.
    ///
    /// At each pass, points further than half a box length from the centroid
    /// along a periodic dimension are shifted by one box length toward the
    /// centroid, until no point moves (or after [`MAX_REUNIFY_PASSES`]). The
    /// unwrapped positions are only accepted if they reduce the sum of squared
    /// deviations from the centroid. Otherwise the original positions are
    /// returned with `reunited` set to `false`.
    ///
    /// This is a heuristic: objects split evenly across a boundary, or with
    /// ring-like shapes, may not be reunited.
    #[time_graph::instrument(name = "SimulationBox::outcell")]
    pub fn outcell(&self, points: ArrayView2<f64>) -> Result<Reunification, Error> {
        self.check_dimension(&points, "points")?;

        let original = points.to_owned();
        if original.nrows() == 0 {
            return Ok(Reunification {
                positions: original,
                reunited: false,
                passes: 0,
            });
        }

        let mut positions = original.clone();
        let mut moved = false;
        let mut passes = 0;
        while passes < MAX_REUNIFY_PASSES {
            passes += 1;

            let center = centroid(&positions.view())?;
            let mut changed = false;
            for mut row in positions.outer_iter_mut() {
                for i in 0..self.dimension {
                    if !self.periodic[i] {
                        continue;
                    }

                    let length = self.length(i);
                    let delta = row[i] - center[i];
                    if delta > 0.5 * length {
                        row[i] -= length;
                        changed = true;
                    } else if delta < -0.5 * length {
                        row[i] += length;
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
            moved = true;
        }

        let before = spread(&original.view())?;
        let after = spread(&positions.view())?;
        debug!("reunification after {} passes: spread went from {} to {}", passes, before, after);

        if moved && after < before {
            return Ok(Reunification {
                positions: positions,
                reunited: true,
                passes: passes,
            });
        }

        if moved {
            warn!(
                "rejected reunification of {} points, the spread did not decrease ({} -> {})",
                original.nrows(), before, after
            );
        }

        return Ok(Reunification {
            positions: original,
            reunited: false,
            passes: passes,
        });
    }
}
