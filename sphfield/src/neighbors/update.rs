use std::sync::Arc;

use log::info;
use ndarray::ArrayView2;

use crate::{Error, Vector3D};
use super::{NeighborList, Pair, to_vectors};

/// What happened during [`NeighborList::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The points did not move more than the tolerance, and the existing
    /// pairs were re-used with updated distances
    Revalidated,
    /// The points moved too much, and a new neighbor list was built from
    /// scratch
    Rebuilt,
}

/// Pick up to `samples` indexes regularly spaced in `0..n`
fn sampled_indexes(n: usize, samples: usize) -> impl Iterator<Item = usize> {
    let stride = usize::max(n / samples, 1);
    (0..n).step_by(stride).take(samples)
}

impl NeighborList {
    /// Get a neighbor list for new positions of the same points.
    ///
    /// The displacement of a regularly spaced subset of `samples` points is
    /// measured against the positions used for the last full search. If no
    /// sampled point moved by more than `tolerance` and by more than half of
    /// the [`skin`](crate::NeighborListOptions::skin), all pairs found within
    /// `cutoff + skin` by the last full search are re-computed from the new
    /// positions, and the pairs below the cutoff are kept. Any pair now below
    /// the cutoff was then within `cutoff + skin` during the full search.
    /// Otherwise, the list is rebuilt from scratch with the same options and
    /// filter.
    ///
    /// Without skin, the list is only re-validated if the sampled points did
    /// not move at all. `reference` must be `None` for self-searches, and
    /// contain the new reference positions for cross-searches. Lists created
    /// by [`NeighborList::partition`] can not be updated.
    ///
    /// This function never modifies `self`, and always returns a new list.
    #[time_graph::instrument(name = "NeighborList::update")]
    pub fn update(
        &self,
        query: ArrayView2<f64>,
        reference: Option<ArrayView2<f64>>,
        tolerance: f64,
        samples: usize,
    ) -> Result<(NeighborList, UpdateOutcome), Error> {
        if !(tolerance >= 0.0 && tolerance.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "update tolerance must be a positive number, got {}", tolerance
            )));
        }

        if samples == 0 {
            return Err(Error::InvalidParameter(
                "the number of samples for neighbor list update must be at least 1".into()
            ));
        }

        if self.partitioned {
            return Err(Error::InvalidParameter(
                "can not update a partitioned neighbor list, update the full list and partition it again".into()
            ));
        }

        if self.is_self_search() && reference.is_some() {
            return Err(Error::InvalidParameter(
                "can not give reference points when updating a self neighbor list".into()
            ));
        } else if !self.is_self_search() && reference.is_none() {
            return Err(Error::InvalidParameter(
                "missing reference points when updating a cross neighbor list".into()
            ));
        }

        check_same_shape(&self.query_positions(), &query, "query points")?;
        let query_vectors = to_vectors(&query, "query points")?;
        let reference_vectors = match &reference {
            Some(reference) => {
                check_same_shape(&self.reference_positions(), reference, "reference points")?;
                Some(to_vectors(reference, "reference points")?)
            }
            None => None,
        };

        if let Some(domain) = &self.domain {
            domain.check_inside(query)?;
            if let Some(reference) = reference {
                domain.check_inside(reference)?;
            }
        }

        let (candidates, old_query, old_reference) = match &self.candidates {
            Some(candidates) => (
                &candidates.pairs,
                candidates.query_positions.view(),
                candidates.reference_positions.as_ref().map(|r| r.view()),
            ),
            None => (
                &self.pairs,
                self.query_positions.view(),
                self.reference_positions.as_ref().map(|r| r.view()),
            ),
        };

        let threshold = if self.candidates.is_some() {
            f64::min(tolerance, 0.5 * self.options.skin)
        } else {
            0.0
        };

        let mut maximal = self.displacement(old_query, &query_vectors, samples);
        if let (Some(old), Some(new)) = (old_reference, &reference_vectors) {
            maximal = f64::max(maximal, self.displacement(old, new, samples));
        }

        if maximal <= threshold {
            let reference_vectors = reference_vectors.as_ref().unwrap_or(&query_vectors);
            let pairs = self.revalidate(candidates, &query_vectors, reference_vectors);

            let list = NeighborList {
                options: self.options,
                filter: self.filter.clone(),
                pairs: pairs,
                query_positions: Arc::new(query.to_owned()),
                reference_positions: reference.map(|r| Arc::new(r.to_owned())),
                domain: self.domain,
                candidates: self.candidates.clone(),
                partitioned: false,
            };
            return Ok((list, UpdateOutcome::Revalidated));
        }

        info!(
            "rebuilding neighbor list: points moved by {} which is more than the tolerance ({})",
            maximal, threshold
        );

        let list = match self.domain {
            Some(ref domain) => NeighborList::periodic_with_filter(
                domain, query, reference, self.options, self.filter.clone()
            )?,
            None => NeighborList::with_filter(
                query, reference, self.options, self.filter.clone()
            )?,
        };

        return Ok((list, UpdateOutcome::Rebuilt));
    }

    /// Maximal displacement between the `old` positions and the `new` ones,
    /// over a subset of `samples` points
    fn displacement(&self, old: ArrayView2<f64>, new: &[Vector3D], samples: usize) -> f64 {
        let mut maximal = 0.0;
        for i in sampled_indexes(new.len(), samples) {
            let mut delta = new[i] - Vector3D::from_row(old.row(i));
            if let Some(domain) = &self.domain {
                domain.vector_image(&mut delta);
            }
            maximal = f64::max(maximal, delta.norm());
        }
        return maximal;
    }

    /// Re-compute the vectors and distances of the `candidates` pairs with new
    /// positions, and only keep the pairs below the cutoff.
    fn revalidate(&self, candidates: &[Vec<Pair>], query: &[Vector3D], reference: &[Vector3D]) -> Vec<Vec<Pair>> {
        let cutoff = self.options.cutoff;

        return candidates.iter().map(|pairs| {
            pairs.iter().filter_map(|pair| {
                let direct = reference[pair.second] - query[pair.first];

                let mut vector = direct;
                let mut cell_shift = pair.cell_shift;
                if let Some(domain) = &self.domain {
                    domain.vector_image(&mut vector);
                    for i in 0..domain.dimension() {
                        if domain.is_periodic(i) {
                            cell_shift[i] = f64::round((vector[i] - direct[i]) / domain.length(i)) as i32;
                        }
                    }
                }

                let distance = vector.norm();
                if distance < cutoff {
                    Some(Pair {
                        first: pair.first,
                        second: pair.second,
                        distance: distance,
                        vector: vector,
                        cell_shift: cell_shift,
                    })
                } else {
                    None
                }
            }).collect()
        }).collect();
    }
}

fn check_same_shape(old: &ArrayView2<f64>, new: &ArrayView2<f64>, name: &str) -> Result<(), Error> {
    if old.shape() != new.shape() {
        return Err(Error::ShapeMismatch(format!(
            "new {} have shape {:?}, but this neighbor list was built with shape {:?}",
            name, new.shape(), old.shape()
        )));
    }
    Ok(())
}
