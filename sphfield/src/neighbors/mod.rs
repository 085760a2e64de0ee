//! Cutoff-radius neighbor search (Verlet lists) over one or two point sets.
use std::sync::Arc;

use log::warn;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::{Error, SimulationBox, Vector3D};

mod cell_list;
use self::cell_list::CellList;

mod filter;
pub use self::filter::{PairFilter, MaskRelation};

mod periodic;

mod update;
pub use self::update::UpdateOutcome;

mod partition;
pub use self::partition::TypePartition;

/// Below this number of candidate pairs (`n_query x n_reference`), all pairs
/// are checked directly instead of building a cell list.
pub const BRUTE_FORCE_MAX_PAIRS: usize = 4096;

/// Pair of points coming from a neighbor list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair {
    /// index of the query point
    pub first: usize,
    /// index of the reference point
    pub second: usize,
    /// distance between the two points
    pub distance: f64,
    /// vector from the query point to the reference point, accounting for
    /// periodic boundary conditions. This is `reference[second] -
    /// query[first] + cell_shift * L` where `L` are the box lengths.
    pub vector: Vector3D,
    /// How many box lengths were applied to the reference point to create
    /// this pair. This is always zero for non-periodic neighbor lists.
    pub cell_shift: [i32; 3],
}

/// Parameters of a neighbor search
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NeighborListOptions {
    /// Spherical cutoff to use to determine if two points are neighbors.
    /// Pairs are included if their distance is strictly below the cutoff.
    pub cutoff: f64,
    /// Should individual points be considered their own neighbor in a
    /// self-search? Setting this to `true` will add "self pairs", i.e. pairs
    /// between a point and itself, with the distance 0. This is required for
    /// density-like kernel sums. This has no effect on cross-searches.
    #[serde(default)]
    pub self_pairs: bool,
    /// Additional distance searched beyond the cutoff. Pairs between
    /// `cutoff` and `cutoff + skin` are not reported, but they are kept to
    /// re-validate the list in [`NeighborList::update`] while no point moved
    /// by more than `skin / 2`.
    #[serde(default)]
    pub skin: f64,
}

impl NeighborListOptions {
    /// Create options with the given `cutoff`, without self pairs and without
    /// skin
    pub fn new(cutoff: f64) -> NeighborListOptions {
        NeighborListOptions { cutoff: cutoff, self_pairs: false, skin: 0.0 }
    }

    /// Create options from their JSON representation
    pub fn from_json(json: &str) -> Result<NeighborListOptions, Error> {
        let options: NeighborListOptions = serde_json::from_str(json)?;
        options.validate()?;
        return Ok(options);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "neighbor list cutoff must be a positive number, got {}", self.cutoff
            )));
        }

        if !(self.skin >= 0.0 && self.skin.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "neighbor list skin must be a positive number or zero, got {}", self.skin
            )));
        }
        Ok(())
    }

    /// Distance used when searching for pairs, `cutoff + skin`
    pub fn search_radius(&self) -> f64 {
        self.cutoff + self.skin
    }
}

/// Convert a `N x D` array to a list of `Vector3D`, checking that all values
/// are finite.
pub(crate) fn to_vectors(points: &ArrayView2<f64>, name: &str) -> Result<Vec<Vector3D>, Error> {
    if points.ncols() != 2 && points.ncols() != 3 {
        return Err(Error::ShapeMismatch(format!(
            "{} must be 2 or 3 dimensional, got {} columns", name, points.ncols()
        )));
    }

    let mut vectors = Vec::with_capacity(points.nrows());
    for (i, row) in points.outer_iter().enumerate() {
        if row.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "{} contain non-finite coordinates for point {}", name, i
            )));
        }
        vectors.push(Vector3D::from_row(row));
    }
    return Ok(vectors);
}

/// Pair found by the raw search, before mapping image indexes back to the
/// original points
#[derive(Debug, Clone, Copy)]
struct RawPair {
    second: usize,
    distance: f64,
    vector: Vector3D,
}

/// Find all pairs between `query` and `reference` with a distance below
/// `cutoff`. If `identity` is `Some`, the query point `i` is the same point as
/// the reference point `i`, and the pair is only included if `identity` is
/// `Some(true)`.
fn search<F>(
    query: &[Vector3D],
    reference: &[Vector3D],
    dimension: usize,
    cutoff: f64,
    identity: Option<bool>,
    keep: F,
) -> Vec<Vec<RawPair>> where F: Fn(usize, usize) -> bool + Sync {
    let cutoff2 = cutoff * cutoff;

    let check = |i: usize, j: usize, pairs: &mut Vec<RawPair>| {
        if let Some(self_pairs) = identity {
            if i == j {
                if self_pairs && keep(i, j) {
                    pairs.push(RawPair { second: j, distance: 0.0, vector: Vector3D::zero() });
                }
                return;
            }
        }

        let vector = reference[j] - query[i];
        let distance2 = vector.norm2();
        if distance2 < cutoff2 && keep(i, j) {
            pairs.push(RawPair { second: j, distance: distance2.sqrt(), vector: vector });
        }
    };

    if query.len() * reference.len() <= BRUTE_FORCE_MAX_PAIRS {
        return (0..query.len()).map(|i| {
            let mut pairs = Vec::new();
            for j in 0..reference.len() {
                check(i, j, &mut pairs);
            }
            pairs
        }).collect();
    }

    let cell_list = CellList::new(reference, dimension, cutoff);
    return (0..query.len()).into_par_iter().map(|i| {
        let mut pairs = Vec::new();
        cell_list.for_each_candidate(query[i], |j| check(i, j, &mut pairs));
        pairs.sort_unstable_by_key(|pair| pair.second);
        pairs
    }).collect();
}

/// Neighbor list mapping each point in a query set to the points of a
/// reference set within a cutoff distance.
///
/// The list can be built over a single set of points (self-search, the query
/// and reference sets are the same), or between two sets (cross-search).
/// Periodic neighbor lists ([`NeighborList::periodic`]) use ghost images of the
/// reference points, but report pairs with the index of the original
/// reference point and the corresponding cell shift.
///
/// For self-searches, the list is "full": if `j` is a neighbor of `i`, then
/// `i` is also a neighbor of `j`.
///
/// A neighbor list is never modified after creation, [`NeighborList::update`]
/// creates a new list.
#[derive(Debug, Clone)]
pub struct NeighborList {
    options: NeighborListOptions,
    filter: PairFilter,
    /// pairs associated with each query point, sorted by reference index
    pairs: Vec<Vec<Pair>>,
    /// positions of the query points used to build this list
    query_positions: Arc<Array2<f64>>,
    /// positions of the reference points used to build this list, `None` for
    /// self-searches
    reference_positions: Option<Arc<Array2<f64>>>,
    /// simulation box, for periodic neighbor lists
    domain: Option<SimulationBox>,
    /// pairs found by the last full search, `None` if the skin is zero
    candidates: Option<Arc<Candidates>>,
    /// was this list created by [`NeighborList::partition`]?
    partitioned: bool,
}

/// All pairs within `cutoff + skin` found by a full search, together with the
/// positions used for this search
#[derive(Debug)]
struct Candidates {
    pairs: Vec<Vec<Pair>>,
    query_positions: Arc<Array2<f64>>,
    reference_positions: Option<Arc<Array2<f64>>>,
}

impl NeighborList {
    /// Build a neighbor list over a single set of `points`
    pub fn new(points: ArrayView2<f64>, options: NeighborListOptions) -> Result<NeighborList, Error> {
        NeighborList::with_filter(points, None, options, PairFilter::KeepAll)
    }

    /// Build a neighbor list between `query` and `reference` points. The two
    /// sets are considered disjoint, so `self_pairs` has no effect.
    pub fn cross(query: ArrayView2<f64>, reference: ArrayView2<f64>, options: NeighborListOptions) -> Result<NeighborList, Error> {
        NeighborList::with_filter(query, Some(reference), options, PairFilter::KeepAll)
    }

    /// Build a neighbor list (self-search if `reference` is `None`, and
    /// cross-search otherwise), only keeping the pairs allowed by `filter`.
    #[time_graph::instrument(name = "NeighborList::new")]
    pub fn with_filter(
        query: ArrayView2<f64>,
        reference: Option<ArrayView2<f64>>,
        options: NeighborListOptions,
        filter: PairFilter,
    ) -> Result<NeighborList, Error> {
        options.validate()?;

        let query_vectors = to_vectors(&query, "query points")?;
        let dimension = query.ncols();

        let (reference_vectors, identity) = match reference {
            Some(reference) => {
                if reference.ncols() != dimension {
                    return Err(Error::ShapeMismatch(format!(
                        "query points have {} dimensions but reference points have {}",
                        dimension, reference.ncols()
                    )));
                }
                (to_vectors(&reference, "reference points")?, None)
            }
            None => (query_vectors.clone(), Some(options.self_pairs)),
        };

        filter.validate(query_vectors.len(), reference_vectors.len())?;

        let raw = search(
            &query_vectors,
            &reference_vectors,
            dimension,
            options.search_radius(),
            identity,
            |i, j| filter.keep(i, j),
        );

        let found = raw.into_iter().enumerate().map(|(first, pairs)| {
            pairs.into_iter().map(|pair| Pair {
                first: first,
                second: pair.second,
                distance: pair.distance,
                vector: pair.vector,
                cell_shift: [0, 0, 0],
            }).collect()
        }).collect();

        return Ok(NeighborList::from_search(
            options,
            filter,
            found,
            Arc::new(query.to_owned()),
            reference.map(|r| Arc::new(r.to_owned())),
            None,
        ));
    }

    /// Create a neighbor list from all the pairs `found` within the search
    /// radius of `options`.
    fn from_search(
        options: NeighborListOptions,
        filter: PairFilter,
        found: Vec<Vec<Pair>>,
        query_positions: Arc<Array2<f64>>,
        reference_positions: Option<Arc<Array2<f64>>>,
        domain: Option<SimulationBox>,
    ) -> NeighborList {
        let (pairs, candidates) = if options.skin > 0.0 {
            let pairs = within_cutoff(&found, options.cutoff);
            let candidates = Candidates {
                pairs: found,
                query_positions: Arc::clone(&query_positions),
                reference_positions: reference_positions.clone(),
            };
            (pairs, Some(Arc::new(candidates)))
        } else {
            (found, None)
        };

        let list = NeighborList {
            options: options,
            filter: filter,
            pairs: pairs,
            query_positions: query_positions,
            reference_positions: reference_positions,
            domain: domain,
            candidates: candidates,
            partitioned: false,
        };
        list.warn_close_pairs();

        return list;
    }

    fn warn_close_pairs(&self) {
        let threshold = 1e-3 * self.options.cutoff;
        let n_close = self.iter()
            .filter(|pair| !self.is_self_pair(pair) && pair.distance < threshold)
            .count();

        if n_close != 0 {
            warn!(
                "{} pairs of points are very close to one another (less than {})",
                n_close, threshold
            );
        }
    }

    /// Is this pair between a point and itself (as opposed to between a point
    /// and another point, or between a point and its own periodic image)?
    fn is_self_pair(&self, pair: &Pair) -> bool {
        self.is_self_search() && pair.first == pair.second && pair.cell_shift == [0, 0, 0]
    }

    /// Get the cutoff used to create this neighbor list
    pub fn cutoff(&self) -> f64 {
        self.options.cutoff
    }

    /// Get the options used to create this neighbor list
    pub fn options(&self) -> &NeighborListOptions {
        &self.options
    }

    /// Is this list the result of a self-search?
    pub fn is_self_search(&self) -> bool {
        self.reference_positions.is_none()
    }

    /// Is this list built with periodic boundary conditions?
    pub fn is_periodic(&self) -> bool {
        self.domain.is_some()
    }

    /// Simulation box used for periodic neighbor lists
    pub fn domain(&self) -> Option<&SimulationBox> {
        self.domain.as_ref()
    }

    /// Number of query points
    pub fn n_query(&self) -> usize {
        self.pairs.len()
    }

    /// Number of reference points
    pub fn n_reference(&self) -> usize {
        match self.reference_positions {
            Some(ref positions) => positions.nrows(),
            None => self.query_positions.nrows(),
        }
    }

    /// Positions of the query points used to build this list
    pub fn query_positions(&self) -> ArrayView2<'_, f64> {
        self.query_positions.view()
    }

    /// Positions of the reference points used to build this list
    pub fn reference_positions(&self) -> ArrayView2<'_, f64> {
        match self.reference_positions {
            Some(ref positions) => positions.view(),
            None => self.query_positions.view(),
        }
    }

    /// Get all pairs involving the query point `query`
    pub fn pairs(&self, query: usize) -> &[Pair] {
        &self.pairs[query]
    }

    /// Get the indexes of the reference points within the cutoff of the query
    /// point `query`
    pub fn neighbors(&self, query: usize) -> Vec<usize> {
        self.pairs[query].iter().map(|pair| pair.second).collect()
    }

    /// Get the distances to the reference points within the cutoff of the
    /// query point `query`, in the same order as [`NeighborList::neighbors`]
    pub fn distances(&self, query: usize) -> Vec<f64> {
        self.pairs[query].iter().map(|pair| pair.distance).collect()
    }

    /// Iterate over all pairs in this neighbor list
    pub fn iter(&self) -> impl Iterator<Item = &Pair> + '_ {
        self.pairs.iter().flatten()
    }

    /// Total number of pairs in this list
    pub fn n_pairs(&self) -> usize {
        self.pairs.iter().map(Vec::len).sum()
    }

    /// Number of neighbors of each query point
    pub fn neighbor_counts(&self) -> Vec<usize> {
        self.pairs.iter().map(Vec::len).collect()
    }

    /// Maximal number of neighbors of a query point
    pub fn max_neighbors(&self) -> usize {
        self.pairs.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Average number of neighbors per query point
    pub fn mean_neighbors(&self) -> f64 {
        if self.pairs.is_empty() {
            return 0.0;
        }
        self.n_pairs() as f64 / self.pairs.len() as f64
    }

    /// Minimal distance between two distinct points in this list, ignoring
    /// self pairs. Returns `None` if the list contains no such pair.
    pub fn min_distance(&self) -> Option<f64> {
        self.iter()
            .filter(|pair| !self.is_self_pair(pair))
            .map(|pair| pair.distance)
            .min_by(f64::total_cmp)
    }

    /// Natural radius of the particles, taken as half of the minimal distance
    /// between two distinct points.
    pub fn particle_radius(&self) -> Option<f64> {
        self.min_distance().map(|distance| 0.5 * distance)
    }

    /// Create a new list sharing the positions with this one, containing a
    /// subset of the pairs
    fn with_pairs(&self, pairs: Vec<Vec<Pair>>) -> NeighborList {
        NeighborList {
            options: self.options,
            filter: self.filter.clone(),
            pairs: pairs,
            query_positions: Arc::clone(&self.query_positions),
            reference_positions: self.reference_positions.clone(),
            domain: self.domain,
            candidates: None,
            partitioned: true,
        }
    }
}

/// Keep only the pairs strictly below `cutoff`
fn within_cutoff(pairs: &[Vec<Pair>], cutoff: f64) -> Vec<Vec<Pair>> {
    pairs.iter().map(|pairs| {
        pairs.iter().filter(|pair| pair.distance < cutoff).copied().collect()
    }).collect()
}
