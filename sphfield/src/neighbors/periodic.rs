use std::sync::Arc;

use ndarray::ArrayView2;

use crate::{Error, SimulationBox};
use super::{NeighborList, NeighborListOptions, Pair, PairFilter};
use super::{search, to_vectors};

impl NeighborList {
    /// Build a neighbor list over a single set of `points` inside `domain`,
    /// using periodic boundary conditions along the periodic dimensions of
    /// the box.
    ///
    /// All points must be inside the box (see [`SimulationBox::incell`]), and
    /// the search radius (`cutoff + skin`) must be at most half of the box
    /// length along all periodic dimensions.
    pub fn periodic(domain: &SimulationBox, points: ArrayView2<f64>, options: NeighborListOptions) -> Result<NeighborList, Error> {
        NeighborList::periodic_with_filter(domain, points, None, options, PairFilter::KeepAll)
    }

    /// Build a periodic neighbor list between `query` and `reference` points,
    /// both inside `domain`.
    pub fn periodic_cross(
        domain: &SimulationBox,
        query: ArrayView2<f64>,
        reference: ArrayView2<f64>,
        options: NeighborListOptions,
    ) -> Result<NeighborList, Error> {
        NeighborList::periodic_with_filter(domain, query, Some(reference), options, PairFilter::KeepAll)
    }

    /// Build a periodic neighbor list (self-search if `reference` is `None`,
    /// cross-search otherwise), only keeping the pairs allowed by `filter`.
    ///
    /// Ghost images of the reference points are generated close to the
    /// periodic faces of the box, and the pairs involving an image are
    /// reported with the index of the original reference point and the
    /// corresponding [`Pair::cell_shift`].
    #[time_graph::instrument(name = "NeighborList::periodic")]
    pub fn periodic_with_filter(
        domain: &SimulationBox,
        query: ArrayView2<f64>,
        reference: Option<ArrayView2<f64>>,
        options: NeighborListOptions,
        filter: PairFilter,
    ) -> Result<NeighborList, Error> {
        options.validate()?;

        domain.check_inside(query)?;
        let query_vectors = to_vectors(&query, "query points")?;

        let reference_view = match &reference {
            Some(reference) => {
                domain.check_inside(reference.view())?;
                reference.view()
            }
            None => query.view(),
        };
        let n_reference = reference_view.nrows();
        filter.validate(query.nrows(), n_reference)?;

        let images = domain.images(reference_view.view(), options.search_radius())?;
        let extended = images.extend(reference_view.view())?;
        let extended_vectors = to_vectors(&extended.view(), "reference points")?;

        let identity = if reference.is_none() {
            Some(options.self_pairs)
        } else {
            None
        };

        let raw = search(
            &query_vectors,
            &extended_vectors,
            domain.dimension(),
            options.search_radius(),
            identity,
            |i, j| filter.keep(i, images.source_of(n_reference, j)),
        );

        let found = raw.into_iter().enumerate().map(|(first, raw_pairs)| {
            let mut pairs = raw_pairs.into_iter().map(|pair| {
                let cell_shift = if pair.second < n_reference {
                    [0, 0, 0]
                } else {
                    images.shifts()[pair.second - n_reference]
                };

                Pair {
                    first: first,
                    second: images.source_of(n_reference, pair.second),
                    distance: pair.distance,
                    vector: pair.vector,
                    cell_shift: cell_shift,
                }
            }).collect::<Vec<_>>();

            pairs.sort_unstable_by_key(|pair| (pair.second, pair.cell_shift));
            pairs
        }).collect();

        return Ok(NeighborList::from_search(
            options,
            filter,
            found,
            Arc::new(query.to_owned()),
            reference.map(|r| Arc::new(r.to_owned())),
            Some(*domain),
        ));
    }
}
