use crate::Error;

/// Relation between the mask values of the two points in a pair, used by
/// [`PairFilter::Mask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRelation {
    /// both points have the same mask value
    Equal,
    /// the points have different mask values
    Different,
    /// both points have their mask set
    Both,
    /// at most one of the points has its mask set
    NotBoth,
}

impl MaskRelation {
    fn check(self, first: bool, second: bool) -> bool {
        match self {
            MaskRelation::Equal => first == second,
            MaskRelation::Different => first != second,
            MaskRelation::Both => first && second,
            MaskRelation::NotBoth => !(first && second),
        }
    }
}

/// Which pairs to keep when building a neighbor list.
///
/// The filter is stored inside the neighbor list, and applied again when the
/// list is rebuilt by [`NeighborList::update`](super::NeighborList::update).
/// For periodic lists, the filter sees the index of the original reference
/// point, not the index of the image.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PairFilter {
    /// Keep all pairs within the cutoff
    #[default]
    KeepAll,
    /// Caller-supplied boolean partition of both sets (e.g. "is this point
    /// part of the object"). A pair `(i, j)` is kept only if
    /// `relation(query[i], reference[j])` holds.
    Mask {
        query: Vec<bool>,
        reference: Vec<bool>,
        relation: MaskRelation,
    },
    /// Logical group of each point. Pairs where both points belong to the same
    /// group are ignored, which prevents an object from seeing itself (or its
    /// own periodic images) as a neighbor.
    DistinctGroups {
        query: Vec<usize>,
        reference: Vec<usize>,
    },
}

fn check_length(name: &str, actual: usize, expected: usize) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::ShapeMismatch(format!(
            "{} filter has {} entries, but there are {} points", name, actual, expected
        )));
    }
    Ok(())
}

impl PairFilter {
    /// Check that this filter can be used with `n_query` query points and
    /// `n_reference` reference points
    pub(crate) fn validate(&self, n_query: usize, n_reference: usize) -> Result<(), Error> {
        match self {
            PairFilter::KeepAll => Ok(()),
            PairFilter::Mask { query, reference, .. } => {
                check_length("query mask", query.len(), n_query)?;
                check_length("reference mask", reference.len(), n_reference)
            }
            PairFilter::DistinctGroups { query, reference } => {
                check_length("query groups", query.len(), n_query)?;
                check_length("reference groups", reference.len(), n_reference)
            }
        }
    }

    /// Should the pair between query point `first` and reference point
    /// `second` be kept?
    #[inline]
    pub(crate) fn keep(&self, first: usize, second: usize) -> bool {
        match self {
            PairFilter::KeepAll => true,
            PairFilter::Mask { query, reference, relation } => {
                relation.check(query[first], reference[second])
            }
            PairFilter::DistinctGroups { query, reference } => {
                query[first] != reference[second]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations() {
        assert!(MaskRelation::Equal.check(true, true));
        assert!(MaskRelation::Equal.check(false, false));
        assert!(!MaskRelation::Equal.check(true, false));

        assert!(MaskRelation::Different.check(false, true));
        assert!(!MaskRelation::Different.check(true, true));

        assert!(MaskRelation::Both.check(true, true));
        assert!(!MaskRelation::Both.check(true, false));

        assert!(MaskRelation::NotBoth.check(true, false));
        assert!(MaskRelation::NotBoth.check(false, false));
        assert!(!MaskRelation::NotBoth.check(true, true));
    }

    #[test]
    fn mask() {
        let filter = PairFilter::Mask {
            query: vec![true, false],
            reference: vec![false, true, true],
            relation: MaskRelation::Different,
        };

        filter.validate(2, 3).unwrap();
        assert!(filter.keep(0, 0));
        assert!(!filter.keep(0, 1));
        assert!(filter.keep(1, 2));

        let error = filter.validate(2, 4).unwrap_err();
        assert_eq!(error.to_string(), "shape mismatch: reference mask filter has 3 entries, but there are 4 points");
    }
}
