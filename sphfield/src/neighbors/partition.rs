use std::collections::BTreeMap;

use crate::Error;
use super::{NeighborList, Pair};

/// Neighbor list split according to the type of the points in each pair.
///
/// All sub-lists share the query indexing of the parent list: they contain
/// one (possibly empty) set of pairs for every query point. They should not
/// be updated on their own, but re-created by partitioning an updated parent
/// list.
#[derive(Debug, Clone)]
pub struct TypePartition {
    by_types: BTreeMap<(i32, i32), NeighborList>,
    same_type: NeighborList,
    cross_type: NeighborList,
}

impl TypePartition {
    /// Get the neighbor list containing pairs between query points of type
    /// `query` and reference points of type `reference`, if any such pair
    /// exists.
    pub fn get(&self, query: i32, reference: i32) -> Option<&NeighborList> {
        self.by_types.get(&(query, reference))
    }

    /// Get all pairs of types `(query, reference)` with at least one pair
    pub fn types(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.by_types.keys().copied()
    }

    /// Neighbor list containing only pairs between points of the same type
    pub fn same_type(&self) -> &NeighborList {
        &self.same_type
    }

    /// Neighbor list containing only pairs between points of different types
    pub fn cross_type(&self) -> &NeighborList {
        &self.cross_type
    }
}

impl NeighborList {
    /// Split this neighbor list according to the type of the points in each
    /// pair, without re-computing any distance.
    ///
    /// `reference_types` must be `None` for self-searches (the query types are
    /// used for both sides of the pair), and is required for cross-searches.
    pub fn partition(&self, query_types: &[i32], reference_types: Option<&[i32]>) -> Result<TypePartition, Error> {
        if query_types.len() != self.n_query() {
            return Err(Error::ShapeMismatch(format!(
                "expected {} query types, got {}", self.n_query(), query_types.len()
            )));
        }

        let reference_types = match (self.is_self_search(), reference_types) {
            (true, None) => query_types,
            (false, Some(types)) => {
                if types.len() != self.n_reference() {
                    return Err(Error::ShapeMismatch(format!(
                        "expected {} reference types, got {}", self.n_reference(), types.len()
                    )));
                }
                types
            }
            (true, Some(_)) => {
                return Err(Error::InvalidParameter(
                    "can not give reference types when partitioning a self neighbor list".into()
                ));
            }
            (false, None) => {
                return Err(Error::InvalidParameter(
                    "missing reference types when partitioning a cross neighbor list".into()
                ));
            }
        };

        let empty = || vec![Vec::<Pair>::new(); self.n_query()];

        let mut by_types = BTreeMap::new();
        let mut same_type = empty();
        let mut cross_type = empty();
        for pair in self.iter() {
            let types = (query_types[pair.first], reference_types[pair.second]);
            by_types.entry(types).or_insert_with(empty)[pair.first].push(*pair);

            if types.0 == types.1 {
                same_type[pair.first].push(*pair);
            } else {
                cross_type[pair.first].push(*pair);
            }
        }

        return Ok(TypePartition {
            by_types: by_types.into_iter()
                .map(|(types, pairs)| (types, self.with_pairs(pairs)))
                .collect(),
            same_type: self.with_pairs(same_type),
            cross_type: self.with_pairs(cross_type),
        });
    }
}
