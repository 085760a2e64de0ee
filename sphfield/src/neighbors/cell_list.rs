use ndarray::Array3;

use crate::Vector3D;

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a sparse set of points and a small cutoff
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// The cell list is used to sort reference points inside bins/cells of size
/// at least `cutoff`, covering the bounding box of the reference points.
///
/// Candidate neighbors of a query point are then found by looking through the
/// cell containing the query point and the neighboring cells (the number of
/// cells to search depends on the cutoff and the size of the cells).
#[derive(Debug, Clone)]
pub(crate) struct CellList {
    /// How many cells do we need to look at when searching neighbors to include
    /// all neighbors below cutoff
    n_search: [i64; 3],
    /// lower corner of the bounding box of the reference points
    origin: Vector3D,
    /// size of a single cell along each dimension
    cell_size: [f64; 3],
    /// the cells themselves, containing indexes of reference points
    cells: Array3<Vec<usize>>,
}

impl CellList {
    /// Create a new `CellList` containing all the `reference` points, with
    /// cells large enough for the given `cutoff`.
    pub fn new(reference: &[Vector3D], dimension: usize, cutoff: f64) -> CellList {
        assert!(cutoff > 0.0 && cutoff.is_finite());

        let mut min = Vector3D::zero();
        let mut max = Vector3D::zero();
        if let Some(first) = reference.first() {
            min = *first;
            max = *first;
        }

        for position in reference {
            for i in 0..dimension {
                min[i] = f64::min(min[i], position[i]);
                max[i] = f64::max(max[i], position[i]);
            }
        }

        let mut extent = [cutoff; 3];
        let mut n_cells = [1.0; 3];
        for i in 0..dimension {
            extent[i] = f64::max(max[i] - min[i], cutoff);
            n_cells[i] = f64::clamp(f64::trunc(extent[i] / cutoff), 1.0, f64::INFINITY);
        }

        assert!(n_cells[0].is_finite() && n_cells[1].is_finite() && n_cells[2].is_finite());

        // limit memory consumption by ensuring we have less than
        // `MAX_NUMBER_OF_CELLS` cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            if dimension == 2 {
                let ratio_x_y = n_cells[0] / n_cells[1];
                n_cells[1] = f64::max(f64::trunc(f64::sqrt(MAX_NUMBER_OF_CELLS / ratio_x_y)), 1.0);
                n_cells[0] = f64::max(f64::trunc(ratio_x_y * n_cells[1]), 1.0);
            } else {
                // set the total number of cells close to MAX_NUMBER_OF_CELLS,
                // while keeping roughly the ratio of cells in each direction
                let ratio_x_y = n_cells[0] / n_cells[1];
                let ratio_y_z = n_cells[1] / n_cells[2];

                n_cells[2] = f64::max(f64::trunc(f64::cbrt(MAX_NUMBER_OF_CELLS / (ratio_x_y * ratio_y_z * ratio_y_z))), 1.0);
                n_cells[1] = f64::max(f64::trunc(ratio_y_z * n_cells[2]), 1.0);
                n_cells[0] = f64::max(f64::trunc(ratio_x_y * n_cells[1]), 1.0);
            }
        }

        let cell_size = [
            extent[0] / n_cells[0],
            extent[1] / n_cells[1],
            extent[2] / n_cells[2],
        ];

        // number of cells to search in each direction to make sure all possible
        // pairs below the cutoff are accounted for. This is 1 unless rounding
        // made the cells slightly smaller than the cutoff.
        let mut n_search = [
            f64::ceil(cutoff / cell_size[0]) as i64,
            f64::ceil(cutoff / cell_size[1]) as i64,
            f64::ceil(cutoff / cell_size[2]) as i64,
        ];

        let n_cells = [
            n_cells[0] as usize,
            n_cells[1] as usize,
            n_cells[2] as usize,
        ];

        // query points can be outside of the bounding box of the reference
        // points, so we always look at the neighboring cells, even when there
        // is a single cell along a dimension
        for n in &mut n_search {
            *n = i64::max(*n, 1);
        }

        let mut cell_list = CellList {
            n_search: n_search,
            origin: min,
            cell_size: cell_size,
            cells: Array3::from_elem(n_cells, Vec::new()),
        };

        for (index, &position) in reference.iter().enumerate() {
            let cell = cell_list.cell_index(position);
            let cell = [
                i64::clamp(cell[0], 0, n_cells[0] as i64 - 1) as usize,
                i64::clamp(cell[1], 0, n_cells[1] as i64 - 1) as usize,
                i64::clamp(cell[2], 0, n_cells[2] as i64 - 1) as usize,
            ];
            cell_list.cells[cell].push(index);
        }

        return cell_list;
    }

    /// Get the index of the cell containing `position`. The index can be
    /// outside of the range of existing cells for points outside of the
    /// bounding box of reference points.
    fn cell_index(&self, position: Vector3D) -> [i64; 3] {
        let fractional = position - self.origin;
        [
            f64::floor(fractional[0] / self.cell_size[0]) as i64,
            f64::floor(fractional[1] / self.cell_size[1]) as i64,
            f64::floor(fractional[2] / self.cell_size[2]) as i64,
        ]
    }

    /// Call `function` with the index of all reference points which might be
    /// within the cutoff of `position`. Some of these points might be further
    /// than the cutoff, so additional filtering is required.
    pub fn for_each_candidate(&self, position: Vector3D, mut function: impl FnMut(usize)) {
        let shape = self.cells.shape();
        let cell = self.cell_index(position);

        let mut start = [0; 3];
        let mut stop = [0; 3];
        for i in 0..3 {
            start[i] = i64::max(cell[i] - self.n_search[i], 0);
            stop[i] = i64::min(cell[i] + self.n_search[i], shape[i] as i64 - 1);
            if start[i] > stop[i] {
                // the point is too far from all reference points
                return;
            }
        }

        for x in start[0]..=stop[0] {
            for y in start[1]..=stop[1] {
                for z in start[2]..=stop[2] {
                    for &index in &self.cells[[x as usize, y as usize, z as usize]] {
                        function(index);
                    }
                }
            }
        }
    }

    /// Total number of cells in this cell list
    #[cfg(test)]
    fn n_cells(&self) -> usize {
        self.cells.len()
    }
}
