use std::collections::HashSet;

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};

use crate::Error;
use super::SimulationBox;

/// Which side of the box a point is close to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Close to the `lo` face, the image is translated by `+L`
    Low,
    /// Close to the `hi` face, the image is translated by `-L`
    High,
}

impl Side {
    fn shift(self) -> i32 {
        match self {
            Side::Low => 1,
            Side::High => -1,
        }
    }
}

/// Kind of periodic copy. Together with the cell shift of an image, this
/// identifies the face/edge/corner combination that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Translated along a single periodic dimension
    Face,
    /// Translated along two periodic dimensions of a 3D box
    Edge,
    /// Translated along all dimensions of a fully periodic box
    Corner,
}

/// Cutoff used to select points close to the box faces, either the same for
/// all dimensions or one value per dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageCutoff {
    Uniform(f64),
    PerDimension([f64; 3]),
}

impl ImageCutoff {
    fn get(&self, dimension: usize) -> f64 {
        match self {
            ImageCutoff::Uniform(cutoff) => *cutoff,
            ImageCutoff::PerDimension(cutoffs) => cutoffs[dimension],
        }
    }
}

impl From<f64> for ImageCutoff {
    fn from(cutoff: f64) -> ImageCutoff {
        ImageCutoff::Uniform(cutoff)
    }
}

impl From<[f64; 2]> for ImageCutoff {
    fn from(cutoff: [f64; 2]) -> ImageCutoff {
        ImageCutoff::PerDimension([cutoff[0], cutoff[1], 0.0])
    }
}

impl From<[f64; 3]> for ImageCutoff {
    fn from(cutoff: [f64; 3]) -> ImageCutoff {
        ImageCutoff::PerDimension(cutoff)
    }
}

/// Ghost copies of points close to the periodic boundaries of a box.
///
/// Each image has a position outside of the primary cell, the index of the
/// point it was copied from, the number of box lengths it was shifted by along
/// each dimension, and the kind of copy (face, edge or corner).
#[derive(Debug, Clone)]
pub struct Images {
    positions: Array2<f64>,
    sources: Vec<usize>,
    shifts: Vec<[i32; 3]>,
    kinds: Vec<ImageKind>,
}

impl Images {
    /// Number of images
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Are there no images at all?
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Positions of the images, as a `N_images x D` array
    pub fn positions(&self) -> ArrayView2<'_, f64> {
        self.positions.view()
    }

    /// Index of the source point for each image
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Number of box lengths each image was translated by, along each
    /// dimension
    pub fn shifts(&self) -> &[[i32; 3]] {
        &self.shifts
    }

    /// Kind of copy for each image
    pub fn kinds(&self) -> &[ImageKind] {
        &self.kinds
    }

    /// Number of images of the given kind
    pub fn count(&self, kind: ImageKind) -> usize {
        self.kinds.iter().filter(|&&k| k == kind).count()
    }

    /// Stack the original `points` and the images in a single array. The
    /// first `points.nrows()` rows are the original points, and the image `i`
    /// is at row `points.nrows() + i`.
    pub fn extend(&self, points: ArrayView2<f64>) -> Result<Array2<f64>, Error> {
        if points.ncols() != self.positions.ncols() {
            return Err(Error::ShapeMismatch(format!(
                "points have {} columns but images have {}", points.ncols(), self.positions.ncols()
            )));
        }
        Ok(ndarray::concatenate(Axis(0), &[points.view(), self.positions.view()])?)
    }

    /// Map an index in the array created by [`Images::extend`] back to the
    /// index of the corresponding original point.
    pub fn source_of(&self, n_points: usize, index: usize) -> usize {
        if index < n_points {
            index
        } else {
            self.sources[index - n_points]
        }
    }
}

/// Accumulate images while generating them, keeping only the first image at a
/// given position.
struct ImagesBuilder {
    dimension: usize,
    data: Vec<f64>,
    sources: Vec<usize>,
    shifts: Vec<[i32; 3]>,
    kinds: Vec<ImageKind>,
    seen: HashSet<[u64; 3]>,
    duplicated: usize,
}

impl ImagesBuilder {
    fn new(dimension: usize) -> ImagesBuilder {
        ImagesBuilder {
            dimension: dimension,
            data: Vec::new(),
            sources: Vec::new(),
            shifts: Vec::new(),
            kinds: Vec::new(),
            seen: HashSet::new(),
            duplicated: 0,
        }
    }

    fn push(&mut self, position: [f64; 3], source: usize, shift: [i32; 3], kind: ImageKind) {
        // adding 0.0 maps -0.0 to 0.0, making the bit patterns comparable
        let key = [
            (position[0] + 0.0).to_bits(),
            (position[1] + 0.0).to_bits(),
            (position[2] + 0.0).to_bits(),
        ];

        if !self.seen.insert(key) {
            self.duplicated += 1;
            return;
        }

        self.data.extend_from_slice(&position[..self.dimension]);
        self.sources.push(source);
        self.shifts.push(shift);
        self.kinds.push(kind);
    }

    /// Add images translated along all the dimensions in `subset` at once,
    /// for every combination of low/high sides.
    fn add_images(
        &mut self,
        domain: &SimulationBox,
        points: &ArrayView2<f64>,
        cutoff: &ImageCutoff,
        subset: &[usize],
        kind: ImageKind,
    ) {
        let n_combinations = 1_usize << subset.len();
        for combination in 0..n_combinations {
            let sides = subset.iter().enumerate().map(|(bit, &dimension)| {
                let side = if combination & (1 << bit) == 0 { Side::Low } else { Side::High };
                (dimension, side)
            }).collect::<Vec<_>>();

            let mut shift = [0; 3];
            for &(dimension, side) in &sides {
                shift[dimension] = side.shift();
            }

            for (index, row) in points.outer_iter().enumerate() {
                let selected = sides.iter().all(|&(dimension, side)| {
                    let x = row[dimension];
                    match side {
                        Side::Low => x - domain.lo[dimension] <= cutoff.get(dimension),
                        Side::High => domain.hi[dimension] - x <= cutoff.get(dimension),
                    }
                });

                if !selected {
                    continue;
                }

                let mut position = [0.0; 3];
                for (dimension, &x) in row.iter().enumerate() {
                    position[dimension] = x + shift[dimension] as f64 * domain.length(dimension);
                }
                self.push(position, index, shift, kind);
            }
        }
    }

    fn finish(self) -> Result<Images, Error> {
        if self.duplicated != 0 {
            debug!("removed {} duplicated periodic images", self.duplicated);
        }

        let n_images = self.sources.len();
        let positions = Array2::from_shape_vec((n_images, self.dimension), self.data)?;
        Ok(Images {
            positions: positions,
            sources: self.sources,
            shifts: self.shifts,
            kinds: self.kinds,
        })
    }
}

impl SimulationBox {
    /// Generate the periodic images of `points` needed so that a neighbor
    /// search with the given `cutoff` sees points across periodic boundaries.
    ///
    /// All points must be inside the box (see [`SimulationBox::incell`]),
    /// otherwise this function returns [`Error::OutsideBox`]. The cutoff must
    /// be positive, and at most half of the box length along periodic
    /// dimensions, since only a single layer of images is generated.
    ///
    /// Face images are generated for each periodic dimension; edge images for
    /// each pair of periodic dimensions in 3D; and corner images when all
    /// dimensions are periodic. Images at the exact same position are only
    /// included once.
    #[time_graph::instrument(name = "SimulationBox::images")]
    pub fn images(&self, points: ArrayView2<f64>, cutoff: impl Into<ImageCutoff>) -> Result<Images, Error> {
        let cutoff = cutoff.into();
        self.check_inside(points)?;

        let periodic = (0..self.dimension).filter(|&i| self.periodic[i]).collect::<Vec<_>>();
        for i in 0..self.dimension {
            let value = cutoff.get(i);
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "image cutoff must be a positive number, got {} along dimension {}", value, i
                )));
            }

            if self.periodic[i] && value > 0.5 * self.length(i) {
                return Err(Error::InvalidParameter(format!(
                    "image cutoff ({}) is larger than half of the box length ({}) along \
                    dimension {}, multiple images would be required", value, self.length(i), i
                )));
            }
        }

        let mut builder = ImagesBuilder::new(self.dimension);

        for &dimension in &periodic {
            builder.add_images(self, &points, &cutoff, &[dimension], ImageKind::Face);
        }

        if periodic.len() == self.dimension {
            builder.add_images(self, &points, &cutoff, &periodic, ImageKind::Corner);
        }

        if self.dimension == 3 && periodic.len() >= 2 {
            for (a, &first) in periodic.iter().enumerate() {
                for &second in &periodic[(a + 1)..] {
                    builder.add_images(self, &points, &cutoff, &[first, second], ImageKind::Edge);
                }
            }
        }

        let images = builder.finish()?;
        debug!(
            "generated {} periodic images ({} face, {} edge, {} corner) for {} points",
            images.len(),
            images.count(ImageKind::Face),
            images.count(ImageKind::Edge),
            images.count(ImageKind::Corner),
            points.nrows(),
        );

        return Ok(images);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn faces_and_corners_2d() {
        let domain = SimulationBox::square(1.0, true);
        let points = array![
            [0.05, 0.5],
            [0.5, 0.95],
            [0.02, 0.03],
            [0.5, 0.5],
        ];

        let images = domain.images(points.view(), 0.1).unwrap();
        assert_eq!(images.count(ImageKind::Face), 4);
        assert_eq!(images.count(ImageKind::Corner), 1);
        assert_eq!(images.count(ImageKind::Edge), 0);
        assert_eq!(images.len(), 5);

        assert_relative_eq!(images.positions(), array![
            [1.05, 0.5],
            [1.02, 0.03],
            [0.02, 1.03],
            [0.5, -0.05],
            [1.02, 1.03],
        ], epsilon = 1e-12);
        assert_eq!(images.sources(), &[0, 2, 2, 1, 2]);
        assert_eq!(images.shifts(), &[[1, 0, 0], [1, 0, 0], [0, 1, 0], [0, -1, 0], [1, 1, 0]]);
        assert_eq!(images.kinds(), &[
            ImageKind::Face, ImageKind::Face, ImageKind::Face, ImageKind::Face, ImageKind::Corner
        ]);
    }

    #[test]
    fn partially_periodic() {
        let domain = SimulationBox::new(&[0.0, 0.0], &[1.0, 1.0], &[true, false]).unwrap();
        let points = array![[0.02, 0.03], [0.99, 0.98]];

        let images = domain.images(points.view(), 0.1).unwrap();
        // no corners when some dimensions are not periodic
        assert_eq!(images.len(), 2);
        assert_eq!(images.count(ImageKind::Face), 2);
        assert_eq!(images.shifts(), &[[1, 0, 0], [-1, 0, 0]]);
    }

    #[test]
    fn edges_3d() {
        let domain = SimulationBox::new(&[0.0; 3], &[1.0; 3], &[true, true, false]).unwrap();
        let points = array![[0.01, 0.01, 0.5]];

        let images = domain.images(points.view(), 0.1).unwrap();
        assert_eq!(images.count(ImageKind::Face), 2);
        assert_eq!(images.count(ImageKind::Edge), 1);
        assert_eq!(images.count(ImageKind::Corner), 0);
        assert_eq!(images.shifts()[2], [1, 1, 0]);

        let domain = SimulationBox::cubic(1.0, true);
        let images = domain.images(array![[0.01, 0.01, 0.01]].view(), 0.1).unwrap();
        assert_eq!(images.count(ImageKind::Face), 3);
        assert_eq!(images.count(ImageKind::Corner), 1);
        assert_eq!(images.count(ImageKind::Edge), 3);
    }

    #[test]
    fn per_dimension_cutoff() {
        let domain = SimulationBox::square(1.0, true);
        let points = array![[0.15, 0.15]];

        let images = domain.images(points.view(), [0.2, 0.1]).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images.shifts(), &[[1, 0, 0]]);
    }

    #[test]
    fn duplicated_points() {
        let domain = SimulationBox::square(1.0, true);
        let points = array![[0.05, 0.5], [0.05, 0.5]];

        let images = domain.images(points.view(), 0.1).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images.sources(), &[0]);
    }

    #[test]
    fn extend() {
        let domain = SimulationBox::square(1.0, true);
        let points = array![[0.05, 0.5], [0.5, 0.5]];
        let images = domain.images(points.view(), 0.1).unwrap();

        let all = images.extend(points.view()).unwrap();
        assert_eq!(all.nrows(), 3);
        assert_eq!(images.source_of(2, 1), 1);
        assert_eq!(images.source_of(2, 2), 0);
    }

    #[test]
    fn preconditions() {
        let domain = SimulationBox::square(1.0, true);

        let error = domain.images(array![[1.5, 0.5]].view(), 0.1).unwrap_err();
        assert!(matches!(error, Error::OutsideBox { point: 0, dimension: 0, .. }));

        let error = domain.images(array![[0.5, 0.5]].view(), 0.6).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));

        let error = domain.images(array![[0.5, 0.5]].view(), -1.0).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));
    }
}
