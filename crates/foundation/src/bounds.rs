/// Well-known spatial reference id (e.g. 4326, 3857).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpatialRef(pub u32);

/// Axis-aligned 2D extent tagged with the spatial reference it is expressed in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
    pub srid: SpatialRef,
}

impl Extent {
    pub fn new(min: [f64; 2], max: [f64; 2], srid: SpatialRef) -> Self {
        Extent { min, max, srid }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// An extent is degenerate when it encloses no area.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Extent, SpatialRef};

    #[test]
    fn width_and_height() {
        let e = Extent::new([0.0, 0.0], [4.0, 2.0], SpatialRef(3857));
        assert_eq!(e.width(), 4.0);
        assert_eq!(e.height(), 2.0);
        assert!(!e.is_degenerate());
    }

    #[test]
    fn inverted_extent_is_degenerate() {
        let e = Extent::new([4.0, 0.0], [0.0, 2.0], SpatialRef(3857));
        assert!(e.is_degenerate());
    }
}
