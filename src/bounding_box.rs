use anyhow::{ensure, Result};

/// A geographic bounding box in degrees, min/max per axis.
///
/// # Example
/// ```rust
/// # use osm_overlay::GeoBoundingBox;
/// let berlin_mitte = GeoBoundingBox::new(13.3, 13.5, 52.5, 52.6);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBoundingBox {
    /// Create a new bounding box from the specified boundaries in degrees.
    ///
    /// # Panics
    /// Panics if a minimum exceeds its maximum, if the longitudes aren't in
    /// the closed range [-180, 180] or the latitudes aren't in [-90, 90].
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        assert!(min_lon <= max_lon);
        assert!(min_lat <= max_lat);
        assert!((-180_f64..=180_f64).contains(&min_lon));
        assert!((-180_f64..=180_f64).contains(&max_lon));
        assert!((-90_f64..=90_f64).contains(&min_lat));
        assert!((-90_f64..=90_f64).contains(&max_lat));

        GeoBoundingBox {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// The smallest box enclosing every `(lon, lat)` pair in `coords`.
    ///
    /// Fails on an empty list and on coordinates outside the valid lon/lat
    /// range (a NaN anywhere in the input counts as out of range).
    pub fn from_coords(coords: &[(f64, f64)]) -> Result<Self> {
        ensure!(
            !coords.is_empty(),
            "cannot derive a bounding box from an empty coordinate list"
        );

        let (mut min_lon, mut min_lat) = coords[0];
        let (mut max_lon, mut max_lat) = coords[0];

        for &(lon, lat) in coords {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }

        ensure!(
            min_lon >= -180_f64
                && max_lon <= 180_f64
                && min_lat >= -90_f64
                && max_lat <= 90_f64,
            "coordinates outside the valid lon/lat range: lon {min_lon}..{max_lon}, lat {min_lat}..{max_lat}",
        );

        Ok(GeoBoundingBox {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        })
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}
