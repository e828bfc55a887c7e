//! Coarse geographic predicates used to skip sampling where the imagery
//! service is unreliable or the measurement is meaningless.
//!
//! The ocean boxes are hand-tuned rectangles, not coastlines. Small islands
//! inside a box are treated as open water and coastal water outside every box
//! is sampled normally.

/// Latitude (absolute, degrees) from which a point counts as polar.
pub const POLAR_LATITUDE: f64 = 80.1;

/// Inclusive lat/lon rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub name: &'static str,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(
        name: &'static str,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Self {
        Self {
            name,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

pub const OPEN_WATER: [BoundingBox; 7] = [
    BoundingBox::new("north_pacific", 5.0, 45.0, -175.0, -130.0),
    BoundingBox::new("north_atlantic", 25.0, 50.0, -60.0, -20.0),
    BoundingBox::new("bering_sea", 54.0, 62.0, -180.0, -170.0),
    BoundingBox::new("south_pacific", -60.0, -20.0, -160.0, -85.0),
    BoundingBox::new("southern_ocean", -65.0, -50.0, 150.0, 180.0),
    BoundingBox::new("indian_ocean", -40.0, -10.0, 60.0, 95.0),
    BoundingBox::new("siberian_sea", 73.0, 80.0, 150.0, 180.0),
];

pub fn is_polar(lat: f64) -> bool {
    lat.abs() >= POLAR_LATITUDE
}

pub fn is_open_water(lat: f64, lon: f64) -> bool {
    open_water_region(lat, lon).is_some()
}

/// The ocean box containing the point, if any.
pub fn open_water_region(lat: f64, lon: f64) -> Option<&'static BoundingBox> {
    OPEN_WATER.iter().find(|b| b.contains(lat, lon))
}

/// Which geofences a dataset family honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeofencePolicy {
    pub polar: bool,
    pub open_water: bool,
}

/// Why sampling was skipped for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    Polar,
    OpenWater(&'static str),
}

impl GeofencePolicy {
    pub const NONE: GeofencePolicy = GeofencePolicy {
        polar: false,
        open_water: false,
    };

    pub fn check(&self, lat: f64, lon: f64) -> Option<Fence> {
        if self.polar && is_polar(lat) {
            return Some(Fence::Polar);
        }
        if self.open_water {
            if let Some(region) = open_water_region(lat, lon) {
                return Some(Fence::OpenWater(region.name));
            }
        }
        None
    }
}
