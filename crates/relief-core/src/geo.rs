//! Coordinate helpers: planar distance and geohash cells.

use serde::{Deserialize, Serialize};

const GEOHASH_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Geohash precision used for disaster bucketing and identifiers.
pub const DISASTER_CELL_PRECISION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Euclidean distance measured directly in degrees.
    ///
    /// No geodesic correction is applied, so one unit of longitude counts the
    /// same as one unit of latitude everywhere on the globe.
    pub fn planar_distance(&self, other: &Coordinates) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    pub fn geohash(&self, precision: usize) -> String {
        encode_geohash(self.latitude, self.longitude, precision)
    }

    /// Cell key shared by every disaster reported in the same neighbourhood.
    pub fn disaster_cell(&self) -> String {
        self.geohash(DISASTER_CELL_PRECISION)
    }
}

pub fn encode_geohash(latitude: f64, longitude: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut even_bit = true;
    let mut bits = 0u8;
    let mut index = 0usize;

    while hash.len() < precision {
        let (range, value) = if even_bit {
            (&mut lon_range, longitude)
        } else {
            (&mut lat_range, latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        index <<= 1;
        if value >= mid {
            index |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even_bit = !even_bit;

        bits += 1;
        if bits == 5 {
            hash.push(GEOHASH_ALPHABET[index] as char);
            bits = 0;
            index = 0;
        }
    }

    hash
}
