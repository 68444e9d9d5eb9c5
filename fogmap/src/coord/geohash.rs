//! Geohash encoding for spatial bucket keys.
//!
//! Regions carry a geohash so that future queries can bucket by prefix.
//! Precision 7 cells are roughly 153m × 153m, close to the default
//! exploration radius.

/// Default geohash precision used for visited regions.
pub const DEFAULT_GEOHASH_PRECISION: usize = 7;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode a coordinate as a geohash string of `precision` characters.
///
/// Coordinates outside the valid range are clamped. A precision of zero
/// yields an empty string.
pub fn encode(lat: f64, lon: f64, precision: usize) -> String {
    let lat = lat.clamp(-90.0, 90.0);
    let lon = lon.clamp(-180.0, 180.0);

    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);

    let mut even_bit = true;
    let mut bit = 0;
    let mut idx = 0usize;

    while hash.len() < precision {
        // Bits alternate longitude, latitude, starting with longitude
        let (range, value) = if even_bit {
            (&mut lon_range, lon)
        } else {
            (&mut lat_range, lat)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            idx = (idx << 1) | 1;
            range.0 = mid;
        } else {
            idx <<= 1;
            range.1 = mid;
        }
        even_bit = !even_bit;

        bit += 1;
        if bit == 5 {
            hash.push(BASE32[idx] as char);
            bit = 0;
            idx = 0;
        }
    }

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_geohash() {
        // Reference value for 57.64911, 10.40744
        assert_eq!(encode(57.64911, 10.40744, 11), "u4pruydqqvj");
    }

    #[test]
    fn test_precision_controls_length() {
        assert_eq!(encode(41.0082, 28.9784, 7).len(), 7);
        assert_eq!(encode(41.0082, 28.9784, 0), "");
    }

    #[test]
    fn test_nearby_points_share_prefix() {
        let a = encode(41.0082, 28.9784, 7);
        let b = encode(41.0083, 28.9785, 7);
        assert_eq!(&a[..5], &b[..5]);
    }

    #[test]
    fn test_origin() {
        assert_eq!(encode(0.0, 0.0, 5), "s0000");
    }
}
