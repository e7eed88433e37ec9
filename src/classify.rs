//! Pixel reclassification of raw product codes into semantic categories
//!
//! MOD14A2 fire mask codes:
//!
//! | code | meaning                    | class     |
//! |------|----------------------------|-----------|
//! | 0-2  | not processed              | uncertain |
//! | 3    | non-fire water             | uncertain |
//! | 4    | cloud                      | uncertain |
//! | 5    | non-fire land              | non-fire  |
//! | 6    | unknown                    | uncertain |
//! | 7    | fire, low confidence       | uncertain |
//! | 8    | fire, nominal confidence   | fire      |
//! | 9    | fire, high confidence      | fire      |
//!
//! MCD12Q1 land cover type 2 (UMD) codes are grouped into non-flammable (0), forest (1),
//! savanna (2), grassland (3) and cropland (4). Any other code, such as 255 for
//! unclassified, passes through unchanged.

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Semantic class of a fire-mask pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FireClass {
    /// Confident observation of no fire
    NonFire,
    /// Fire detected with nominal or high confidence
    Fire,
    /// No confident statement either way
    Uncertain,
}

impl FireClass {
    /// Numeric value used when summing: 0 for non-fire, 1 for fire
    pub const fn value(self) -> Option<u16> {
        match self {
            Self::NonFire => Some(0),
            Self::Fire => Some(1),
            Self::Uncertain => None,
        }
    }
}

/// Land-cover groups produced by [`classify_landcover`]
pub const NON_FLAMMABLE: u16 = 0;
pub const FOREST: u16 = 1;
pub const SAVANNA: u16 = 2;
pub const GRASSLAND: u16 = 3;
pub const CROPLAND: u16 = 4;

/// Classify one MOD14A2 fire-mask code
pub const fn classify_fire(code: u16) -> FireClass {
    match code {
        8 | 9 => FireClass::Fire,
        5 => FireClass::NonFire,
        _ => FireClass::Uncertain,
    }
}

/// Group one MCD12Q1 land-cover code
pub const fn classify_landcover(code: u16) -> u16 {
    match code {
        0 | 11 | 13 | 15 => NON_FLAMMABLE,
        1..=5 => FOREST,
        8 | 9 => SAVANNA,
        6 | 7 | 10 => GRASSLAND,
        12 | 14 => CROPLAND,
        other => other,
    }
}

/// Raster values are stored as floats; anything that is not a non-negative integer
/// code is treated as an unknown code.
fn as_code(value: f32) -> Option<u16> {
    if value.is_finite() && value >= 0.0 && value <= f32::from(u16::MAX) && value.fract() == 0.0 {
        Some(value as u16)
    } else {
        None
    }
}

/// Element-wise [`classify_fire`] over an array of any dimensionality
pub fn classify_fire_array<S, D>(codes: &ArrayBase<S, D>) -> Array<FireClass, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    codes.map(|&v| as_code(v).map_or(FireClass::Uncertain, classify_fire))
}

/// Element-wise [`classify_landcover`]; non-integer values pass through unchanged
pub fn classify_landcover_array<S, D>(codes: &ArrayBase<S, D>) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    codes.map(|&v| as_code(v).map_or(v, |code| f32::from(classify_landcover(code))))
}
