//! Validity masks
//!
//! A cell contributes to a row only when every source used by that row has a valid
//! (non-NoData) value there.

use crate::errors::{PipelineError, Result};
use crate::raster_io::is_nodata;
use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};

/// `true` wherever the cell is not NoData
pub fn valid_mask<S>(layer: &ArrayBase<S, Ix2>, nodata: Option<f64>) -> Array2<bool>
where
    S: Data<Elem = f32>,
{
    layer.mapv(|v| !is_nodata(v, nodata))
}

/// Logical AND of several masks over the same grid
pub fn combine_masks(masks: &[&Array2<bool>]) -> Result<Array2<bool>> {
    let (first, rest) = masks
        .split_first()
        .ok_or_else(|| PipelineError::alignment("no masks to combine"))?;
    let mut combined = (*first).clone();
    for mask in rest {
        if mask.dim() != combined.dim() {
            return Err(PipelineError::alignment(format!(
                "mask {:?} does not match mask {:?}",
                mask.dim(),
                combined.dim()
            )));
        }
        Zip::from(&mut combined).and(*mask).for_each(|c, &m| *c &= m);
    }
    Ok(combined)
}

/// Values of `layer` where `mask` is set, in row-major order
pub fn select<S>(layer: &ArrayBase<S, Ix2>, mask: &Array2<bool>) -> Result<Vec<f32>>
where
    S: Data<Elem = f32>,
{
    if layer.dim() != mask.dim() {
        return Err(PipelineError::alignment(format!(
            "layer {:?} does not match mask {:?}",
            layer.dim(),
            mask.dim()
        )));
    }
    Ok(layer
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &keep)| keep.then_some(v))
        .collect())
}
