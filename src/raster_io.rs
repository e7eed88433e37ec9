//! Raster I/O: single-band georeferenced rasters stored as NetCDF files
//!
//! Each file holds one `band(y, x)` float32 variable whose `_FillValue` is the raster's
//! NoData value, plus the georeferencing needed to place it on the ground:
//!
//! - global `GeoTransform`: the six affine coefficients
//!   `(origin_x, cell_width, row_rotation, origin_y, column_rotation, cell_height)`
//! - global `crs_wkt`: the spatial reference as WKT
//! - variable `pixel_type`: logical pixel type the values were rounded/clamped to
//!
//! Writes go to a hidden sibling file which is renamed into place once the NetCDF
//! handle is closed, so an output that exists on disk is always complete.

use crate::errors::{PipelineError, Result};
use crate::period::is_strictly_increasing;
use chrono::{Datelike, NaiveDate, Utc};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use netcdf::AttributeValue;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File extension of raster files produced and consumed by the pipeline
pub const RASTER_EXTENSION: &str = "nc";

const BAND_VARIABLE: &str = "band";
const GEOTRANSFORM_ATTRIBUTE: &str = "GeoTransform";
const CRS_ATTRIBUTE: &str = "crs_wkt";
const PIXEL_TYPE_ATTRIBUTE: &str = "pixel_type";

/// WKT of WGS 84 geographic coordinates (EPSG:4326)
pub const WGS84_WKT: &str = concat!(
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
    r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,"#,
    r#"AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,"#,
    r#"AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#
);

/// Affine transform and spatial reference shared by every cell of a raster
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    pub geotransform: [f64; 6],
    pub crs_wkt: String,
}

impl GeoReference {
    pub fn new(geotransform: [f64; 6], crs_wkt: impl Into<String>) -> Self {
        Self {
            geotransform,
            crs_wkt: crs_wkt.into(),
        }
    }

    /// North-up WGS 84 grid anchored at its upper-left corner
    pub fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self::new(
            [origin_x, cell_size, 0.0, origin_y, 0.0, -cell_size],
            WGS84_WKT,
        )
    }

    /// Cell width and (positive) cell height
    pub fn resolution(&self) -> (f64, f64) {
        (self.geotransform[1], -self.geotransform[5])
    }

    /// Geographic coordinates of the centre of cell `(row, col)`
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.geotransform;
        let (px, py) = (col as f64 + 0.5, row as f64 + 0.5);
        (
            gt[0] + px * gt[1] + py * gt[2],
            gt[3] + px * gt[4] + py * gt[5],
        )
    }
}

/// Logical pixel type of a persisted raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    UInt8,
    UInt16,
    Int16,
    Float32,
}

impl PixelType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UInt8 => "UInt8",
            Self::UInt16 => "UInt16",
            Self::Int16 => "Int16",
            Self::Float32 => "Float32",
        }
    }

    /// Round and clamp a value into this type's range. Non-finite values are kept
    /// for `Float32` and mapped to the type's maximum otherwise.
    ///
    /// A valid value may land on the NoData value once clamped (300 stored as `UInt8`
    /// with NoData 255); [`coerce_array`] counts those cells.
    pub fn coerce(self, value: f32) -> f32 {
        let (min, max) = match self {
            Self::UInt8 => (0.0, f32::from(u8::MAX)),
            Self::UInt16 => (0.0, f32::from(u16::MAX)),
            Self::Int16 => (f32::from(i16::MIN), f32::from(i16::MAX)),
            Self::Float32 => return value,
        };
        if value.is_finite() {
            value.round().clamp(min, max)
        } else {
            max
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UInt8" => Ok(Self::UInt8),
            "UInt16" => Ok(Self::UInt16),
            "Int16" => Ok(Self::Int16),
            "Float32" => Ok(Self::Float32),
            other => Err(PipelineError::shape(format!("unknown pixel type '{other}'"))),
        }
    }
}

/// A georeferenced 2-D grid
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub data: Array2<f32>,
    pub georef: GeoReference,
    pub nodata: Option<f64>,
    pub pixel_type: PixelType,
}

impl Raster {
    pub fn new(data: Array2<f32>, georef: GeoReference, nodata: Option<f64>) -> Self {
        Self {
            data,
            georef,
            nodata,
            pixel_type: PixelType::Float32,
        }
    }

    /// True when `value` is this raster's NoData value
    pub fn is_nodata(&self, value: f32) -> bool {
        is_nodata(value, self.nodata)
    }
}

/// NoData test shared by every masking operation. NaN cells never count as valid.
pub fn is_nodata(value: f32, nodata: Option<f64>) -> bool {
    value.is_nan() || nodata.map_or(false, |nd| f64::from(value) == nd)
}

/// An ordered sequence of rasters indexed by period
#[derive(Debug, Clone)]
pub struct RasterStack {
    /// Values laid out as (period, y, x)
    pub data: Array3<f32>,
    pub periods: Vec<NaiveDate>,
    pub georef: GeoReference,
    pub nodata: Option<f64>,
}

impl RasterStack {
    /// Build a stack, checking that the index matches the first axis and is strictly increasing
    pub fn new(
        data: Array3<f32>,
        periods: Vec<NaiveDate>,
        georef: GeoReference,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if data.len_of(Axis(0)) != periods.len() {
            return Err(PipelineError::shape(format!(
                "{} layers but {} periods",
                data.len_of(Axis(0)),
                periods.len()
            )));
        }
        if !is_strictly_increasing(&periods) {
            return Err(PipelineError::shape(
                "period index must be strictly increasing without duplicates",
            ));
        }
        Ok(Self {
            data,
            periods,
            georef,
            nodata,
        })
    }

    /// Grid dimensions as (rows, cols)
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Layer for an exact period label
    pub fn layer(&self, period: NaiveDate) -> Option<ArrayView2<'_, f32>> {
        self.periods
            .binary_search(&period)
            .ok()
            .map(|i| self.data.index_axis(Axis(0), i))
    }

    /// Layers whose period lies in `[start, end]`. Bounds outside the index are
    /// clipped, so the result may have zero layers.
    pub fn slice_periods(&self, start: NaiveDate, end: NaiveDate) -> ArrayView3<'_, f32> {
        let from = self.periods.partition_point(|p| *p < start);
        let to = self.periods.partition_point(|p| *p <= end).max(from);
        self.data.slice(s![from..to, .., ..])
    }

    /// Layers belonging to a calendar year
    pub fn select_year(&self, year: i32) -> ArrayView3<'_, f32> {
        let from = self.periods.partition_point(|p| p.year() < year);
        let to = self.periods.partition_point(|p| p.year() <= year).max(from);
        self.data.slice(s![from..to, .., ..])
    }
}

/// Raster files of a directory in file-name order
pub fn list_raster_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == RASTER_EXTENSION)
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn first_raster_file(directory: &Path) -> Result<PathBuf> {
    list_raster_files(directory)?
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::EmptyDirectory {
            path: directory.to_path_buf(),
        })
}

fn attribute_as_f64(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        _ => None,
    }
}

/// Read a single raster file
pub fn read_raster(path: &Path) -> Result<Raster> {
    let file = netcdf::open(path)?;
    let var = file.variable(BAND_VARIABLE).ok_or_else(|| {
        PipelineError::shape(format!(
            "'{}' has no '{}' variable",
            path.display(),
            BAND_VARIABLE
        ))
    })?;

    let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
    let (rows, cols) = match shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(PipelineError::shape(format!(
                "'{}' is not a 2-D raster (shape {:?})",
                path.display(),
                other
            )))
        }
    };
    let values = var.get_values::<f32, _>(..)?;
    let data = Array2::from_shape_vec((rows, cols), values)?;

    let nodata = var
        .attribute("_FillValue")
        .and_then(|attr| attr.value().ok())
        .and_then(attribute_as_f64);

    let pixel_type = match var.attribute(PIXEL_TYPE_ATTRIBUTE).map(|a| a.value()) {
        Some(Ok(AttributeValue::Str(name))) => name.parse()?,
        _ => PixelType::Float32,
    };

    let geotransform = match file.attribute(GEOTRANSFORM_ATTRIBUTE).map(|a| a.value()) {
        Some(Ok(AttributeValue::Doubles(v))) if v.len() == 6 => [v[0], v[1], v[2], v[3], v[4], v[5]],
        _ => {
            return Err(PipelineError::shape(format!(
                "'{}' lacks a six-element {} attribute",
                path.display(),
                GEOTRANSFORM_ATTRIBUTE
            )))
        }
    };
    let crs_wkt = match file.attribute(CRS_ATTRIBUTE).map(|a| a.value()) {
        Some(Ok(AttributeValue::Str(wkt))) => wkt,
        _ => String::new(),
    };

    Ok(Raster {
        data,
        georef: GeoReference::new(geotransform, crs_wkt),
        nodata,
        pixel_type,
    })
}

/// NoData value declared by the first raster file of a directory
pub fn read_nodata(directory: &Path) -> Result<Option<f64>> {
    let first = first_raster_file(directory)?;
    Ok(read_raster(&first)?.nodata)
}

/// Read every raster file of a directory into a stack indexed by `periods`
pub fn read_stack(directory: &Path, periods: &[NaiveDate]) -> Result<RasterStack> {
    read_stack_skip(directory, periods, 0)
}

/// Like [`read_stack`] but skips the first `offset` files
pub fn read_stack_skip(
    directory: &Path,
    periods: &[NaiveDate],
    offset: usize,
) -> Result<RasterStack> {
    let files: Vec<PathBuf> = list_raster_files(directory)?
        .into_iter()
        .skip(offset)
        .collect();
    if files.is_empty() {
        return Err(PipelineError::EmptyDirectory {
            path: directory.to_path_buf(),
        });
    }
    if files.len() != periods.len() {
        return Err(PipelineError::shape(format!(
            "'{}' holds {} rasters but the period index has {} entries",
            directory.display(),
            files.len(),
            periods.len()
        )));
    }

    log::debug!("Stacking {} rasters from {}", files.len(), directory.display());

    let first = read_raster(&files[0])?;
    let (rows, cols) = first.data.dim();
    let mut data = Array3::<f32>::zeros((files.len(), rows, cols));
    data.index_axis_mut(Axis(0), 0).assign(&first.data);

    for (i, path) in files.iter().enumerate().skip(1) {
        let raster = read_raster(path)?;
        if raster.data.dim() != (rows, cols) {
            return Err(PipelineError::shape(format!(
                "'{}' is {:?} but the stack is {:?}",
                path.display(),
                raster.data.dim(),
                (rows, cols)
            )));
        }
        data.index_axis_mut(Axis(0), i).assign(&raster.data);
    }

    RasterStack::new(data, periods.to_vec(), first.georef, first.nodata)
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Coerce every cell to `pixel_type`, keeping NoData cells at `nodata`
///
/// Also returns how many valid cells were clamped or rounded onto the NoData value;
/// those cells read back as NoData.
pub fn coerce_array(data: &Array2<f32>, pixel_type: PixelType, nodata: Option<f64>) -> (Array2<f32>, usize) {
    let mut collisions = 0;
    let stored = data.mapv(|v| match nodata {
        Some(nd) if is_nodata(v, Some(nd)) => nd as f32,
        Some(nd) => {
            let coerced = pixel_type.coerce(v);
            if is_nodata(coerced, Some(nd)) {
                collisions += 1;
            }
            coerced
        }
        None => pixel_type.coerce(v),
    });
    (stored, collisions)
}

/// Persist a 2-D array with full georeferencing
///
/// Values are coerced to `pixel_type` before storage; a warning is logged when valid
/// cells collapse onto the NoData value. Parent directories are created
/// and an existing file at `path` is replaced.
pub fn write_raster(
    data: &Array2<f32>,
    path: &Path,
    georef: &GeoReference,
    pixel_type: PixelType,
    nodata: Option<f64>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = partial_path(path);
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }

    let (stored, collisions) = coerce_array(data, pixel_type, nodata);
    if collisions > 0 {
        log::warn!(
            "{} valid cells became NoData when stored as {} in {}",
            collisions,
            pixel_type,
            path.display()
        );
    }

    {
        let mut file = netcdf::create(&tmp)?;
        let (rows, cols) = stored.dim();
        file.add_dimension("y", rows)?;
        file.add_dimension("x", cols)?;

        let mut var = file.add_variable::<f32>(BAND_VARIABLE, &["y", "x"])?;
        if let Some(nd) = nodata {
            var.put_attribute("_FillValue", nd as f32)?;
        }
        var.put_attribute(PIXEL_TYPE_ATTRIBUTE, pixel_type.as_str())?;
        var.put(stored.view(), ..)?;

        file.add_attribute(GEOTRANSFORM_ATTRIBUTE, georef.geotransform.to_vec())?;
        file.add_attribute(CRS_ATTRIBUTE, georef.crs_wkt.as_str())?;
        file.add_attribute(
            "history",
            format!("Created by tdf_fire on {}", Utc::now().to_rfc3339()),
        )?;
    }

    fs::rename(&tmp, path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Write a [`Raster`] with its own metadata
pub fn write(raster: &Raster, path: &Path) -> Result<()> {
    write_raster(
        &raster.data,
        path,
        &raster.georef,
        raster.pixel_type,
        raster.nodata,
    )
}

/// Check that two grids can be combined cell by cell
pub fn ensure_aligned(
    left: (&GeoReference, (usize, usize)),
    right: (&GeoReference, (usize, usize)),
) -> Result<()> {
    if left.1 != right.1 {
        return Err(PipelineError::alignment(format!(
            "grid {:?} does not match grid {:?}",
            left.1, right.1
        )));
    }
    if left.0 != right.0 {
        return Err(PipelineError::alignment(
            "geotransform or spatial reference differs between sources",
        ));
    }
    Ok(())
}
