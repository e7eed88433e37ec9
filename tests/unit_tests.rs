//! Unit tests for tdf_fire modules that touch the filesystem
//!
//! Pure kernels are covered next to their code; these tests exercise raster files,
//! stacks, configuration files and the public re-exports together.

use chrono::NaiveDate;
use ndarray::{arr2, Array2, Array3, Axis};
use tdf_fire::{
    classify::{classify_fire_array, classify_landcover, FireClass},
    config::PipelineConfig,
    errors::PipelineError,
    metadata::describe_raster,
    parallel::ParallelConfig,
    period::{monthly_range, yearly_range},
    proximity::{distance_to_nearest, DistanceMetric, PROXIMITY_NODATA},
    raster_io::{
        list_raster_files, read_nodata, read_raster, read_stack, read_stack_skip, write,
        write_raster, GeoReference, PixelType, Raster, RasterStack,
    },
    sampling::undersample,
    statistics::StatOperation,
    temporal::{monthly_fire_sum, sum_periods},
};
use tempfile::tempdir;

fn ymd(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn georef() -> GeoReference {
    GeoReference::north_up(-75.0, 10.0, 0.5)
}

#[test]
fn test_error_display() {
    let shape = PipelineError::ShapeMismatch {
        message: "3 files, 4 periods".to_string(),
    };
    assert!(format!("{}", shape).contains("Shape mismatch"));

    let empty = PipelineError::EmptyDirectory {
        path: "fires/original".into(),
    };
    assert!(format!("{}", empty).contains("fires/original"));

    let stat = PipelineError::UnsupportedStatistic {
        name: "median".to_string(),
    };
    assert!(format!("{}", stat).contains("'median'"));
}

#[test]
fn test_stat_operation_names() {
    assert_eq!("mean".parse::<StatOperation>().unwrap(), StatOperation::Mean);
    assert_eq!("sum".parse::<StatOperation>().unwrap(), StatOperation::Sum);
    assert!(matches!(
        "max".parse::<StatOperation>(),
        Err(PipelineError::UnsupportedStatistic { .. })
    ));
}

#[test]
fn test_parallel_config() {
    let config = ParallelConfig::default();
    assert!(config.num_threads.is_none());
    assert!(config.setup_global_pool().is_ok());
}

#[test]
fn test_raster_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("fire.nc");

    let data = arr2(&[[0.0, 1.0, 2.0], [3.0, 255.0, 4.6]]);
    write_raster(&data, &path, &georef(), PixelType::UInt16, Some(255.0))
        .expect("Failed to write raster");
    assert!(path.exists());

    let raster = read_raster(&path).expect("Failed to read raster");
    assert_eq!(raster.data.dim(), (2, 3));
    assert_eq!(raster.georef, georef());
    assert_eq!(raster.nodata, Some(255.0));
    assert_eq!(raster.pixel_type, PixelType::UInt16);
    // UInt16 storage rounds fractional values
    assert_eq!(raster.data[[1, 2]], 5.0);
    assert_eq!(raster.data[[1, 1]], 255.0);
    assert!(raster.is_nodata(raster.data[[1, 1]]));

    let listed = list_raster_files(&dir.path().join("nested")).unwrap();
    assert_eq!(listed, vec![path]);
}

#[test]
fn test_clamped_values_read_back_as_nodata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lc.nc");
    write_raster(&arr2(&[[300.0, 3.0]]), &path, &georef(), PixelType::UInt8, Some(255.0))
        .expect("Failed to write raster");

    let raster = read_raster(&path).unwrap();
    assert!(raster.is_nodata(raster.data[[0, 0]]));
    assert_eq!(raster.data[[0, 1]], 3.0);
}

#[test]
fn test_raster_without_nodata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("evi.nc");
    let raster = Raster::new(arr2(&[[0.25, -0.5]]), georef(), None);
    write(&raster, &path).unwrap();

    let back = read_raster(&path).unwrap();
    assert_eq!(back.nodata, None);
    assert_eq!(back.pixel_type, PixelType::Float32);
    assert_eq!(back.data, raster.data);
}

#[test]
fn test_read_stack_errors() {
    let dir = tempdir().unwrap();
    let months = monthly_range(ymd(2002, 1), ymd(2002, 3));

    assert!(matches!(
        read_stack(dir.path(), &months),
        Err(PipelineError::EmptyDirectory { .. })
    ));
    assert!(matches!(
        read_nodata(dir.path()),
        Err(PipelineError::EmptyDirectory { .. })
    ));

    for m in 1..=2 {
        let path = dir.path().join(format!("MOD14A2_20020{m}.nc"));
        write_raster(&Array2::zeros((2, 2)), &path, &georef(), PixelType::UInt16, Some(255.0))
            .unwrap();
    }
    assert!(matches!(
        read_stack(dir.path(), &months),
        Err(PipelineError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_read_stack_skip_offset() {
    let dir = tempdir().unwrap();
    for (i, m) in [10, 11, 12].iter().enumerate() {
        let path = dir.path().join(format!("MOD13A3_2001{m}.nc"));
        write_raster(
            &Array2::from_elem((1, 2), i as f32),
            &path,
            &georef(),
            PixelType::Int16,
            Some(-3000.0),
        )
        .unwrap();
    }

    let stack = read_stack_skip(dir.path(), &monthly_range(ymd(2001, 11), ymd(2001, 12)), 1)
        .expect("Failed to stack rasters");
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.nodata, Some(-3000.0));
    assert_eq!(stack.layer(ymd(2001, 11)).unwrap()[[0, 0]], 1.0);
    assert_eq!(stack.layer(ymd(2001, 12)).unwrap()[[0, 1]], 2.0);
    assert!(stack.layer(ymd(2001, 10)).is_none());
}

#[test]
fn test_stack_rejects_unordered_periods() {
    let periods = vec![ymd(2002, 2), ymd(2002, 1)];
    assert!(RasterStack::new(Array3::zeros((2, 1, 1)), periods, georef(), None).is_err());
    assert!(RasterStack::new(Array3::zeros((3, 1, 1)), yearly_range(2002, 2003), georef(), None)
        .is_err());
}

#[test]
fn test_three_period_fire_stack_end_to_end() {
    let dir = tempdir().unwrap();
    let layers = [
        arr2(&[[8.0, 9.0], [5.0, 0.0]]),
        arr2(&[[5.0, 5.0], [5.0, 0.0]]),
        arr2(&[[7.0, 7.0], [7.0, 0.0]]),
    ];
    let files: Vec<_> = layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let path = dir.path().join(format!("MOD14A2.A20020{:02}.nc", 1 + 8 * i));
            write_raster(layer, &path, &georef(), PixelType::UInt8, None).unwrap();
            path
        })
        .collect();

    let (summed, reference) = monthly_fire_sum(&files, 255).expect("Failed to sum composites");
    assert_eq!(reference, georef());
    assert_eq!(summed[[0, 0]], 1);
    assert_eq!(summed[[1, 1]], 255);
    assert_eq!(summed, arr2(&[[1, 1], [0, 255]]));
}

#[test]
fn test_single_period_sum_matches_class() {
    let codes = arr2(&[[9.0, 5.0, 2.0]]).insert_axis(Axis(0));
    let classes = classify_fire_array(&codes);
    assert_eq!(classes[[0, 0, 2]], FireClass::Uncertain);
    assert_eq!(sum_periods(&classes), arr2(&[[1, 0, 255]]));
}

#[test]
fn test_landcover_codes() {
    let grouped: Vec<u16> = (0..=16).map(classify_landcover).collect();
    assert_eq!(
        grouped,
        vec![0, 1, 1, 1, 1, 1, 3, 3, 2, 2, 3, 0, 4, 0, 4, 0, 16]
    );
}

#[test]
fn test_proximity_raster_metadata() {
    let raster = Raster::new(arr2(&[[1.0, 2.0, 2.0, 2.0]]), georef(), Some(255.0));
    let distance = distance_to_nearest(&raster, &[1], DistanceMetric::Euclidean);
    assert_eq!(distance.pixel_type, PixelType::Int16);
    assert_eq!(distance.nodata, Some(PROXIMITY_NODATA));
    assert_eq!(distance.georef, raster.georef);
    assert_eq!(distance.data, arr2(&[[0.0, 1.0, 2.0, 3.0]]));
}

#[test]
fn test_describe_raster() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lc.nc");
    write_raster(
        &arr2(&[[1.0, 2.0], [3.0, 255.0]]),
        &path,
        &georef(),
        PixelType::UInt8,
        Some(255.0),
    )
    .unwrap();

    let description = describe_raster(&path).expect("Failed to describe raster");
    assert_eq!((description.rows, description.cols), (2, 2));
    assert_eq!(description.pixel_type, PixelType::UInt8);
    assert!(description.history.is_some());
    let summary = description.summary.unwrap();
    assert_eq!(summary.valid_cells, 3);
    assert_eq!(summary.mean, 2.0);
    assert!(format!("{}", description).contains("UInt8"));
}

#[test]
fn test_config_from_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"data_root": "/srv/tdf", "sample_size": 500, "distance_metric": "chebyshev",
            "first_month": "2005-01-01"}"#,
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(&path).expect("Failed to load config");
    assert_eq!(config.sample_size, 500);
    assert_eq!(config.distance_metric, DistanceMetric::Chebyshev);
    assert_eq!(config.first_month, ymd(2005, 1));
    assert_eq!(config.last_month, ymd(2016, 12));
    assert_eq!(
        config.resolve(&config.paths.csv),
        std::path::PathBuf::from("/srv/tdf/csv")
    );

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&path),
        Err(PipelineError::ConfigError(_))
    ));
}

#[test]
fn test_undersampling_balances_classes() {
    let rows: Vec<(u8, usize)> = (0..1000).map(|i| (u8::from(i < 100), i)).collect();
    let balanced = undersample(&rows, |r| r.0, 7);

    assert_eq!(balanced.len(), 200);
    assert_eq!(balanced.iter().filter(|r| r.0 == 1).count(), 100);
    assert_eq!(balanced.iter().filter(|r| r.0 == 0).count(), 100);
    // every kept row comes from the input
    assert!(balanced.iter().all(|r| rows.contains(r)));
    assert_eq!(balanced, undersample(&rows, |r| r.0, 7));
}
