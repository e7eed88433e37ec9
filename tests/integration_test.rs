use chrono::NaiveDate;
use ndarray::{arr2, Array2};
use std::path::Path;
use tdf_fire::config::{BoundingBox, PipelineConfig};
use tdf_fire::datasets::DatasetKind;
use tdf_fire::pipeline::{forest_proximity, group_fires, reclass_landcover, run_all};
use tdf_fire::proximity::DistanceMetric;
use tdf_fire::raster_io::{read_raster, write_raster, GeoReference, PixelType};
use tempfile::tempdir;

fn georef() -> GeoReference {
    GeoReference::north_up(-75.0, 10.0, 0.00416666)
}

fn put(dir: &Path, name: &str, data: &Array2<f32>, pixel_type: PixelType, nodata: Option<f64>) {
    write_raster(data, &dir.join(name), &georef(), pixel_type, nodata)
        .expect("Failed to write test raster");
}

fn config_for(root: &Path) -> PipelineConfig {
    PipelineConfig {
        data_root: root.to_path_buf(),
        first_month: NaiveDate::from_ymd_opt(2003, 1, 1).unwrap(),
        last_month: NaiveDate::from_ymd_opt(2003, 2, 1).unwrap(),
        first_year: 2003,
        last_year: 2003,
        rolling_window: 1,
        ..PipelineConfig::default()
    }
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV");
    let header = reader
        .headers()
        .expect("Failed to read header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("Bad record").iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[test]
fn test_group_fires_stage() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = config_for(temp_dir.path());
    let original = config.resolve(&config.paths.fire_original);

    // two January composites and one February composite
    put(&original, "MOD14A2.A2002001.nc", &arr2(&[[9.0, 5.0], [5.0, 3.0]]), PixelType::UInt8, None);
    put(&original, "MOD14A2.A2002009.nc", &arr2(&[[5.0, 5.0], [5.0, 0.0]]), PixelType::UInt8, None);
    put(&original, "MOD14A2.A2002033.nc", &arr2(&[[5.0, 8.0], [0.0, 5.0]]), PixelType::UInt8, None);

    let written = group_fires(&config).expect("Failed to group fires");
    assert_eq!(written, 2);

    let preprocessed = config.resolve(&config.paths.fire_preprocessed);
    let january = read_raster(&preprocessed.join("MOD14A2_200201.nc")).unwrap();
    assert_eq!(january.data, arr2(&[[1.0, 0.0], [0.0, 255.0]]));
    assert_eq!(january.nodata, Some(255.0));
    assert_eq!(january.pixel_type, PixelType::UInt16);
    assert_eq!(january.georef, georef());

    let february = read_raster(&preprocessed.join("MOD14A2_200202.nc")).unwrap();
    assert_eq!(february.data, arr2(&[[0.0, 1.0], [255.0, 0.0]]));

    // completed outputs are left alone on a second run
    assert_eq!(group_fires(&config).unwrap(), 0);

    let overwrite = PipelineConfig {
        skip_existing: false,
        ..config
    };
    assert_eq!(group_fires(&overwrite).unwrap(), 2);
}

#[test]
fn test_landcover_and_proximity_stages() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut config = config_for(temp_dir.path());
    config.distance_metric = DistanceMetric::Chebyshev;

    let original = config.resolve(&config.paths.landcover_original);
    put(
        &original,
        "MCD12Q1.A2003001.nc",
        &arr2(&[[2.0, 9.0, 12.0], [17.0, 255.0, 15.0]]),
        PixelType::UInt8,
        Some(255.0),
    );
    assert_eq!(reclass_landcover(&config).unwrap(), 1);

    let reclassed = read_raster(
        &config
            .resolve(&config.paths.landcover_preprocessed)
            .join("MCD12Q1_2003.nc"),
    )
    .unwrap();
    assert_eq!(reclassed.data, arr2(&[[1.0, 2.0, 4.0], [17.0, 255.0, 0.0]]));
    assert_eq!(reclassed.nodata, Some(255.0));

    // proximity reads the prepared land cover
    let prepared = config.resolve(&config.paths.landcover_prepared);
    put(&prepared, "MCD12Q1_2003.nc", &reclassed.data, PixelType::UInt16, Some(255.0));
    assert_eq!(forest_proximity(&config).unwrap(), 1);

    let distance = read_raster(
        &config
            .resolve(&config.paths.forest_distance)
            .join("DTNF_2003.nc"),
    )
    .unwrap();
    assert_eq!(distance.pixel_type, PixelType::Int16);
    assert_eq!(distance.data, arr2(&[[0.0, 1.0, 2.0], [1.0, 32767.0, 2.0]]));
}

#[test]
fn test_dataset_builds() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = config_for(temp_dir.path());
    let paths = &config.paths;

    let fire = config.resolve(&paths.fire_prepared);
    put(&fire, "MOD14A2_200301.nc", &arr2(&[[1.0, 0.0], [0.0, 255.0]]), PixelType::UInt16, Some(255.0));
    put(&fire, "MOD14A2_200302.nc", &arr2(&[[0.0, 2.0], [0.0, 255.0]]), PixelType::UInt16, Some(255.0));

    let landcover = config.resolve(&paths.landcover_prepared);
    put(&landcover, "MCD12Q1_2003.nc", &arr2(&[[1.0, 2.0], [2.0, 0.0]]), PixelType::UInt16, Some(255.0));

    let evi = config.resolve(&paths.evi_prepared);
    let ppt = config.resolve(&paths.ppt_prepared);
    for (i, stamp) in ["200212", "200301", "200302"].iter().enumerate() {
        let step = (i + 1) as f32;
        put(&evi, &format!("MOD13A3_{stamp}.nc"), &Array2::from_elem((2, 2), 1000.0 * step), PixelType::Int16, Some(-3000.0));
        put(&ppt, &format!("3B43_{stamp}.nc"), &Array2::from_elem((2, 2), 10.0 * step), PixelType::Float32, Some(-9999.0));
    }

    let distance = config.resolve(&paths.forest_distance);
    put(&distance, "DTNF_2003.nc", &arr2(&[[0.0, 1.0], [1.0, 1.0]]), PixelType::Int16, Some(32767.0));

    for kind in DatasetKind::ALL {
        let path = kind.build(&config).expect("Failed to build dataset");
        assert!(path.exists(), "{} was not written", kind);
    }

    let (header, rows) = read_csv(&DatasetKind::GroupbyArea.output_path(&config));
    assert_eq!(header, vec!["date", "fire_pixels", "evi", "evi_prev", "ppt", "ppt_prev"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "2003-01-01");
    assert_eq!(rows[0][1], "1");
    assert_eq!(rows[1][1], "2");
    let value = |r: usize, c: usize| rows[r][c].parse::<f64>().unwrap();
    assert!((value(0, 2) - 0.2).abs() < 1e-9);
    assert!((value(0, 3) - 0.1).abs() < 1e-9);
    assert!((value(1, 4) - 30.0).abs() < 1e-9);
    assert!((value(1, 5) - 20.0).abs() < 1e-9);

    let (header, rows) = read_csv(&DatasetKind::LandcoverPerFirePixel.output_path(&config));
    assert_eq!(header, vec!["year", "code", "name"]);
    assert_eq!(rows, vec![vec!["2003", "1", "Forest"], vec!["2003", "2", "Savanna"]]);

    let (_, rows) = read_csv(&DatasetKind::LandcoverNormalizedArea.output_path(&config));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], "2");

    let (header, rows) = read_csv(&DatasetKind::FireProportionPerLandcover.output_path(&config));
    assert_eq!(header, vec!["date", "Forest", "Savanna", "Grassland", "Cropland"]);
    assert_eq!(rows[0], vec!["2003-01-01", "1", "0", "", ""]);
    assert_eq!(rows[1], vec!["2003-02-01", "0", "1", "", ""]);

    let (header, rows) = read_csv(&DatasetKind::ForestProximityPerPixel.output_path(&config));
    assert_eq!(
        header,
        vec!["is_fire_pixel", "year", "lc_code", "forest_distance", "lc_name"]
    );
    // one fire and one non-fire pixel survive balancing
    assert_eq!(rows.len(), 2);
    let mut classes: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    classes.sort_unstable();
    assert_eq!(classes, vec!["0", "1"]);
}

fn put_on(dir: &Path, name: &str, data: &Array2<f32>, georef: &GeoReference, pixel_type: PixelType, nodata: Option<f64>) {
    write_raster(data, &dir.join(name), georef, pixel_type, nodata).expect("Failed to write test raster");
}

#[test]
fn test_run_all_from_original_products() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut config = config_for(temp_dir.path());
    config.bbox = BoundingBox {
        min_x: -75.0,
        min_y: 8.0,
        max_x: -73.0,
        max_y: 10.0,
    };
    config.ppt_cell_size = 1.0;
    let paths = config.paths.clone();

    // fire grid: 4 x 4 cells of 0.5 degrees
    let fire_grid = GeoReference::north_up(-75.0, 10.0, 0.5);
    let fire = config.resolve(&paths.fire_original);
    let mut january = Array2::from_elem((4, 4), 5.0);
    january[[0, 1]] = 9.0;
    let mut february = Array2::from_elem((4, 4), 5.0);
    february[[2, 2]] = 8.0;
    february[[3, 3]] = 0.0;
    put_on(&fire, "MOD14A2.A2003001.nc", &january, &fire_grid, PixelType::UInt8, None);
    put_on(&fire, "MOD14A2.A2003009.nc", &Array2::from_elem((4, 4), 5.0), &fire_grid, PixelType::UInt8, None);
    put_on(&fire, "MOD14A2.A2003033.nc", &february, &fire_grid, PixelType::UInt8, None);

    // land cover on a finer grid whose origin is a quarter cell off the fire grid;
    // every 2 x 2 block maps onto one fire cell
    let classes = arr2(&[[1, 2, 2, 3], [1, 1, 2, 3], [2, 2, 4, 0], [1, 2, 3, 0]]);
    let raw_code = |class: i32| -> f32 {
        match class {
            1 => 2.0,
            2 => 9.0,
            3 => 10.0,
            4 => 12.0,
            _ => 13.0,
        }
    };
    let raw = Array2::from_shape_fn((9, 9), |(r, c)| {
        if r < 8 && c < 8 {
            raw_code(classes[[r / 2, c / 2]])
        } else {
            255.0
        }
    });
    put_on(
        &config.resolve(&paths.landcover_original),
        "MCD12Q1.A2003001.nc",
        &raw,
        &GeoReference::north_up(-75.125, 10.125, 0.25),
        PixelType::UInt8,
        Some(255.0),
    );

    // TRMM rates stored longitude-major and south-up on the 1 degree bounding-box grid
    let trmm = config.resolve(&paths.ppt_original);
    let december = arr2(&[[1.0, 2.0], [3.0, -9999.0]]);
    put_on(&trmm, "3B43.20021201.7A.nc", &december, &fire_grid, PixelType::Float32, Some(-9999.0));
    for stamp in ["20030101", "20030201"] {
        put_on(&trmm, &format!("3B43.{stamp}.7A.nc"), &Array2::from_elem((2, 2), 1.0), &fire_grid, PixelType::Float32, Some(-9999.0));
    }

    let evi = config.resolve(&paths.evi_original);
    for (i, stamp) in ["200212", "200301", "200302"].iter().enumerate() {
        let value = 1000.0 * (i + 1) as f32;
        put_on(&evi, &format!("MOD13A3_{stamp}.nc"), &Array2::from_elem((4, 4), value), &fire_grid, PixelType::Int16, Some(-3000.0));
    }

    // the area of interest leaves out the westernmost column
    let aoi = Array2::from_shape_fn((4, 4), |(_, c)| if c == 0 { 0.0 } else { 1.0 });
    write_raster(&aoi, &config.resolve(&paths.aoi_mask), &fire_grid, PixelType::UInt8, None)
        .expect("Failed to write AOI");

    // 2 fire months, 1 land cover, 3 precipitation, 1 + 3 resampled, 1 + 3 + 2 + 3 masked,
    // 1 proximity and 5 datasets
    assert_eq!(run_all(&config).expect("Failed to run the pipeline"), 25);

    let december = read_raster(&config.resolve(&paths.ppt_preprocessed).join("3B43_200212.nc")).unwrap();
    assert_eq!(december.data, arr2(&[[1488.0, -9999.0], [744.0, 2232.0]]));
    assert_eq!(december.nodata, Some(-9999.0));
    assert_eq!(december.georef.geotransform, [-75.0, 1.0, 0.0, 10.0, 0.0, -1.0]);

    let prepared = [
        config.resolve(&paths.landcover_prepared).join("MCD12Q1_2003.nc"),
        config.resolve(&paths.evi_prepared).join("MOD13A3_200301.nc"),
        config.resolve(&paths.fire_prepared).join("MOD14A2_200302.nc"),
        config.resolve(&paths.ppt_prepared).join("3B43_200212.nc"),
        config.resolve(&paths.forest_distance).join("DTNF_2003.nc"),
    ];
    for path in &prepared {
        let raster = read_raster(path).expect("Failed to read prepared raster");
        assert_eq!(raster.data.dim(), (4, 3), "{}", path.display());
        assert_eq!(raster.georef.geotransform, [-74.5, 0.5, 0.0, 10.0, 0.0, -0.5], "{}", path.display());
    }

    let landcover = read_raster(&prepared[0]).unwrap();
    assert_eq!(landcover.data, arr2(&[[2.0, 2.0, 3.0], [1.0, 2.0, 3.0], [2.0, 4.0, 0.0], [2.0, 3.0, 0.0]]));
    let february = read_raster(&prepared[2]).unwrap();
    assert_eq!(february.data[[2, 1]], 1.0);
    assert_eq!(february.data[[3, 2]], 255.0);
    let ppt = read_raster(&prepared[3]).unwrap();
    assert_eq!(ppt.nodata, Some(-9999.0));
    assert_eq!(ppt.pixel_type, PixelType::Float32);

    for kind in DatasetKind::ALL {
        assert!(kind.output_path(&config).exists(), "{} was not written", kind);
    }
    let (_, rows) = read_csv(&DatasetKind::GroupbyArea.output_path(&config));
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0][1].as_str(), rows[1][1].as_str()), ("1", "1"));
    assert!((rows[0][2].parse::<f64>().unwrap() - 0.2).abs() < 1e-9);

    let (_, rows) = read_csv(&DatasetKind::LandcoverPerFirePixel.output_path(&config));
    assert_eq!(rows, vec![vec!["2003", "2", "Savanna"], vec!["2003", "4", "Cropland"]]);

    // two burned pixels balanced against two of the eight unburned flammable ones
    let (_, rows) = read_csv(&DatasetKind::ForestProximityPerPixel.output_path(&config));
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().filter(|r| r[0] == "1").count(), 2);
}
