//! Ingests a NetCDF diagnostic file into a local store, archive and in-memory index.

use std::path::Path;
use std::sync::Arc;

use diag_common::{DiagError, Field};
use ingestion::{Ingester, IngestionError};
use storage::{open_group, resolve, series_prefix, GroupPath, HistoryArchive, ObjectStorage, S3Credentials};
use tempfile::TempDir;
use test_utils::MemoryRunIndex;

const FILENAME: &str = "RTMA_WCOSS_CONUS_REALTIME_diag_t_anl.202205051400.HRRR.nc4";

fn write_diag(path: &Path) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("nobs", 3)?;

    let columns: [(&str, [f32; 3]); 5] = [
        ("Latitude", [22.0, 23.0, 24.0]),
        ("Longitude", [90.0, 270.0, 180.0]),
        ("Observation", [1.0, 2.0, 3.0]),
        ("Obs_Minus_Forecast_adjusted", [0.25, -0.5, 1.0]),
        ("Obs_Minus_Forecast_unadjusted", [0.5, -1.0, 2.0]),
    ];
    for (name, values) in columns {
        let mut var = file.add_variable::<f32>(name, &["nobs"])?;
        var.put_values(&values, ..)?;
    }

    let mut flag = file.add_variable::<i32>("Analysis_Use_Flag", &["nobs"])?;
    flag.put_values(&[1i32, -1, 1], ..)?;
    Ok(())
}

#[tokio::test]
async fn test_ingest_file_end_to_end() {
    let files = TempDir::new().unwrap();
    let zarr = TempDir::new().unwrap();
    let parquet = TempDir::new().unwrap();

    let path = files.path().join(FILENAME);
    write_diag(&path).unwrap();

    let store = resolve(zarr.path().to_str().unwrap()).unwrap();
    let archive = HistoryArchive::new(
        ObjectStorage::from_uri(parquet.path().to_str().unwrap(), &S3Credentials::default()).unwrap(),
    );
    let index = MemoryRunIndex::new();
    let ingester = Ingester::new(store.clone(), Arc::new(index.clone())).with_archive(archive.clone());

    let outcome = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(outcome.group, "RTMA/WCOSS/CONUS/HRRR/REALTIME/t/2022-05-05T14:00/anl");
    assert_eq!(outcome.nobs, 3);

    let dataset = open_group(&store, &GroupPath::new(
        "RTMA", "WCOSS", "CONUS", "HRRR", "REALTIME", "t", "2022-05-05T14:00", "anl",
    ))
    .unwrap();
    assert_eq!(dataset.longitude, vec![90.0, -90.0, 180.0]);
    assert_eq!(dataset.is_used, vec![true, false, true]);
    assert_eq!(dataset.forecast_unadjusted, Field::Scalar(vec![0.5, 3.0, 1.0]));

    let series = series_prefix("RTMA", "HRRR", "WCOSS", "CONUS", "REALTIME", "t");
    let archived = archive.read_used(&series, "anl").await.unwrap();
    assert_eq!(archived.len(), 2);

    assert_eq!(index.analyses().len(), 1);
}

#[tokio::test]
async fn test_ingest_file_rejects_bad_name() {
    let files = TempDir::new().unwrap();
    let zarr = TempDir::new().unwrap();
    let path = files.path().join("diag_t.nc4");
    write_diag(&path).unwrap();

    let ingester = Ingester::new(
        resolve(zarr.path().to_str().unwrap()).unwrap(),
        Arc::new(MemoryRunIndex::new()),
    );
    let err = ingester.ingest_file(&path).await.unwrap_err();
    assert!(matches!(err, IngestionError::Diag(DiagError::InvalidFilename(_))));
}
