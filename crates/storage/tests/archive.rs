//! Parquet history archive on a local directory.

use storage::{series_prefix, HistoryArchive, ObjectStorage, S3Credentials};
use test_utils::{scalar_dataset, wind_dataset};

fn archive(dir: &tempfile::TempDir) -> HistoryArchive {
    let storage =
        ObjectStorage::from_uri(dir.path().to_str().unwrap(), &S3Credentials::default()).unwrap();
    HistoryArchive::new(storage)
}

#[tokio::test]
async fn test_write_partitions_by_loop_and_usage() {
    let dir = tempfile::tempdir().unwrap();
    let archive = archive(&dir);

    archive.write(&scalar_dataset()).await.unwrap();

    let series = dir.path().join("RTMA_HRRR_WCOSS_CONUS_REALTIME/t/loop=anl");
    assert!(series.join("is_used=true/2022-05-05T1400.parquet").exists());
    assert!(series.join("is_used=false/2022-05-05T1400.parquet").exists());
}

#[tokio::test]
async fn test_read_used_values() {
    let dir = tempfile::tempdir().unwrap();
    let archive = archive(&dir);
    archive.write(&scalar_dataset()).await.unwrap();

    let series = series_prefix("RTMA", "HRRR", "WCOSS", "CONUS", "REALTIME", "t");
    let values = archive.read_used(&series, "anl").await.unwrap();

    let omf: Vec<f64> = values.iter().map(|v| v.obs_minus_forecast_unadjusted).collect();
    assert_eq!(omf, vec![0.5, 2.0]);
    assert!(values
        .iter()
        .all(|v| v.initialization_time == "2022-05-05T14:00"));

    assert!(archive.read_used(&series, "ges").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vector_rows_per_component() {
    let dir = tempfile::tempdir().unwrap();
    let archive = archive(&dir);
    archive.write(&wind_dataset()).await.unwrap();

    let series = series_prefix("RTMA", "HRRR", "WCOSS", "CONUS", "REALTIME", "uv");
    let values = archive.read_used(&series, "ges").await.unwrap();

    // three used observations, two components each
    assert_eq!(values.len(), 6);
}

#[tokio::test]
async fn test_rewrite_replaces_run() {
    let dir = tempfile::tempdir().unwrap();
    let archive = archive(&dir);

    archive.write(&scalar_dataset()).await.unwrap();
    archive.write(&scalar_dataset()).await.unwrap();

    let series = series_prefix("RTMA", "HRRR", "WCOSS", "CONUS", "REALTIME", "t");
    assert_eq!(archive.read_used(&series, "anl").await.unwrap().len(), 2);
}
