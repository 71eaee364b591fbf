//! Normalizes and saves synthetic diagnostics, then queries them back.

use std::sync::Arc;

use diag_common::{DiagError, MinimLoop, Variable};
use diag_query::{DiagnosticService, Series};
use ingestion::{normalize, parse_diag_filename, Ingester};
use storage::{resolve, HistoryArchive, ObjectStorage, S3Credentials};
use tempfile::TempDir;
use test_utils::{scalar_raw_diagnostic, wind_raw_diagnostic, MemoryRunIndex};

struct Harness {
    _zarr: TempDir,
    _parquet: TempDir,
    ingester: Ingester,
    service: DiagnosticService,
}

fn harness() -> Harness {
    let zarr = TempDir::new().unwrap();
    let parquet = TempDir::new().unwrap();

    let store = resolve(zarr.path().to_str().unwrap()).unwrap();
    let archive = HistoryArchive::new(
        ObjectStorage::from_uri(parquet.path().to_str().unwrap(), &S3Credentials::default()).unwrap(),
    );
    let index = Arc::new(MemoryRunIndex::new());

    Harness {
        ingester: Ingester::new(store.clone(), index.clone()).with_archive(archive.clone()),
        service: DiagnosticService::new(store, archive, index),
        _zarr: zarr,
        _parquet: parquet,
    }
}

fn series(variable: Variable) -> Series {
    Series {
        model: "RTMA".to_string(),
        system: "WCOSS".to_string(),
        domain: "CONUS".to_string(),
        background: "HRRR".to_string(),
        frequency: "REALTIME".to_string(),
        variable,
    }
}

fn filters(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn save_temperature(h: &Harness, filename: &str) {
    let meta = parse_diag_filename(filename).unwrap();
    let dataset = normalize(&scalar_raw_diagnostic(false), &meta).unwrap();
    assert_eq!(dataset.nobs(), 3);
    assert_eq!(dataset.longitude, vec![90.0, -90.0, 180.0]);
    assert_eq!(dataset.is_used, vec![true, false, true]);
    h.ingester.save(dataset).await.unwrap();
}

#[tokio::test]
async fn test_default_query_returns_used_observations() {
    let h = harness();
    save_temperature(&h, "RTMA_WCOSS_CONUS_REALTIME_diag_t_anl.202205051400.HRRR.nc4").await;
    let t = series(Variable::Temperature);

    let used = h
        .service
        .records(&t, "2022-05-05T14:00", MinimLoop::Analysis, &[])
        .await
        .unwrap();
    assert_eq!(used.len(), 2);

    let all = h
        .service
        .records(&t, "2022-05-05T14:00", MinimLoop::Analysis, &filters(&[("is_used", "true::false")]))
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_missing_run_is_not_found() {
    let h = harness();
    save_temperature(&h, "RTMA_WCOSS_CONUS_REALTIME_diag_t_anl.202205051400.HRRR.nc4").await;

    let err = h
        .service
        .records(&series(Variable::Temperature), "2022-05-05T14:00", MinimLoop::Guess, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DiagError::GroupNotFound(_)));
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn test_wind_magnitude_and_observations() {
    let h = harness();
    let meta = parse_diag_filename("RTMA_WCOSS_CONUS_REALTIME_diag_uv_ges.202205051400.HRRR.nc4").unwrap();
    h.ingester
        .save(normalize(&wind_raw_diagnostic(true), &meta).unwrap())
        .await
        .unwrap();
    let uv = series(Variable::Wind);

    let rows = h
        .service
        .magnitude(&uv, "2022-05-05T14:00", MinimLoop::Guess, &[])
        .await
        .unwrap();
    // the second observation is not used
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].observation, 10.0);
    assert_eq!(rows[0].longitude, -105.0);

    let observations = h
        .service
        .observations(&uv, "2022-05-05T14:00", MinimLoop::Guess, &filters(&[("is_used", "true::false")]))
        .await
        .unwrap();
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[1].variable, "wind");
}

#[tokio::test]
async fn test_history_and_run_list() {
    let h = harness();
    save_temperature(&h, "RTMA_WCOSS_CONUS_REALTIME_diag_t_anl.202205051400.HRRR.nc4").await;
    save_temperature(&h, "RTMA_WCOSS_CONUS_REALTIME_diag_t_anl.202205051500.HRRR.nc4").await;
    save_temperature(&h, "RTMA_WCOSS_CONUS_REALTIME_diag_t_ges.202205051500.HRRR.nc4").await;
    let t = series(Variable::Temperature);

    let history = h.service.history(&t, MinimLoop::Analysis).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].initialization_time, "2022-05-05T14:00");
    assert_eq!(history[1].initialization_time, "2022-05-05T15:00");
    // used observations have unadjusted innovations 0.5 and 2.0
    assert_eq!(history[0].count, 2);
    assert_eq!(history[0].min, Some(0.5));
    assert_eq!(history[0].max, Some(2.0));
    assert_eq!(history[0].mean, Some(1.25));

    let runs = h.service.run_list(&t).await.unwrap();
    assert_eq!(runs, vec!["2022-05-05T14:00", "2022-05-05T15:00"]);

    let metadata = h.service.model_metadata().await.unwrap();
    assert_eq!(metadata.model_list, vec!["RTMA"]);
    assert_eq!(metadata.background_list, vec!["HRRR"]);
    assert_eq!(metadata.init_time_list, vec!["2022-05-05T14:00", "2022-05-05T15:00"]);
}

#[tokio::test]
async fn test_empty_history() {
    let h = harness();
    let history = h
        .service
        .history(&series(Variable::Moisture), MinimLoop::Guess)
        .await
        .unwrap();
    assert!(history.is_empty());
}
