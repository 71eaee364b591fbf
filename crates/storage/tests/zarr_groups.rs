//! Writing and reading diagnostic groups in a local zarr store.

use std::path::Path;

use diag_common::DiagError;
use storage::{list_child_groups, open_group, resolve, series_path, write_group, GroupPath};
use test_utils::{scalar_dataset, wind_dataset};

fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().display().to_string();
                files.push((rel, std::fs::read(&path).unwrap()));
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_scalar_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let dataset = scalar_dataset();
    let path = GroupPath::for_run(&dataset.attributes);

    write_group(&store, &path, &dataset).unwrap();

    assert!(dir
        .path()
        .join("RTMA/WCOSS/CONUS/HRRR/REALTIME/t/2022-05-05T14:00/anl/zarr.json")
        .exists());
    assert_eq!(open_group(&store, &path).unwrap(), dataset);
}

#[test]
fn test_vector_round_trip_preserves_component_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let dataset = wind_dataset();
    let path = GroupPath::for_run(&dataset.attributes);

    write_group(&store, &path, &dataset).unwrap();
    let reopened = open_group(&store, &path).unwrap();

    assert_eq!(reopened.components, Some(vec!["u".to_string(), "v".to_string()]));
    assert_eq!(reopened, dataset);
}

#[test]
fn test_rewrite_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let dataset = scalar_dataset();
    let path = GroupPath::for_run(&dataset.attributes);

    write_group(&store, &path, &dataset).unwrap();
    let first = snapshot(dir.path());
    write_group(&store, &path, &dataset).unwrap();

    assert_eq!(snapshot(dir.path()), first);
}

#[test]
fn test_sibling_groups_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();

    let anl = scalar_dataset();
    let mut ges = scalar_dataset();
    ges.attributes.loop_ = "ges".to_string();

    write_group(&store, &GroupPath::for_run(&anl.attributes), &anl).unwrap();
    write_group(&store, &GroupPath::for_run(&ges.attributes), &ges).unwrap();

    assert_eq!(open_group(&store, &GroupPath::for_run(&anl.attributes)).unwrap(), anl);
    assert_eq!(open_group(&store, &GroupPath::for_run(&ges.attributes)).unwrap(), ges);
}

#[test]
fn test_missing_group_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let path = GroupPath::new("a", "b", "c", "d", "e", "t", "2022-01-01T00:00", "anl");

    assert!(matches!(
        open_group(&store, &path),
        Err(DiagError::GroupNotFound(_))
    ));
}

#[test]
fn test_file_in_path_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/b/c"), b"not a group").unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let path = GroupPath::new("a", "b", "c", "d", "e", "t", "2022-01-01T00:00", "anl");

    let err = open_group(&store, &path).unwrap_err();
    assert!(matches!(err, DiagError::GroupPathConflict(_)));
    assert_eq!(err.http_status_code(), 500);
}

#[test]
fn test_list_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();

    for time in ["2022-05-05T14:00", "2022-05-05T12:00"] {
        let mut dataset = scalar_dataset();
        dataset.attributes.initialization_time = time.to_string();
        write_group(&store, &GroupPath::for_run(&dataset.attributes), &dataset).unwrap();
    }

    let series = series_path("RTMA", "WCOSS", "CONUS", "HRRR", "REALTIME", "t");
    assert_eq!(
        list_child_groups(&store, &series).unwrap(),
        vec!["2022-05-05T12:00", "2022-05-05T14:00"]
    );

    let missing = series_path("RTMA", "WCOSS", "CONUS", "HRRR", "REALTIME", "q");
    assert!(matches!(
        list_child_groups(&store, &missing),
        Err(DiagError::GroupNotFound(_))
    ));
}

#[test]
fn test_empty_dataset_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = resolve(dir.path().to_str().unwrap()).unwrap();
    let dataset = scalar_dataset().select(&[]);
    let path = GroupPath::for_run(&dataset.attributes);

    write_group(&store, &path, &dataset).unwrap();
    assert_eq!(open_group(&store, &path).unwrap().nobs(), 0);
}
