//! Reads a small diagnostic file written with the netcdf library.

use ncdiag_parser::{load_raw_diagnostic, NetCdfError};

fn write_fixture(path: &std::path::Path) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("nobs", 3)?;
    file.add_dimension("nchars", 8)?;

    let mut lat = file.add_variable::<f32>("Latitude", &["nobs"])?;
    lat.put_values(&[22.0f32, 23.0, 24.0], ..)?;

    let mut lon = file.add_variable::<f32>("Longitude", &["nobs"])?;
    lon.put_values(&[90.0f32, 270.0, 180.0], ..)?;

    let mut flag = file.add_variable::<i32>("Analysis_Use_Flag", &["nobs"])?;
    flag.put_values(&[1i32, -1, 1], ..)?;

    let mut observation = file.add_variable::<f32>("Observation", &["nobs"])?;
    observation.put_attribute("_FillValue", 9.96921e36f32)?;
    observation.put_values(&[1.5f32, 9.96921e36, 3.5], ..)?;

    let mut omf = file.add_variable::<f64>("Obs_Minus_Forecast_unadjusted", &["nobs"])?;
    omf.put_attribute("missing_value", -999.0f64)?;
    omf.put_values(&[-999.0f64, 0.5, 1.0], ..)?;

    let mut station = file.add_variable::<u8>("Station_ID", &["nobs", "nchars"])?;
    station.put_values(&[b'A'; 24], ..)?;

    Ok(())
}

#[test]
fn test_reads_observation_variables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diag_t_anl.202205051400.nc4");
    write_fixture(&path).unwrap();

    let raw = load_raw_diagnostic(&path).unwrap();

    assert_eq!(raw.nobs(), 3);
    assert_eq!(raw.get("Longitude"), Some(&[90.0, 270.0, 180.0][..]));
    assert_eq!(raw.get("Analysis_Use_Flag"), Some(&[1.0, -1.0, 1.0][..]));
    assert!(!raw.contains("Station_ID"));
}

#[test]
fn test_missing_value_attributes_read_as_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diag_t_anl.202205051400.nc4");
    write_fixture(&path).unwrap();

    let raw = load_raw_diagnostic(&path).unwrap();

    let observation = raw.get("Observation").unwrap();
    assert_eq!(observation[0], 1.5);
    assert!(observation[1].is_nan());
    assert_eq!(observation[2], 3.5);

    let omf = raw.get("Obs_Minus_Forecast_unadjusted").unwrap();
    assert!(omf[0].is_nan());
    assert_eq!(&omf[1..], &[0.5, 1.0]);
}

#[test]
fn test_missing_file_is_not_found() {
    let err = load_raw_diagnostic(std::path::Path::new("/nonexistent/diag_t_anl.2022050514.nc4"))
        .unwrap_err();
    match err {
        NetCdfError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other}"),
    }
}
