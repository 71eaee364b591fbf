//! Diagnostic data handlers.
//!
//! Query strings are filters: each `key=value` pair bounds one coordinate and
//! repeated keys are all applied.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use diag_common::{DiagResult, MinimLoop};
use diag_query::{feature_collection, HistoryPoint, MagnitudeRecord, Record, Series};

use crate::error::ApiResult;
use crate::state::AppState;

type Filters = Query<Vec<(String, String)>>;

/// Path segments naming a series.
#[derive(Debug, Deserialize)]
pub struct SeriesParams {
    pub model: String,
    pub system: String,
    pub domain: String,
    pub background: String,
    pub frequency: String,
    pub variable: String,
}

impl SeriesParams {
    fn series(self) -> DiagResult<Series> {
        Ok(Series {
            variable: self.variable.parse()?,
            model: self.model,
            system: self.system,
            domain: self.domain,
            background: self.background,
            frequency: self.frequency,
        })
    }
}

/// Path segments naming one loop of a series.
#[derive(Debug, Deserialize)]
pub struct LoopParams {
    pub model: String,
    pub system: String,
    pub domain: String,
    pub background: String,
    pub frequency: String,
    pub variable: String,
    #[serde(rename = "loop")]
    pub loop_: String,
}

impl LoopParams {
    fn parse(self) -> DiagResult<(Series, MinimLoop)> {
        let loop_ = self.loop_.parse()?;
        let series = SeriesParams {
            model: self.model,
            system: self.system,
            domain: self.domain,
            background: self.background,
            frequency: self.frequency,
            variable: self.variable,
        }
        .series()?;
        Ok((series, loop_))
    }
}

/// Path segments naming one run.
#[derive(Debug, Deserialize)]
pub struct RunParams {
    pub model: String,
    pub system: String,
    pub domain: String,
    pub background: String,
    pub frequency: String,
    pub variable: String,
    pub initialization_time: String,
    #[serde(rename = "loop")]
    pub loop_: String,
}

impl RunParams {
    fn parse(self) -> DiagResult<(Series, String, MinimLoop)> {
        let loop_ = self.loop_.parse()?;
        let series = SeriesParams {
            model: self.model,
            system: self.system,
            domain: self.domain,
            background: self.background,
            frequency: self.frequency,
            variable: self.variable,
        }
        .series()?;
        Ok((series, self.initialization_time, loop_))
    }
}

/// GET /diag/{model}/{system}/{domain}/{background}/{frequency}/{variable}/ - Run list
pub async fn run_list_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(params): Path<SeriesParams>,
) -> ApiResult<Json<Vec<String>>> {
    let series = params.series()?;
    Ok(Json(state.service.run_list(&series).await?))
}

/// GET /diag/{model}/{system}/{domain}/{background}/{frequency}/{variable}/{loop}/ - History
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(params): Path<LoopParams>,
) -> ApiResult<Json<Vec<HistoryPoint>>> {
    let (series, loop_) = params.parse()?;
    Ok(Json(state.service.history(&series, loop_).await?))
}

/// GET /diag/.../{initialization_time}/{loop}/ - Filtered observation records
pub async fn records_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(params): Path<RunParams>,
    Query(filters): Filters,
) -> ApiResult<Json<Vec<Record>>> {
    let (series, init_time, loop_) = params.parse()?;
    Ok(Json(state.service.records(&series, &init_time, loop_, &filters).await?))
}

/// GET /diag/.../{initialization_time}/{loop}/magnitude/ - Filtered magnitudes
pub async fn magnitude_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(params): Path<RunParams>,
    Query(filters): Filters,
) -> ApiResult<Json<Vec<MagnitudeRecord>>> {
    let (series, init_time, loop_) = params.parse()?;
    Ok(Json(state.service.magnitude(&series, &init_time, loop_, &filters).await?))
}

/// GET /diag/.../{initialization_time}/{loop}/geojson/ - Filtered observations as
/// a GeoJSON FeatureCollection
pub async fn geojson_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(params): Path<RunParams>,
    Query(filters): Filters,
) -> ApiResult<Json<Value>> {
    let (series, init_time, loop_) = params.parse()?;
    let observations = state.service.observations(&series, &init_time, loop_, &filters).await?;
    Ok(Json(feature_collection(&observations)))
}
