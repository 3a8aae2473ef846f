use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use report_core::{
    catalog::sector_summaries,
    lifecycle::{self, PhotoSlot, ReportDraft, TriageDecision},
    photo::RawImage,
    presenter::{self, TableControls, Visibility},
    session::{authorize, Session},
    ReportError,
};
use serde::Deserialize;
use shared::{
    domain::{InspectorId, PhotoRef, Report, ReportId, Sector},
    error::{ApiError, ErrorCode},
    protocol::{
        HistoryEntry, PhotoUpload, ReportCreatedResponse, ReportDetail, SectorSummary,
        SessionInfo, SortKey, SubmitReportRequest, TableView, TriageRequest,
    },
};
use tracing::{error, info, warn};

use crate::app_state::AppState;

pub(crate) type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
pub(crate) struct ActorQuery {
    inspector_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminTableQuery {
    inspector_id: Option<i64>,
    #[serde(default)]
    show_resolved: bool,
    #[serde(default)]
    show_archived: bool,
    sector: Option<String>,
    #[serde(default)]
    sort: SortKey,
}

impl AdminTableQuery {
    fn visibility(&self) -> Visibility {
        Visibility {
            show_resolved: self.show_resolved,
            show_archived: self.show_archived,
        }
    }

    fn controls(&self) -> Result<TableControls, ApiError> {
        let sector = self
            .sector
            .as_deref()
            .map(str::trim)
            .filter(|sector| !sector.is_empty())
            .map(Sector::from_str)
            .transpose()?;
        Ok(TableControls {
            sector,
            sort: self.sort,
        })
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn api_error(error: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(error.code), Json(error))
}

fn reject(err: ReportError) -> (StatusCode, Json<ApiError>) {
    match &err {
        ReportError::Store { .. } => error!(error = %err, "report store failure"),
        _ => warn!(error = %err, code = ?err.code(), "request rejected"),
    }
    api_error(err.into())
}

async fn session_for(state: &AppState, inspector_id: Option<i64>) -> ApiResult<Session> {
    authorize(&state.storage, inspector_id.map(InspectorId))
        .await
        .map_err(reject)
}

fn draft_from(req: &SubmitReportRequest) -> ReportDraft {
    ReportDraft {
        status: req.status,
        sector: req.sector,
        trail: req.trail.clone(),
        comments: req.comments.clone(),
    }
}

fn decode_upload(upload: &PhotoUpload) -> Result<RawImage, ApiError> {
    let data = upload
        .data_b64
        .split_once("base64,")
        .map_or(upload.data_b64.as_str(), |(_, data)| data);
    let bytes = STANDARD.decode(data.trim()).map_err(|e| {
        ApiError::new(
            ErrorCode::Validation,
            format!("invalid base64 photo '{}': {e}", upload.file_name),
        )
    })?;
    Ok(RawImage {
        file_name: upload.file_name.clone(),
        bytes,
    })
}

/// Compresses a freshly uploaded photo; without one, `fallback` is kept.
async fn photo_slot(
    state: &AppState,
    upload: Option<&PhotoUpload>,
    fallback: PhotoSlot,
) -> ApiResult<PhotoSlot> {
    let Some(upload) = upload else {
        return Ok(fallback);
    };
    let raw = decode_upload(upload).map_err(api_error)?;
    let settings = state.reports.photo_settings;
    let compressed = state
        .reports
        .pipeline
        .compress(raw, settings.max_width, settings.quality)
        .await
        .map_err(|e| reject(ReportError::photo(e)))?;
    Ok(PhotoSlot::Pending(compressed))
}

pub(crate) async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

pub(crate) async fn current_session(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ActorQuery>,
) -> ApiResult<Json<SessionInfo>> {
    let session = session_for(&state, q.inspector_id).await?;
    Ok(Json(session.info()))
}

pub(crate) async fn list_sectors(State(state): State<Arc<AppState>>) -> Json<Vec<SectorSummary>> {
    Json(sector_summaries(state.reports.catalog.as_ref()))
}

pub(crate) async fn my_reports(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ActorQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let session = session_for(&state, q.inspector_id).await?;
    let reports = lifecycle::inspector_reports(&state.reports, &session, state.history_limit)
        .await
        .map_err(reject)?;
    Ok(Json(presenter::history_entries(&reports)))
}

pub(crate) async fn create_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ActorQuery>,
    Json(req): Json<SubmitReportRequest>,
) -> ApiResult<(StatusCode, Json<ReportCreatedResponse>)> {
    let session = session_for(&state, q.inspector_id).await?;
    let mut photo = photo_slot(&state, req.photo.as_ref(), PhotoSlot::Empty).await?;
    let saved = lifecycle::create_report(&state.reports, &session, &draft_from(&req), &mut photo)
        .await
        .map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(ReportCreatedResponse {
            report_id: saved.id,
            photo_ref: saved.photo_ref,
        }),
    ))
}

pub(crate) async fn get_own_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<ReportId>,
    Query(q): Query<ActorQuery>,
) -> ApiResult<Json<Report>> {
    let session = session_for(&state, q.inspector_id).await?;
    let report = lifecycle::load_own_report(&state.reports, &session, report_id)
        .await
        .map_err(reject)?;
    Ok(Json(report))
}

pub(crate) async fn modify_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<ReportId>,
    Query(q): Query<ActorQuery>,
    Json(req): Json<SubmitReportRequest>,
) -> ApiResult<Json<ReportCreatedResponse>> {
    let session = session_for(&state, q.inspector_id).await?;
    let existing = lifecycle::load_own_report(&state.reports, &session, report_id)
        .await
        .map_err(reject)?;
    let kept = match existing.photo_ref {
        Some(photo_ref) if !req.remove_photo => PhotoSlot::Stored(photo_ref),
        _ => PhotoSlot::Empty,
    };
    let mut photo = photo_slot(&state, req.photo.as_ref(), kept).await?;
    let saved = lifecycle::modify_report(
        &state.reports,
        &session,
        report_id,
        &draft_from(&req),
        &mut photo,
    )
    .await
    .map_err(reject)?;
    Ok(Json(ReportCreatedResponse {
        report_id: saved.id,
        photo_ref: saved.photo_ref,
    }))
}

async fn admin_snapshot(state: &AppState, q: &AdminTableQuery) -> ApiResult<Vec<Report>> {
    let session = session_for(state, q.inspector_id).await?;
    lifecycle::admin_reports(&state.reports, &session, q.visibility())
        .await
        .map_err(reject)
}

pub(crate) async fn admin_table(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AdminTableQuery>,
) -> ApiResult<Json<TableView>> {
    let controls = q.controls().map_err(api_error)?;
    let reports = admin_snapshot(&state, &q).await?;
    Ok(Json(presenter::present_table(
        &reports,
        controls,
        state.reports.catalog.as_ref(),
    )))
}

/// Table body for the console page. Store failures render the error row.
pub(crate) async fn admin_table_html(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AdminTableQuery>,
) -> ApiResult<(StatusCode, Html<String>)> {
    let controls = q.controls().map_err(api_error)?;
    let (status, view) = match admin_snapshot(&state, &q).await {
        Ok(reports) => (
            StatusCode::OK,
            presenter::present_table(&reports, controls, state.reports.catalog.as_ref()),
        ),
        Err((status, Json(error))) if error.code == ErrorCode::Internal => (
            status,
            TableView::Error {
                message: error.message,
            },
        ),
        Err(rejection) => return Err(rejection),
    };
    Ok((status, Html(presenter::render_table_html(&view))))
}

pub(crate) async fn admin_report_detail(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<ReportId>,
    Query(q): Query<ActorQuery>,
) -> ApiResult<Json<ReportDetail>> {
    let session = session_for(&state, q.inspector_id).await?;
    let report = lifecycle::load_any_report(&state.reports, &session, report_id)
        .await
        .map_err(reject)?;
    Ok(Json(presenter::report_detail(
        &report,
        state.reports.catalog.as_ref(),
    )))
}

pub(crate) async fn triage_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<ReportId>,
    Query(q): Query<ActorQuery>,
    Json(req): Json<TriageRequest>,
) -> ApiResult<Json<ReportDetail>> {
    let session = session_for(&state, q.inspector_id).await?;
    let report = lifecycle::triage_report(
        &state.reports,
        &session,
        report_id,
        &TriageDecision::from(req),
    )
    .await
    .map_err(reject)?;
    Ok(Json(presenter::report_detail(
        &report,
        state.reports.catalog.as_ref(),
    )))
}

/// Photos are visible to their owner and to administrators. Anyone else gets
/// the same 404 as for a key that does not exist.
pub(crate) async fn download_photo(
    State(state): State<Arc<AppState>>,
    Path(photo_ref): Path<String>,
    Query(q): Query<ActorQuery>,
) -> ApiResult<impl IntoResponse> {
    let session = session_for(&state, q.inspector_id).await?;
    let photo_ref = PhotoRef(photo_ref.trim_start_matches('/').to_string());
    let not_found = || {
        api_error(ApiError::new(
            ErrorCode::NotFound,
            format!("photo '{photo_ref}' not found"),
        ))
    };
    let photo = state
        .reports
        .photos
        .load_photo(&photo_ref)
        .await
        .map_err(|e| reject(ReportError::store(e)))?
        .ok_or_else(not_found)?;

    if photo.owner != session.inspector_id() && !session.actor().is_admin {
        warn!(%photo_ref, inspector_id = %session.inspector_id(), "photo access denied");
        return Err(not_found());
    }

    info!(%photo_ref, bytes = photo.bytes.len(), "serving photo");
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&photo.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    Ok((StatusCode::OK, headers, photo.bytes))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
