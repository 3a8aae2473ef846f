use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{InspectorId, PhotoRef, PresentationState, ReportId, Sector, SignStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub inspector_id: InspectorId,
    pub name: String,
    pub may_submit: bool,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorSummary {
    pub sector: Sector,
    pub display_name: String,
    pub trails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub file_name: String,
    pub data_b64: String,
}

/// Body of both the create and the modify call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitReportRequest {
    #[serde(default)]
    pub status: Option<SignStatus>,
    #[serde(default)]
    pub sector: Option<Sector>,
    #[serde(default)]
    pub trail: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoUpload>,
    /// Only meaningful on modify: drop the stored photo instead of keeping it.
    #[serde(default)]
    pub remove_photo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCreatedResponse {
    pub report_id: ReportId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<PhotoRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRequest {
    pub resolved: bool,
    pub archived: bool,
    #[serde(default)]
    pub admin_comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub report_id: ReportId,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Date,
    Sector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBadge {
    pub label: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub report_id: ReportId,
    pub created: String,
    pub sector: String,
    pub trail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusBadge>,
    pub inspector_name: String,
    pub states: Vec<PresentationState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TableView {
    Loading,
    Error { message: String },
    Empty { placeholder: String },
    Rows { rows: Vec<ReportRow> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report_id: ReportId,
    pub sector: String,
    pub trail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusBadge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<PhotoRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub inspector_name: String,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    pub resolved: bool,
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}
