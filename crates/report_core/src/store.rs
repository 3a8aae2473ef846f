use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::{InspectorId, PhotoRef, Report, ReportId, Sector, SignStatus};

/// Document written on creation. The store assigns the id and sets
/// `created_at = modified_at = stamped_at` with both triage flags cleared.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub inspector_id: InspectorId,
    pub inspector_name: String,
    pub status: Option<SignStatus>,
    pub sector: Sector,
    pub trail: String,
    pub comments: Option<String>,
    pub photo_ref: Option<PhotoRef>,
    pub stamped_at: DateTime<Utc>,
}

/// Fields the inspector path may overwrite.
#[derive(Debug, Clone)]
pub struct InspectorEdit {
    pub status: Option<SignStatus>,
    pub sector: Sector,
    pub trail: String,
    pub comments: Option<String>,
    pub photo_ref: Option<PhotoRef>,
    pub modified_at: DateTime<Utc>,
}

/// Fields the administrator path may overwrite.
///
/// A flag written as `true` stamps its `*_at` column with `admin_modified_at`
/// only when that column is still empty; stamps are never cleared.
#[derive(Debug, Clone)]
pub struct TriageEdit {
    pub resolved: bool,
    pub archived: bool,
    pub admin_comments: Option<String>,
    pub admin_modified_at: DateTime<Utc>,
}

impl TriageEdit {
    /// Applies the edit to an in-memory copy with the same stamping rules.
    pub fn apply_to(&self, report: &mut Report) {
        report.resolved = self.resolved;
        report.archived = self.archived;
        report.admin_comments = self.admin_comments.clone();
        report.admin_modified_at = Some(self.admin_modified_at);
        if self.resolved && report.resolved_at.is_none() {
            report.resolved_at = Some(self.admin_modified_at);
        }
        if self.archived && report.archived_at.is_none() {
            report.archived_at = Some(self.admin_modified_at);
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReportPatch {
    Inspector(InspectorEdit),
    Triage(TriageEdit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub inspector: Option<InspectorId>,
    pub include_resolved: bool,
    pub include_archived: bool,
}

impl ReportQuery {
    pub fn all() -> Self {
        Self {
            inspector: None,
            include_resolved: true,
            include_archived: true,
        }
    }

    pub fn by_inspector(inspector_id: InspectorId) -> Self {
        Self {
            inspector: Some(inspector_id),
            ..Self::all()
        }
    }

    pub fn visible(include_resolved: bool, include_archived: bool) -> Self {
        Self {
            inspector: None,
            include_resolved,
            include_archived,
        }
    }

    pub fn matches(&self, report: &Report) -> bool {
        if let Some(inspector_id) = self.inspector {
            if report.inspector_id != inspector_id {
                return false;
            }
        }
        if !self.include_resolved && report.resolved {
            return false;
        }
        if !self.include_archived && report.archived {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportOrder {
    #[default]
    CreatedAtDesc,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, report: NewReport) -> Result<ReportId>;
    async fn get(&self, id: ReportId) -> Result<Option<Report>>;
    /// Returns `false` when no document has this id.
    async fn update(&self, id: ReportId, patch: ReportPatch) -> Result<bool>;
    async fn query(
        &self,
        filter: ReportQuery,
        order: ReportOrder,
        limit: Option<u32>,
    ) -> Result<Vec<Report>>;
}
