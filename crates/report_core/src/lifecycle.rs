//! Validation and the three write paths of a report: create, modify, triage.
//!
//! The inspector path and the triage path write disjoint field sets; neither
//! ever carries the other's fields.

use chrono::Utc;
use shared::{
    domain::{PhotoRef, Report, ReportId, Sector, SignStatus},
    protocol::TriageRequest,
};
use tracing::{info, warn};

use crate::{
    catalog::TrailCatalog,
    error::{AccessError, ReportError, ValidationReport, Violation},
    photo::CompressedImage,
    presenter::Visibility,
    session::Session,
    store::{InspectorEdit, NewReport, ReportOrder, ReportPatch, ReportQuery, TriageEdit},
    ReportContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// When off, any non-empty trail is accepted for the selected sector.
    pub strict_trail_membership: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            strict_trail_membership: true,
        }
    }
}

/// Inspector-editable fields as entered, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDraft {
    pub status: Option<SignStatus>,
    pub sector: Option<Sector>,
    pub trail: Option<String>,
    pub comments: Option<String>,
}

impl ReportDraft {
    pub fn from_report(report: &Report) -> Self {
        Self {
            status: report.status,
            sector: Some(report.sector),
            trail: Some(report.trail.clone()),
            comments: report.comments.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub status: Option<SignStatus>,
    pub sector: Sector,
    pub trail: String,
    pub comments: Option<String>,
}

/// Photo attached to a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PhotoSlot {
    #[default]
    Empty,
    /// Already uploaded; kept as is.
    Stored(PhotoRef),
    /// Compressed but not yet uploaded.
    Pending(CompressedImage),
}

impl PhotoSlot {
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub fn stored_ref(&self) -> Option<&PhotoRef> {
        match self {
            Self::Stored(photo_ref) => Some(photo_ref),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageDecision {
    pub resolved: bool,
    pub archived: bool,
    pub admin_comments: Option<String>,
}

impl From<TriageRequest> for TriageDecision {
    fn from(value: TriageRequest) -> Self {
        Self {
            resolved: value.resolved,
            archived: value.archived,
            admin_comments: value.admin_comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub id: ReportId,
    pub photo_ref: Option<PhotoRef>,
}

/// Checks status-or-photo, sector, then trail. All three rules are evaluated
/// and reported together.
pub fn validate(
    draft: &ReportDraft,
    has_photo: bool,
    catalog: &dyn TrailCatalog,
    policy: ValidationPolicy,
) -> Result<ValidDraft, ValidationReport> {
    let mut violations = Vec::new();

    if draft.status.is_none() && !has_photo {
        violations.push(Violation::MissingStatusOrPhoto);
    }
    if draft.sector.is_none() {
        violations.push(Violation::MissingSector);
    }

    let trail = draft
        .trail
        .as_deref()
        .map(str::trim)
        .filter(|trail| !trail.is_empty());
    match (draft.sector, trail) {
        (_, None) => violations.push(Violation::MissingTrail),
        (Some(sector), Some(trail))
            if policy.strict_trail_membership && !catalog.contains(sector, trail) =>
        {
            violations.push(Violation::UnknownTrail {
                sector,
                trail: trail.to_string(),
            });
        }
        _ => {}
    }

    match (draft.sector, trail) {
        (Some(sector), Some(trail)) if violations.is_empty() => Ok(ValidDraft {
            status: draft.status,
            sector,
            trail: trail.to_string(),
            comments: normalize_text(draft.comments.as_deref()),
        }),
        _ => Err(ValidationReport::new(violations)),
    }
}

/// Trims free text; blank input counts as absent.
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn validate_for(
    ctx: &ReportContext,
    session: &Session,
    draft: &ReportDraft,
    photo: &PhotoSlot,
) -> Result<ValidDraft, ReportError> {
    validate(draft, photo.is_present(), ctx.catalog.as_ref(), ctx.policy).map_err(|report| {
        warn!(
            inspector_id = %session.inspector_id(),
            violations = report.violations().len(),
            "report rejected by validation"
        );
        ReportError::Validation(report)
    })
}

/// Uploads a pending photo and turns the slot into `Stored`, so a retry after
/// a failed report write reuses the uploaded blob.
async fn resolve_photo(
    ctx: &ReportContext,
    session: &Session,
    photo: &mut PhotoSlot,
) -> Result<Option<PhotoRef>, ReportError> {
    let image = match photo {
        PhotoSlot::Empty => return Ok(None),
        PhotoSlot::Stored(photo_ref) => return Ok(Some(photo_ref.clone())),
        PhotoSlot::Pending(image) => image,
    };
    let photo_ref = ctx
        .photos
        .store_photo(session.inspector_id(), image)
        .await
        .map_err(ReportError::store)?;
    info!(%photo_ref, bytes = image.bytes.len(), "photo stored");
    *photo = PhotoSlot::Stored(photo_ref.clone());
    Ok(Some(photo_ref))
}

pub async fn create_report(
    ctx: &ReportContext,
    session: &Session,
    draft: &ReportDraft,
    photo: &mut PhotoSlot,
) -> Result<SavedReport, ReportError> {
    session.require_submit()?;
    let valid = validate_for(ctx, session, draft, photo)?;
    let photo_ref = resolve_photo(ctx, session, photo).await?;

    let actor = session.actor();
    let id = ctx
        .reports
        .create(NewReport {
            inspector_id: actor.inspector_id,
            inspector_name: actor.name.clone(),
            status: valid.status,
            sector: valid.sector,
            trail: valid.trail,
            comments: valid.comments,
            photo_ref: photo_ref.clone(),
            stamped_at: Utc::now(),
        })
        .await
        .map_err(ReportError::store)?;

    info!(
        report_id = %id,
        inspector_id = %actor.inspector_id,
        sector = %valid.sector,
        "report created"
    );
    Ok(SavedReport { id, photo_ref })
}

pub async fn modify_report(
    ctx: &ReportContext,
    session: &Session,
    id: ReportId,
    draft: &ReportDraft,
    photo: &mut PhotoSlot,
) -> Result<SavedReport, ReportError> {
    session.require_submit()?;
    let valid = validate_for(ctx, session, draft, photo)?;
    load_own_report(ctx, session, id).await?;
    let photo_ref = resolve_photo(ctx, session, photo).await?;

    let patch = ReportPatch::Inspector(InspectorEdit {
        status: valid.status,
        sector: valid.sector,
        trail: valid.trail,
        comments: valid.comments,
        photo_ref: photo_ref.clone(),
        modified_at: Utc::now(),
    });
    let updated = ctx
        .reports
        .update(id, patch)
        .await
        .map_err(ReportError::store)?;
    if !updated {
        return Err(ReportError::NotFound(id));
    }

    info!(report_id = %id, inspector_id = %session.inspector_id(), "report modified");
    Ok(SavedReport { id, photo_ref })
}

/// Writes the administrator fields and returns the report as stored afterwards.
///
/// Once the update has landed the call succeeds; if reloading fails, the edit
/// is applied to the copy read beforehand.
pub async fn triage_report(
    ctx: &ReportContext,
    session: &Session,
    id: ReportId,
    decision: &TriageDecision,
) -> Result<Report, ReportError> {
    session.require_admin()?;
    let mut before = load_report(ctx, id).await?;

    let edit = TriageEdit {
        resolved: decision.resolved,
        archived: decision.archived,
        admin_comments: normalize_text(decision.admin_comments.as_deref()),
        admin_modified_at: Utc::now(),
    };
    let updated = ctx
        .reports
        .update(id, ReportPatch::Triage(edit.clone()))
        .await
        .map_err(ReportError::store)?;
    if !updated {
        return Err(ReportError::NotFound(id));
    }

    let report = match load_report(ctx, id).await {
        Ok(report) => report,
        Err(err) => {
            warn!(report_id = %id, error = %err, "triage saved but reloading the report failed");
            edit.apply_to(&mut before);
            before
        }
    };
    info!(
        report_id = %id,
        admin_id = %session.inspector_id(),
        resolved = report.resolved,
        archived = report.archived,
        "report triaged"
    );
    Ok(report)
}

async fn load_report(ctx: &ReportContext, id: ReportId) -> Result<Report, ReportError> {
    ctx.reports
        .get(id)
        .await
        .map_err(ReportError::store)?
        .ok_or(ReportError::NotFound(id))
}

/// Loads a report for the submit form; only the creator may open it.
pub async fn load_own_report(
    ctx: &ReportContext,
    session: &Session,
    id: ReportId,
) -> Result<Report, ReportError> {
    let report = load_report(ctx, id).await?;
    if report.inspector_id != session.inspector_id() {
        return Err(AccessError::NotOwner { report_id: id }.into());
    }
    Ok(report)
}

pub async fn load_any_report(
    ctx: &ReportContext,
    session: &Session,
    id: ReportId,
) -> Result<Report, ReportError> {
    session.require_admin()?;
    load_report(ctx, id).await
}

/// The actor's own reports, newest first.
pub async fn inspector_reports(
    ctx: &ReportContext,
    session: &Session,
    limit: u32,
) -> Result<Vec<Report>, ReportError> {
    ctx.reports
        .query(
            ReportQuery::by_inspector(session.inspector_id()),
            ReportOrder::CreatedAtDesc,
            Some(limit),
        )
        .await
        .map_err(ReportError::store)
}

/// Every report that passes the visibility toggles, newest first.
pub async fn admin_reports(
    ctx: &ReportContext,
    session: &Session,
    visibility: Visibility,
) -> Result<Vec<Report>, ReportError> {
    session.require_admin()?;
    ctx.reports
        .query(visibility.query(), ReportOrder::CreatedAtDesc, None)
        .await
        .map_err(ReportError::store)
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
