//! Administrator console: a fetched snapshot of reports, live table
//! controls over it, and an editor for one report's triage fields.

use shared::{
    domain::{Report, ReportId, Sector},
    protocol::{ReportDetail, SortKey, TableView},
};
use tracing::{debug, info, warn};

use crate::{
    error::ReportError,
    lifecycle::{self, TriageDecision},
    presenter::{self, TableControls, Visibility},
    session::Session,
    ReportContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Loading,
    Failed(String),
    Ready(Vec<Report>),
}

/// Triage fields of the report open in the detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageEditor {
    pub report: Report,
    pub resolved: bool,
    pub archived: bool,
    pub admin_comments: String,
}

impl TriageEditor {
    fn open(report: Report) -> Self {
        Self {
            resolved: report.resolved,
            archived: report.archived,
            admin_comments: report.admin_comments.clone().unwrap_or_default(),
            report,
        }
    }

    fn decision(&self) -> TriageDecision {
        TriageDecision {
            resolved: self.resolved,
            archived: self.archived,
            admin_comments: Some(self.admin_comments.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeskCommand {
    Refresh,
    SetShowResolved(bool),
    SetShowArchived(bool),
    SetSectorFilter(Option<Sector>),
    SetSort(SortKey),
    Open(ReportId),
    EditTriage {
        resolved: bool,
        archived: bool,
        admin_comments: String,
    },
    SaveTriage,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskOutcome {
    Updated,
    Fetched(usize),
    Opened(ReportId),
    Saved(ReportId),
    Closed,
}

pub struct TriageDesk {
    ctx: ReportContext,
    session: Session,
    visibility: Visibility,
    controls: TableControls,
    snapshot: Snapshot,
    editor: Option<TriageEditor>,
}

impl TriageDesk {
    /// Only administrators may open the console.
    pub fn new(ctx: ReportContext, session: Session) -> Result<Self, ReportError> {
        session.require_admin()?;
        Ok(Self {
            ctx,
            session,
            visibility: Visibility::default(),
            controls: TableControls::default(),
            snapshot: Snapshot::Loading,
            editor: None,
        })
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn controls(&self) -> TableControls {
        self.controls
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn editor(&self) -> Option<&TriageEditor> {
        self.editor.as_ref()
    }

    pub fn view(&self) -> TableView {
        match &self.snapshot {
            Snapshot::Loading => TableView::Loading,
            Snapshot::Failed(message) => TableView::Error {
                message: message.clone(),
            },
            Snapshot::Ready(reports) => {
                presenter::present_table(reports, self.controls, self.ctx.catalog.as_ref())
            }
        }
    }

    pub fn detail(&self) -> Option<ReportDetail> {
        self.editor
            .as_ref()
            .map(|editor| presenter::report_detail(&editor.report, self.ctx.catalog.as_ref()))
    }

    pub async fn dispatch(&mut self, command: DeskCommand) -> Result<DeskOutcome, ReportError> {
        debug!(?command, "triage command");
        match command {
            DeskCommand::Refresh => self.refresh().await,
            DeskCommand::SetShowResolved(show) => {
                self.visibility.show_resolved = show;
                self.refresh().await
            }
            DeskCommand::SetShowArchived(show) => {
                self.visibility.show_archived = show;
                self.refresh().await
            }
            DeskCommand::SetSectorFilter(sector) => {
                self.controls.sector = sector;
                Ok(DeskOutcome::Updated)
            }
            DeskCommand::SetSort(sort) => {
                self.controls.sort = sort;
                Ok(DeskOutcome::Updated)
            }
            DeskCommand::Open(id) => {
                let report = lifecycle::load_any_report(&self.ctx, &self.session, id).await?;
                self.editor = Some(TriageEditor::open(report));
                Ok(DeskOutcome::Opened(id))
            }
            DeskCommand::EditTriage {
                resolved,
                archived,
                admin_comments,
            } => {
                let editor = self.editor.as_mut().ok_or(ReportError::WrongMode {
                    action: "edit triage",
                    mode: "no report is open",
                })?;
                editor.resolved = resolved;
                editor.archived = archived;
                editor.admin_comments = admin_comments;
                Ok(DeskOutcome::Updated)
            }
            DeskCommand::SaveTriage => self.save_triage().await,
            DeskCommand::Close => {
                self.editor = None;
                Ok(DeskOutcome::Closed)
            }
        }
    }

    /// Re-runs the fetch with the current visibility toggles. A failure is
    /// kept in the snapshot so the table can show it.
    pub async fn refresh(&mut self) -> Result<DeskOutcome, ReportError> {
        self.snapshot = Snapshot::Loading;
        match lifecycle::admin_reports(&self.ctx, &self.session, self.visibility).await {
            Ok(reports) => {
                let count = reports.len();
                debug!(count, visibility = ?self.visibility, "triage snapshot fetched");
                self.snapshot = Snapshot::Ready(reports);
                Ok(DeskOutcome::Fetched(count))
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch reports for triage");
                self.snapshot = Snapshot::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn save_triage(&mut self) -> Result<DeskOutcome, ReportError> {
        let editor = self.editor.as_ref().ok_or(ReportError::WrongMode {
            action: "save triage",
            mode: "no report is open",
        })?;
        let id = editor.report.id;
        let decision = editor.decision();

        let report = lifecycle::triage_report(&self.ctx, &self.session, id, &decision).await?;
        self.editor = Some(TriageEditor::open(report));
        info!(report_id = %id, "triage saved, refreshing table");

        if let Err(err) = self.refresh().await {
            warn!(report_id = %id, error = %err, "triage saved but table refresh failed");
        }
        Ok(DeskOutcome::Saved(id))
    }
}

#[cfg(test)]
#[path = "tests/triage_tests.rs"]
mod tests;
