//! Inspector submit form: one report at a time, either a new one ("save")
//! or an existing one the inspector created ("modify").

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ReportId, Sector, SignStatus},
    protocol::HistoryEntry,
};
use tracing::{debug, warn};

use crate::{
    error::{FormField, ReportError},
    lifecycle::{self, PhotoSlot, ReportDraft, SavedReport},
    photo::RawImage,
    presenter::{self, HISTORY_LIMIT},
    session::Session,
    ReportContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    New,
    Editing(ReportId),
}

impl FormMode {
    fn describe(self) -> &'static str {
        match self {
            Self::New => "creating a new report",
            Self::Editing(_) => "editing an existing report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum FormCommand {
    StartNew,
    Load(ReportId),
    SetStatus(Option<SignStatus>),
    SetSector(Option<Sector>),
    SetTrail(Option<String>),
    SetComments(String),
    AttachPhoto(RawImage),
    RemovePhoto,
    Save,
    Modify,
    RefreshHistory,
}

impl FormCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::StartNew => "start_new",
            Self::Load(_) => "load",
            Self::SetStatus(_) => "set_status",
            Self::SetSector(_) => "set_sector",
            Self::SetTrail(_) => "set_trail",
            Self::SetComments(_) => "set_comments",
            Self::AttachPhoto(_) => "attach_photo",
            Self::RemovePhoto => "remove_photo",
            Self::Save => "save",
            Self::Modify => "modify",
            Self::RefreshHistory => "refresh_history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Updated,
    Loaded(ReportId),
    Created(ReportId),
    Modified(ReportId),
    HistoryRefreshed(usize),
}

pub struct ReportForm {
    ctx: ReportContext,
    session: Session,
    mode: FormMode,
    draft: ReportDraft,
    photo: PhotoSlot,
    report_datetime: DateTime<Utc>,
    invalid: BTreeSet<FormField>,
    history: Vec<HistoryEntry>,
    notice: Option<Notice>,
    busy: bool,
}

impl ReportForm {
    pub fn new(ctx: ReportContext, session: Session) -> Result<Self, ReportError> {
        session.require_submit()?;
        Ok(Self {
            ctx,
            session,
            mode: FormMode::New,
            draft: ReportDraft::default(),
            photo: PhotoSlot::Empty,
            report_datetime: Utc::now(),
            invalid: BTreeSet::new(),
            history: Vec::new(),
            notice: None,
            busy: false,
        })
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn photo(&self) -> &PhotoSlot {
        &self.photo
    }

    pub fn inspector_name(&self) -> &str {
        &self.session.actor().name
    }

    pub fn report_datetime(&self) -> DateTime<Utc> {
        self.report_datetime
    }

    pub fn invalid_fields(&self) -> &BTreeSet<FormField> {
        &self.invalid
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Trails selectable for the chosen sector; `None` while the list is disabled.
    pub fn trail_options(&self) -> Option<&[&'static str]> {
        self.draft
            .sector
            .map(|sector| self.ctx.catalog.trails_for(sector))
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub async fn dispatch(&mut self, command: FormCommand) -> Result<FormOutcome, ReportError> {
        let name = command.name();
        debug!(command = name, mode = ?self.mode, "form command");
        let result = self.apply(command).await;
        if let Err(err) = &result {
            warn!(command = name, error = %err, "form command failed");
            self.notice = Some(Notice::new(NoticeKind::Error, err.to_string()));
        }
        result
    }

    async fn apply(&mut self, command: FormCommand) -> Result<FormOutcome, ReportError> {
        match command {
            FormCommand::StartNew => {
                self.start_new();
                Ok(FormOutcome::Updated)
            }
            FormCommand::Load(id) => self.load(id).await,
            FormCommand::SetStatus(status) => {
                self.draft.status = status;
                Ok(FormOutcome::Updated)
            }
            FormCommand::SetSector(sector) => {
                self.set_sector(sector);
                Ok(FormOutcome::Updated)
            }
            FormCommand::SetTrail(trail) => {
                self.draft.trail = trail;
                Ok(FormOutcome::Updated)
            }
            FormCommand::SetComments(comments) => {
                self.draft.comments = Some(comments);
                Ok(FormOutcome::Updated)
            }
            FormCommand::AttachPhoto(raw) => self.attach_photo(raw).await,
            FormCommand::RemovePhoto => {
                self.photo = PhotoSlot::Empty;
                Ok(FormOutcome::Updated)
            }
            FormCommand::Save => self.save().await,
            FormCommand::Modify => self.modify().await,
            FormCommand::RefreshHistory => self.refresh_history().await,
        }
    }

    /// Resets every field; identity and timestamp are pre-filled again.
    pub fn start_new(&mut self) {
        self.mode = FormMode::New;
        self.draft = ReportDraft::default();
        self.photo = PhotoSlot::Empty;
        self.report_datetime = Utc::now();
        self.invalid.clear();
    }

    /// Keeps the chosen trail only if the new sector lists it.
    pub fn set_sector(&mut self, sector: Option<Sector>) {
        self.draft.sector = sector;
        let keep_trail = match (sector, self.draft.trail.as_deref()) {
            (Some(sector), Some(trail)) => self.ctx.catalog.contains(sector, trail),
            _ => false,
        };
        if !keep_trail {
            self.draft.trail = None;
        }
    }

    async fn load(&mut self, id: ReportId) -> Result<FormOutcome, ReportError> {
        let report = lifecycle::load_own_report(&self.ctx, &self.session, id).await?;
        self.mode = FormMode::Editing(id);
        self.draft = ReportDraft::from_report(&report);
        self.photo = report
            .photo_ref
            .map(PhotoSlot::Stored)
            .unwrap_or(PhotoSlot::Empty);
        self.invalid.clear();
        self.notice = Some(Notice::new(
            NoticeKind::Info,
            "Rapport chargé. Modifiez les champs nécessaires et enregistrez.",
        ));
        Ok(FormOutcome::Loaded(id))
    }

    async fn attach_photo(&mut self, raw: RawImage) -> Result<FormOutcome, ReportError> {
        let settings = self.ctx.photo_settings;
        let compressed = self
            .ctx
            .pipeline
            .compress(raw, settings.max_width, settings.quality)
            .await
            .map_err(ReportError::photo)?;
        self.photo = PhotoSlot::Pending(compressed);
        Ok(FormOutcome::Updated)
    }

    fn record_validation(&mut self, result: &Result<SavedReport, ReportError>) {
        match result {
            Err(ReportError::Validation(report)) => self.invalid = report.invalid_fields(),
            _ => self.invalid.clear(),
        }
    }

    async fn save(&mut self) -> Result<FormOutcome, ReportError> {
        if self.mode != FormMode::New {
            return Err(ReportError::WrongMode {
                action: "save",
                mode: self.mode.describe(),
            });
        }

        self.busy = true;
        let result =
            lifecycle::create_report(&self.ctx, &self.session, &self.draft, &mut self.photo).await;
        self.busy = false;
        self.record_validation(&result);
        let saved = result?;

        self.start_new();
        self.refresh_history_quietly().await;
        self.notice = Some(Notice::new(
            NoticeKind::Success,
            "Rapport enregistré avec succès!",
        ));
        Ok(FormOutcome::Created(saved.id))
    }

    async fn modify(&mut self) -> Result<FormOutcome, ReportError> {
        let FormMode::Editing(id) = self.mode else {
            return Err(ReportError::WrongMode {
                action: "modify",
                mode: self.mode.describe(),
            });
        };

        self.busy = true;
        let result = lifecycle::modify_report(
            &self.ctx,
            &self.session,
            id,
            &self.draft,
            &mut self.photo,
        )
        .await;
        self.busy = false;
        self.record_validation(&result);
        let saved = result?;

        self.photo = saved
            .photo_ref
            .map(PhotoSlot::Stored)
            .unwrap_or(PhotoSlot::Empty);
        self.refresh_history_quietly().await;
        self.notice = Some(Notice::new(
            NoticeKind::Success,
            "Modifications enregistrées!",
        ));
        Ok(FormOutcome::Modified(id))
    }

    async fn refresh_history(&mut self) -> Result<FormOutcome, ReportError> {
        let reports =
            lifecycle::inspector_reports(&self.ctx, &self.session, HISTORY_LIMIT).await?;
        self.history = presenter::history_entries(&reports);
        Ok(FormOutcome::HistoryRefreshed(self.history.len()))
    }

    /// After a successful write the list refresh must not turn the write into a failure.
    async fn refresh_history_quietly(&mut self) {
        if let Err(err) = self.refresh_history().await {
            warn!(error = %err, "failed to refresh report history");
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
