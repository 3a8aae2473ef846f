use std::{collections::HashMap, io::Cursor, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use shared::domain::{
    Account, AccountStatus, InspectorId, PhotoRef, Report, ReportId, Role, Sector, SignStatus,
};
use tokio::sync::Mutex;

use crate::{
    photo::{photo_key, CompressedImage, PhotoStore, StoredPhoto},
    session::{authorize, AccountDirectory, Session},
    store::{NewReport, ReportOrder, ReportPatch, ReportQuery, ReportStore},
    ReportContext,
};

pub const INSPECTOR: InspectorId = InspectorId(7);
pub const OTHER_INSPECTOR: InspectorId = InspectorId(8);
pub const ADMIN: InspectorId = InspectorId(1);

#[derive(Default)]
struct State {
    reports: Vec<Report>,
    photos: HashMap<String, StoredPhoto>,
    accounts: HashMap<InspectorId, Account>,
    report_writes: u32,
    photo_writes: u32,
    queries: u32,
    fail_with: Option<String>,
    fail_report_writes: Option<String>,
    fail_reads_after_write: Option<String>,
    fail_reads: Option<String>,
}

/// In-memory stand-in for the report, photo and account collections.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Backend seeded with one inspector, a second inspector and one admin.
    pub async fn seeded() -> Arc<Self> {
        let backend = Arc::new(Self::default());
        backend
            .add_account(account(INSPECTOR, "Julie Tremblay", Role::Inspector))
            .await;
        backend
            .add_account(account(OTHER_INSPECTOR, "Marc Gagnon", Role::Inspector))
            .await;
        backend
            .add_account(account(ADMIN, "Sophie Côté", Role::Admin))
            .await;
        backend
    }

    pub fn context(self: &Arc<Self>) -> ReportContext {
        ReportContext::new(self.clone(), self.clone())
    }

    pub async fn session(&self, inspector_id: InspectorId) -> Session {
        authorize(self, Some(inspector_id))
            .await
            .expect("authorized session")
    }

    pub async fn add_account(&self, account: Account) {
        self.state
            .lock()
            .await
            .accounts
            .insert(account.inspector_id, account);
    }

    pub async fn insert_report(&self, report: Report) {
        self.state.lock().await.reports.push(report);
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().await.fail_with = Some(message.into());
    }

    /// Report creates and updates fail; photos and reads keep working.
    pub async fn fail_report_writes(&self, message: impl Into<String>) {
        self.state.lock().await.fail_report_writes = Some(message.into());
    }

    /// Report reads start failing once the next report update lands.
    pub async fn fail_reads_after_next_write(&self, message: impl Into<String>) {
        self.state.lock().await.fail_reads_after_write = Some(message.into());
    }

    pub async fn recover(&self) {
        let mut state = self.state.lock().await;
        state.fail_with = None;
        state.fail_report_writes = None;
        state.fail_reads_after_write = None;
        state.fail_reads = None;
    }

    pub async fn report_writes(&self) -> u32 {
        self.state.lock().await.report_writes
    }

    pub async fn photo_writes(&self) -> u32 {
        self.state.lock().await.photo_writes
    }

    pub async fn queries(&self) -> u32 {
        self.state.lock().await.queries
    }

    pub async fn photo_count(&self) -> usize {
        self.state.lock().await.photos.len()
    }

    pub async fn stored(&self, id: ReportId) -> Report {
        self.get(id).await.expect("get").expect("report exists")
    }
}

fn check(state: &State) -> Result<()> {
    match &state.fail_with {
        Some(message) => Err(anyhow!(message.clone())),
        None => Ok(()),
    }
}

fn check_report_write(state: &State) -> Result<()> {
    check(state)?;
    match &state.fail_report_writes {
        Some(message) => Err(anyhow!(message.clone())),
        None => Ok(()),
    }
}

fn check_read(state: &State) -> Result<()> {
    check(state)?;
    match &state.fail_reads {
        Some(message) => Err(anyhow!(message.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl ReportStore for MemoryBackend {
    async fn create(&self, report: NewReport) -> Result<ReportId> {
        let mut state = self.state.lock().await;
        check_report_write(&state)?;
        state.report_writes += 1;
        let id = ReportId::generate();
        state.reports.push(Report {
            id,
            inspector_id: report.inspector_id,
            inspector_name: report.inspector_name,
            status: report.status,
            sector: report.sector,
            trail: report.trail,
            comments: report.comments,
            photo_ref: report.photo_ref,
            resolved: false,
            archived: false,
            admin_comments: None,
            created_at: Some(report.stamped_at),
            modified_at: report.stamped_at,
            resolved_at: None,
            archived_at: None,
            admin_modified_at: None,
        });
        Ok(id)
    }

    async fn get(&self, id: ReportId) -> Result<Option<Report>> {
        let state = self.state.lock().await;
        check_read(&state)?;
        Ok(state.reports.iter().find(|report| report.id == id).cloned())
    }

    async fn update(&self, id: ReportId, patch: ReportPatch) -> Result<bool> {
        let mut state = self.state.lock().await;
        check_report_write(&state)?;
        state.report_writes += 1;
        let Some(report) = state.reports.iter_mut().find(|report| report.id == id) else {
            return Ok(false);
        };
        match patch {
            ReportPatch::Inspector(edit) => {
                report.status = edit.status;
                report.sector = edit.sector;
                report.trail = edit.trail;
                report.comments = edit.comments;
                report.photo_ref = edit.photo_ref;
                report.modified_at = edit.modified_at;
            }
            ReportPatch::Triage(edit) => edit.apply_to(report),
        }
        if let Some(message) = state.fail_reads_after_write.take() {
            state.fail_reads = Some(message);
        }
        Ok(true)
    }

    async fn query(
        &self,
        filter: ReportQuery,
        order: ReportOrder,
        limit: Option<u32>,
    ) -> Result<Vec<Report>> {
        let mut state = self.state.lock().await;
        check_read(&state)?;
        state.queries += 1;
        let mut reports: Vec<Report> = state
            .reports
            .iter()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        match order {
            ReportOrder::CreatedAtDesc => reports.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        if let Some(limit) = limit {
            reports.truncate(limit as usize);
        }
        Ok(reports)
    }
}

#[async_trait]
impl PhotoStore for MemoryBackend {
    async fn store_photo(&self, owner: InspectorId, image: &CompressedImage) -> Result<PhotoRef> {
        let mut state = self.state.lock().await;
        check(&state)?;
        state.photo_writes += 1;
        let created_at = Utc::now();
        let photo_ref = photo_key(owner, &image.file_name, created_at);
        state.photos.insert(
            photo_ref.0.clone(),
            StoredPhoto {
                photo_ref: photo_ref.clone(),
                owner,
                mime_type: image.mime_type.to_string(),
                bytes: image.bytes.clone(),
                created_at,
            },
        );
        Ok(photo_ref)
    }

    async fn load_photo(&self, photo_ref: &PhotoRef) -> Result<Option<StoredPhoto>> {
        let state = self.state.lock().await;
        check(&state)?;
        Ok(state.photos.get(photo_ref.as_str()).cloned())
    }
}

#[async_trait]
impl AccountDirectory for MemoryBackend {
    async fn account(&self, inspector_id: InspectorId) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        check(&state)?;
        Ok(state.accounts.get(&inspector_id).cloned())
    }
}

pub fn account(inspector_id: InspectorId, name: &str, role: Role) -> Account {
    Account {
        inspector_id,
        name: name.to_string(),
        status: AccountStatus::Active,
        allow_signalisation: true,
        role,
    }
}

/// Stored report with explicit timestamps, for presenter and triage fixtures.
pub fn stored_report(
    inspector_id: InspectorId,
    sector: Sector,
    trail: &str,
    created_at: Option<DateTime<Utc>>,
) -> Report {
    let modified_at = created_at.unwrap_or_else(Utc::now);
    Report {
        id: ReportId::generate(),
        inspector_id,
        inspector_name: "Julie Tremblay".to_string(),
        status: Some(SignStatus::Open),
        sector,
        trail: trail.to_string(),
        comments: None,
        photo_ref: None,
        resolved: false,
        archived: false,
        admin_comments: None,
        created_at,
        modified_at,
        resolved_at: None,
        archived_at: None,
        admin_modified_at: None,
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}
