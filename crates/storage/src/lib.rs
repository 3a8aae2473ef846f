use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use report_core::{
    photo::{photo_key, CompressedImage, PhotoStore, StoredPhoto},
    session::AccountDirectory,
    store::{NewReport, ReportOrder, ReportPatch, ReportQuery, ReportStore},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    Account, AccountStatus, InspectorId, PhotoRef, Report, ReportId, Role, Sector, SignStatus,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

const REPORT_COLUMNS: &str = "id, inspector_id, inspector_name, status, sector, trail, comments, \
     photo_ref, resolved, archived, admin_comments, created_at, modified_at, resolved_at, \
     archived_at, admin_modified_at";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_inspector(
        &self,
        name: &str,
        role: Role,
        allow_signalisation: bool,
    ) -> Result<InspectorId> {
        let rec = sqlx::query(
            "INSERT INTO inspectors (name, status, allow_signalisation, role) VALUES (?, 'active', ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(allow_signalisation)
        .bind(role_str(role))
        .fetch_one(&self.pool)
        .await?;
        Ok(InspectorId(rec.get::<i64, _>(0)))
    }

    /// Returns `false` when no inspector has this id.
    pub async fn set_account_status(
        &self,
        inspector_id: InspectorId,
        status: AccountStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE inspectors SET status = ? WHERE id = ?")
            .bind(match status {
                AccountStatus::Active => "active",
                AccountStatus::Inactive => "inactive",
            })
            .bind(inspector_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_signalisation_access(
        &self,
        inspector_id: InspectorId,
        allow_signalisation: bool,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE inspectors SET allow_signalisation = ? WHERE id = ?")
            .bind(allow_signalisation)
            .bind(inspector_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, name, status, allow_signalisation, role FROM inspectors ORDER BY lower(name) ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(account_from_row).collect())
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Inspector => "inspector",
        Role::Admin => "admin",
    }
}

fn account_from_row(r: &SqliteRow) -> Account {
    Account {
        inspector_id: InspectorId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        status: match r.get::<String, _>(2).as_str() {
            "active" => AccountStatus::Active,
            _ => AccountStatus::Inactive,
        },
        allow_signalisation: r.get::<bool, _>(3),
        role: match r.get::<String, _>(4).as_str() {
            "admin" => Role::Admin,
            _ => Role::Inspector,
        },
    }
}

fn report_from_row(r: &SqliteRow) -> Result<Report> {
    let id: String = r.get(0);
    let status = r
        .get::<Option<String>, _>(3)
        .map(|status| SignStatus::from_str(&status))
        .transpose()?;
    Ok(Report {
        id: ReportId::from_str(&id).with_context(|| format!("invalid report id '{id}'"))?,
        inspector_id: InspectorId(r.get::<i64, _>(1)),
        inspector_name: r.get::<String, _>(2),
        status,
        sector: Sector::from_str(&r.get::<String, _>(4))?,
        trail: r.get::<String, _>(5),
        comments: r.get::<Option<String>, _>(6),
        photo_ref: r.get::<Option<String>, _>(7).map(PhotoRef),
        resolved: r.get::<bool, _>(8),
        archived: r.get::<bool, _>(9),
        admin_comments: r.get::<Option<String>, _>(10),
        created_at: r.get::<Option<DateTime<Utc>>, _>(11),
        modified_at: r.get::<DateTime<Utc>, _>(12),
        resolved_at: r.get::<Option<DateTime<Utc>>, _>(13),
        archived_at: r.get::<Option<DateTime<Utc>>, _>(14),
        admin_modified_at: r.get::<Option<DateTime<Utc>>, _>(15),
    })
}

#[async_trait]
impl ReportStore for Storage {
    async fn create(&self, report: NewReport) -> Result<ReportId> {
        let id = ReportId::generate();
        sqlx::query(
            "INSERT INTO reports (
                id, inspector_id, inspector_name, status, sector, trail, comments, photo_ref,
                resolved, archived, created_at, modified_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(report.inspector_id.0)
        .bind(&report.inspector_name)
        .bind(report.status.map(SignStatus::as_str))
        .bind(report.sector.as_str())
        .bind(&report.trail)
        .bind(report.comments.as_deref())
        .bind(report.photo_ref.as_ref().map(PhotoRef::as_str))
        .bind(report.stamped_at)
        .bind(report.stamped_at)
        .execute(&self.pool)
        .await
        .context("failed to insert report")?;
        Ok(id)
    }

    async fn get(&self, id: ReportId) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(report_from_row).transpose()
    }

    async fn update(&self, id: ReportId, patch: ReportPatch) -> Result<bool> {
        let result = match patch {
            ReportPatch::Inspector(edit) => {
                sqlx::query(
                    "UPDATE reports
                     SET status = ?, sector = ?, trail = ?, comments = ?, photo_ref = ?, modified_at = ?
                     WHERE id = ?",
                )
                .bind(edit.status.map(SignStatus::as_str))
                .bind(edit.sector.as_str())
                .bind(&edit.trail)
                .bind(edit.comments.as_deref())
                .bind(edit.photo_ref.as_ref().map(PhotoRef::as_str))
                .bind(edit.modified_at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .context("failed to update report")?
            }
            // First-resolved and first-archived stamps are kept once set.
            ReportPatch::Triage(edit) => {
                sqlx::query(
                    "UPDATE reports
                     SET resolved = ?1,
                         archived = ?2,
                         admin_comments = ?3,
                         admin_modified_at = ?4,
                         resolved_at = CASE WHEN ?1 THEN COALESCE(resolved_at, ?4) ELSE resolved_at END,
                         archived_at = CASE WHEN ?2 THEN COALESCE(archived_at, ?4) ELSE archived_at END
                     WHERE id = ?5",
                )
                .bind(edit.resolved)
                .bind(edit.archived)
                .bind(edit.admin_comments.as_deref())
                .bind(edit.admin_modified_at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .context("failed to triage report")?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        filter: ReportQuery,
        order: ReportOrder,
        limit: Option<u32>,
    ) -> Result<Vec<Report>> {
        let order_by = match order {
            // SQLite sorts NULL lowest, so undated reports come last.
            ReportOrder::CreatedAtDesc => "created_at DESC, rowid DESC",
        };
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE (?1 IS NULL OR inspector_id = ?1)
               AND (?2 OR resolved = 0)
               AND (?3 OR archived = 0)
             ORDER BY {order_by}
             LIMIT ?4"
        ))
        .bind(filter.inspector.map(|inspector| inspector.0))
        .bind(filter.include_resolved)
        .bind(filter.include_archived)
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .context("failed to query reports")?;
        rows.iter().map(report_from_row).collect()
    }
}

#[async_trait]
impl PhotoStore for Storage {
    async fn store_photo(&self, owner: InspectorId, image: &CompressedImage) -> Result<PhotoRef> {
        let created_at = Utc::now();
        let photo_ref = photo_key(owner, &image.file_name, created_at);
        sqlx::query(
            "INSERT INTO photos (photo_ref, owner_id, mime_type, bytes, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(photo_ref.as_str())
        .bind(owner.0)
        .bind(image.mime_type)
        .bind(&image.bytes)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store photo '{photo_ref}'"))?;
        Ok(photo_ref)
    }

    async fn load_photo(&self, photo_ref: &PhotoRef) -> Result<Option<StoredPhoto>> {
        let row = sqlx::query(
            "SELECT photo_ref, owner_id, mime_type, bytes, created_at FROM photos WHERE photo_ref = ?",
        )
        .bind(photo_ref.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredPhoto {
            photo_ref: PhotoRef(r.get::<String, _>(0)),
            owner: InspectorId(r.get::<i64, _>(1)),
            mime_type: r.get::<String, _>(2),
            bytes: r.get::<Vec<u8>, _>(3),
            created_at: r.get::<DateTime<Utc>, _>(4),
        }))
    }
}

#[async_trait]
impl AccountDirectory for Storage {
    async fn account(&self, inspector_id: InspectorId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, status, allow_signalisation, role FROM inspectors WHERE id = ?",
        )
        .bind(inspector_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(account_from_row))
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
