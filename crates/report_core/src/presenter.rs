//! Filtering, ordering and rendering of report collections for the
//! inspector history selector and the administrator triage table.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use html_escape::encode_text;
use shared::{
    domain::{Report, Sector},
    protocol::{HistoryEntry, ReportDetail, ReportRow, SortKey, StatusBadge, TableView},
};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{catalog::TrailCatalog, store::ReportQuery};

pub const HISTORY_LIMIT: u32 = 50;
pub const EMPTY_PLACEHOLDER: &str = "Aucun rapport trouvé";
const TABLE_COLUMNS: usize = 7;

/// Fetch-time toggles. Changing either one requires a new query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub show_resolved: bool,
    pub show_archived: bool,
}

impl Visibility {
    pub fn query(&self) -> ReportQuery {
        ReportQuery::visible(self.show_resolved, self.show_archived)
    }
}

/// Live controls applied to an already fetched snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableControls {
    pub sector: Option<Sector>,
    pub sort: SortKey,
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_date_short(at: DateTime<Utc>) -> String {
    at.format("%d/%m %H:%M").to_string()
}

fn format_optional_date(at: Option<DateTime<Utc>>) -> String {
    at.map(format_date).unwrap_or_else(|| "-".to_string())
}

/// Selector entries for re-opening one of the inspector's own reports.
pub fn history_entries(reports: &[Report]) -> Vec<HistoryEntry> {
    reports
        .iter()
        .take(HISTORY_LIMIT as usize)
        .map(|report| {
            let date = report
                .created_at
                .map(format_date_short)
                .unwrap_or_else(|| "-".to_string());
            let trail = match report.trail.trim() {
                "" => "N/A",
                trail => trail,
            };
            HistoryEntry {
                report_id: report.id,
                label: format!("{date} - {trail}"),
            }
        })
        .collect()
}

/// Accent- and case-insensitive key approximating French collation.
fn collation_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_sector_names(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b))
}

/// Applies the sector filter, then orders by the active sort key.
pub fn filter_and_sort<'a>(
    reports: &'a [Report],
    controls: TableControls,
    catalog: &dyn TrailCatalog,
) -> Vec<&'a Report> {
    let mut selected: Vec<&Report> = reports
        .iter()
        .filter(|report| controls.sector.map_or(true, |sector| report.sector == sector))
        .collect();

    match controls.sort {
        // `None` orders before every timestamp, so undated reports end up last.
        SortKey::Date => selected.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Sector => selected.sort_by(|a, b| {
            compare_sector_names(catalog.display_name(a.sector), catalog.display_name(b.sector))
        }),
    }
    selected
}

fn status_badge(report: &Report) -> Option<StatusBadge> {
    report.status.map(|status| StatusBadge {
        label: status.display_name().to_string(),
        class: status.badge_class().to_string(),
    })
}

fn trail_or_dash(report: &Report) -> String {
    match report.trail.trim() {
        "" => "-".to_string(),
        trail => trail.to_string(),
    }
}

pub fn report_row(report: &Report, catalog: &dyn TrailCatalog) -> ReportRow {
    ReportRow {
        report_id: report.id,
        created: format_optional_date(report.created_at),
        sector: catalog.display_name(report.sector).to_string(),
        trail: trail_or_dash(report),
        status: status_badge(report),
        inspector_name: report.inspector_name.clone(),
        states: report.presentation_states(),
    }
}

pub fn present_table(
    reports: &[Report],
    controls: TableControls,
    catalog: &dyn TrailCatalog,
) -> TableView {
    let rows: Vec<ReportRow> = filter_and_sort(reports, controls, catalog)
        .into_iter()
        .map(|report| report_row(report, catalog))
        .collect();
    if rows.is_empty() {
        TableView::Empty {
            placeholder: EMPTY_PLACEHOLDER.to_string(),
        }
    } else {
        TableView::Rows { rows }
    }
}

pub fn report_detail(report: &Report, catalog: &dyn TrailCatalog) -> ReportDetail {
    ReportDetail {
        report_id: report.id,
        sector: catalog.display_name(report.sector).to_string(),
        trail: trail_or_dash(report),
        status: status_badge(report),
        photo_ref: report.photo_ref.clone(),
        comments: report.comments.clone(),
        inspector_name: report.inspector_name.clone(),
        created: format_optional_date(report.created_at),
        modified: Some(format_date(report.modified_at)),
        resolved: report.resolved,
        archived: report.archived,
        admin_comments: report.admin_comments.clone(),
        admin_modified: report.admin_modified_at.map(format_date),
        resolved_at: report.resolved_at,
        archived_at: report.archived_at,
    }
}

fn single_cell_row(style: Option<&str>, text: &str) -> String {
    let style = style
        .map(|style| format!(" style=\"{style}\""))
        .unwrap_or_default();
    format!(
        "<tr><td colspan=\"{TABLE_COLUMNS}\" class=\"text-center\"{style}>{}</td></tr>",
        encode_text(text)
    )
}

/// Renders the `<tbody>` content of the administrator table.
pub fn render_table_html(view: &TableView) -> String {
    match view {
        TableView::Loading => single_cell_row(None, "Chargement..."),
        TableView::Error { message } => single_cell_row(
            Some("color: #dc2626;"),
            &format!("Erreur de chargement: {message}"),
        ),
        TableView::Empty { placeholder } => single_cell_row(None, placeholder),
        TableView::Rows { rows } => rows.iter().map(render_row_html).collect(),
    }
}

fn render_row_html(row: &ReportRow) -> String {
    let status = row
        .status
        .as_ref()
        .map(|badge| {
            format!(
                "<span class=\"badge {}\">{}</span>",
                badge.class,
                encode_text(&badge.label)
            )
        })
        .unwrap_or_else(|| "-".to_string());
    let states: Vec<String> = row
        .states
        .iter()
        .map(|state| {
            format!(
                "<span class=\"badge {}\">{}</span>",
                state.badge_class(),
                state.label()
            )
        })
        .collect();
    let inspector = match row.inspector_name.trim() {
        "" => "-".to_string(),
        name => encode_text(name).into_owned(),
    };

    format!(
        "<tr><td>{created}</td><td>{sector}</td><td>{trail}</td><td>{status}</td>\
         <td>{inspector}</td><td>{states}</td>\
         <td><button class=\"btn btn-sm btn-primary\" data-report-id=\"{id}\">Voir</button></td></tr>",
        created = encode_text(&row.created),
        sector = encode_text(&row.sector),
        trail = encode_text(&row.trail),
        states = states.join(" "),
        id = row.report_id,
    )
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
