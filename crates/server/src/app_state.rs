use report_core::ReportContext;
use storage::Storage;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) reports: ReportContext,
    pub(crate) storage: Storage,
    pub(crate) history_limit: u32,
    pub(crate) max_body_bytes: usize,
}
