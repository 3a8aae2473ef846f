pub mod catalog;
pub mod error;
pub mod form;
pub mod lifecycle;
pub mod photo;
pub mod presenter;
pub mod session;
pub mod store;
pub mod triage;

use std::sync::Arc;

pub use catalog::{StaticCatalog, TrailCatalog};
pub use error::{AccessError, FormField, ReportError, ValidationReport, Violation};
pub use lifecycle::{PhotoSlot, ReportDraft, TriageDecision, ValidationPolicy};
pub use photo::{ImagePipeline, JpegPipeline, PhotoSettings, PhotoStore, RawImage};
pub use session::{authorize, AccountDirectory, Session};
pub use store::ReportStore;

/// Collaborators every report operation runs against.
#[derive(Clone)]
pub struct ReportContext {
    pub reports: Arc<dyn ReportStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub pipeline: Arc<dyn ImagePipeline>,
    pub catalog: Arc<dyn TrailCatalog>,
    pub policy: ValidationPolicy,
    pub photo_settings: PhotoSettings,
}

impl ReportContext {
    pub fn new(reports: Arc<dyn ReportStore>, photos: Arc<dyn PhotoStore>) -> Self {
        Self {
            reports,
            photos,
            pipeline: Arc::new(JpegPipeline),
            catalog: Arc::new(StaticCatalog),
            policy: ValidationPolicy::default(),
            photo_settings: PhotoSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_photo_settings(mut self, photo_settings: PhotoSettings) -> Self {
        self.photo_settings = photo_settings;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn TrailCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Arc<dyn ImagePipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
