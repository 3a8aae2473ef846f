use std::{collections::BTreeSet, fmt};

use shared::{
    domain::{InspectorId, ReportId, Sector},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

/// Form inputs a validation rule can flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Status,
    Photo,
    Sector,
    Trail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingStatusOrPhoto,
    MissingSector,
    MissingTrail,
    UnknownTrail { sector: Sector, trail: String },
}

impl Violation {
    pub fn fields(&self) -> &'static [FormField] {
        match self {
            Self::MissingStatusOrPhoto => &[FormField::Status, FormField::Photo],
            Self::MissingSector => &[FormField::Sector],
            Self::MissingTrail | Self::UnknownTrail { .. } => &[FormField::Trail],
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MissingStatusOrPhoto => "Un statut OU une photo est requis".to_string(),
            Self::MissingSector => "Le secteur est requis".to_string(),
            Self::MissingTrail => "La piste est requise".to_string(),
            Self::UnknownTrail { sector, trail } => format!(
                "La piste « {trail} » n'existe pas dans le secteur {}",
                sector.display_name()
            ),
        }
    }
}

/// Every rule a draft broke, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn invalid_fields(&self) -> BTreeSet<FormField> {
        self.violations
            .iter()
            .flat_map(|violation| violation.fields().iter().copied())
            .collect()
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(Violation::message).collect();
        f.write_str(&messages.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no authenticated inspector")]
    Unauthenticated,
    #[error("inspector {0} is not registered")]
    UnknownAccount(InspectorId),
    #[error("account of inspector {0} is inactive")]
    Inactive(InspectorId),
    #[error("inspector {0} has no access to signage reports")]
    NoSubmitCapability(InspectorId),
    #[error("inspector {0} is not an administrator")]
    NotAdministrator(InspectorId),
    #[error("report {report_id} belongs to another inspector")]
    NotOwner { report_id: ReportId },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(ValidationReport),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("report {0} not found")]
    NotFound(ReportId),
    #[error("cannot {action} while {mode}")]
    WrongMode {
        action: &'static str,
        mode: &'static str,
    },
    #[error("report store failure: {source:#}")]
    Store { source: anyhow::Error },
    #[error("photo processing failed: {source:#}")]
    Photo { source: anyhow::Error },
}

impl ReportError {
    pub fn store(source: anyhow::Error) -> Self {
        Self::Store { source }
    }

    pub fn photo(source: anyhow::Error) -> Self {
        Self::Photo { source }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Access(AccessError::Unauthenticated) => ErrorCode::Unauthorized,
            Self::Access(_) => ErrorCode::Forbidden,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::WrongMode { .. } => ErrorCode::Conflict,
            Self::Store { .. } => ErrorCode::Internal,
            Self::Photo { source } if source.downcast_ref::<tokio::task::JoinError>().is_some() => {
                ErrorCode::Internal
            }
            Self::Photo { .. } => ErrorCode::Validation,
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(value: ReportError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}
