use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseDomainError;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(ReportId, Uuid);
id_newtype!(InspectorId, i64);

impl ReportId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for ReportId {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParseDomainError::new("report id", s))
    }
}

/// Storage key of an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignStatus {
    #[serde(alias = "ouverte")]
    Open,
    #[serde(alias = "attention-requise")]
    AttentionRequired,
    #[serde(alias = "fermee")]
    Closed,
}

impl SignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::AttentionRequired => "attention-required",
            Self::Closed => "closed",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Open => "🟢 Ouverte",
            Self::AttentionRequired => "🟡 Attention requise",
            Self::Closed => "🔴 Fermée",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Self::Open => "badge-success",
            Self::AttentionRequired => "badge-warning",
            Self::Closed => "badge-danger",
        }
    }
}

impl FromStr for SignStatus {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" | "ouverte" => Ok(Self::Open),
            "attention-required" | "attention-requise" => Ok(Self::AttentionRequired),
            "closed" | "fermee" => Ok(Self::Closed),
            other => Err(ParseDomainError::new("status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sector {
    MontOrford,
    GirouxNord,
    GirouxEst,
    AlfredDesrochers,
    Remontees,
    RandonneeAlpine,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Self::MontOrford,
        Self::GirouxNord,
        Self::GirouxEst,
        Self::AlfredDesrochers,
        Self::Remontees,
        Self::RandonneeAlpine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MontOrford => "mont-orford",
            Self::GirouxNord => "giroux-nord",
            Self::GirouxEst => "giroux-est",
            Self::AlfredDesrochers => "alfred-desrochers",
            Self::Remontees => "remontees",
            Self::RandonneeAlpine => "randonnee-alpine",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sector| sector.as_str() == s)
            .ok_or_else(|| ParseDomainError::new("sector", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Inspector,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// Inspector account as kept in the shared inspectors directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub inspector_id: InspectorId,
    pub name: String,
    pub status: AccountStatus,
    pub allow_signalisation: bool,
    pub role: Role,
}

/// Persisted inspection report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub inspector_id: InspectorId,
    pub inspector_name: String,
    #[serde(default)]
    pub status: Option<SignStatus>,
    pub sector: Sector,
    pub trail: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<PhotoRef>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub admin_comments: Option<String>,
    /// Absent only for documents written without a server timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin_modified_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn presentation_states(&self) -> Vec<PresentationState> {
        let mut states = Vec::with_capacity(2);
        if self.resolved {
            states.push(PresentationState::Resolved);
        }
        if self.archived {
            states.push(PresentationState::Archived);
        }
        if states.is_empty() {
            states.push(PresentationState::InProgress);
        }
        states
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationState {
    InProgress,
    Resolved,
    Archived,
}

impl PresentationState {
    pub fn label(self) -> &'static str {
        match self {
            Self::InProgress => "En cours",
            Self::Resolved => "Résolu",
            Self::Archived => "Archivé",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Self::InProgress => "badge-primary",
            Self::Resolved => "badge-success",
            Self::Archived => "badge-secondary",
        }
    }
}
