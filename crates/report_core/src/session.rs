use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{Account, AccountStatus, InspectorId, Role},
    protocol::SessionInfo,
};
use tracing::{info, warn};

use crate::error::{AccessError, ReportError};

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn account(&self, inspector_id: InspectorId) -> Result<Option<Account>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub inspector_id: InspectorId,
    pub name: String,
    pub may_submit: bool,
    pub is_admin: bool,
}

/// Authorized actor for the lifetime of one sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    actor: Actor,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Admits active accounts that carry the signage capability.
    pub fn from_account(account: &Account) -> Result<Self, AccessError> {
        if account.status != AccountStatus::Active {
            return Err(AccessError::Inactive(account.inspector_id));
        }
        if !account.allow_signalisation {
            return Err(AccessError::NoSubmitCapability(account.inspector_id));
        }
        Ok(Self {
            actor: Actor {
                inspector_id: account.inspector_id,
                name: account.name.clone(),
                may_submit: account.allow_signalisation,
                is_admin: account.role == Role::Admin,
            },
            started_at: Utc::now(),
        })
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn inspector_id(&self) -> InspectorId {
        self.actor.inspector_id
    }

    pub fn require_submit(&self) -> Result<(), AccessError> {
        if self.actor.may_submit {
            Ok(())
        } else {
            Err(AccessError::NoSubmitCapability(self.actor.inspector_id))
        }
    }

    pub fn require_admin(&self) -> Result<(), AccessError> {
        if self.actor.is_admin {
            Ok(())
        } else {
            Err(AccessError::NotAdministrator(self.actor.inspector_id))
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            inspector_id: self.actor.inspector_id,
            name: self.actor.name.clone(),
            may_submit: self.actor.may_submit,
            is_admin: self.actor.is_admin,
        }
    }

    pub fn sign_out(self) {
        info!(
            inspector_id = %self.actor.inspector_id,
            started_at = %self.started_at,
            "session closed"
        );
    }
}

/// Resolves the current actor before any report operation may run.
pub async fn authorize(
    directory: &dyn AccountDirectory,
    inspector_id: Option<InspectorId>,
) -> Result<Session, ReportError> {
    let inspector_id = inspector_id.ok_or(AccessError::Unauthenticated)?;
    let account = directory
        .account(inspector_id)
        .await
        .map_err(ReportError::store)?
        .ok_or(AccessError::UnknownAccount(inspector_id))?;

    match Session::from_account(&account) {
        Ok(session) => Ok(session),
        Err(err) => {
            warn!(%inspector_id, error = %err, "access denied");
            Err(err.into())
        }
    }
}
