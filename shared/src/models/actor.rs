//! Who caused a movement

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// The party responsible for a stock or cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// A named staff member
    Employee {
        #[serde(rename = "employeeId")]
        employee_id: Uuid,
    },
    /// An administrator acting without a personal employee record
    Admin,
    /// An unauthenticated sale from the public web shop
    Online,
}

impl Actor {
    pub fn kind(&self) -> &'static str {
        match self {
            Actor::Employee { .. } => "employee",
            Actor::Admin => "admin",
            Actor::Online => "online",
        }
    }

    pub fn employee_id(&self) -> Option<Uuid> {
        match self {
            Actor::Employee { employee_id } => Some(*employee_id),
            _ => None,
        }
    }

    /// Rebuild an actor from its persisted `(kind, employee_id)` columns
    pub fn from_parts(kind: &str, employee_id: Option<Uuid>) -> LedgerResult<Self> {
        match (kind, employee_id) {
            ("employee", Some(employee_id)) => Ok(Actor::Employee { employee_id }),
            ("admin", _) => Ok(Actor::Admin),
            ("online", _) => Ok(Actor::Online),
            ("employee", None) => Err(LedgerError::validation(
                "employee_id",
                "Employee actor without an employee id",
            )),
            (other, _) => Err(LedgerError::validation(
                "actor_kind",
                format!("Unknown actor kind '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Employee { employee_id } => write!(f, "employee:{}", employee_id),
            Actor::Admin => write!(f, "admin"),
            Actor::Online => write!(f, "online"),
        }
    }
}

/// The authenticated caller of a ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser {
    pub employee_id: Option<Uuid>,
    pub is_admin: bool,
}

impl ActingUser {
    pub fn admin() -> Self {
        Self {
            employee_id: None,
            is_admin: true,
        }
    }

    pub fn employee(employee_id: Uuid) -> Self {
        Self {
            employee_id: Some(employee_id),
            is_admin: false,
        }
    }

    /// Decide which actor a movement is recorded under.
    ///
    /// Admins always act as [`Actor::Admin`]. Anyone else needs an employee
    /// id, either supplied with the request or taken from their identity.
    pub fn resolve_actor(&self, supplied: Option<Uuid>) -> LedgerResult<Actor> {
        if self.is_admin {
            return Ok(Actor::Admin);
        }

        supplied
            .or(self.employee_id)
            .map(|employee_id| Actor::Employee { employee_id })
            .ok_or_else(|| LedgerError::validation("employee_id", "An employee id is required"))
    }
}
