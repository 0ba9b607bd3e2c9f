use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of roles known to the access core.
///
/// Callers identify roles either by numeric id or by name; both forms are
/// normalised here so nothing past the HTTP boundary compares raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Professor,
    Collaborator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Professor => "professor",
            Role::Collaborator => "collaborator",
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "administrator" | "admin" | "administrador" => Ok(Role::Administrator),
            "2" | "professor" | "teacher" => Ok(Role::Professor),
            "3" | "collaborator" | "colaborador" => Ok(Role::Collaborator),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}
