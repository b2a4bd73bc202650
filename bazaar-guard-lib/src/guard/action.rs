//! Identifiers and records shared by every guard component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{GuardError, Result};

/// Opaque key-value payload attached to an action. Compared structurally.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Identifier of the user performing an action.
///
/// Construction rejects empty ids, so every component can rely on a
/// non-empty key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(GuardError::MissingUserId);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        UserId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Category of user-initiated operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionType {
    Search,
    Contact,
    Save,
    ProductCreate,
    /// Any other action name, stored upper-cased.
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Search => "SEARCH",
            ActionType::Contact => "CONTACT",
            ActionType::Save => "SAVE",
            ActionType::ProductCreate => "PRODUCT_CREATE",
            ActionType::Other(name) => name,
        }
    }

    /// Bounded label for metrics: client-supplied names collapse to `OTHER`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ActionType::Search => "SEARCH",
            ActionType::Contact => "CONTACT",
            ActionType::Save => "SAVE",
            ActionType::ProductCreate => "PRODUCT_CREATE",
            ActionType::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(GuardError::InvalidActionType(s.to_string()));
        }
        let upper = name.to_ascii_uppercase().replace('-', "_");
        Ok(match upper.as_str() {
            "SEARCH" => ActionType::Search,
            "CONTACT" => ActionType::Contact,
            "SAVE" => ActionType::Save,
            "PRODUCT_CREATE" => ActionType::ProductCreate,
            _ => ActionType::Other(upper),
        })
    }
}

impl TryFrom<String> for ActionType {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

/// One recorded occurrence of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub at: Instant,
    pub payload: Payload,
}

impl ActionRecord {
    pub fn new(at: Instant, payload: Payload) -> Self {
        Self { at, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(matches!(UserId::new(""), Err(GuardError::MissingUserId)));
        assert!(matches!(UserId::new("   "), Err(GuardError::MissingUserId)));
    }

    #[test]
    fn test_user_id_trims() {
        let id = UserId::new(" alice ").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn test_metric_label_collapses_custom_names() -> Result<()> {
        assert_eq!(ActionType::Search.metric_label(), "SEARCH");
        assert_eq!("report_listing".parse::<ActionType>()?.metric_label(), "OTHER");
        assert_eq!("x-9f3a".parse::<ActionType>()?.metric_label(), "OTHER");
        Ok(())
    }

    #[test]
    fn test_action_type_parsing() {
        assert_eq!("search".parse::<ActionType>().ok(), Some(ActionType::Search));
        assert_eq!("PRODUCT_CREATE".parse::<ActionType>().ok(), Some(ActionType::ProductCreate));
        assert_eq!("product-create".parse::<ActionType>().ok(), Some(ActionType::ProductCreate));
        assert_eq!(
            "report_listing".parse::<ActionType>().ok(),
            Some(ActionType::Other("REPORT_LISTING".to_string()))
        );
        assert!("".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_action_type_serde_uses_names() -> std::result::Result<(), serde_json::Error> {
        let json = serde_json::to_string(&ActionType::ProductCreate)?;
        assert_eq!(json, "\"PRODUCT_CREATE\"");
        let parsed: ActionType = serde_json::from_str("\"contact\"")?;
        assert_eq!(parsed, ActionType::Contact);
        Ok(())
    }
}
