use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Enums
// =============================================================================

/// Overall health of the automation pipeline.
///
/// Mutated only by the transition rules in the health monitor; see
/// `marionette-automation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Actions are executing normally.
    Healthy,
    /// The consecutive-failure threshold was reached.
    Degraded,
    /// An automatic recovery attempt is in progress.
    Recovering,
    /// Recovery failed; intake is paused until an operator resumes.
    Failed,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Recovering => write!(f, "recovering"),
            HealthState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for HealthState {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthState::Healthy),
            "degraded" => Ok(HealthState::Degraded),
            "recovering" => Ok(HealthState::Recovering),
            "failed" => Ok(HealthState::Failed),
            _ => Err(format!("Unknown health state: {}", s)),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A resolved chat contact, referenced by messages and actions.
///
/// `display_name` is what the target application shows on screen and is the
/// only handle automation has; it is not guaranteed unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable store-side identifier (never shown in the UI).
    pub id: String,
    /// On-screen name used for target resolution.
    pub display_name: String,
    /// Optional operator-assigned remark overriding the display name.
    pub remark: Option<String>,
}

impl Contact {
    /// The name automation should search for: remark when set, otherwise
    /// the display name.
    pub fn locate_name(&self) -> &str {
        self.remark.as_deref().unwrap_or(&self.display_name)
    }
}

/// A resolved group chat (room).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub display_name: String,
    pub member_count: u32,
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_health_state_display_roundtrip() {
        for state in [
            HealthState::Healthy,
            HealthState::Degraded,
            HealthState::Recovering,
            HealthState::Failed,
        ] {
            let parsed = HealthState::from_str(&state.to_string()).unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn test_health_state_unknown_string() {
        assert!(HealthState::from_str("broken").is_err());
    }

    #[test]
    fn test_health_state_serde_snake_case() {
        let json = serde_json::to_string(&HealthState::Recovering).unwrap();
        assert_eq!(json, "\"recovering\"");
    }

    #[test]
    fn test_contact_locate_name_prefers_remark() {
        let contact = Contact {
            id: "u_1001".to_string(),
            display_name: "Alice".to_string(),
            remark: Some("Alice (work)".to_string()),
        };
        assert_eq!(contact.locate_name(), "Alice (work)");
    }

    #[test]
    fn test_contact_locate_name_falls_back_to_display() {
        let contact = Contact {
            id: "u_1001".to_string(),
            display_name: "Alice".to_string(),
            remark: None,
        };
        assert_eq!(contact.locate_name(), "Alice");
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp(10) < Timestamp(20));
        assert_eq!(Timestamp(10), Timestamp(10));
    }

    #[test]
    fn test_timestamp_now_roundtrip() {
        let ts = Timestamp::now();
        let dt = ts.to_datetime();
        assert_eq!(Timestamp::from_datetime(dt), ts);
    }
}
