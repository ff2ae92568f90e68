use crate::error::EngineError;
use crate::types::InstanceStatus;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status vocabulary of the persisted process record. Richer than the
/// engine's vocabulary; the two are related through the explicit tables
/// below and nowhere else. The engine never stores these values internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistedStatus {
    Draft,
    Pending,
    Active,
    Inactive,
    Completed,
    Cancelled,
    Archived,
}

impl PersistedStatus {
    pub const ALL: [PersistedStatus; 7] = [
        PersistedStatus::Draft,
        PersistedStatus::Pending,
        PersistedStatus::Active,
        PersistedStatus::Inactive,
        PersistedStatus::Completed,
        PersistedStatus::Cancelled,
        PersistedStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PersistedStatus::Draft => "draft",
            PersistedStatus::Pending => "pending",
            PersistedStatus::Active => "active",
            PersistedStatus::Inactive => "inactive",
            PersistedStatus::Completed => "completed",
            PersistedStatus::Cancelled => "cancelled",
            PersistedStatus::Archived => "archived",
        }
    }

    /// Persisted → engine mapping. Total over the persisted domain.
    pub fn to_engine(self) -> InstanceStatus {
        match self {
            PersistedStatus::Draft => InstanceStatus::Inactive,
            PersistedStatus::Pending => InstanceStatus::Active,
            PersistedStatus::Active => InstanceStatus::Active,
            PersistedStatus::Inactive => InstanceStatus::Inactive,
            PersistedStatus::Completed => InstanceStatus::Completed,
            PersistedStatus::Cancelled => InstanceStatus::Failed,
            PersistedStatus::Archived => InstanceStatus::Inactive,
        }
    }
}

impl std::fmt::Display for PersistedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistedStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PersistedStatus::Draft),
            "pending" => Ok(PersistedStatus::Pending),
            "active" => Ok(PersistedStatus::Active),
            "inactive" => Ok(PersistedStatus::Inactive),
            "completed" => Ok(PersistedStatus::Completed),
            "cancelled" => Ok(PersistedStatus::Cancelled),
            "archived" => Ok(PersistedStatus::Archived),
            other => Err(EngineError::Validation(format!(
                "unknown persisted status: {other}"
            ))),
        }
    }
}

impl InstanceStatus {
    /// Engine → persisted mapping. Total over the engine domain.
    pub fn to_persisted(self) -> PersistedStatus {
        match self {
            InstanceStatus::Active => PersistedStatus::Active,
            InstanceStatus::Inactive => PersistedStatus::Inactive,
            InstanceStatus::Suspended => PersistedStatus::Inactive,
            InstanceStatus::Completed => PersistedStatus::Completed,
            InstanceStatus::Failed => PersistedStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE_ALL: [InstanceStatus; 5] = [
        InstanceStatus::Active,
        InstanceStatus::Inactive,
        InstanceStatus::Suspended,
        InstanceStatus::Completed,
        InstanceStatus::Failed,
    ];

    #[test]
    fn persisted_to_engine_table() {
        assert_eq!(PersistedStatus::Draft.to_engine(), InstanceStatus::Inactive);
        assert_eq!(PersistedStatus::Pending.to_engine(), InstanceStatus::Active);
        assert_eq!(PersistedStatus::Active.to_engine(), InstanceStatus::Active);
        assert_eq!(
            PersistedStatus::Inactive.to_engine(),
            InstanceStatus::Inactive
        );
        assert_eq!(
            PersistedStatus::Completed.to_engine(),
            InstanceStatus::Completed
        );
        assert_eq!(
            PersistedStatus::Cancelled.to_engine(),
            InstanceStatus::Failed
        );
        assert_eq!(
            PersistedStatus::Archived.to_engine(),
            InstanceStatus::Inactive
        );
    }

    #[test]
    fn engine_to_persisted_table() {
        assert_eq!(InstanceStatus::Active.to_persisted(), PersistedStatus::Active);
        assert_eq!(
            InstanceStatus::Inactive.to_persisted(),
            PersistedStatus::Inactive
        );
        assert_eq!(
            InstanceStatus::Suspended.to_persisted(),
            PersistedStatus::Inactive
        );
        assert_eq!(
            InstanceStatus::Completed.to_persisted(),
            PersistedStatus::Completed
        );
        assert_eq!(
            InstanceStatus::Failed.to_persisted(),
            PersistedStatus::Cancelled
        );
    }

    #[test]
    fn both_mappings_are_total() {
        // Exhaustive match arms make these calls; iterating proves no panic
        // path exists for any variant on either side.
        for status in PersistedStatus::ALL {
            let _ = status.to_engine();
        }
        for status in ENGINE_ALL {
            let _ = status.to_persisted();
        }
    }

    #[test]
    fn round_trip_is_identity_for_stable_statuses() {
        for status in [
            InstanceStatus::Active,
            InstanceStatus::Inactive,
            InstanceStatus::Completed,
        ] {
            assert_eq!(status.to_persisted().to_engine(), status);
        }
    }

    #[test]
    fn string_round_trip() {
        for status in PersistedStatus::ALL {
            assert_eq!(status.as_str().parse::<PersistedStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<PersistedStatus>().is_err());
    }
}
