#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of an asset version.
///
/// The set is fixed but transitions are not enforced: any value may be
/// declared on a newly allocated version, the system only validates
/// membership. When the `sea-orm` feature is enabled, this enum can be used
/// directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Shell exists but no real work has landed yet.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "placeholder"))]
    Placeholder,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ready_to_start"))]
    ReadyToStart,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "work_in_progress"))]
    WorkInProgress,
    /// Sent back by review with requested changes.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "kickback"))]
    Kickback,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ready_for_review"))]
    ReadyForReview,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "approved"))]
    Approved,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "published"))]
    Published,
}

impl VersionStatus {
    /// All workflow statuses, in pipeline order.
    pub const ALL: &'static [VersionStatus] = &[
        Self::Placeholder,
        Self::ReadyToStart,
        Self::WorkInProgress,
        Self::Kickback,
        Self::ReadyForReview,
        Self::Approved,
        Self::Published,
    ];

    /// The status a version gets when the caller declares none.
    pub fn initial() -> Self {
        Self::Placeholder
    }

    /// Machine-readable key (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::ReadyToStart => "ready_to_start",
            Self::WorkInProgress => "work_in_progress",
            Self::Kickback => "kickback",
            Self::ReadyForReview => "ready_for_review",
            Self::Approved => "approved",
            Self::Published => "published",
        }
    }

    /// Human-readable label for UI display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::ReadyToStart => "ready to start",
            Self::WorkInProgress => "work in progress",
            Self::Kickback => "kickback",
            Self::ReadyForReview => "ready for review",
            Self::Approved => "approved",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for VersionStatus {
    fn default() -> Self {
        Self::initial()
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            VersionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for VersionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placeholder" => Ok(Self::Placeholder),
            "ready_to_start" => Ok(Self::ReadyToStart),
            "work_in_progress" => Ok(Self::WorkInProgress),
            "kickback" => Ok(Self::Kickback),
            "ready_for_review" => Ok(Self::ReadyForReview),
            "approved" => Ok(Self::Approved),
            "published" => Ok(Self::Published),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        for status in VersionStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            let parsed: VersionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn from_str_accepts_keys_only() {
        assert_eq!(
            "ready_for_review".parse::<VersionStatus>().unwrap(),
            VersionStatus::ReadyForReview
        );
        assert!("ready for review".parse::<VersionStatus>().is_err());
        assert!("not_a_real_status".parse::<VersionStatus>().is_err());
    }

    #[test]
    fn initial_is_placeholder() {
        assert_eq!(VersionStatus::default(), VersionStatus::Placeholder);
        assert_eq!(VersionStatus::initial().as_str(), "placeholder");
    }

    #[test]
    fn labels_cover_all_statuses() {
        for status in VersionStatus::ALL {
            assert!(!status.label().is_empty());
        }
        assert_eq!(VersionStatus::WorkInProgress.label(), "work in progress");
    }
}
