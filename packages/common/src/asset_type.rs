#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content an asset holds.
///
/// Mutable descriptive metadata on the asset shell, not versioned. The kind
/// also picks which background pipeline job runs after an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "image"))]
    Image,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "video"))]
    Video,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "document"))]
    Document,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "geometry"))]
    Geometry,
}

impl AssetType {
    pub const ALL: &'static [AssetType] =
        &[Self::Image, Self::Video, Self::Document, Self::Geometry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for AssetType {
    fn default() -> Self {
        Self::Document
    }
}

/// Error when parsing an invalid asset type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAssetTypeError {
    invalid: String,
}

impl fmt::Display for ParseAssetTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid asset_type '{}'. Valid values: {}",
            self.invalid,
            AssetType::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseAssetTypeError {}

impl FromStr for AssetType {
    type Err = ParseAssetTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            "geometry" => Ok(Self::Geometry),
            _ => Err(ParseAssetTypeError {
                invalid: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_strict() {
        assert_eq!("geometry".parse::<AssetType>().unwrap(), AssetType::Geometry);
        assert!("Geometry".parse::<AssetType>().is_err());
        assert!("mesh".parse::<AssetType>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&AssetType::Image).unwrap(), "\"image\"");
    }
}
