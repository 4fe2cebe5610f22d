// ── Object categories ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The kind of object a list mirrors. One list per category per context.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Category {
    Device,
    ExternalDevice,
    Entity,
    Source,
    Destination,
}

impl Category {
    /// Devices own entities, entities own endpoints.
    pub fn parent_category(self) -> Option<Self> {
        match self {
            Self::Device | Self::ExternalDevice => None,
            Self::Entity => Some(Self::Device),
            Self::Source | Self::Destination => Some(Self::Entity),
        }
    }

    pub fn is_endpoint(self) -> bool {
        matches!(self, Self::Source | Self::Destination)
    }

    /// Every category, in declaration order.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}
