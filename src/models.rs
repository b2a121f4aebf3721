use std::collections::HashSet;

use serde::de::IgnoredAny;
use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use validator::Validate;

mod file;
pub use file::ConfigExt;

/// One of the four LED strips around the rack
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl Side {
    /// All sides, in declaration order. The fallback global offsets follow this order.
    pub const ALL: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

    /// Sides that carry the vertical ruler
    pub const VERTICAL: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which vertical sides an equipment is lit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(from = "SideAffinityRepr", into = "&'static str")]
#[strum(serialize_all = "lowercase")]
pub enum SideAffinity {
    Left,
    Right,
    Both,
}

impl Default for SideAffinity {
    fn default() -> Self {
        Self::Both
    }
}

impl SideAffinity {
    pub fn sides(self) -> &'static [Side] {
        match self {
            Self::Left => &[Side::Left],
            Self::Right => &[Side::Right],
            Self::Both => &Side::VERTICAL,
        }
    }
}

/// Accepted spellings for [SideAffinity]: a name, a list of names, or anything else (both)
#[derive(Deserialize)]
#[serde(untagged)]
enum SideAffinityRepr {
    One(String),
    Many(Vec<String>),
    Other(IgnoredAny),
}

impl From<SideAffinityRepr> for SideAffinity {
    fn from(repr: SideAffinityRepr) -> Self {
        let names: Vec<String> = match repr {
            SideAffinityRepr::One(name) if name.eq_ignore_ascii_case("both") => {
                return Self::Both;
            }
            SideAffinityRepr::One(name) => vec![name],
            SideAffinityRepr::Many(names) => names,
            SideAffinityRepr::Other(_) => return Self::Both,
        };

        let left = names.iter().any(|n| n.eq_ignore_ascii_case("left"));
        let right = names.iter().any(|n| n.eq_ignore_ascii_case("right"));

        match (left, right) {
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            _ => Self::Both,
        }
    }
}

fn default_rack_unit_size() -> u32 {
    3
}

fn default_rack_units_count() -> u32 {
    42
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default)]
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SideConfig {
    #[validate(range(min = 1))]
    pub length: u32,
    /// Absolute global index of local index 0 (before reversal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub calibration: Calibration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommonConfig {
    #[serde(default = "default_rack_unit_size")]
    #[validate(range(min = 1))]
    pub rack_unit_size: u32,
    #[serde(default = "default_rack_units_count")]
    #[validate(range(min = 1))]
    pub rack_units_count: u32,
    #[validate(nested)]
    pub left: SideConfig,
    #[validate(nested)]
    pub top: SideConfig,
    #[validate(nested)]
    pub right: SideConfig,
    #[validate(nested)]
    pub bottom: SideConfig,
}

impl CommonConfig {
    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::Left => &self.left,
            Side::Top => &self.top,
            Side::Right => &self.right,
            Side::Bottom => &self.bottom,
        }
    }

    /// Height of the canonical vertical ruler, in rows
    ///
    /// Saturates on configurations that [Config::check] rejects.
    pub fn canonical_height(&self) -> u32 {
        self.rack_units_count.saturating_mul(self.rack_unit_size)
    }

    /// Global index of the first LED of `side`: its absolute start if set,
    /// otherwise the sum of the lengths of the sides declared before it.
    pub fn side_base(&self, side: Side) -> u32 {
        self.side(side).start.unwrap_or_else(|| {
            Side::ALL
                .iter()
                .take_while(|&&s| s != side)
                .fold(0u32, |sum, &s| sum.saturating_add(self.side(s).length))
        })
    }

    /// One past the last global index of `side`
    pub fn side_end(&self, side: Side) -> u64 {
        u64::from(self.side_base(side)) + u64::from(self.side(side).length)
    }

    /// Total number of LEDs across all sides
    pub fn pixel_count(&self) -> u64 {
        Side::ALL.iter().map(|&s| u64::from(self.side(s).length)).sum()
    }
}

/// Unit of a catalog vertical segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerticalUnit {
    /// Start and length count rack units
    RackUnits,
    /// Start and length count ruler rows
    Leds,
}

impl Default for VerticalUnit {
    fn default() -> Self {
        Self::RackUnits
    }
}

impl From<String> for VerticalUnit {
    fn from(unit: String) -> Self {
        if unit.eq_ignore_ascii_case("leds") {
            Self::Leds
        } else {
            Self::RackUnits
        }
    }
}

impl From<VerticalUnit> for String {
    fn from(unit: VerticalUnit) -> Self {
        match unit {
            VerticalUnit::RackUnits => "u".to_owned(),
            VerticalUnit::Leds => "leds".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalSpec {
    pub start: u32,
    pub length: u32,
    #[serde(default)]
    pub unit: VerticalUnit,
}

impl VerticalSpec {
    /// Start and length on the canonical ruler, `None` if they do not fit in `u32`
    pub fn rows(&self, rack_unit_size: u32) -> Option<(u32, u32)> {
        match self.unit {
            VerticalUnit::Leds => Some((self.start, self.length)),
            VerticalUnit::RackUnits => Some((
                self.start.checked_mul(rack_unit_size)?,
                self.length.checked_mul(rack_unit_size)?,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSpan {
    pub start: u32,
    pub length: u32,
}

/// Named entry of the rack-unit catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackUnitConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<LocalSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<LocalSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<LocalSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<LocalSpan>,
}

impl RackUnitConfig {
    /// Per-side local spans, in side order
    pub fn local_spans(&self) -> impl Iterator<Item = (Side, &LocalSpan)> {
        Side::ALL.iter().filter_map(move |&side| {
            let span = match side {
                Side::Left => self.left.as_ref(),
                Side::Top => self.top.as_ref(),
                Side::Right => self.right.as_ref(),
                Side::Bottom => self.bottom.as_ref(),
            };

            span.map(|span| (side, span))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Occupied rack units, 1-based unless the list contains 0
    #[serde(default)]
    pub rack_units: Vec<i64>,
    #[serde(default)]
    pub side: SideAffinity,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("sides `{0}` and `{1}` overlap in the global index space")]
    OverlappingSides(Side, Side),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("rack unit `{id}`: {what} segment {start}+{length} exceeds {limit}")]
    SegmentOutOfRange {
        id: String,
        what: String,
        start: u32,
        length: u32,
        limit: u32,
    },
    #[error("{0} does not fit in the 32-bit index space")]
    Overflow(String),
}

/// Static LED strip topology, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub common: CommonConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rack_units: Vec<RackUnitConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipments: Vec<EquipmentConfig>,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.check()?;
        Ok(config)
    }

    /// Field validation followed by the topology checks
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.check_extents()?;
        self.check_overlaps()?;
        self.check_catalog()?;
        Ok(())
    }

    /// Every ruler row and global index must be representable as `u32`
    fn check_extents(&self) -> Result<(), ConfigError> {
        let common = &self.common;

        if common
            .rack_units_count
            .checked_mul(common.rack_unit_size)
            .is_none()
        {
            return Err(ConfigError::Overflow("canonical ruler height".to_owned()));
        }

        if common.pixel_count() > u64::from(u32::MAX) {
            return Err(ConfigError::Overflow("total LED count".to_owned()));
        }

        // The last LED of a side may sit at u32::MAX
        for &side in &Side::ALL {
            if common.side_end(side) > u64::from(u32::MAX) + 1 {
                return Err(ConfigError::Overflow(format!("{} side", side)));
            }
        }

        Ok(())
    }

    fn check_overlaps(&self) -> Result<(), ConfigError> {
        let common = &self.common;

        for (i, &a) in Side::ALL.iter().enumerate() {
            for &b in &Side::ALL[i + 1..] {
                let (a_start, b_start) = (
                    u64::from(common.side_base(a)),
                    u64::from(common.side_base(b)),
                );
                let (a_end, b_end) = (common.side_end(a), common.side_end(b));

                if a_start < b_end && b_start < a_end {
                    return Err(ConfigError::OverlappingSides(a, b));
                }
            }
        }

        Ok(())
    }

    fn check_catalog(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for unit in &self.rack_units {
            if !ids.insert(unit.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "rack unit",
                    id: unit.id.clone(),
                });
            }

            for (side, span) in unit.local_spans() {
                let limit = self.common.side(side).length;
                if span.start as u64 + span.length as u64 > limit as u64 {
                    return Err(ConfigError::SegmentOutOfRange {
                        id: unit.id.clone(),
                        what: side.to_string(),
                        start: span.start,
                        length: span.length,
                        limit,
                    });
                }
            }

            if let Some(vertical) = &unit.vertical {
                let (start, length) = vertical
                    .rows(self.common.rack_unit_size)
                    .ok_or_else(|| ConfigError::Overflow(format!("rack unit `{}`", unit.id)))?;
                let limit = self.common.canonical_height();
                if start as u64 + length as u64 > limit as u64 {
                    return Err(ConfigError::SegmentOutOfRange {
                        id: unit.id.clone(),
                        what: "vertical".to_owned(),
                        start,
                        length,
                        limit,
                    });
                }
            }
        }

        let mut ids = HashSet::new();
        for equipment in &self.equipments {
            if !ids.insert(equipment.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "equipment",
                    id: equipment.id.clone(),
                });
            }
        }

        Ok(())
    }
}
