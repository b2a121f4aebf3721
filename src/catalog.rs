//! Equipment and named rack units, resolved once from the configuration

use serde_derive::Serialize;

use crate::{
    geometry::VerticalSpan,
    models::{Config, EquipmentConfig, Side},
};

/// A piece of equipment mounted in the rack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    /// Occupied rack units, 1-based
    pub rack_units: Vec<u32>,
    pub sides: Vec<Side>,
}

impl Equipment {
    fn new(config: &EquipmentConfig, rack_units_count: u32) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            rack_units: normalize_units(&config.rack_units, rack_units_count),
            sides: config.side.sides().to_vec(),
        }
    }
}

/// Convert a configured unit list to 1-based unit numbers
///
/// A list containing 0 is taken as 0-based. Units outside `1..=count` are dropped.
pub fn normalize_units(units: &[i64], count: u32) -> Vec<u32> {
    let shift = if units.contains(&0) { 1 } else { 0 };

    units
        .iter()
        .map(|&u| u + shift)
        .filter(|&u| u >= 1 && u <= count as i64)
        .map(|u| u as u32)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSegment {
    /// Side-local LEDs `start..start + length`
    Local { side: Side, start: u32, length: u32 },
    /// Ruler rows, mapped onto `side`
    Vertical { side: Side, span: VerticalSpan },
}

/// Named rack unit and the LED segments that light it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUnit {
    pub id: String,
    pub segments: Vec<CatalogSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    equipments: Vec<Equipment>,
    rack_units: Vec<CatalogUnit>,
}

impl Catalog {
    pub fn new(config: &Config) -> Self {
        let common = &config.common;

        let rack_units = config
            .rack_units
            .iter()
            .map(|unit| {
                let mut segments: Vec<_> = unit
                    .local_spans()
                    .map(|(side, span)| CatalogSegment::Local {
                        side,
                        start: span.start,
                        length: span.length,
                    })
                    .collect();

                if let Some((start, length)) = unit
                    .vertical
                    .as_ref()
                    .and_then(|vertical| vertical.rows(common.rack_unit_size))
                {
                    segments.extend(Side::VERTICAL.iter().map(|&side| CatalogSegment::Vertical {
                        side,
                        span: VerticalSpan::new(start, length),
                    }));
                }

                CatalogUnit {
                    id: unit.id.clone(),
                    segments,
                }
            })
            .collect();

        Self {
            equipments: config
                .equipments
                .iter()
                .map(|eq| Equipment::new(eq, common.rack_units_count))
                .collect(),
            rack_units,
        }
    }

    pub fn equipment(&self, id: &str) -> Option<&Equipment> {
        self.equipments.iter().find(|eq| eq.id == id)
    }

    pub fn rack_unit(&self, id: &str) -> Option<&CatalogUnit> {
        self.rack_units.iter().find(|unit| unit.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::RACK_CONFIG;

    #[test]
    fn zero_based_units_are_shifted() {
        assert_eq!(normalize_units(&[0, 1, 41], 42), vec![1, 2, 42]);
        assert_eq!(normalize_units(&[1, 2, 42], 42), vec![1, 2, 42]);
        assert_eq!(normalize_units(&[-3, 5, 43], 42), vec![5]);
        assert!(normalize_units(&[], 42).is_empty());
    }

    #[test]
    fn resolve_from_config() {
        let catalog = Catalog::new(&Config::from_json_str(RACK_CONFIG).unwrap());

        let sw1 = catalog.equipment("sw1").unwrap();
        assert_eq!(sw1.rack_units, vec![41, 42]);
        assert_eq!(sw1.sides, vec![Side::Left, Side::Right]);

        let srv1 = catalog.equipment("srv1").unwrap();
        assert_eq!(srv1.rack_units, vec![1, 2]);
        assert_eq!(srv1.sides, vec![Side::Left]);

        assert!(catalog.equipment("nope").is_none());

        assert_eq!(
            catalog.rack_unit("patch-panel").unwrap().segments,
            vec![
                CatalogSegment::Vertical {
                    side: Side::Left,
                    span: VerticalSpan::new(0, 6)
                },
                CatalogSegment::Vertical {
                    side: Side::Right,
                    span: VerticalSpan::new(0, 6)
                },
            ]
        );
        assert_eq!(
            catalog.rack_unit("top-bar").unwrap().segments,
            vec![CatalogSegment::Local {
                side: Side::Top,
                start: 5,
                length: 10
            }]
        );
    }
}
