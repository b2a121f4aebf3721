use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

use crate::{color::HexColor, geometry::Geometry, geometry::Pixel};

/// One batched update for the controller
///
/// Serializes to the segment-patch body understood by the firmware:
/// `{"seg":{"i":[index0,"RRGGBB",index1,"RRGGBB",...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    entries: Vec<(u32, HexColor)>,
}

impl Patch {
    /// Resolve `pixels` to global indices, keeping their order
    pub fn build(geometry: &Geometry, pixels: &[Pixel]) -> Self {
        Self {
            entries: pixels
                .iter()
                .map(|p| (geometry.local_to_global(p.side, p.index), p.color))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(u32, HexColor)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flat `[index, "RRGGBB", ...]` list
struct Interleaved<'p>(&'p [(u32, HexColor)]);

impl Serialize for Interleaved<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len() * 2))?;
        for (index, color) in self.0 {
            seq.serialize_element(index)?;
            seq.serialize_element(&color.to_wire())?;
        }
        seq.end()
    }
}

struct Segment<'p>(&'p [(u32, HexColor)]);

impl Serialize for Segment<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("i", &Interleaved(self.0))?;
        map.end()
    }
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("seg", &Segment(&self.entries))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{tests::RACK_CONFIG, Config, Side};

    fn geometry() -> Geometry {
        Geometry::new(&Config::from_json_str(RACK_CONFIG).unwrap().common)
    }

    #[test]
    fn wire_format() {
        let patch = Patch::build(
            &geometry(),
            &[
                Pixel::new(Side::Left, 0, HexColor::new(0xff, 0x00, 0x7f)),
                Pixel::new(Side::Top, 2, HexColor::BLACK),
            ],
        );

        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"seg":{"i":[57,"FF007F",60,"000000"]}}"#
        );
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let patch = Patch::build(
            &geometry(),
            &[
                Pixel::new(Side::Top, 1, HexColor::RED),
                Pixel::new(Side::Top, 0, HexColor::RED),
                Pixel::new(Side::Top, 1, HexColor::BLUE),
            ],
        );

        assert_eq!(
            patch.entries(),
            &[(59, HexColor::RED), (58, HexColor::RED), (59, HexColor::BLUE)]
        );
    }

    #[test]
    fn empty_patch() {
        let patch = Patch::build(&geometry(), &[]);

        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"seg":{"i":[]}}"#);
    }
}
