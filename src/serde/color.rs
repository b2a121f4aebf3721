use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::color::HexColor;

/// Serde visitor for `#RRGGBB` color strings
struct HexColorVisitor;

impl<'de> de::Visitor<'de> for HexColorVisitor {
    type Value = HexColor;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a color string like \"#RRGGBB\"")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        value.parse().map_err(E::custom)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(HexColorVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_as_string() {
        let color: HexColor = serde_json::from_str(r##""#00ff7f""##).unwrap();
        assert_eq!(color, HexColor::new(0, 255, 127));
        assert_eq!(serde_json::to_string(&color).unwrap(), r##""#00FF7F""##);
    }

    #[test]
    fn reject_non_color() {
        assert!(serde_json::from_str::<HexColor>(r#""blue""#).is_err());
        assert!(serde_json::from_str::<HexColor>("255").is_err());
    }
}
