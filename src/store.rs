use std::collections::BTreeMap;

use serde_derive::Serialize;
use thiserror::Error;

use crate::{
    color::HexColor,
    geometry::{Geometry, GeometryError, Pixel, VerticalSpan},
    models::Side,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("out-of-range segment on `{side}` (start={start}, length={length})")]
    OutOfRange { side: Side, start: i64, length: i64 },
    #[error("invalid LED index {index} for side `{side}`")]
    InvalidIndex { side: Side, index: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedEntry {
    pub color: HexColor,
}

/// Full dump of the store, per side
pub type Snapshot = BTreeMap<Side, Vec<LedEntry>>;

/// In-memory mirror of the colors last sent to the controller
///
/// Sized once from the geometry; entries are overwritten, never added or removed.
#[derive(Debug, Clone)]
pub struct LedStore {
    sides: [Vec<HexColor>; 4],
}

impl LedStore {
    pub fn new(geometry: &Geometry) -> Self {
        let side = |side| vec![HexColor::BLACK; geometry.side_length(side) as usize];

        Self {
            sides: [
                side(Side::Left),
                side(Side::Top),
                side(Side::Right),
                side(Side::Bottom),
            ],
        }
    }

    pub fn side_length(&self, side: Side) -> u32 {
        self.sides[side.index()].len() as u32
    }

    pub fn get(&self, side: Side, index: u32) -> Option<HexColor> {
        self.sides[side.index()].get(index as usize).copied()
    }

    /// Overwrite `length` entries of `side` starting at `start`
    pub fn set_range(
        &mut self,
        side: Side,
        start: i64,
        length: i64,
        color: HexColor,
    ) -> Result<Vec<Pixel>, StoreError> {
        if start < 0 || length < 0 || start + length > self.side_length(side) as i64 {
            return Err(StoreError::OutOfRange {
                side,
                start,
                length,
            });
        }

        let entries = &mut self.sides[side.index()][start as usize..(start + length) as usize];
        entries.fill(color);

        Ok((start..start + length)
            .map(|index| Pixel::new(side, index as u32, color))
            .collect())
    }

    /// Write all `pixels` in order, or none of them if any is out of range
    pub fn set_pixels(&mut self, pixels: &[Pixel]) -> Result<(), StoreError> {
        if let Some(pixel) = pixels
            .iter()
            .find(|p| p.index >= self.side_length(p.side))
        {
            return Err(StoreError::InvalidIndex {
                side: pixel.side,
                index: pixel.index,
            });
        }

        for pixel in pixels {
            self.sides[pixel.side.index()][pixel.index as usize] = pixel.color;
        }

        Ok(())
    }

    /// Expand a ruler segment on `side` and record the result
    pub fn set_from_vertical_segment(
        &mut self,
        geometry: &Geometry,
        side: Side,
        span: VerticalSpan,
        color: HexColor,
    ) -> Result<Vec<Pixel>, GeometryError> {
        let pixels = geometry.expand_vertical_segment(side, span, color)?;

        for pixel in &pixels {
            self.sides[side.index()][pixel.index as usize] = color;
        }

        Ok(pixels)
    }

    /// Set every LED of every side, side-major
    pub fn fill(&mut self, color: HexColor) -> Vec<Pixel> {
        let mut pixels = Vec::new();

        for &side in &Side::ALL {
            let entries = &mut self.sides[side.index()];
            entries.fill(color);
            pixels.extend((0..entries.len() as u32).map(|index| Pixel::new(side, index, color)));
        }

        pixels
    }

    pub fn snapshot(&self) -> Snapshot {
        Side::ALL
            .iter()
            .map(|&side| {
                (
                    side,
                    self.sides[side.index()]
                        .iter()
                        .map(|&color| LedEntry { color })
                        .collect(),
                )
            })
            .collect()
    }
}
