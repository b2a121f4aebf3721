//! Coordinate conversions between the LED index spaces
//!
//! Four spaces are involved:
//!
//! * the local index of an LED within its side (`0..length`),
//! * the global index in the flat pixel array of the controller,
//! * the canonical vertical ruler (`0..rack_units_count * rack_unit_size`) shared by the
//!   left and right sides, which may have different LED densities,
//! * rack unit numbers (`1..=rack_units_count`), each covering `rack_unit_size` ruler rows.
//!
//! Everything here is pure. Writing the resulting pixels is the job of the
//! [LedStore](crate::store::LedStore).

use serde_derive::Serialize;
use thiserror::Error;

use crate::{
    color::HexColor,
    models::{CommonConfig, Side},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("vertical index {v} out of range 0..{max}")]
    VerticalOutOfRange { v: i64, max: i64 },
    #[error("U number {unum} out of range 1..{count}")]
    UnitOutOfRange { unum: i64, count: u32 },
    #[error("side `{0}` has no LEDs")]
    EmptySide(Side),
}

/// A color assigned to an LED, addressed by side and local index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub side: Side,
    pub index: u32,
    pub color: HexColor,
}

impl Pixel {
    pub fn new(side: Side, index: u32, color: HexColor) -> Self {
        Self { side, index, color }
    }
}

/// A contiguous run of rows on the canonical ruler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerticalSpan {
    #[serde(rename = "vStart")]
    pub start: u32,
    #[serde(rename = "vLength")]
    pub length: u32,
}

impl VerticalSpan {
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    pub fn rows(&self) -> impl Iterator<Item = u32> {
        self.start..(self.start + self.length)
    }
}

/// Resolved placement of one side in the global index space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideLayout {
    pub length: u32,
    pub base: u32,
    pub reverse: bool,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    sides: [SideLayout; 4],
    rack_unit_size: u32,
    rack_units_count: u32,
}

impl Geometry {
    pub fn new(common: &CommonConfig) -> Self {
        let layout = |side| {
            let config = common.side(side);

            SideLayout {
                length: config.length,
                base: common.side_base(side),
                reverse: config.reverse,
                offset: config.calibration.offset,
            }
        };

        Self {
            sides: [
                layout(Side::Left),
                layout(Side::Top),
                layout(Side::Right),
                layout(Side::Bottom),
            ],
            rack_unit_size: common.rack_unit_size,
            rack_units_count: common.rack_units_count,
        }
    }

    pub fn side(&self, side: Side) -> &SideLayout {
        &self.sides[side.index()]
    }

    pub fn side_length(&self, side: Side) -> u32 {
        self.side(side).length
    }

    pub fn rack_unit_size(&self) -> u32 {
        self.rack_unit_size
    }

    pub fn rack_units_count(&self) -> u32 {
        self.rack_units_count
    }

    pub fn canonical_height(&self) -> u32 {
        self.rack_units_count.saturating_mul(self.rack_unit_size)
    }

    /// Global index of a local LED index
    ///
    /// `local` must be in `0..length`; callers validate it beforehand. A checked
    /// configuration keeps every side within the `u32` index space.
    pub fn local_to_global(&self, side: Side, local: u32) -> u32 {
        let layout = self.side(side);
        debug_assert!(local < layout.length, "{} index {} out of range", side, local);

        let effective = if layout.reverse {
            layout.length - 1 - local
        } else {
            local
        };

        debug_assert!(layout.base.checked_add(effective).is_some());
        layout.base.saturating_add(effective)
    }

    /// Local LED index displaying ruler row `v` on `side`
    ///
    /// The row is scaled proportionally onto the side length, rounded, shifted
    /// by the side calibration offset and clamped to the side bounds. Reversal
    /// is not applied here, see [Geometry::local_to_global].
    pub fn vertical_to_local(&self, side: Side, v: i64) -> Result<u32, GeometryError> {
        let height = self.canonical_height() as i64;
        if v < 0 || v >= height {
            return Err(GeometryError::VerticalOutOfRange { v, max: height - 1 });
        }

        let layout = self.side(side);
        if layout.length == 0 {
            return Err(GeometryError::EmptySide(side));
        }

        // A one-row ruler maps everything to the first LED
        let raw = if height > 1 {
            v as f64 / (height - 1) as f64 * (layout.length - 1) as f64
        } else {
            0.
        };

        let local = raw.round() as i64 + layout.offset as i64;
        Ok(local.clamp(0, layout.length as i64 - 1) as u32)
    }

    /// Rows of the ruler covered by rack unit `unum`
    ///
    /// Both ends are clamped to the ruler independently, the length is derived
    /// from the clamped ends.
    pub fn u_to_vertical_range(&self, unum: i64) -> Result<VerticalSpan, GeometryError> {
        if unum < 1 || unum > self.rack_units_count as i64 {
            return Err(GeometryError::UnitOutOfRange {
                unum,
                count: self.rack_units_count,
            });
        }

        let size = self.rack_unit_size as i64;
        let max = self.canonical_height() as i64 - 1;

        let v_start = (unum - 1) * size;
        let v_end = v_start + size - 1;
        let start = v_start.clamp(0, max);
        let end = v_end.clamp(0, max);

        Ok(VerticalSpan::new(start as u32, (end - start + 1) as u32))
    }

    /// Pixels of `side` covering `span`, one per ruler row, in row order
    ///
    /// Sides shorter than the ruler yield repeated local indices.
    pub fn expand_vertical_segment(
        &self,
        side: Side,
        span: VerticalSpan,
        color: HexColor,
    ) -> Result<Vec<Pixel>, GeometryError> {
        span.rows()
            .map(|v| Ok(Pixel::new(side, self.vertical_to_local(side, v as i64)?, color)))
            .collect()
    }
}
