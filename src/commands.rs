//! Operations exposed by the HTTP API
//!
//! Each operation validates its input, resolves the targeted LEDs through the
//! [Geometry], then applies them with a single [Global::update]. Blink and scan
//! variants spawn a background task and return as soon as it is registered.

use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    color::{ColorParseError, HexColor},
    device::DeviceError,
    geometry::{Geometry, GeometryError, Pixel, VerticalSpan},
    global::Global,
    models::Side,
    store::{LedStore, StoreError},
    tasks::pause,
};

mod diagnostics;
pub use diagnostics::*;

mod equipment;
pub use equipment::*;

mod leds;
pub use leds::*;

mod maintenance;
pub use maintenance::*;

mod units;
pub use units::*;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("failed to update the LED controller: {0}")]
    Device(#[from] DeviceError),
}

impl CommandError {
    /// `true` if the request itself is at fault, `false` for controller failures
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Device(_))
    }
}

pub fn parse_side(side: &str) -> Result<Side, CommandError> {
    side.parse()
        .map_err(|_| CommandError::Invalid(format!("invalid side `{}`", side)))
}

/// One LED touched by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedDetail {
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<u32>,
    pub local_index: u32,
    pub global_index: u32,
    pub color: HexColor,
}

impl LedDetail {
    fn new(geometry: &Geometry, pixel: &Pixel) -> Self {
        Self {
            side: pixel.side,
            u: None,
            v: None,
            local_index: pixel.index,
            global_index: geometry.local_to_global(pixel.side, pixel.index),
            color: pixel.color,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorBody {
    pub color: HexColor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlinkBody {
    pub color: HexColor,
    pub times: u32,
    /// Milliseconds between phases
    pub interval: u64,
}

impl Default for BlinkBody {
    fn default() -> Self {
        Self {
            color: HexColor::RED,
            times: 3,
            interval: 500,
        }
    }
}

/// Acknowledgement of a spawned background sequence
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAck {
    pub message: String,
    pub task_id: uuid::Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<u32>>,
    pub sides: Vec<Side>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A ruler segment to light on one side, tagged with the unit it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSegment {
    pub u: Option<u32>,
    pub side: Side,
    pub span: VerticalSpan,
}

/// Segments of units `unums` on `sides`, unit-major
pub fn unit_segments(
    geometry: &Geometry,
    unums: impl IntoIterator<Item = u32>,
    sides: &[Side],
) -> Result<Vec<UnitSegment>, GeometryError> {
    let mut segments = Vec::new();

    for u in unums {
        let span = geometry.u_to_vertical_range(u as i64)?;
        segments.extend(sides.iter().map(|&side| UnitSegment {
            u: Some(u),
            side,
            span,
        }));
    }

    Ok(segments)
}

/// Record every segment with `color`, pixels in segment then row order
fn paint(
    store: &mut LedStore,
    geometry: &Geometry,
    segments: &[UnitSegment],
    color: HexColor,
) -> Result<Vec<Pixel>, CommandError> {
    let mut pixels = Vec::new();

    for segment in segments {
        pixels.extend(store.set_from_vertical_segment(geometry, segment.side, segment.span, color)?);
    }

    Ok(pixels)
}

/// Light `segments` in one update and describe every written row
pub async fn light_segments(
    global: &Global,
    segments: &[UnitSegment],
    color: HexColor,
) -> Result<Vec<LedDetail>, CommandError> {
    let pixels = global
        .update(|store, geometry| paint(store, geometry, segments, color))
        .await?;

    let rows = segments
        .iter()
        .flat_map(|segment| segment.span.rows().map(move |v| (segment.u, v)));

    Ok(rows
        .zip(&pixels)
        .map(|((u, v), pixel)| LedDetail {
            u,
            v: Some(v),
            ..LedDetail::new(global.geometry(), pixel)
        })
        .collect())
}

/// Alternate `color` and black on `segments`
///
/// Returns early without a final black phase when `token` is cancelled. The
/// first controller failure ends the sequence.
pub async fn blink_segments(
    global: &Global,
    token: &CancellationToken,
    segments: &[UnitSegment],
    color: HexColor,
    times: u32,
    interval: Duration,
) -> Result<(), CommandError> {
    for _ in 0..times {
        if token.is_cancelled() {
            break;
        }

        global
            .update(|store, geometry| paint(store, geometry, segments, color))
            .await?;
        if !pause(token, interval).await {
            break;
        }

        global
            .update(|store, geometry| paint(store, geometry, segments, HexColor::BLACK))
            .await?;
        if !pause(token, interval).await {
            break;
        }
    }

    Ok(())
}

fn join_sides(sides: &[Side]) -> String {
    sides
        .iter()
        .map(|side| side.to_string())
        .collect::<Vec<_>>()
        .join("&")
}
