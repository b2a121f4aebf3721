use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::Serialize;

use super::{
    blink_segments, join_sides, light_segments, unit_segments, BlinkBody, ColorBody,
    CommandError, LedDetail, TaskAck,
};
use crate::{
    catalog::CatalogSegment,
    global::Global,
    models::Side,
    tasks::TaskKind,
};

lazy_static! {
    static ref RANGE_RE: Regex = Regex::new(r"^(\d+)-(\d+)$").expect("invalid range regex");
}

/// Parse a `U` path parameter. Range checks are left to the geometry.
pub fn parse_unit(unum: &str) -> Result<i64, CommandError> {
    unum.parse()
        .map_err(|_| CommandError::Invalid(format!("invalid U number `{}`", unum)))
}

/// Parse `start-end`, swapping reversed bounds
pub fn parse_range(range: &str) -> Result<(u32, u32), CommandError> {
    let invalid = || CommandError::Invalid("invalid range format, use start-end".to_owned());

    let captures = RANGE_RE.captures(range).ok_or_else(invalid)?;
    let start: u32 = captures[1].parse().map_err(|_| invalid())?;
    let end: u32 = captures[2].parse().map_err(|_| invalid())?;

    Ok(if start > end { (end, start) } else { (start, end) })
}

fn check_unit(global: &Global, unum: i64) -> Result<u32, CommandError> {
    global.geometry().u_to_vertical_range(unum)?;
    Ok(unum as u32)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub message: String,
    pub rack_units_count: u32,
    pub v_start: u32,
    pub v_length: u32,
    pub details: Vec<LedDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeResponse {
    pub message: String,
    pub rack_units_count: u32,
    pub details: Vec<LedDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogUnitResponse {
    pub message: String,
    pub leds: usize,
    pub details: Vec<LedDetail>,
}

/// Light one rack unit on both vertical sides
#[instrument(skip(global))]
pub async fn light_unit(
    global: &Global,
    unum: i64,
    body: ColorBody,
) -> Result<UnitResponse, CommandError> {
    let unum = check_unit(global, unum)?;
    let segments = unit_segments(global.geometry(), Some(unum), &Side::VERTICAL)?;
    let span = segments[0].span;

    let details = light_segments(global, &segments, body.color).await?;

    Ok(UnitResponse {
        message: format!(
            "Lit U{} on {} with {}",
            unum,
            join_sides(&Side::VERTICAL),
            body.color
        ),
        rack_units_count: global.geometry().rack_units_count(),
        v_start: span.start,
        v_length: span.length,
        details,
    })
}

#[instrument(skip(global))]
pub async fn blink_unit(
    global: &Global,
    unum: i64,
    body: BlinkBody,
) -> Result<TaskAck, CommandError> {
    let unum = check_unit(global, unum)?;
    let segments = unit_segments(global.geometry(), Some(unum), &Side::VERTICAL)?;

    let task = global
        .tasks()
        .spawn(TaskKind::BlinkUnit { unum }, {
            let global = global.clone();
            let body = body.clone();

            move |token| async move {
                blink_segments(
                    &global,
                    &token,
                    &segments,
                    body.color,
                    body.times,
                    Duration::from_millis(body.interval),
                )
                .await
            }
        })
        .await;

    Ok(TaskAck {
        message: format!(
            "Blinking U{} on {} with {}, {} times, {}ms interval",
            unum,
            join_sides(&Side::VERTICAL),
            body.color,
            body.times,
            body.interval
        ),
        task_id: task.id,
        units: Some(vec![unum]),
        sides: Side::VERTICAL.to_vec(),
    })
}

#[instrument(skip(global))]
pub async fn light_range(
    global: &Global,
    range: &str,
    body: ColorBody,
) -> Result<RangeResponse, CommandError> {
    let (start, end) = parse_range(range)?;
    let segments = unit_segments(global.geometry(), start..=end, &Side::VERTICAL)?;

    let details = light_segments(global, &segments, body.color).await?;

    Ok(RangeResponse {
        message: format!(
            "Lit U{}-U{} on {} with {}",
            start,
            end,
            join_sides(&Side::VERTICAL),
            body.color
        ),
        rack_units_count: global.geometry().rack_units_count(),
        details,
    })
}

#[instrument(skip(global))]
pub async fn blink_range(
    global: &Global,
    range: &str,
    body: BlinkBody,
) -> Result<TaskAck, CommandError> {
    let (start, end) = parse_range(range)?;
    let segments = unit_segments(global.geometry(), start..=end, &Side::VERTICAL)?;

    let task = global
        .tasks()
        .spawn(TaskKind::BlinkUnitRange { start, end }, {
            let global = global.clone();
            let body = body.clone();

            move |token| async move {
                blink_segments(
                    &global,
                    &token,
                    &segments,
                    body.color,
                    body.times,
                    Duration::from_millis(body.interval),
                )
                .await
            }
        })
        .await;

    Ok(TaskAck {
        message: format!(
            "Blinking U{}-U{} on {} with {}, {} times, {}ms interval",
            start,
            end,
            join_sides(&Side::VERTICAL),
            body.color,
            body.times,
            body.interval
        ),
        task_id: task.id,
        units: Some((start..=end).collect()),
        sides: Side::VERTICAL.to_vec(),
    })
}

/// Light every segment of a named catalog entry
#[instrument(skip(global))]
pub async fn light_catalog_unit(
    global: &Global,
    id: &str,
    body: ColorBody,
) -> Result<CatalogUnitResponse, CommandError> {
    let unit = global
        .catalog()
        .rack_unit(id)
        .ok_or_else(|| CommandError::Invalid(format!("unknown rack unit `{}`", id)))?;
    let color = body.color;

    // Ruler row of each written pixel, if it comes from a vertical segment
    let mut rows = Vec::new();
    let pixels = global
        .update(|store, geometry| {
            let mut pixels = Vec::new();

            for segment in &unit.segments {
                match *segment {
                    CatalogSegment::Local {
                        side,
                        start,
                        length,
                    } => {
                        pixels.extend(store.set_range(side, start as i64, length as i64, color)?);
                        rows.extend((0..length).map(|_| None));
                    }
                    CatalogSegment::Vertical { side, span } => {
                        pixels.extend(store.set_from_vertical_segment(geometry, side, span, color)?);
                        rows.extend(span.rows().map(Some));
                    }
                }
            }

            Ok::<_, CommandError>(pixels)
        })
        .await?;

    let details = pixels
        .iter()
        .zip(rows)
        .map(|(pixel, v)| LedDetail {
            v,
            ..LedDetail::new(global.geometry(), pixel)
        })
        .collect();

    Ok(CatalogUnitResponse {
        message: format!("Rack unit {} set to {}", unit.id, color),
        leds: pixels.len(),
        details,
    })
}
