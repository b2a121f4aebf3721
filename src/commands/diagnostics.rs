use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use super::{blink_segments, unit_segments, CommandError, LedDetail, TaskAck};
use crate::{
    color::HexColor,
    geometry::Pixel,
    global::Global,
    models::Side,
    tasks::{pause, TaskKind},
};

#[derive(Debug, Clone, Serialize)]
pub struct SideTestResponse {
    pub message: String,
    pub leds: u32,
    pub offset: i32,
    pub details: Vec<LedDetail>,
}

/// Light a whole side: blue first LED, red last LED, green in between
#[instrument(skip(global))]
pub async fn test_side(global: &Global, side: Side) -> Result<SideTestResponse, CommandError> {
    let layout = *global.geometry().side(side);
    let length = layout.length;

    let pixels: Vec<_> = (0..length)
        .map(|index| {
            let color = if index == 0 {
                HexColor::BLUE
            } else if index == length - 1 {
                HexColor::RED
            } else {
                HexColor::GREEN
            };

            Pixel::new(side, index, color)
        })
        .collect();

    let pixels = global
        .update(move |store, _| {
            store.set_pixels(&pixels)?;
            Ok::<_, CommandError>(pixels)
        })
        .await?;

    Ok(SideTestResponse {
        message: format!(
            "Tested side {} ({} LEDs). Start=Blue, End=Red, Middle=Green.",
            side, length
        ),
        leds: length,
        offset: layout.offset,
        details: pixels
            .iter()
            .map(|pixel| LedDetail::new(global.geometry(), pixel))
            .collect(),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanBody {
    /// First unit, defaults to the top of the rack
    pub from: Option<u32>,
    pub to: u32,
    pub times: u32,
    pub interval: u64,
    pub pause_between_units: u64,
}

impl Default for ScanBody {
    fn default() -> Self {
        Self {
            from: None,
            to: 1,
            times: 3,
            interval: 250,
            pause_between_units: 150,
        }
    }
}

/// Blink every unit from `from` down to `to`, each with its own random color
#[instrument(skip(global))]
pub async fn scan_units(global: &Global, body: ScanBody) -> Result<TaskAck, CommandError> {
    let count = global.geometry().rack_units_count();
    let from = body.from.unwrap_or(count);
    let to = body.to;

    if from < 1 || from > count || to < 1 || to > count {
        return Err(CommandError::Invalid(format!(
            "`from` and `to` must be in 1..{}",
            count
        )));
    }

    if from < to {
        return Err(CommandError::Invalid(
            "`from` should be >= `to` for a downward scan".to_owned(),
        ));
    }

    let task = global
        .tasks()
        .spawn(TaskKind::ScanUnits { from, to }, {
            let global = global.clone();
            let body = body.clone();

            move |token| async move {
                let interval = Duration::from_millis(body.interval);
                let between = Duration::from_millis(body.pause_between_units);

                for unum in (to..=from).rev() {
                    let color = HexColor::random();
                    debug!(unum, color = %color, "scanning unit");

                    let segments = unit_segments(global.geometry(), Some(unum), &Side::VERTICAL)?;
                    blink_segments(&global, &token, &segments, color, body.times, interval).await?;

                    if token.is_cancelled() {
                        break;
                    }

                    if unum != to && !between.is_zero() && !pause(&token, between).await {
                        break;
                    }
                }

                Ok::<_, CommandError>(())
            }
        })
        .await;

    Ok(TaskAck {
        message: format!(
            "Starting U scan from U{} down to U{}. Each U blinks {} times with interval {}ms.",
            from, to, body.times, body.interval
        ),
        task_id: task.id,
        units: None,
        sides: Side::VERTICAL.to_vec(),
    })
}
