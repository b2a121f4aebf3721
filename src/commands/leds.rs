use serde_derive::{Deserialize, Serialize};

use super::CommandError;
use crate::{color::HexColor, geometry::Pixel, global::Global, models::Side};

#[derive(Debug, Clone, Deserialize)]
pub struct LedCommand {
    pub index: u32,
    pub color: HexColor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetLedsBody {
    pub leds: Vec<LedCommand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetLedsResponse {
    pub message: String,
    pub count: usize,
}

/// Set individual LEDs of `side`
///
/// Every index is checked before anything is written.
#[instrument(skip(global, body), fields(leds = body.leds.len()))]
pub async fn set_side_leds(
    global: &Global,
    side: Side,
    body: SetLedsBody,
) -> Result<SetLedsResponse, CommandError> {
    let pixels: Vec<_> = body
        .leds
        .iter()
        .map(|led| Pixel::new(side, led.index, led.color))
        .collect();

    let pixels = global
        .update(move |store, _| {
            store.set_pixels(&pixels)?;
            Ok::<_, CommandError>(pixels)
        })
        .await?;

    Ok(SetLedsResponse {
        message: format!("Updated {}", side),
        count: pixels.len(),
    })
}
