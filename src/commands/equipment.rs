use std::time::Duration;

use serde_derive::Serialize;

use super::{
    blink_segments, join_sides, light_segments, unit_segments, BlinkBody, ColorBody,
    CommandError, LedDetail, TaskAck,
};
use crate::{catalog::Equipment, global::Global, models::Side, tasks::TaskKind};

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentResponse {
    pub message: String,
    pub units: Vec<u32>,
    pub sides: Vec<Side>,
    pub leds: usize,
    pub details: Vec<LedDetail>,
}

fn find<'g>(global: &'g Global, id: &str) -> Result<&'g Equipment, CommandError> {
    global
        .catalog()
        .equipment(id)
        .filter(|equipment| !equipment.rack_units.is_empty())
        .ok_or_else(|| CommandError::Invalid(format!("unknown or empty equipment `{}`", id)))
}

/// Light every unit of an equipment on its sides
#[instrument(skip(global))]
pub async fn light_equipment(
    global: &Global,
    id: &str,
    body: ColorBody,
) -> Result<EquipmentResponse, CommandError> {
    let equipment = find(global, id)?;
    let segments = unit_segments(
        global.geometry(),
        equipment.rack_units.iter().copied(),
        &equipment.sides,
    )?;

    let details = light_segments(global, &segments, body.color).await?;

    Ok(EquipmentResponse {
        message: format!("Equipment {} ({}) updated", equipment.id, equipment.name),
        units: equipment.rack_units.clone(),
        sides: equipment.sides.clone(),
        leds: details.len(),
        details,
    })
}

#[instrument(skip(global))]
pub async fn blink_equipment(
    global: &Global,
    id: &str,
    body: BlinkBody,
) -> Result<TaskAck, CommandError> {
    let equipment = find(global, id)?;
    let segments = unit_segments(
        global.geometry(),
        equipment.rack_units.iter().copied(),
        &equipment.sides,
    )?;

    let task = global
        .tasks()
        .spawn(
            TaskKind::BlinkEquipment {
                equipment: equipment.id.clone(),
            },
            {
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
            },
        )
        .await;

    Ok(TaskAck {
        message: format!(
            "Blinking equipment {} ({}) on {} with {}, {} times, {}ms interval",
            equipment.id,
            equipment.name,
            join_sides(&equipment.sides),
            body.color,
            body.times,
            body.interval
        ),
        task_id: task.id,
        units: Some(equipment.rack_units.clone()),
        sides: equipment.sides.clone(),
    })
}
