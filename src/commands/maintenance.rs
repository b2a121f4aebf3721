use std::collections::BTreeMap;

use serde_derive::Serialize;
use uuid::Uuid;

use super::{CommandError, MessageResponse};
use crate::{
    color::HexColor,
    global::Global,
    models::{Side, SideAffinity},
    store::Snapshot,
    tasks::TaskInfo,
};

pub type SideMap<T> = BTreeMap<Side, T>;

/// Equipment as configured, with the units and sides it resolved to
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentStatus {
    pub id: String,
    pub name: String,
    pub rack_units: Vec<i64>,
    pub side: SideAffinity,
    /// `rack_units` as 1-based units within the rack
    pub units: Vec<u32>,
    pub sides: Vec<Side>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// LED count of each side
    pub config: SideMap<u32>,
    /// Global index of local LED 0 before reversal
    pub start: SideMap<u32>,
    pub reverse: SideMap<bool>,
    pub calibration_offset: SideMap<i32>,
    pub vertical_height: u32,
    pub rack_unit_size: u32,
    pub rack_units_count: u32,
    pub equipments: Vec<EquipmentStatus>,
    pub states: Snapshot,
}

fn per_side<T>(f: impl Fn(Side) -> T) -> SideMap<T> {
    Side::ALL.iter().map(|&side| (side, f(side))).collect()
}

fn equipments(global: &Global) -> Vec<EquipmentStatus> {
    global
        .config()
        .equipments
        .iter()
        .filter_map(|config| {
            let resolved = global.catalog().equipment(&config.id)?;

            Some(EquipmentStatus {
                id: config.id.clone(),
                name: config.name.clone(),
                rack_units: config.rack_units.clone(),
                side: config.side,
                units: resolved.rack_units.clone(),
                sides: resolved.sides.clone(),
            })
        })
        .collect()
}

pub async fn status(global: &Global) -> StatusResponse {
    let geometry = global.geometry();

    StatusResponse {
        config: per_side(|side| geometry.side(side).length),
        start: per_side(|side| geometry.side(side).base),
        reverse: per_side(|side| geometry.side(side).reverse),
        calibration_offset: per_side(|side| geometry.side(side).offset),
        vertical_height: geometry.canonical_height(),
        rack_unit_size: geometry.rack_unit_size(),
        rack_units_count: geometry.rack_units_count(),
        equipments: equipments(global),
        states: global.snapshot().await,
    }
}

async fn fill(global: &Global, color: HexColor) -> Result<usize, CommandError> {
    let pixels = global
        .update(|store, _| Ok::<_, CommandError>(store.fill(color)))
        .await?;

    Ok(pixels.len())
}

/// Turn every LED off
#[instrument(skip(global))]
pub async fn clear(global: &Global) -> Result<MessageResponse, CommandError> {
    fill(global, HexColor::BLACK).await?;

    Ok(MessageResponse {
        message: format!("All LEDs cleared (black {})", HexColor::BLACK),
    })
}

/// Turn every LED white
#[instrument(skip(global))]
pub async fn reset(global: &Global) -> Result<MessageResponse, CommandError> {
    fill(global, HexColor::WHITE).await?;

    Ok(MessageResponse {
        message: format!("All LEDs reset to white ({})", HexColor::WHITE),
    })
}

pub async fn list_tasks(global: &Global) -> Vec<TaskInfo> {
    global.tasks().list().await
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub task: TaskInfo,
}

#[instrument(skip(global))]
pub async fn cancel_task(global: &Global, id: &str) -> Result<CancelResponse, CommandError> {
    let unknown = || CommandError::Invalid(format!("unknown task `{}`", id));
    let uuid: Uuid = id.parse().map_err(|_| unknown())?;

    let task = global.tasks().cancel(uuid).await.ok_or_else(unknown)?;
    info!(task = %task.kind, "cancelling task");

    Ok(CancelResponse {
        message: format!("Cancelling {}", task.kind),
        task,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAllResponse {
    pub message: String,
    pub cancelled: usize,
}

#[instrument(skip(global))]
pub async fn cancel_all_tasks(global: &Global) -> CancelAllResponse {
    let cancelled = global.tasks().cancel_all().await;

    CancelAllResponse {
        message: format!("Cancelling {} task(s)", cancelled),
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::commands::{blink_unit, tests::global, BlinkBody};

    #[tokio::test]
    async fn clear_then_status() {
        let (global, device) = global();

        reset(&global).await.unwrap();
        let response = clear(&global).await.unwrap();
        assert_eq!(response.message, "All LEDs cleared (black #000000)");

        let status = status(&global).await;
        assert!(status
            .states
            .values()
            .flatten()
            .all(|entry| entry.color == HexColor::BLACK));
        assert_eq!(device.patches().len(), 2);
        assert_eq!(device.last().unwrap().len(), 157);
    }

    #[tokio::test]
    async fn status_json() {
        let (global, _) = global();
        let value = serde_json::to_value(status(&global).await).unwrap();

        assert_eq!(value["config"]["left"], 57);
        assert_eq!(value["start"]["bottom"], 138);
        assert_eq!(value["reverse"]["left"], true);
        assert_eq!(value["calibrationOffset"]["right"], 1);
        assert_eq!(value["verticalHeight"], 126);
        assert_eq!(value["rackUnitSize"], 3);
        assert_eq!(value["rackUnitsCount"], 42);
        assert_eq!(value["equipments"][1]["sides"], json!(["left"]));
        assert_eq!(value["equipments"][1]["side"], "left");
        assert_eq!(value["equipments"][1]["rack_units"], json!([0, 1]));
        assert_eq!(value["equipments"][1]["units"], json!([1, 2]));
        assert_eq!(value["equipments"][0]["side"], "both");
        assert_eq!(value["states"]["top"][0]["color"], "#000000");
        assert_eq!(value["states"]["right"].as_array().unwrap().len(), 60);
    }

    #[tokio::test]
    async fn cancel_tasks() {
        let (global, _) = global();

        let ack = blink_unit(
            &global,
            5,
            BlinkBody {
                times: 1000,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(list_tasks(&global).await.len(), 1);
        assert!(cancel_task(&global, "not-a-uuid").await.is_err());
        assert!(cancel_task(&global, &Uuid::nil().to_string()).await.is_err());

        let response = cancel_task(&global, &ack.task_id.to_string()).await.unwrap();
        assert_eq!(response.task.id, ack.task_id);
        assert_eq!(response.message, "Cancelling blink U5");

        assert!(cancel_all_tasks(&global).await.cancelled <= 1);
    }
}
