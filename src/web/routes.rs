use std::convert::Infallible;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use warp::{http::StatusCode, reply::Response, Filter, Rejection, Reply};

use super::error_reply;
use crate::{
    commands::{
        self, parse_side, parse_unit, BlinkBody, ColorBody, CommandError, ScanBody, SetLedsBody,
    },
    global::Global,
};

fn with_global(global: Global) -> impl Filter<Extract = (Global,), Error = Infallible> + Clone {
    warp::any().map(move || global.clone())
}

/// Decode a JSON request body, an empty body standing for `{}`
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CommandError> {
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        &b"{}"[..]
    } else {
        bytes
    };

    Ok(serde_json::from_slice(bytes)?)
}

fn json_body<T: DeserializeOwned + Send>(
) -> impl Filter<Extract = (Result<T, CommandError>,), Error = Rejection> + Clone {
    warp::body::bytes().map(|bytes: Bytes| parse_body(&bytes))
}

fn respond<T: Serialize>(result: Result<T, CommandError>) -> Response {
    match result {
        Ok(value) => warp::reply::json(&value).into_response(),
        Err(error) if error.is_client_error() => {
            debug!(error = %error, "invalid request");
            error_reply(StatusCode::BAD_REQUEST, error)
        }
        Err(error) => {
            error!(error = %error, "command failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    }
}

async fn status(global: Global) -> Response {
    warp::reply::json(&commands::status(&global).await).into_response()
}

async fn set_leds(
    side: String,
    body: Result<SetLedsBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::set_side_leds(&global, parse_side(&side)?, body?).await }.await)
}

async fn light_unit(unum: String, body: Result<ColorBody, CommandError>, global: Global) -> Response {
    respond(async { commands::light_unit(&global, parse_unit(&unum)?, body?).await }.await)
}

async fn blink_unit(unum: String, body: Result<BlinkBody, CommandError>, global: Global) -> Response {
    respond(async { commands::blink_unit(&global, parse_unit(&unum)?, body?).await }.await)
}

async fn light_range(
    range: String,
    body: Result<ColorBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::light_range(&global, &range, body?).await }.await)
}

async fn blink_range(
    range: String,
    body: Result<BlinkBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::blink_range(&global, &range, body?).await }.await)
}

async fn light_equipment(
    id: String,
    body: Result<ColorBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::light_equipment(&global, &id, body?).await }.await)
}

async fn blink_equipment(
    id: String,
    body: Result<BlinkBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::blink_equipment(&global, &id, body?).await }.await)
}

async fn light_catalog_unit(
    id: String,
    body: Result<ColorBody, CommandError>,
    global: Global,
) -> Response {
    respond(async { commands::light_catalog_unit(&global, &id, body?).await }.await)
}

async fn clear(global: Global) -> Response {
    respond(commands::clear(&global).await)
}

async fn reset(global: Global) -> Response {
    respond(commands::reset(&global).await)
}

async fn test_side(side: String, global: Global) -> Response {
    respond(async { commands::test_side(&global, parse_side(&side)?).await }.await)
}

async fn scan_units(body: Result<ScanBody, CommandError>, global: Global) -> Response {
    respond(async { commands::scan_units(&global, body?).await }.await)
}

async fn list_tasks(global: Global) -> Response {
    warp::reply::json(&commands::list_tasks(&global).await).into_response()
}

async fn cancel_task(id: String, global: Global) -> Response {
    respond(commands::cancel_task(&global, &id).await)
}

async fn cancel_all_tasks(global: Global) -> Response {
    warp::reply::json(&commands::cancel_all_tasks(&global).await).into_response()
}

/// JSON API, mounted under `/api`
pub fn api(global: Global) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let global = with_global(global);

    let status = warp::path!("status")
        .and(warp::get())
        .and(global.clone())
        .then(status);

    let leds = warp::path!("led" / String)
        .and(warp::post())
        .and(json_body())
        .and(global.clone())
        .then(set_leds);

    let units = warp::path!("rack-unit-u" / "range" / String)
        .and(warp::post())
        .and(json_body())
        .and(global.clone())
        .then(light_range)
        .or(warp::path!("rack-unit-u" / "range" / String / "blink")
            .and(warp::post())
            .and(json_body())
            .and(global.clone())
            .then(blink_range))
        .unify()
        .or(warp::path!("rack-unit-u" / String)
            .and(warp::post())
            .and(json_body())
            .and(global.clone())
            .then(light_unit))
        .unify()
        .or(warp::path!("rack-unit-u" / String / "blink")
            .and(warp::post())
            .and(json_body())
            .and(global.clone())
            .then(blink_unit))
        .unify();

    let equipment = warp::path!("equipment" / String)
        .and(warp::post())
        .and(json_body())
        .and(global.clone())
        .then(light_equipment)
        .or(warp::path!("equipment" / String / "blink")
            .and(warp::post())
            .and(json_body())
            .and(global.clone())
            .then(blink_equipment))
        .unify();

    let catalog = warp::path!("rack-unit" / String)
        .and(warp::post())
        .and(json_body())
        .and(global.clone())
        .then(light_catalog_unit);

    let maintenance = warp::path!("clear")
        .and(warp::post())
        .and(global.clone())
        .then(clear)
        .or(warp::path!("reset")
            .and(warp::post())
            .and(global.clone())
            .then(reset))
        .unify();

    let diagnostics = warp::path!("test" / "side" / String)
        .and(warp::post())
        .and(global.clone())
        .then(test_side)
        .or(warp::path!("test" / "scan-u")
            .and(warp::post())
            .and(json_body())
            .and(global.clone())
            .then(scan_units))
        .unify();

    let tasks = warp::path!("tasks")
        .and(warp::get())
        .and(global.clone())
        .then(list_tasks)
        .or(warp::path!("tasks" / String)
            .and(warp::delete())
            .and(global.clone())
            .then(cancel_task))
        .unify()
        .or(warp::path!("tasks")
            .and(warp::delete())
            .and(global)
            .then(cancel_all_tasks))
        .unify();

    status
        .or(leds)
        .unify()
        .or(units)
        .unify()
        .or(equipment)
        .unify()
        .or(catalog)
        .unify()
        .or(maintenance)
        .unify()
        .or(diagnostics)
        .unify()
        .or(tasks)
        .unify()
}
