use std::{convert::Infallible, net::SocketAddr, path::PathBuf};

use futures::Future;
use serde_derive::Serialize;
use warp::{http::StatusCode, reply::Response, Filter, Rejection, Reply};

use crate::global::Global;

mod proxy;
pub use proxy::Upstream;

mod routes;
pub use routes::parse_body;

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub address: SocketAddr,
    /// Directory served under `/web`
    pub document_root: PathBuf,
    /// Live-view socket of the controller, if any
    pub upstream: Option<Upstream>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn error_reply(status: StatusCode, error: impl ToString) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: error.to_string(),
        }),
        status,
    )
    .into_response()
}

const UPGRADE_HEADERS: [&str; 4] = [
    "connection",
    "upgrade",
    "sec-websocket-version",
    "sec-websocket-key",
];

fn header_message(name: &str) -> String {
    if UPGRADE_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
        "expected a websocket upgrade request".to_owned()
    } else {
        format!("invalid or missing header `{}`", name)
    }
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_owned())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_owned(),
        )
    } else if let Some(missing) = rejection.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, header_message(missing.name()))
    } else if let Some(invalid) = rejection.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, header_message(invalid.name()))
    } else {
        debug!(rejection = ?rejection, "rejected request");
        (StatusCode::BAD_REQUEST, "bad request".to_owned())
    };

    Ok(error_reply(status, message))
}

/// All routes of the server: the JSON API, the live-view proxy and the static files
pub fn routes(
    global: Global,
    config: &WebConfig,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        routes::api(global)
            .or(proxy::route(config.upstream.clone()))
            .unify(),
    );

    let files = warp::path("web").and(warp::fs::dir(config.document_root.clone()));

    api.or(files.map(|file: warp::fs::File| file.into_response()))
        .unify()
        .recover(handle_rejection)
        .unify()
}

pub async fn bind(
    global: Global,
    config: WebConfig,
) -> Result<impl Future<Output = ()>, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(config.address).await;

    match listener {
        Ok(listener) => {
            info!(address = %config.address, "API server listening");
            let routes = routes(global, &config).with(warp::filters::log::log("rackled::web"));

            Ok(warp::serve(routes)
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener)))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rejection_messages() {
        assert_eq!(
            header_message("Sec-WebSocket-Key"),
            "expected a websocket upgrade request"
        );
        assert_eq!(
            header_message("content-type"),
            "invalid or missing header `content-type`"
        );
    }
}
