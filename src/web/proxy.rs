//! Pass-through for the controller live-view socket

use std::{fmt, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{
    self,
    protocol::{frame::coding::CloseCode, CloseFrame},
};
use warp::{
    http::StatusCode,
    reply::Response,
    ws::{Message, WebSocket, Ws},
    Filter, Rejection, Reply,
};

use super::error_reply;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Location of the controller live-view socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Upstream {
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Client frame to forward upstream, `None` for control frames each peer handles itself
fn to_upstream(message: Message) -> Option<tungstenite::Message> {
    if message.is_close() {
        Some(tungstenite::Message::Close(message.close_frame().map(
            |(code, reason)| CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_owned().into(),
            },
        )))
    } else if message.is_text() {
        message
            .to_str()
            .ok()
            .map(|text| tungstenite::Message::Text(text.to_owned()))
    } else if message.is_binary() {
        Some(tungstenite::Message::Binary(message.into_bytes()))
    } else {
        None
    }
}

/// Upstream frame to forward to the client
fn to_client(message: tungstenite::Message) -> Option<Message> {
    match message {
        tungstenite::Message::Text(text) => Some(Message::text(text)),
        tungstenite::Message::Binary(data) => Some(Message::binary(data)),
        tungstenite::Message::Close(Some(frame)) => Some(Message::close_with(
            u16::from(frame.code),
            frame.reason.into_owned(),
        )),
        tungstenite::Message::Close(None) => Some(Message::close()),
        _ => None,
    }
}

#[instrument(skip(client, upstream), fields(upstream = %upstream))]
async fn relay(client: WebSocket, upstream: Upstream) {
    let connect = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        tokio_tungstenite::connect_async(upstream.url()),
    );

    let (server, _) = match connect.await {
        Ok(Ok(connected)) => connected,
        Ok(Err(error)) => {
            warn!(error = %error, "failed to connect to the live-view socket");
            let _ = client.close().await;
            return;
        }
        Err(_) => {
            warn!("timed out connecting to the live-view socket");
            let _ = client.close().await;
            return;
        }
    };

    debug!("live-view proxy connected");

    let (mut client_tx, mut client_rx) = client.split();
    let (mut server_tx, mut server_rx) = server.split();

    let mut heartbeat = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            message = client_rx.next() => match message {
                Some(Ok(message)) => {
                    if let Some(message) = to_upstream(message) {
                        let close = message.is_close();
                        if let Err(error) = server_tx.send(message).await {
                            warn!(error = %error, "live-view upstream error");
                            break;
                        }

                        if close {
                            break;
                        }
                    }
                }
                Some(Err(error)) => {
                    debug!(error = %error, "live-view client error");
                    break;
                }
                None => break,
            },
            message = server_rx.next() => match message {
                Some(Ok(message)) => {
                    if let Some(message) = to_client(message) {
                        let close = message.is_close();
                        if let Err(error) = client_tx.send(message).await {
                            debug!(error = %error, "live-view client error");
                            break;
                        }

                        if close {
                            break;
                        }
                    }
                }
                Some(Err(error)) => {
                    warn!(error = %error, "live-view upstream error");
                    break;
                }
                None => break,
            },
            _ = heartbeat.tick() => {
                if client_tx.send(Message::ping(Vec::new())).await.is_err()
                    || server_tx.send(tungstenite::Message::Ping(Vec::new())).await.is_err()
                {
                    break;
                }
            }
        }
    }

    let _ = client_tx.close().await;
    let _ = server_tx.close().await;

    debug!("live-view proxy closed");
}

pub fn route(
    upstream: Option<Upstream>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("wled-ws")
        .and(warp::ws())
        .map(move |ws: Ws| match upstream.clone() {
            Some(upstream) => ws
                .on_upgrade(move |socket| relay(socket, upstream))
                .into_response(),
            None => error_reply(
                StatusCode::SERVICE_UNAVAILABLE,
                "live view is not configured",
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_url() {
        let upstream = Upstream {
            host: "192.168.1.50".to_owned(),
            port: 80,
            path: "/ws".to_owned(),
        };

        assert_eq!(upstream.url(), "ws://192.168.1.50:80/ws");
    }

    #[test]
    fn forward_data_frames() {
        assert_eq!(
            to_upstream(Message::text("{\"lv\":true}")),
            Some(tungstenite::Message::Text("{\"lv\":true}".to_owned()))
        );
        assert_eq!(
            to_upstream(Message::binary(vec![1, 2, 3])),
            Some(tungstenite::Message::Binary(vec![1, 2, 3]))
        );
        assert_eq!(to_upstream(Message::ping(vec![1])), None);

        assert_eq!(
            to_client(tungstenite::Message::Binary(vec![4, 5])),
            Some(Message::binary(vec![4, 5]))
        );
        assert_eq!(to_client(tungstenite::Message::Pong(vec![])), None);
    }

    #[test]
    fn mirror_close_frames() {
        assert_eq!(
            to_upstream(Message::close_with(1001u16, "going away")),
            Some(tungstenite::Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "going away".into(),
            })))
        );

        assert_eq!(
            to_client(tungstenite::Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))),
            Some(Message::close_with(1000u16, "bye"))
        );
        assert_eq!(
            to_client(tungstenite::Message::Close(None)),
            Some(Message::close())
        );
    }
}
