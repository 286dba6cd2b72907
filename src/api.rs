use std::convert::Infallible;

use warp::Filter;

use crate::{router::Relay, wire::WireFormat, ws::client_connected};

fn with_relay(relay: Relay) -> impl Filter<Extract = (Relay,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

fn with_format(
    format: WireFormat,
) -> impl Filter<Extract = (WireFormat,), Error = Infallible> + Clone {
    warp::any().map(move || format)
}

async fn upgrade_connection(
    ws: warp::ws::Ws,
    relay: Relay,
    format: WireFormat,
) -> Result<impl warp::Reply, Infallible> {
    // This will call our function if the handshake succeeds.
    Ok(ws.on_upgrade(move |socket| client_connected(socket, relay, format)))
}

// GET /chat -> websocket upgrade
fn ws_upgrade(
    relay: Relay,
    format: WireFormat,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("chat")
        // The `ws()` filter will prepare Websocket handshake...
        .and(warp::ws())
        .and(with_relay(relay))
        .and(with_format(format))
        .and_then(upgrade_connection)
}

async fn health_report(relay: Relay) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&relay.stats().await))
}

// GET /health -> {"connections": n, "rooms": m}
fn health(relay: Relay) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("health")
        .and(warp::get())
        .and(with_relay(relay))
        .and_then(health_report)
}

pub fn build_filters(
    relay: Relay,
    format: WireFormat,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let cors = warp::cors().allow_any_origin().allow_method("GET");
    ws_upgrade(relay.clone(), format)
        .or(health(relay))
        .with(cors)
        .with(warp::log("chat_relay::api"))
}
