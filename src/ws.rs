//! WebSocket transport: one task pair per connected client.

use futures::{SinkExt, StreamExt, TryFutureExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::ws::{Message, WebSocket};

use crate::{
    error::{WireError, WireResult},
    event::InboundEvent,
    router::{Flow, Relay},
    wire::{self, WireFormat},
};

pub async fn client_connected(ws: WebSocket, relay: Relay, format: WireFormat) {
    // Split the socket into a sender and receiver of messages.
    let (mut client_ws_tx, mut client_ws_rx) = ws.split();

    // The relay only ever queues events; this task encodes them and
    // flushes them to the websocket.
    let (tx, rx) = mpsc::unbounded_channel();
    let mut rx = UnboundedReceiverStream::new(rx);

    tokio::task::spawn(async move {
        while let Some(event) = rx.next().await {
            client_ws_tx
                .send(Message::text(wire::encode(&event, format)))
                .unwrap_or_else(|e| {
                    warn!("websocket send error: {}", e);
                })
                .await;
        }
        // the outbox is gone, so the connection has been unregistered
        if let Err(e) = client_ws_tx.close().await {
            debug!("websocket close error: {}", e);
        }
    });

    let my_id = relay.connect(tx).await;
    info!("new connection: {}", my_id);

    while let Some(result) = client_ws_rx.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("websocket error(connection={}): {}", my_id, e);
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        match inbound(&msg) {
            Ok(event) => {
                if relay.handle(my_id, event).await == Flow::Close {
                    break;
                }
            }
            Err(WireError::NotText) => {}
            Err(e) => warn!("dropping frame from connection {}: {}", my_id, e),
        }
    }

    // client_ws_rx stream will keep processing as long as the client stays
    // connected or until it says good bye. Either way...
    relay.disconnect(my_id).await;
}

fn inbound(msg: &Message) -> WireResult<InboundEvent> {
    let text = msg.to_str().map_err(|_| WireError::NotText)?;
    wire::decode(text)
}
