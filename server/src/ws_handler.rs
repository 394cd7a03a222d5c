use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};

use common::log;

use crate::broadcaster::{client_channel, ClientEndpoint};
use crate::message_handler::handle_text_frame;
use crate::server_config::OUTBOUND_QUEUE_CAPACITY;
use crate::web_server::WebServerState;

pub async fn handle_websocket(socket: WebSocket, state: WebServerState) {
    let (ws_sender, mut ws_receiver) = socket.split();

    let (client, endpoint) = client_channel(OUTBOUND_QUEUE_CAPACITY);
    let send_task = tokio::spawn(write_frames(ws_sender, endpoint));

    let game_server = state.game_server;
    let connection_id = game_server.open_connection(client.clone()).await;

    let closed = client.closed();
    tokio::pin!(closed);

    loop {
        tokio::select! {
            _ = &mut closed => break,
            result = ws_receiver.next() => match result {
                Some(Ok(Message::Text(text))) => {
                    handle_text_frame(&game_server, connection_id, &client, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log!("[{}] WebSocket error: {}", connection_id, e);
                    break;
                }
            },
        }
    }

    game_server.close_connection(connection_id).await;
    client.close();
    let _ = send_task.await;
}

/// Single writer for one socket. Stops on the close signal without
/// draining the backlog, then sends a close frame.
async fn write_frames<S>(mut sink: S, mut endpoint: ClientEndpoint)
where
    S: Sink<Message> + Unpin,
{
    while let Some(text) = endpoint.next_frame().await {
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
