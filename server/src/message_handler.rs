use common::protocol::{decode_client_json, ClientMessage};
use common::{log, ConnectionId};

use crate::broadcaster::ClientHandle;
use crate::game_server::GameServer;

/// Decodes one inbound text frame and routes it. Malformed frames and
/// unknown message types are dropped without a reply.
pub async fn handle_text_frame(server: &GameServer, connection_id: ConnectionId, client: &ClientHandle, text: &str) {
    let message = match decode_client_json(text) {
        Ok(message) => message,
        Err(e) => {
            log!("[{}] dropping malformed frame: {}", connection_id, e);
            return;
        }
    };

    match message {
        ClientMessage::Join { name } => server.handle_join(connection_id, client, &name).await,
        ClientMessage::Direction { direction } => server.handle_direction(connection_id, &direction).await,
        ClientMessage::Ping => server.handle_ping(connection_id, client).await,
        ClientMessage::Unknown => {}
    }
}
