//! JSON text-frame protocol spoken over the game WebSocket.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::games::snake::Point;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(default, deserialize_with = "text_like")]
        name: String,
    },
    /// Direction stays raw text; unparsable values are dropped by the handler.
    Direction {
        #[serde(default, deserialize_with = "text_like")]
        direction: String,
    },
    Ping,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome(WelcomeMessage),
    State(StateMessage),
    Pong { now: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
    pub id: String,
    pub color: String,
    pub cols: i32,
    pub rows: i32,
    pub tick_millis: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateMessage {
    pub tick: u64,
    pub players: Vec<PlayerPayload>,
    pub foods: Vec<Point>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerPayload {
    pub id: String,
    pub name: String,
    pub color: String,
    pub alive: bool,
    pub score: u32,
    pub segments: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
}

/// Reads any JSON scalar as text. Numbers and booleans keep their literal
/// form, while null, arrays and objects become empty.
fn text_like<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

pub fn decode_client_json(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn encode_server_json(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
