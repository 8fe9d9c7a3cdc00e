//! Text codec for tic-tac-toe protocol messages.
//!
//! Wire format (one message per frame or datagram):
//! ```text
//! <topic> <body>
//! ```
//! where `<topic>` is `client/`, `server/` or `broadcast/`, followed by exactly
//! one space.  Bodies are whitespace-tokenised, except `update` whose payload
//! is the raw board drawing that follows `update `.
//!
//! Decoding is strict: a message under another topic is a
//! [`ProtocolError::WrongTopic`], and anything that does not match the
//! grammar is [`ProtocolError::Malformed`].  The codec assigns no meaning to
//! a well-formed message; turn order and legality are the state machines'
//! business.  Receivers are expected to drop undecodable input silently.

use std::net::IpAddr;

use thiserror::Error;

use crate::domain::board::{Board, InvalidBoard};
use crate::protocol::messages::{
    ClientMessage, DiscoveryRecord, ServerMessage, CLIENT_TOPIC, DISCOVERY_TOPIC, SERVER_TOPIC,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The text does not start with the topic this decoder accepts.
    #[error("message is not on topic {expected:?}")]
    WrongTopic { expected: &'static str },

    /// The body does not match the message grammar.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The `update` payload is not a valid board drawing.
    #[error("invalid board in update: {0}")]
    Board(#[from] InvalidBoard),

    /// A value to be encoded would not survive tokenisation (empty or
    /// containing whitespace).
    #[error("invalid token {0:?}: must be non-empty and contain no whitespace")]
    InvalidToken(String),
}

impl ProtocolError {
    fn malformed(body: &str) -> Self {
        ProtocolError::Malformed(body.to_string())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Checks that `name` can travel as a single token.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidToken`] for empty names or names with whitespace.
pub fn validate_username(name: &str) -> Result<(), ProtocolError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ProtocolError::InvalidToken(name.to_string()));
    }
    Ok(())
}

/// Encodes a [`ClientMessage`] under the `client/` topic.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidToken`] if the username is not a single token.
///
/// # Examples
///
/// ```rust
/// use tictactoe_core::protocol::{decode_client_message, encode_client_message, ClientMessage};
///
/// let msg = ClientMessage::Move { col: 1, row: 2, username: "alice".into() };
/// let text = encode_client_message(&msg).unwrap();
/// assert_eq!(text, "client/ 1 2 alice");
/// assert_eq!(decode_client_message(&text).unwrap(), msg);
/// ```
pub fn encode_client_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    validate_username(msg.username())?;
    let body = match msg {
        ClientMessage::Join { username } => format!("request join {username}"),
        ClientMessage::Move { col, row, username } => format!("{col} {row} {username}"),
        ClientMessage::Resign { username } => format!("resign {username}"),
    };
    Ok(format!("{CLIENT_TOPIC} {body}"))
}

/// Decodes a `client/` message.
///
/// # Errors
///
/// [`ProtocolError::WrongTopic`] if the text is not on `client/`;
/// [`ProtocolError::Malformed`] if the body matches no known shape or a move
/// coordinate is not an integer.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let body = strip_topic(text, CLIENT_TOPIC)?;
    let tokens: Vec<&str> = body.split_whitespace().collect();

    match tokens.as_slice() {
        ["request", "join", username] => Ok(ClientMessage::Join {
            username: username.to_string(),
        }),
        ["resign", username] => Ok(ClientMessage::Resign {
            username: username.to_string(),
        }),
        [col, row, username] => {
            let col = col.parse::<i32>().map_err(|_| ProtocolError::malformed(body))?;
            let row = row.parse::<i32>().map_err(|_| ProtocolError::malformed(body))?;
            Ok(ClientMessage::Move {
                col,
                row,
                username: username.to_string(),
            })
        }
        _ => Err(ProtocolError::malformed(body)),
    }
}

/// Encodes a [`ServerMessage`] under the `server/` topic.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidToken`] if a username is not a single token.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    let body = match msg {
        ServerMessage::Joined(u) => named("joined", u)?,
        ServerMessage::Update(board) => format!("update {}", board.render()),
        ServerMessage::Turn(u) => named("turn", u)?,
        ServerMessage::Won(u) => named("won", u)?,
        ServerMessage::Draw => "draw".to_string(),
        ServerMessage::Error(reason) if reason.trim().is_empty() => "error".to_string(),
        ServerMessage::Error(reason) => format!("error {}", reason.trim()),
    };
    Ok(format!("{SERVER_TOPIC} {body}"))
}

/// Decodes a `server/` message.
///
/// # Errors
///
/// [`ProtocolError::WrongTopic`] if the text is not on `server/`;
/// [`ProtocolError::Board`] if an `update` carries an invalid drawing;
/// [`ProtocolError::Malformed`] for any other shape.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    let body = strip_topic(text, SERVER_TOPIC)?;

    if let Some(drawing) = body.strip_prefix("update ") {
        let (board, _next) = Board::parse(drawing)?;
        return Ok(ServerMessage::Update(board));
    }

    let tokens: Vec<&str> = body.split_whitespace().collect();
    match tokens.as_slice() {
        ["joined", u] => Ok(ServerMessage::Joined(u.to_string())),
        ["turn", u] => Ok(ServerMessage::Turn(u.to_string())),
        ["won", u] => Ok(ServerMessage::Won(u.to_string())),
        ["draw"] => Ok(ServerMessage::Draw),
        ["error", reason @ ..] => Ok(ServerMessage::Error(reason.join(" "))),
        _ => Err(ProtocolError::malformed(body)),
    }
}

/// Encodes the discovery announcement payload.
pub fn encode_discovery_record(record: &DiscoveryRecord) -> String {
    format!(
        "{DISCOVERY_TOPIC} server_info {} {} {}",
        record.server_address, record.port_to_clients, record.port_from_clients
    )
}

/// Decodes a discovery announcement.
///
/// # Errors
///
/// [`ProtocolError::WrongTopic`] if the datagram is not on `broadcast/`;
/// [`ProtocolError::Malformed`] if the address or ports do not parse.
pub fn decode_discovery_record(text: &str) -> Result<DiscoveryRecord, ProtocolError> {
    let body = strip_topic(text, DISCOVERY_TOPIC)?;
    let tokens: Vec<&str> = body.split_whitespace().collect();

    match tokens.as_slice() {
        ["server_info", ip, to_clients, from_clients] => {
            let server_address = ip
                .parse::<IpAddr>()
                .map_err(|_| ProtocolError::malformed(body))?;
            let port_to_clients = to_clients
                .parse::<u16>()
                .map_err(|_| ProtocolError::malformed(body))?;
            let port_from_clients = from_clients
                .parse::<u16>()
                .map_err(|_| ProtocolError::malformed(body))?;
            Ok(DiscoveryRecord {
                server_address,
                port_to_clients,
                port_from_clients,
            })
        }
        _ => Err(ProtocolError::malformed(body)),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Removes `<topic> ` from the front of `text`.
fn strip_topic<'a>(text: &'a str, topic: &'static str) -> Result<&'a str, ProtocolError> {
    let rest = text
        .strip_prefix(topic)
        .ok_or(ProtocolError::WrongTopic { expected: topic })?;
    rest.strip_prefix(' ')
        .ok_or_else(|| ProtocolError::malformed(text))
}

fn named(command: &str, username: &str) -> Result<String, ProtocolError> {
    validate_username(username)?;
    Ok(format!("{command} {username}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
