//! The arbitration loop: drives a [`Session`] from inbound text to outbound
//! broadcasts.
//!
//! This use case depends only on the traits [`MessageInbox`] and
//! [`MessagePublisher`]; the TCP pub/sub transport implements them in
//! `infrastructure::network::pubsub`, tests implement them with channels.
//!
//! The loop is the only owner of the `Session`, so no locking is needed.
//!
//! Transport faults while a match is in progress are fatal: a seated
//! player's connection closing, or a subscriber connection failing, aborts
//! the session and broadcasts `error disconnect` to whoever is left.

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tictactoe_core::protocol::{decode_client_message, ProtocolError};
use tictactoe_core::ServerMessage;

use super::arbitrate::{Phase, Session};

/// One event from the clients' side of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Raw `client/` message text.
    Message(String),
    /// A client connection closed.  `username` is the last player that
    /// spoke on it, if any message on it decoded.
    Hangup { username: Option<String> },
}

/// Source of inbound events, in arrival order.
#[async_trait]
pub trait MessageInbox: Send {
    /// Waits for the next event.  `None` once the source is closed.
    async fn next_event(&mut self) -> Option<Inbound>;
}

/// Why a broadcast did not reach every subscriber.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A subscriber connection failed since the previous publish.  The
    /// message still went out to the remaining subscribers.
    #[error("subscriber {peer} connection lost")]
    SubscriberLost { peer: SocketAddr },

    #[error("failed to encode message: {0}")]
    Encode(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink broadcasting server messages to every subscriber.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, msg: &ServerMessage) -> Result<(), PublishError>;
}

/// Fatal errors that end the arbitration loop before a normal outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Broadcasting during the match failed; `error disconnect` was attempted.
    #[error("failed to publish server message: {0}")]
    Publish(#[from] PublishError),

    /// A seated player's connection closed mid-match; `error disconnect`
    /// was attempted.
    #[error("connection to player {0} lost")]
    PlayerLost(String),

    /// The inbound channel closed while the match was still undecided.
    #[error("inbound message channel closed")]
    InboxClosed,

    /// The session had already finished before the loop started.
    #[error("session is already over")]
    AlreadyOver,
}

/// Runs `session` until it reaches a final outcome.
///
/// Undecodable input is dropped.  Returns the final message broadcast
/// (`won <u>` or `draw`).
///
/// Faults seen in the lobby are logged and otherwise ignored: nobody is
/// seated yet, so there is no match to abort.
///
/// # Errors
///
/// - [`SessionError::Publish`] or [`SessionError::PlayerLost`] on a
///   transport fault during the match; the session is aborted and
///   `error disconnect` is broadcast on a best-effort basis first.
/// - [`SessionError::InboxClosed`] if no more input can arrive.
/// - [`SessionError::AlreadyOver`] if `session` has no match left to play.
pub async fn run_session<I, P>(
    session: &mut Session,
    inbox: &mut I,
    publisher: &P,
) -> Result<ServerMessage, SessionError>
where
    I: MessageInbox + ?Sized,
    P: MessagePublisher + ?Sized,
{
    if session.is_over() {
        return Err(SessionError::AlreadyOver);
    }

    loop {
        let text = match inbox.next_event().await {
            None => return Err(SessionError::InboxClosed),
            Some(Inbound::Message(text)) => text,
            Some(Inbound::Hangup { username: Some(username) })
                if session.holds_seat(&username) =>
            {
                error!(player = %username, "player connection lost, disconnecting all players");
                abort(session, publisher).await;
                return Err(SessionError::PlayerLost(username));
            }
            Some(Inbound::Hangup { username }) => {
                debug!(?username, "client hung up outside a match");
                continue;
            }
        };

        let msg = match decode_client_message(&text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "dropping undecodable client message");
                continue;
            }
        };

        let in_match = session.phase() == Phase::Playing;
        let replies = session.handle(msg);
        for reply in &replies {
            match publisher.publish(reply).await {
                Ok(()) => {}
                Err(e) if in_match => {
                    error!(error = %e, "publish failed, disconnecting all players");
                    abort(session, publisher).await;
                    return Err(SessionError::Publish(e));
                }
                Err(e) => warn!(error = %e, "publish failed in lobby"),
            }
        }

        if session.is_over() {
            if let Some(outcome) = replies.iter().rev().find(|m| m.is_final()) {
                info!(?outcome, "match finished");
                return Ok(outcome.clone());
            }
        }
    }
}

/// Aborts `session` and broadcasts the disconnect on a best-effort basis.
async fn abort<P>(session: &mut Session, publisher: &P)
where
    P: MessagePublisher + ?Sized,
{
    let disconnect = session.abort();
    if let Err(e) = publisher.publish(&disconnect).await {
        warn!(error = %e, "failed to send disconnect");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
