//! PlaySession: the client side of one match.
//!
//! The client mirrors the server's turn signals.  It never decides who wins;
//! it renders what the server broadcasts and, when the server names the local
//! player in a `turn` message, asks the [`MoveInput`] collaborator for a move.
//!
//! ```text
//! DISCOVER ──record──▶ CONNECT ──join sent──▶ WAIT_JOIN ──joined <me>──▶ WAIT_START
//!                                                                          │
//!            ┌────────── turn <other> / update ◀───────────────────────────┘
//!            ▼
//!       WAIT_UPDATE ──turn <me>──▶ MY_TURN ──move sent──▶ WAIT_UPDATE
//!            │                        │
//!            └─ won / draw / error ───┴─ resign ──▶ GAME_OVER
//! ```
//!
//! An `error` broadcast at any point after CONNECT ends the game.  A
//! discovery failure is fatal and the session never reaches CONNECT.
//!
//! # Polling (for beginners)
//!
//! The loop alternates between two things: a non-blocking check of the
//! inbound queue (sleeping for the poll interval when it is empty) and, on the
//! local player's turn, a blocking wait for the player's command.  While the
//! loop waits for input, the transport keeps queueing server messages; they
//! are drained on the next poll, in order.

use std::net::IpAddr;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use tictactoe_core::protocol::{
    decode_server_message, encode_client_message, validate_username, DEFAULT_DISCOVERY_PORT,
};
use tictactoe_core::{
    Board, ClientMessage, DiscoveryRecord, FrameError, ProtocolError, ServerMessage, BOARD_SIZE,
};

/// Errors that end a client session early.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No discovery announcement arrived in time.
    #[error("no server announced itself within {0:?}")]
    DiscoveryTimeout(Duration),

    /// The discovery port could not be bound.
    #[error("failed to listen for server announcements on UDP port {port}: {source}")]
    DiscoveryBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// A TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the server failed.
    #[error("failed to send to server: {0}")]
    Send(#[from] FrameError),

    /// The server's stream closed before the game ended.
    #[error("connection to server lost")]
    ConnectionLost,

    /// A username or message could not be expressed on the wire.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The user asked to quit before a server was found.
    #[error("interrupted before connecting to a server")]
    Interrupted,
}

/// Timing and discovery settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// UDP port the server announces itself on.
    pub discovery_port: u16,
    /// How long to listen for an announcement before giving up.
    pub discovery_timeout: Duration,
    /// Sleep between polls of an empty inbound queue.
    pub poll_interval: Duration,
    /// Pause after connecting so the server registers the subscriber
    /// before it broadcasts our `joined`.
    pub join_settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_port: DEFAULT_DISCOVERY_PORT,
            discovery_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            join_settle_delay: Duration::from_millis(500),
        }
    }
}

/// Where the client is in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Discover,
    Connect,
    WaitJoin,
    WaitStart,
    MyTurn,
    WaitUpdate,
    GameOver,
}

/// How the match ended from this client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server declared a winner (possibly us).
    Won(String),
    Draw,
    /// We resigned.
    Resigned,
    /// The server sent `error <reason>`.
    Disconnected(String),
}

/// What the local player wants to do on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move { col: i32, row: i32 },
    Resign,
}

// ── Collaborator traits ───────────────────────────────────────────────────────

/// Finds the server and opens the pub/sub link to it.
#[async_trait]
pub trait Network: Send {
    type Link: ServerLink;

    /// Returns the server's address and ports.
    async fn discover(&mut self) -> Result<DiscoveryRecord, ClientError>;

    /// Connects to both of the server's ports.
    async fn connect(&mut self, record: &DiscoveryRecord) -> Result<Self::Link, ClientError>;
}

/// An open link to the server.
#[async_trait]
pub trait ServerLink: Send {
    /// Publishes one encoded message on the `client/` topic.
    async fn send(&mut self, text: &str) -> Result<(), ClientError>;

    /// Takes the next queued server message without waiting.
    ///
    /// Returns `Ok(None)` when the queue is empty and
    /// [`ClientError::ConnectionLost`] once the stream has closed and the
    /// queue is drained.
    fn try_recv(&mut self) -> Result<Option<String>, ClientError>;
}

/// Source of the local player's commands.
#[async_trait]
pub trait MoveInput: Send {
    /// Waits for the next command.  `None` means the input is closed, which
    /// the session treats as a resignation.
    async fn next_command(&mut self) -> Option<Command>;
}

/// Output collaborator: renders what the session observes.
#[cfg_attr(test, mockall::automock)]
pub trait GameView: Send {
    fn state_changed(&mut self, state: ClientState);
    fn show_server(&mut self, address: IpAddr);
    fn show_joined(&mut self, username: &str);
    fn show_board(&mut self, board: &Board);
    fn show_turn(&mut self, username: &str, mine: bool);
    fn show_invalid_move(&mut self, col: i32, row: i32);
    fn show_outcome(&mut self, outcome: &Outcome);
}

// ── Session state ─────────────────────────────────────────────────────────────

/// The client's view of one match.
pub struct ClientSession {
    username: String,
    state: ClientState,
    board: Board,
    outcome: Option<Outcome>,
}

impl ClientSession {
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] if `username` is empty or contains
    /// whitespace.
    pub fn new(username: impl Into<String>) -> Result<Self, ClientError> {
        let username = username.into();
        validate_username(&username)?;
        Ok(Self {
            username,
            state: ClientState::Discover,
            board: Board::new(),
            outcome: None,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The last board the server broadcast.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// True once the client has sent its join, so a resignation means
    /// something to the server.
    pub fn is_connected(&self) -> bool {
        !matches!(
            self.state,
            ClientState::Discover | ClientState::Connect | ClientState::GameOver
        )
    }

    fn enter<V: GameView + ?Sized>(&mut self, state: ClientState, view: &mut V) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "client state change");
            self.state = state;
            view.state_changed(state);
        }
    }

    fn finish<V: GameView + ?Sized>(&mut self, outcome: Outcome, view: &mut V) {
        info!(?outcome, "game over");
        self.enter(ClientState::GameOver, view);
        view.show_outcome(&outcome);
        self.outcome = Some(outcome);
    }

    /// A server was found; move to CONNECT.
    pub fn discovered<V: GameView + ?Sized>(&mut self, record: &DiscoveryRecord, view: &mut V) {
        view.show_server(record.server_address);
        self.enter(ClientState::Connect, view);
    }

    /// Builds the join request and moves to WAIT_JOIN.
    pub fn join_request<V: GameView + ?Sized>(&mut self, view: &mut V) -> ClientMessage {
        self.enter(ClientState::WaitJoin, view);
        ClientMessage::Join {
            username: self.username.clone(),
        }
    }

    /// Applies one server broadcast.
    pub fn on_message<V: GameView + ?Sized>(&mut self, msg: ServerMessage, view: &mut V) {
        if self.state == ClientState::GameOver {
            debug!(?msg, "ignoring message after game over");
            return;
        }

        match msg {
            ServerMessage::Error(reason) => self.finish(Outcome::Disconnected(reason), view),
            ServerMessage::Joined(name) => {
                view.show_joined(&name);
                if self.state == ClientState::WaitJoin && name == self.username {
                    self.enter(ClientState::WaitStart, view);
                }
            }
            // Until the server acknowledges us, game traffic belongs to someone else.
            other if self.state == ClientState::WaitJoin => {
                debug!(msg = ?other, "ignoring message before join acknowledged");
            }
            ServerMessage::Update(board) => {
                self.board = board;
                view.show_board(&board);
                self.enter(ClientState::WaitUpdate, view);
            }
            ServerMessage::Turn(name) => {
                let mine = name == self.username;
                view.show_turn(&name, mine);
                let next = if mine {
                    ClientState::MyTurn
                } else {
                    ClientState::WaitUpdate
                };
                self.enter(next, view);
            }
            ServerMessage::Won(name) => self.finish(Outcome::Won(name), view),
            ServerMessage::Draw => self.finish(Outcome::Draw, view),
        }
    }

    /// Turns a player command into the message to publish, if any.
    ///
    /// Moves outside the board are refused locally and the player stays on
    /// turn.  Resigning is allowed at any point after the join was sent.
    pub fn command<V: GameView + ?Sized>(
        &mut self,
        command: Command,
        view: &mut V,
    ) -> Option<ClientMessage> {
        match command {
            Command::Resign if self.is_connected() => {
                self.finish(Outcome::Resigned, view);
                Some(ClientMessage::Resign {
                    username: self.username.clone(),
                })
            }
            Command::Move { col, row } if self.state == ClientState::MyTurn => {
                if !on_board(col) || !on_board(row) {
                    view.show_invalid_move(col, row);
                    return None;
                }
                self.enter(ClientState::WaitUpdate, view);
                Some(ClientMessage::Move {
                    col,
                    row,
                    username: self.username.clone(),
                })
            }
            other => {
                debug!(command = ?other, state = ?self.state, "command not applicable");
                None
            }
        }
    }
}

fn on_board(coord: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&coord)
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Plays one match from discovery to game over.
///
/// Setting `shutdown` to `true` resigns if the join was already sent and
/// otherwise returns [`ClientError::Interrupted`].
///
/// # Errors
///
/// Discovery, connection, and send failures end the session with the
/// corresponding [`ClientError`].  Losing the server's stream before an
/// outcome is [`ClientError::ConnectionLost`].
pub async fn play<N, I, V>(
    session: &mut ClientSession,
    network: &mut N,
    input: &mut I,
    view: &mut V,
    config: &ClientConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Outcome, ClientError>
where
    N: Network,
    I: MoveInput + ?Sized,
    V: GameView + ?Sized,
{
    view.state_changed(ClientState::Discover);
    let record = tokio::select! {
        found = network.discover() => found?,
        _ = interrupted(shutdown) => return Err(ClientError::Interrupted),
    };
    info!(server = %record.server_address, "server found");
    session.discovered(&record, view);

    let mut link = network.connect(&record).await?;
    tokio::time::sleep(config.join_settle_delay).await;
    let join = session.join_request(view);
    publish(&mut link, &join).await?;

    loop {
        if let Some(outcome) = session.outcome() {
            return Ok(outcome.clone());
        }

        if session.state() == ClientState::MyTurn {
            let command = tokio::select! {
                cmd = input.next_command() => cmd.unwrap_or(Command::Resign),
                _ = interrupted(shutdown) => Command::Resign,
            };
            if let Some(msg) = session.command(command, view) {
                publish(&mut link, &msg).await?;
            }
            continue;
        }

        if *shutdown.borrow() {
            info!("interrupted, resigning");
            if let Some(msg) = session.command(Command::Resign, view) {
                publish(&mut link, &msg).await?;
            }
            continue;
        }

        match link.try_recv()? {
            Some(text) => match decode_server_message(&text) {
                Ok(msg) => session.on_message(msg, view),
                Err(e) => debug!(error = %e, %text, "dropping undecodable server message"),
            },
            None => tokio::time::sleep(config.poll_interval).await,
        }
    }
}

async fn publish<L: ServerLink>(link: &mut L, msg: &ClientMessage) -> Result<(), ClientError> {
    let text = encode_client_message(msg)?;
    debug!(%text, "publishing");
    link.send(&text).await
}

/// Resolves once `shutdown` reads `true`.  Never resolves if the sender is
/// gone without having asked for shutdown.
async fn interrupted(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{ScriptedInput, ScriptedNetwork};
    use mockall::predicate::eq;
    use std::net::Ipv4Addr;

    fn quiet_view() -> MockGameView {
        let mut view = MockGameView::new();
        view.expect_state_changed().return_const(());
        view.expect_show_server().return_const(());
        view.expect_show_joined().return_const(());
        view.expect_show_board().return_const(());
        view.expect_show_turn().return_const(());
        view.expect_show_invalid_move().return_const(());
        view.expect_show_outcome().return_const(());
        view
    }

    fn instant() -> ClientConfig {
        ClientConfig {
            poll_interval: Duration::ZERO,
            join_settle_delay: Duration::ZERO,
            ..ClientConfig::default()
        }
    }

    fn record() -> DiscoveryRecord {
        DiscoveryRecord::with_default_ports(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    /// A session that has sent its join and is waiting for the ack.
    fn joined_session(view: &mut MockGameView) -> ClientSession {
        let mut session = ClientSession::new("alice").unwrap();
        session.discovered(&record(), view);
        session.join_request(view);
        session
    }

    fn on_my_turn(view: &mut MockGameView) -> ClientSession {
        let mut session = joined_session(view);
        session.on_message(ServerMessage::Joined("alice".into()), view);
        session.on_message(ServerMessage::Update(Board::new()), view);
        session.on_message(ServerMessage::Turn("alice".into()), view);
        session
    }

    #[test]
    fn test_new_rejects_username_with_whitespace() {
        let result = ClientSession::new("alice smith");
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[test]
    fn test_join_ack_for_other_player_keeps_waiting() {
        // Arrange
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);
        view.checkpoint();
        view.expect_show_joined()
            .withf(|name| name == "bob")
            .times(1)
            .return_const(());

        // Act
        session.on_message(ServerMessage::Joined("bob".into()), &mut view);

        // Assert
        assert_eq!(session.state(), ClientState::WaitJoin);
    }

    #[test]
    fn test_own_join_ack_moves_to_wait_start() {
        // Arrange
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);
        view.checkpoint();
        view.expect_show_joined().return_const(());
        view.expect_state_changed()
            .with(eq(ClientState::WaitStart))
            .times(1)
            .return_const(());

        // Act
        session.on_message(ServerMessage::Joined("alice".into()), &mut view);

        // Assert
        assert_eq!(session.state(), ClientState::WaitStart);
    }

    #[test]
    fn test_game_traffic_before_join_ack_is_ignored() {
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);
        view.checkpoint();

        // No expectations: any view call would panic.
        session.on_message(ServerMessage::Turn("alice".into()), &mut view);

        assert_eq!(session.state(), ClientState::WaitJoin);
    }

    #[test]
    fn test_turn_naming_local_player_enters_my_turn() {
        let mut view = quiet_view();
        let session = on_my_turn(&mut view);
        assert_eq!(session.state(), ClientState::MyTurn);
    }

    #[test]
    fn test_turn_naming_opponent_waits_for_update() {
        // Arrange
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);
        session.on_message(ServerMessage::Joined("alice".into()), &mut view);
        view.checkpoint();
        view.expect_show_turn()
            .withf(|name, mine| name == "bob" && !*mine)
            .times(1)
            .return_const(());
        view.expect_state_changed()
            .with(eq(ClientState::WaitUpdate))
            .times(1)
            .return_const(());

        // Act
        session.on_message(ServerMessage::Turn("bob".into()), &mut view);

        // Assert
        assert_eq!(session.state(), ClientState::WaitUpdate);
    }

    #[test]
    fn test_update_is_rendered_and_remembered() {
        // Arrange
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);
        session.on_message(ServerMessage::Joined("alice".into()), &mut view);
        let board = Board::new().apply_move(tictactoe_core::Player::X, 1, 1).unwrap();
        view.checkpoint();
        view.expect_show_board()
            .withf(move |b| *b == board)
            .times(1)
            .return_const(());
        view.expect_state_changed().return_const(());

        // Act
        session.on_message(ServerMessage::Update(board), &mut view);

        // Assert
        assert_eq!(session.board(), &board);
    }

    #[test]
    fn test_error_after_connect_forces_game_over() {
        // Arrange
        let mut view = quiet_view();
        let mut session = on_my_turn(&mut view);
        view.checkpoint();
        view.expect_state_changed()
            .with(eq(ClientState::GameOver))
            .times(1)
            .return_const(());
        view.expect_show_outcome()
            .with(eq(Outcome::Disconnected("disconnect".into())))
            .times(1)
            .return_const(());

        // Act
        session.on_message(ServerMessage::Error("disconnect".into()), &mut view);

        // Assert
        assert_eq!(session.state(), ClientState::GameOver);
        assert_eq!(
            session.outcome(),
            Some(&Outcome::Disconnected("disconnect".into()))
        );
    }

    #[test]
    fn test_messages_after_game_over_are_ignored() {
        let mut view = quiet_view();
        let mut session = on_my_turn(&mut view);
        session.on_message(ServerMessage::Draw, &mut view);
        view.checkpoint();

        session.on_message(ServerMessage::Won("bob".into()), &mut view);

        assert_eq!(session.outcome(), Some(&Outcome::Draw));
    }

    #[test]
    fn test_out_of_range_move_is_refused_locally() {
        // Arrange
        let mut view = quiet_view();
        let mut session = on_my_turn(&mut view);
        view.checkpoint();
        view.expect_show_invalid_move()
            .with(eq(3), eq(0))
            .times(1)
            .return_const(());

        // Act
        let msg = session.command(Command::Move { col: 3, row: 0 }, &mut view);

        // Assert
        assert_eq!(msg, None);
        assert_eq!(session.state(), ClientState::MyTurn);
    }

    #[test]
    fn test_valid_move_is_published_and_waits_for_update() {
        let mut view = quiet_view();
        let mut session = on_my_turn(&mut view);

        let msg = session.command(Command::Move { col: 2, row: 1 }, &mut view);

        assert_eq!(
            msg,
            Some(ClientMessage::Move {
                col: 2,
                row: 1,
                username: "alice".into()
            })
        );
        assert_eq!(session.state(), ClientState::WaitUpdate);
    }

    #[test]
    fn test_move_out_of_turn_is_not_published() {
        let mut view = quiet_view();
        let mut session = joined_session(&mut view);

        let msg = session.command(Command::Move { col: 0, row: 0 }, &mut view);

        assert_eq!(msg, None);
    }

    #[test]
    fn test_resign_ends_game() {
        let mut view = quiet_view();
        let mut session = on_my_turn(&mut view);

        let msg = session.command(Command::Resign, &mut view);

        assert_eq!(
            msg,
            Some(ClientMessage::Resign {
                username: "alice".into()
            })
        );
        assert_eq!(session.outcome(), Some(&Outcome::Resigned));
    }

    #[test]
    fn test_resign_before_connect_sends_nothing() {
        let mut view = quiet_view();
        let mut session = ClientSession::new("alice").unwrap();

        assert_eq!(session.command(Command::Resign, &mut view), None);
        assert_eq!(session.outcome(), None);
    }

    // ── Driver ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_play_discovery_timeout_never_connects() {
        // Arrange
        let mut network = ScriptedNetwork::unreachable(Duration::from_secs(10));
        let mut input = ScriptedInput::new([]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = MockGameView::new();
        view.expect_state_changed()
            .with(eq(ClientState::Discover))
            .times(1)
            .return_const(());
        let (_stop, mut shutdown) = watch::channel(false);

        // Act
        let result = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &instant(),
            &mut shutdown,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(ClientError::DiscoveryTimeout(_))));
        assert!(!network.connected());
        assert_eq!(session.state(), ClientState::Discover);
    }

    #[tokio::test]
    async fn test_play_sends_join_then_moves_until_win() {
        // Arrange
        let mut network = ScriptedNetwork::new(
            record(),
            [
                "server/ joined alice",
                "server/ joined bob",
                "server/ turn alice",
                "server/ turn bob",
                "server/ turn alice",
                "server/ won alice",
            ],
        );
        let mut input = ScriptedInput::new([
            Command::Move { col: 0, row: 0 },
            Command::Move { col: 1, row: 1 },
        ]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = quiet_view();
        let (_stop, mut shutdown) = watch::channel(false);

        // Act
        let outcome = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &instant(),
            &mut shutdown,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(outcome, Outcome::Won("alice".into()));
        assert_eq!(
            network.sent(),
            vec![
                "client/ request join alice".to_string(),
                "client/ 0 0 alice".to_string(),
                "client/ 1 1 alice".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_play_resigns_when_input_closes() {
        let mut network = ScriptedNetwork::new(
            record(),
            ["server/ joined alice", "server/ turn alice"],
        );
        let mut input = ScriptedInput::new([]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = quiet_view();
        let (_stop, mut shutdown) = watch::channel(false);

        let outcome = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &instant(),
            &mut shutdown,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Resigned);
        assert_eq!(network.sent().last().map(String::as_str), Some("client/ resign alice"));
    }

    #[tokio::test]
    async fn test_play_resigns_on_shutdown_after_join() {
        // Arrange: the server never answers, so the client idles in WAIT_JOIN.
        let mut network = ScriptedNetwork::new(record(), []).keep_open();
        let mut input = ScriptedInput::new([]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = quiet_view();
        let (stop, mut shutdown) = watch::channel(false);
        let config = ClientConfig {
            poll_interval: Duration::from_millis(5),
            ..instant()
        };

        // Act
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            stop.send(true).unwrap();
        });
        let outcome = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &config,
            &mut shutdown,
        )
        .await
        .unwrap();
        stopper.await.unwrap();

        // Assert
        assert_eq!(outcome, Outcome::Resigned);
        assert_eq!(
            network.sent(),
            vec![
                "client/ request join alice".to_string(),
                "client/ resign alice".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_play_reports_lost_connection() {
        let mut network = ScriptedNetwork::new(record(), ["server/ joined alice"]);
        let mut input = ScriptedInput::new([]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = quiet_view();
        let (_stop, mut shutdown) = watch::channel(false);

        let result = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &instant(),
            &mut shutdown,
        )
        .await;

        assert!(matches!(result, Err(ClientError::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_play_drops_undecodable_messages() {
        let mut network = ScriptedNetwork::new(
            record(),
            ["client/ request join mallory", "server/ joined alice", "server/ draw"],
        );
        let mut input = ScriptedInput::new([]);
        let mut session = ClientSession::new("alice").unwrap();
        let mut view = quiet_view();
        let (_stop, mut shutdown) = watch::channel(false);

        let outcome = play(
            &mut session,
            &mut network,
            &mut input,
            &mut view,
            &instant(),
            &mut shutdown,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Draw);
    }
}
