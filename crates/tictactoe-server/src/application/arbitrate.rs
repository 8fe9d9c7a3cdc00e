//! Session: the server's arbitration state machine.
//!
//! One `Session` referees exactly one match.  It is a pure step function:
//! [`Session::handle`] takes one decoded client message and returns the server
//! messages to broadcast, in order.  No I/O happens here, so the whole
//! protocol can be unit-tested by feeding messages and inspecting the output.
//!
//! # States
//!
//! ```text
//!  Lobby ──(2nd distinct join)──► [start game] ──► Playing ──(win/draw/resign/forfeit)──► Over
//!    ▲  │
//!    └──┘ resign: player list cleared
//! ```
//!
//! Starting the game and processing a move are transient steps inside
//! `handle`; the observable phases are [`Phase::Lobby`], [`Phase::Playing`]
//! and [`Phase::Over`].

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use tictactoe_core::{ClientMessage, GameState, ServerMessage, DISCONNECT_REASON};

/// Number of players in a match.
pub const PLAYERS_PER_MATCH: usize = 2;

/// Observable phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting joins.  No game exists yet.
    Lobby,
    /// Two players are fixed and a game is in progress.
    Playing,
    /// A final outcome has been emitted; every further message is ignored.
    Over,
}

// ── Turn order ────────────────────────────────────────────────────────────────

/// Decides who moves first by reordering the two joined players.
///
/// Injected into [`Session`] so tests can fix the order.
pub trait PlayerShuffle: Send {
    /// Reorders `players` in place.  Called once, when the match starts.
    fn shuffle(&mut self, players: &mut [String]);
}

/// Uniformly random order from a per-session RNG.
///
/// The RNG is created when the match starts: from `seed` when given (for
/// reproducible runs), otherwise from OS entropy.
#[derive(Debug, Clone, Default)]
pub struct RandomShuffle {
    seed: Option<u64>,
}

impl RandomShuffle {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

impl PlayerShuffle for RandomShuffle {
    fn shuffle(&mut self, players: &mut [String]) {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        players.shuffle(&mut rng);
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// The server-owned state of one match.
///
/// Invariants: `game` is `Some` iff `phase != Lobby`; the game only starts with
/// exactly two distinct players, who are never replaced afterwards.
pub struct Session {
    players: Vec<String>,
    turn_index: usize,
    game: Option<GameState>,
    phase: Phase,
    shuffle: Box<dyn PlayerShuffle>,
}

impl Session {
    /// A new session in the lobby using `shuffle` to pick the first mover.
    pub fn new(shuffle: impl PlayerShuffle + 'static) -> Self {
        Self {
            players: Vec::with_capacity(PLAYERS_PER_MATCH),
            turn_index: 0,
            game: None,
            phase: Phase::Lobby,
            shuffle: Box::new(shuffle),
        }
    }

    /// A new session with a [`RandomShuffle`].
    pub fn with_seed(seed: Option<u64>) -> Self {
        Self::new(RandomShuffle::new(seed))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::Over
    }

    /// Joined players; after the match starts, in turn order.
    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// The player who must move next, while a match is in progress.
    pub fn player_to_move(&self) -> Option<&str> {
        match self.phase {
            Phase::Playing => self.players.get(self.turn_index).map(String::as_str),
            _ => None,
        }
    }

    /// Feeds one client message through the state machine.
    ///
    /// Returns the server messages to broadcast, in order.  An empty vector
    /// means the message was ignored and nothing changed.
    pub fn handle(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match self.phase {
            Phase::Lobby => self.handle_lobby(msg),
            Phase::Playing => self.handle_playing(msg),
            Phase::Over => {
                debug!(?msg, "session over, ignoring message");
                Vec::new()
            }
        }
    }

    /// Returns the `error disconnect` message to broadcast on a fatal fault.
    ///
    /// A match in progress ends.  In the lobby there is no game to end, so the
    /// session stays there with an empty player list.
    pub fn abort(&mut self) -> ServerMessage {
        match self.phase {
            Phase::Lobby => self.players.clear(),
            Phase::Playing => self.phase = Phase::Over,
            Phase::Over => {}
        }
        ServerMessage::Error(DISCONNECT_REASON.to_string())
    }

    /// True if `username` is one of the two players of a match in progress.
    pub fn holds_seat(&self, username: &str) -> bool {
        self.phase == Phase::Playing && self.seat_of(username).is_some()
    }

    fn handle_lobby(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Join { username } => {
                if self.players.contains(&username) {
                    debug!(player = %username, "duplicate join ignored");
                    return Vec::new();
                }
                info!(player = %username, "player joined");
                self.players.push(username.clone());
                let mut out = vec![ServerMessage::Joined(username)];
                if self.players.len() == PLAYERS_PER_MATCH {
                    out.extend(self.start_game());
                }
                out
            }
            ClientMessage::Resign { username } => {
                info!(player = %username, "resign in lobby, resetting player list");
                self.players.clear();
                Vec::new()
            }
            ClientMessage::Move { .. } => Vec::new(),
        }
    }

    fn start_game(&mut self) -> Vec<ServerMessage> {
        self.shuffle.shuffle(&mut self.players);
        self.turn_index = 0;
        let game = GameState::new();
        self.game = Some(game);
        self.phase = Phase::Playing;

        info!(first = %self.players[0], second = %self.players[1], "match started");
        vec![
            ServerMessage::Update(*game.board()),
            ServerMessage::Turn(self.players[0].clone()),
        ]
    }

    fn handle_playing(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Resign { username } => match self.seat_of(&username) {
                Some(seat) => {
                    let winner = self.players[1 - seat].clone();
                    info!(loser = %username, winner = %winner, "player resigned");
                    self.phase = Phase::Over;
                    vec![ServerMessage::Won(winner)]
                }
                None => Vec::new(),
            },
            ClientMessage::Move { col, row, username } => self.process_move(col, row, &username),
            ClientMessage::Join { .. } => Vec::new(),
        }
    }

    fn process_move(&mut self, col: i32, row: i32, username: &str) -> Vec<ServerMessage> {
        if self.players[self.turn_index] != username {
            debug!(player = %username, "move out of turn ignored");
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let opponent = self.players[1 - self.turn_index].clone();

        if let Err(rejected) = game.play(col, row) {
            info!(player = %username, %rejected, "illegal move, forfeit");
            self.phase = Phase::Over;
            return vec![ServerMessage::Won(opponent)];
        }

        let board = *game.board();
        let mut out = vec![ServerMessage::Update(board)];
        if board.has_winner() {
            info!(winner = %username, "three in a row");
            self.phase = Phase::Over;
            out.push(ServerMessage::Won(username.to_string()));
        } else if board.is_draw() {
            info!("board full, draw");
            self.phase = Phase::Over;
            out.push(ServerMessage::Draw);
        } else {
            self.turn_index = 1 - self.turn_index;
            out.push(ServerMessage::Turn(opponent));
        }
        out
    }

    fn seat_of(&self, username: &str) -> Option<usize> {
        self.players.iter().position(|p| p == username)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
