//! Scripted collaborators for driving [`play`](crate::application::play_session::play)
//! without sockets or a terminal.
//!
//! # Why scripted doubles?
//!
//! The real adapters need a server on the network and a human at the
//! keyboard.  These doubles replay a fixed script instead:
//!
//! - [`ScriptedNetwork`] "discovers" a fixed record (or times out) and hands
//!   out a [`ScriptedLink`] that yields pre-recorded server messages and
//!   records everything the client publishes.
//! - [`ScriptedInput`] returns a fixed list of commands, then reports the
//!   input as closed.
//! - [`RecordingView`] keeps a log of everything the session rendered.
//!
//! A scripted link reports [`ClientError::ConnectionLost`] once its script is
//! exhausted, unless built with [`ScriptedNetwork::keep_open`].

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tictactoe_core::{Board, DiscoveryRecord};

use crate::application::play_session::{
    ClientError, ClientState, Command, GameView, MoveInput, Network, Outcome, ServerLink,
};

/// A [`Network`] that replays a script.
pub struct ScriptedNetwork {
    record: Result<DiscoveryRecord, Duration>,
    inbound: Vec<String>,
    keep_open: bool,
    connected: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedNetwork {
    /// Discovers `record` and then delivers `inbound` in order.
    pub fn new<'a>(record: DiscoveryRecord, inbound: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            record: Ok(record),
            inbound: inbound.into_iter().map(str::to_string).collect(),
            keep_open: false,
            connected: false,
            sent: Arc::default(),
        }
    }

    /// Never finds a server; discovery fails as if `timeout` elapsed.
    pub fn unreachable(timeout: Duration) -> Self {
        Self {
            record: Err(timeout),
            inbound: Vec::new(),
            keep_open: false,
            connected: false,
            sent: Arc::default(),
        }
    }

    /// Keeps the link open (idle) after the script runs out.
    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    /// True once [`Network::connect`] was called.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Every message the client published, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    type Link = ScriptedLink;

    async fn discover(&mut self) -> Result<DiscoveryRecord, ClientError> {
        self.record.map_err(ClientError::DiscoveryTimeout)
    }

    async fn connect(&mut self, _record: &DiscoveryRecord) -> Result<ScriptedLink, ClientError> {
        self.connected = true;
        Ok(ScriptedLink {
            inbound: self.inbound.drain(..).collect(),
            keep_open: self.keep_open,
            sent: Arc::clone(&self.sent),
        })
    }
}

/// The link handed out by [`ScriptedNetwork`].
pub struct ScriptedLink {
    inbound: VecDeque<String>,
    keep_open: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ServerLink for ScriptedLink {
    async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<String>, ClientError> {
        match self.inbound.pop_front() {
            Some(text) => Ok(Some(text)),
            None if self.keep_open => Ok(None),
            None => Err(ClientError::ConnectionLost),
        }
    }
}

/// A [`MoveInput`] that returns a fixed list of commands.
pub struct ScriptedInput {
    commands: VecDeque<Command>,
}

impl ScriptedInput {
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MoveInput for ScriptedInput {
    async fn next_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }
}

/// One thing a [`RecordingView`] was asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    State(ClientState),
    Server(IpAddr),
    Joined(String),
    Board(Board),
    Turn { username: String, mine: bool },
    InvalidMove { col: i32, row: i32 },
    Outcome(Outcome),
}

/// A [`GameView`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub shown: Vec<Shown>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The states entered, in order.
    pub fn states(&self) -> Vec<ClientState> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// The last board rendered, if any.
    pub fn last_board(&self) -> Option<Board> {
        self.shown.iter().rev().find_map(|s| match s {
            Shown::Board(board) => Some(*board),
            _ => None,
        })
    }
}

impl GameView for RecordingView {
    fn state_changed(&mut self, state: ClientState) {
        self.shown.push(Shown::State(state));
    }

    fn show_server(&mut self, address: IpAddr) {
        self.shown.push(Shown::Server(address));
    }

    fn show_joined(&mut self, username: &str) {
        self.shown.push(Shown::Joined(username.to_string()));
    }

    fn show_board(&mut self, board: &Board) {
        self.shown.push(Shown::Board(*board));
    }

    fn show_turn(&mut self, username: &str, mine: bool) {
        self.shown.push(Shown::Turn {
            username: username.to_string(),
            mine,
        });
    }

    fn show_invalid_move(&mut self, col: i32, row: i32) {
        self.shown.push(Shown::InvalidMove { col, row });
    }

    fn show_outcome(&mut self, outcome: &Outcome) {
        self.shown.push(Shown::Outcome(outcome.clone()));
    }
}
