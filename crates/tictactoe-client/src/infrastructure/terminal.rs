//! Terminal adapters: stdin for commands, stdout for the board.

use std::io::Write;
use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use tictactoe_core::Board;

use crate::application::play_session::{ClientState, Command, GameView, MoveInput, Outcome};

const MOVE_PROMPT: &str = "Enter your move (col row) or 'resign': ";

/// A line that is neither a move nor a resignation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid input format. Use two numbers or 'resign'.")]
pub struct CommandParseError;

/// Parses `"<col> <row>"` or `"resign"` (case-insensitive).
///
/// Range checking is left to the session so the player gets the same
/// feedback however the move was entered.
pub fn parse_command(line: &str) -> Result<Command, CommandParseError> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("resign") {
        return Ok(Command::Resign);
    }
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(col), Some(row), None) => {
            let col = col.parse().map_err(|_| CommandParseError)?;
            let row = row.parse().map_err(|_| CommandParseError)?;
            Ok(Command::Move { col, row })
        }
        _ => Err(CommandParseError),
    }
}

/// Reads commands line by line from stdin.
pub struct StdinInput {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prints `prompt` and reads one line.  `None` on EOF or read error.
    pub async fn prompt_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                None
            }
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveInput for StdinInput {
    async fn next_command(&mut self) -> Option<Command> {
        loop {
            let line = self.prompt_line(MOVE_PROMPT).await?;
            match parse_command(&line) {
                Ok(command) => return Some(command),
                Err(e) => println!("{e}"),
            }
        }
    }
}

/// Prints the game to stdout.
pub struct TerminalView {
    username: String,
}

impl TerminalView {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl GameView for TerminalView {
    fn state_changed(&mut self, state: ClientState) {
        match state {
            ClientState::Discover => println!("Searching for Tic-Tac-Toe server via LAN broadcast..."),
            ClientState::Connect => println!("Connecting to server..."),
            ClientState::WaitStart => println!("Joined as {}. Waiting for an opponent...", self.username),
            _ => {}
        }
    }

    fn show_server(&mut self, address: IpAddr) {
        println!("Found server at {address}");
    }

    fn show_joined(&mut self, username: &str) {
        println!("Player joined: {username}");
    }

    fn show_board(&mut self, board: &Board) {
        println!("\nGame Board:\n{}", board.render());
    }

    fn show_turn(&mut self, username: &str, mine: bool) {
        if mine {
            println!("It's your turn!");
        } else {
            println!("Please wait for {username} to make their move");
        }
    }

    fn show_invalid_move(&mut self, col: i32, row: i32) {
        println!("Invalid move ({col}, {row}): must be between 0 and 2.");
    }

    fn show_outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Won(winner) if *winner == self.username => println!("Game over! You won."),
            Outcome::Won(winner) => println!("Game over! Winner: {winner}"),
            Outcome::Draw => println!("Game ended in a draw."),
            Outcome::Resigned => println!("You resigned."),
            Outcome::Disconnected(reason) => println!("Server error ({reason}), disconnecting."),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
