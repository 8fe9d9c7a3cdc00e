//! GameState: one board plus whose turn it is.
//!
//! The server owns exactly one `GameState` per match.  It is created at match
//! start, changed only by accepted moves, and frozen once a win or draw is
//! reached.

use super::board::{Board, InvalidBoard, Player, Rejected};

/// A board together with the symbol due to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameState {
    board: Board,
    current_player: Player,
}

impl GameState {
    /// A fresh game: empty board, `X` to move.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a game from a board drawing.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoard`] if the text is not a valid, reachable drawing.
    /// No `GameState` is constructed in that case.
    pub fn from_rendering(text: &str) -> Result<Self, InvalidBoard> {
        let (board, current_player) = Board::parse(text)?;
        Ok(Self {
            board,
            current_player,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    /// `true` once somebody has won or the board is drawn.
    pub fn is_over(&self) -> bool {
        self.board.has_winner() || self.board.is_draw()
    }

    /// Places the current player's mark at `(col, row)` and passes the turn.
    ///
    /// Returns the player who just moved.
    ///
    /// # Errors
    ///
    /// [`Rejected::GameOver`] once the game is terminal, otherwise whatever
    /// [`Board::apply_move`] rejects.  A rejected move leaves the state untouched.
    pub fn play(&mut self, col: i32, row: i32) -> Result<Player, Rejected> {
        if self.is_over() {
            return Err(Rejected::GameOver);
        }
        let mover = self.current_player;
        self.board = self.board.apply_move(mover, col, row)?;
        self.current_player = mover.opponent();
        Ok(mover)
    }

    /// Text drawing of the current board.
    pub fn render(&self) -> String {
        self.board.render()
    }
}
