//! The 3×3 board, move legality, win/draw detection, and the text drawing.
//!
//! The board is a fixed row-major grid of [`Cell`]s.  Every operation here is
//! pure: applying a move returns a *new* board and leaves turn alternation to
//! the caller (see [`crate::domain::game::GameState`]).
//!
//! # The drawing format
//!
//! [`Board::render`] produces five lines, three data rows separated by two
//! rule lines, using the box-drawing glyphs `│` (U+2502), `─` (U+2500) and
//! `┼` (U+253C):
//!
//! ```text
//!  X │ O │
//! ───┼───┼───
//!    │ X │
//! ───┼───┼───
//!    │   │ O
//! ```
//!
//! The same text is the payload of the `update` wire message, so
//! [`Board::parse`] must accept exactly what `render` emits and nothing else.
//! `parse` additionally rejects boards that cannot arise from legal play.

use std::fmt;

use thiserror::Error;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Width and height of the board.
pub const BOARD_SIZE: usize = 3;

/// Rule line drawn between two data rows.
pub const SEPARATOR_LINE: &str = "───┼───┼───";

/// Vertical bar glyph used between cells in a data row.
const BAR: char = '│';

/// Number of characters (not bytes) in every line of a drawing.
const LINE_WIDTH: usize = 11;

/// Character offsets of the three cells inside a data row.
const CELL_OFFSETS: [usize; BOARD_SIZE] = [1, 5, 9];

/// Character offsets of the two bars inside a data row.
const BAR_OFFSETS: [usize; 2] = [3, 7];

/// Character offsets that must hold a single padding space.
const PAD_OFFSETS: [usize; 6] = [0, 2, 4, 6, 8, 10];

/// The eight winning lines as `(col, row)` triples: rows, columns, diagonals.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

// ── Player / Cell ─────────────────────────────────────────────────────────────

/// One of the two mark symbols.  `X` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Player {
    #[default]
    X,
    O,
}

impl Player {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// The character drawn for this player's marks.
    pub fn symbol(self) -> char {
        match self {
            Player::X => 'X',
            Player::O => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Contents of a single square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Mark(Player),
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Mark(p) => p.symbol(),
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Cell::Empty),
            'X' => Some(Cell::Mark(Player::X)),
            'O' => Some(Cell::Mark(Player::O)),
            _ => None,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A move the rule engine refuses to apply.
///
/// On the server a rejected move forfeits the game for the mover.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Column or row is outside `0..=2`.
    #[error("coordinates ({col}, {row}) are outside the board")]
    OutOfBounds { col: i32, row: i32 },

    /// The target square already carries a mark.
    #[error("square ({col}, {row}) is already taken")]
    Occupied { col: i32, row: i32 },

    /// The game already reached a win or a draw.
    #[error("the game is already over")]
    GameOver,
}

/// Why a board drawing could not be parsed.
///
/// Line numbers are 1-based, as a human would count them in the drawing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidBoard {
    #[error("expected 5 lines, found {0}")]
    LineCount(usize),

    #[error("line {line} is not a valid separator")]
    Separator { line: usize },

    #[error("line {line} is {width} characters wide, expected 11")]
    RowWidth { line: usize, width: usize },

    #[error("line {line} has padding or bars out of place")]
    RowLayout { line: usize },

    #[error("line {line} contains unknown mark {mark:?}")]
    UnknownMark { line: usize, mark: char },

    #[error("mark counts are impossible: {x} X against {o} O")]
    MarkImbalance { x: usize, o: usize },

    #[error("both players have three in a row")]
    BothWin,

    #[error("{winner} has three in a row but the mark counts disagree")]
    WinnerCountMismatch { winner: Player },
}

// ── Board ─────────────────────────────────────────────────────────────────────

/// A 3×3 tic-tac-toe board, stored row-major (`cells[row][col]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `(col, row)`, or `None` when out of range.
    pub fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Returns a copy of this board with `player`'s mark at `(col, row)`.
    ///
    /// # Errors
    ///
    /// - [`Rejected::OutOfBounds`] if either coordinate is outside `0..=2`.
    /// - [`Rejected::Occupied`] if the square is not empty.
    pub fn apply_move(&self, player: Player, col: i32, row: i32) -> Result<Board, Rejected> {
        let (c, r) = match (to_index(col), to_index(row)) {
            (Some(c), Some(r)) => (c, r),
            _ => return Err(Rejected::OutOfBounds { col, row }),
        };
        if self.cells[r][c] != Cell::Empty {
            return Err(Rejected::Occupied { col, row });
        }
        let mut next = *self;
        next.cells[r][c] = Cell::Mark(player);
        Ok(next)
    }

    /// `true` iff any row, column or diagonal holds three identical marks.
    pub fn has_winner(&self) -> bool {
        self.winner().is_some()
    }

    /// The player owning a completed line, if any.
    ///
    /// During legal play at most one player can own a line, because the board
    /// is inspected after every move.
    pub fn winner(&self) -> Option<Player> {
        [Player::X, Player::O]
            .into_iter()
            .find(|&p| self.is_winner(p))
    }

    /// `true` iff every square is marked and nobody has three in a row.
    pub fn is_draw(&self) -> bool {
        self.is_full() && !self.has_winner()
    }

    /// `true` iff no empty square remains.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|c| *c != Cell::Empty)
    }

    /// Number of marks `player` has on the board.
    pub fn count(&self, player: Player) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| **c == Cell::Mark(player))
            .count()
    }

    /// Whose turn it is on this board: `X` when counts are equal, else `O`.
    pub fn next_player(&self) -> Player {
        if self.count(Player::X) == self.count(Player::O) {
            Player::X
        } else {
            Player::O
        }
    }

    fn is_winner(&self, player: Player) -> bool {
        let mark = Cell::Mark(player);
        LINES
            .iter()
            .any(|line| line.iter().all(|&(c, r)| self.cells[r][c] == mark))
    }

    /// Draws the board as five lines joined by `\n`, without a trailing newline.
    pub fn render(&self) -> String {
        let rows: Vec<String> = self
            .cells
            .iter()
            .map(|r| {
                format!(
                    " {} {BAR} {} {BAR} {} ",
                    r[0].symbol(),
                    r[1].symbol(),
                    r[2].symbol()
                )
            })
            .collect();
        let between = format!("\n{SEPARATOR_LINE}\n");
        rows.join(between.as_str())
    }

    /// Parses a drawing produced by [`Board::render`].
    ///
    /// Returns the board together with the player due to move next.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoard`] when the text deviates from the drawing format
    /// in any character, or when the position is unreachable by legal play:
    /// more than one mark of difference, `O` ahead of `X`, both players
    /// winning, or a winner whose mark count does not match having moved last.
    pub fn parse(text: &str) -> Result<(Board, Player), InvalidBoard> {
        let lines: Vec<&str> = text.split('\n').collect();
        if lines.len() != 5 {
            return Err(InvalidBoard::LineCount(lines.len()));
        }
        for idx in [1, 3] {
            if lines[idx] != SEPARATOR_LINE {
                return Err(InvalidBoard::Separator { line: idx + 1 });
            }
        }

        let mut board = Board::new();
        for (row, idx) in [0usize, 2, 4].into_iter().enumerate() {
            board.cells[row] = parse_row(lines[idx], idx + 1)?;
        }

        let x = board.count(Player::X);
        let o = board.count(Player::O);
        if !(x == o || x == o + 1) {
            return Err(InvalidBoard::MarkImbalance { x, o });
        }

        let x_wins = board.is_winner(Player::X);
        let o_wins = board.is_winner(Player::O);
        if x_wins && o_wins {
            return Err(InvalidBoard::BothWin);
        }
        if x_wins && x != o + 1 {
            return Err(InvalidBoard::WinnerCountMismatch { winner: Player::X });
        }
        if o_wins && x != o {
            return Err(InvalidBoard::WinnerCountMismatch { winner: Player::O });
        }

        Ok((board, board.next_player()))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn to_index(v: i32) -> Option<usize> {
    usize::try_from(v).ok().filter(|&i| i < BOARD_SIZE)
}

fn parse_row(line: &str, line_no: usize) -> Result<[Cell; BOARD_SIZE], InvalidBoard> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() != LINE_WIDTH {
        return Err(InvalidBoard::RowWidth {
            line: line_no,
            width: chars.len(),
        });
    }
    let layout_ok = PAD_OFFSETS.iter().all(|&i| chars[i] == ' ')
        && BAR_OFFSETS.iter().all(|&i| chars[i] == BAR);
    if !layout_ok {
        return Err(InvalidBoard::RowLayout { line: line_no });
    }

    let mut row = [Cell::Empty; BOARD_SIZE];
    for (slot, &offset) in row.iter_mut().zip(CELL_OFFSETS.iter()) {
        let mark = chars[offset];
        *slot = Cell::from_symbol(mark).ok_or(InvalidBoard::UnknownMark {
            line: line_no,
            mark,
        })?;
    }
    Ok(row)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
