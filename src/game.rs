use anyhow::{bail, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 10;

// The flat I spawns at x = cols/2 - 1 and must fit inside the walls.
pub const MIN_COLS: usize = 6;
pub const MIN_ROWS: usize = 4;

// Scoring is linear in cleared rows; there is no multi-line bonus.
pub const SCORE_PER_LINE: u32 = 100;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rules {
    pub rows: usize,
    pub cols: usize,
    /// Latch game over when a freshly spawned piece collides. Turning this
    /// off keeps play going on an overlapping spawn, matching the classic
    /// behaviour of this game where the latch is never set.
    pub detect_game_over: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            detect_game_over: true,
        }
    }
}

impl Rules {
    /// Rejects boards a spawned piece cannot fit on, or whose coordinates
    /// overflow `i16`.
    pub fn validate(&self) -> Result<()> {
        if self.rows < MIN_ROWS {
            bail!("rows must be at least {}, got {}", MIN_ROWS, self.rows);
        }
        if self.cols < MIN_COLS {
            bail!("cols must be at least {}, got {}", MIN_COLS, self.cols);
        }
        if self.rows > i16::MAX as usize || self.cols > i16::MAX as usize {
            bail!("board of {}x{} is too large", self.rows, self.cols);
        }
        Ok(())
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i16, dy: i16) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn spawn(cols: usize) -> Self {
        Self {
            x: (cols / 2) as i16 - 1,
            y: 0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ShapeKind {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::I,
        ShapeKind::O,
        ShapeKind::T,
        ShapeKind::L,
        ShapeKind::J,
        ShapeKind::S,
        ShapeKind::Z,
    ];

    fn template(self) -> &'static [&'static [u8]] {
        match self {
            ShapeKind::I => &[&[1, 1, 1, 1]],
            ShapeKind::O => &[&[1, 1], &[1, 1]],
            ShapeKind::T => &[&[0, 1, 0], &[1, 1, 1]],
            ShapeKind::L => &[&[1, 0, 0], &[1, 1, 1]],
            ShapeKind::J => &[&[0, 0, 1], &[1, 1, 1]],
            ShapeKind::S => &[&[0, 1, 1], &[1, 1, 0]],
            ShapeKind::Z => &[&[1, 1, 0], &[0, 1, 1]],
        }
    }

    pub fn shape(self) -> Shape {
        Shape {
            kind: self,
            cells: self
                .template()
                .iter()
                .map(|row| row.iter().map(|&c| c != 0).collect())
                .collect(),
        }
    }
}

// Rotation builds a new matrix; catalog templates are never touched.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Shape {
    kind: ShapeKind,
    cells: Vec<Vec<bool>>,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.cells
    }

    pub fn filled_cells(&self) -> impl Iterator<Item = (i16, i16)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, filled)| **filled)
                .map(move |(x, _)| (x as i16, y as i16))
        })
    }

    /// 90° clockwise: transpose, then reverse each resulting row.
    pub fn rotated(&self) -> Shape {
        let height = self.height();
        let cells = (0..self.width())
            .map(|x| (0..height).rev().map(|y| self.cells[y][x]).collect())
            .collect();
        Shape {
            kind: self.kind,
            cells,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Empty,
    Filled(ShapeKind),
}

impl Cell {
    pub fn is_filled(self) -> bool {
        self != Cell::Empty
    }
}

// ============================================================================
// Board
// ============================================================================

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Board {
    cols: usize,
    cells: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![vec![Cell::Empty; cols]; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.cells[y][x]
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[y][x] = cell;
    }

    pub fn is_row_complete(&self, y: usize) -> bool {
        self.cells[y].iter().all(|cell| cell.is_filled())
    }

    pub fn filled_count_in_row(&self, y: usize) -> usize {
        self.cells[y].iter().filter(|cell| cell.is_filled()).count()
    }

    pub fn total_filled_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_filled())
            .count()
    }

    fn with_locked(&self, piece: &ActivePiece) -> Board {
        let mut board = self.clone();
        let kind = piece.shape.kind();
        let rows = self.rows() as i16;
        let cols = self.cols as i16;
        for block in piece.blocks() {
            if block.y >= 0 && block.y < rows && block.x >= 0 && block.x < cols {
                board.set(block.x as usize, block.y as usize, Cell::Filled(kind));
            }
        }
        board
    }

    /// Removes every full row, pushing an empty row in at the top for each.
    pub fn clear_full_rows(&mut self) -> u32 {
        let full: Vec<usize> = (0..self.rows())
            .filter(|&y| self.is_row_complete(y))
            .collect();

        // Ascending order keeps each pending index valid: removing row y and
        // inserting at 0 leaves every row below y where it was.
        for &y in &full {
            self.cells.remove(y);
            self.cells.insert(0, vec![Cell::Empty; self.cols]);
        }

        full.len() as u32
    }
}

// ============================================================================
// Active Piece
// ============================================================================

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ActivePiece {
    pub shape: Shape,
    pub position: Position,
}

impl ActivePiece {
    pub fn spawn(kind: ShapeKind, cols: usize) -> Self {
        Self {
            shape: kind.shape(),
            position: Position::spawn(cols),
        }
    }

    pub fn new_at(kind: ShapeKind, x: i16, y: i16) -> Self {
        Self {
            shape: kind.shape(),
            position: Position::new(x, y),
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = Position> + '_ {
        let origin = self.position;
        self.shape
            .filled_cells()
            .map(move |(dx, dy)| origin.offset(dx, dy))
    }
}

// ============================================================================
// Collision Oracle
// ============================================================================

/// True when any filled cell of `shape` anchored at `position` leaves the
/// board or lands on an occupied cell. Bounds are checked before the board is
/// indexed, so the lookup is always in range.
pub fn collides(shape: &Shape, position: Position, board: &Board) -> bool {
    let rows = board.rows() as i16;
    let cols = board.cols() as i16;

    shape.filled_cells().any(|(dx, dy)| {
        let x = position.x + dx;
        let y = position.y + dy;
        if y >= rows || y < 0 {
            return true;
        }
        if x < 0 || x >= cols {
            return true;
        }
        board.get(x as usize, y as usize).is_filled()
    })
}

// ============================================================================
// Piece Provider Trait
// ============================================================================

pub trait PieceProvider {
    fn next_piece(&mut self) -> ShapeKind;
}

pub struct RandomPieceProvider {
    rng: StdRng,
}

impl RandomPieceProvider {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPieceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceProvider for RandomPieceProvider {
    fn next_piece(&mut self) -> ShapeKind {
        ShapeKind::ALL[self.rng.gen_range(0..ShapeKind::ALL.len())]
    }
}

pub struct SequencePieceProvider {
    pieces: Vec<ShapeKind>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(pieces: Vec<ShapeKind>) -> Self {
        assert!(!pieces.is_empty(), "piece sequence must not be empty");
        Self { pieces, index: 0 }
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_piece(&mut self) -> ShapeKind {
        let piece = self.pieces[self.index % self.pieces.len()];
        self.index += 1;
        piece
    }
}

// ============================================================================
// Game State
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intent {
    Left,
    Right,
    SoftDrop,
    Rotate,
    Tick,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    pub board: Board,
    pub active_piece: ActivePiece,
    pub score: u32,
    pub is_game_over: bool,
}

impl GameState {
    pub fn new(rules: &Rules, provider: &mut dyn PieceProvider) -> Result<Self> {
        rules.validate()?;
        Ok(Self {
            board: Board::new(rules.rows, rules.cols),
            active_piece: ActivePiece::spawn(provider.next_piece(), rules.cols),
            score: 0,
            is_game_over: false,
        })
    }

    pub fn with_board(board: Board, active_piece: ActivePiece) -> Self {
        Self {
            board,
            active_piece,
            score: 0,
            is_game_over: false,
        }
    }

    pub fn render_grid(&self) -> Vec<Vec<Cell>> {
        let mut visual = self.board.cells().to_vec();
        let kind = self.active_piece.shape.kind();
        let rows = self.board.rows() as i16;
        let cols = self.board.cols() as i16;

        for block in self.active_piece.blocks() {
            if block.y >= 0 && block.y < rows && block.x >= 0 && block.x < cols {
                visual[block.y as usize][block.x as usize] = Cell::Filled(kind);
            }
        }

        visual
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Applies one intent and returns the next state. Rejected intents return an
/// unchanged copy; once the game-over latch is set every intent is rejected.
pub fn step(
    state: &GameState,
    intent: Intent,
    rules: &Rules,
    provider: &mut dyn PieceProvider,
) -> GameState {
    if state.is_game_over {
        return state.clone();
    }

    match intent {
        Intent::Left => shift(state, -1),
        Intent::Right => shift(state, 1),
        Intent::Rotate => rotate(state),
        Intent::SoftDrop | Intent::Tick => descend(state, rules, provider),
    }
}

fn shift(state: &GameState, dx: i16) -> GameState {
    let piece = &state.active_piece;
    let proposed = piece.position.offset(dx, 0);
    if collides(&piece.shape, proposed, &state.board) {
        return state.clone();
    }

    let mut next = state.clone();
    next.active_piece.position = proposed;
    next
}

fn rotate(state: &GameState) -> GameState {
    let piece = &state.active_piece;
    let rotated = piece.shape.rotated();
    if collides(&rotated, piece.position, &state.board) {
        return state.clone();
    }

    let mut next = state.clone();
    next.active_piece.shape = rotated;
    next
}

fn descend(state: &GameState, rules: &Rules, provider: &mut dyn PieceProvider) -> GameState {
    let piece = &state.active_piece;
    let below = piece.position.offset(0, 1);
    if !collides(&piece.shape, below, &state.board) {
        let mut next = state.clone();
        next.active_piece.position = below;
        return next;
    }

    lock_and_spawn(state, rules, provider)
}

fn lock_and_spawn(
    state: &GameState,
    rules: &Rules,
    provider: &mut dyn PieceProvider,
) -> GameState {
    let piece = &state.active_piece;
    debug!(
        "locking {:?} at ({}, {})",
        piece.shape.kind(),
        piece.position.x,
        piece.position.y
    );

    let mut board = state.board.with_locked(piece);
    let cleared = board.clear_full_rows();
    if cleared > 0 {
        debug!("cleared {} row(s)", cleared);
    }

    let score = state.score + cleared * SCORE_PER_LINE;
    let active_piece = ActivePiece::spawn(provider.next_piece(), board.cols());

    let is_game_over = rules.detect_game_over
        && collides(&active_piece.shape, active_piece.position, &board);
    if is_game_over {
        info!("game over: spawn blocked, final score {}", score);
    }

    GameState {
        board,
        active_piece,
        score,
        is_game_over,
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn empty_board() -> Board {
        Board::new(DEFAULT_ROWS, DEFAULT_COLS)
    }

    pub fn fill_row(board: &mut Board, y: usize) {
        for x in 0..board.cols() {
            board.set(x, y, Cell::Filled(ShapeKind::T));
        }
    }

    pub fn fill_row_with_gap(board: &mut Board, y: usize, gap_x: usize) {
        for x in 0..board.cols() {
            if x != gap_x {
                board.set(x, y, Cell::Filled(ShapeKind::T));
            }
        }
    }
}
