//! Game state: grid, piece catalog, collision, rotation, line sweep, scoring,
//! drop scheduler.

use std::time::Duration;

/// Easing rate for the render-only fall offset, per second of frame time.
const VISUAL_FALL_RATE: f32 = 15.0;

/// Tetromino kinds (T, O, L, J, I, S, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    T,
    O,
    L,
    J,
    I,
    S,
    Z,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::T, Self::O, Self::L, Self::J, Self::I, Self::S, Self::Z];

    pub fn name(&self) -> &'static str {
        match self {
            Self::T => "T",
            Self::O => "O",
            Self::L => "L",
            Self::J => "J",
            Self::I => "I",
            Self::S => "S",
            Self::Z => "Z",
        }
    }

    /// Template matrix for this kind. The nonzero value doubles as the colour
    /// index (1..=7) once cells settle into the grid.
    pub fn template(&self) -> Vec<Vec<u8>> {
        match self {
            Self::T => vec![vec![0, 1, 0], vec![1, 1, 1], vec![0, 0, 0]],
            Self::O => vec![vec![2, 2], vec![2, 2]],
            Self::L => vec![vec![0, 0, 3], vec![3, 3, 3], vec![0, 0, 0]],
            Self::J => vec![vec![4, 0, 0], vec![4, 4, 4], vec![0, 0, 0]],
            Self::I => vec![vec![0, 5, 0, 0]; 4],
            Self::S => vec![vec![0, 6, 6], vec![6, 6, 0], vec![0, 0, 0]],
            Self::Z => vec![vec![7, 7, 0], vec![0, 7, 7], vec![0, 0, 0]],
        }
    }
}

/// Rotate a square matrix 90° clockwise in place: transpose, then reverse
/// each row.
pub fn rotate_cw(shape: &mut [Vec<u8>]) {
    for y in 0..shape.len() {
        for x in 0..y {
            let tmp = shape[y][x];
            shape[y][x] = shape[x][y];
            shape[x][y] = tmp;
        }
    }
    for row in shape.iter_mut() {
        row.reverse();
    }
}

/// The currently falling piece: a mutable copy of a catalog template plus its
/// offset into the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub shape: Vec<Vec<u8>>,
    pub x: i32,
    pub y: i32,
    /// Fractional row used only by the renderer; eases toward `y`.
    pub visual_y: f32,
}

/// Fresh piece horizontally centred at the top row.
fn spawn_at_top(cols: usize, kind: PieceKind) -> ActivePiece {
    let shape = kind.template();
    let x = (cols / 2) as i32 - (shape[0].len() / 2) as i32;
    ActivePiece {
        kind,
        shape,
        x,
        y: 0,
        visual_y: 0.0,
    }
}

/// Settled playfield. `cells[y][x]` is 0 when empty, 1..=7 for piece material;
/// row 0 is the top. Dimensions are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Vec<u8>>,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            cells: vec![vec![0; w]; h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.cells.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.cells[y][x] = value;
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(0);
        }
    }

    /// True if any filled piece cell lands outside the grid (either axis,
    /// including above the top) or on settled material. No side effects.
    pub fn collides(&self, piece: &ActivePiece) -> bool {
        for (dy, row) in piece.shape.iter().enumerate() {
            for (dx, &v) in row.iter().enumerate() {
                if v == 0 {
                    continue;
                }
                let x = piece.x + dx as i32;
                let y = piece.y + dy as i32;
                if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
                    return true;
                }
                if self.cells[y as usize][x as usize] != 0 {
                    return true;
                }
            }
        }
        false
    }

    /// Write the piece's filled cells into the grid. The caller must already
    /// have reverted the colliding step; cells outside the grid are skipped.
    pub fn merge(&mut self, piece: &ActivePiece) {
        for (dy, row) in piece.shape.iter().enumerate() {
            for (dx, &v) in row.iter().enumerate() {
                if v == 0 {
                    continue;
                }
                let x = piece.x + dx as i32;
                let y = piece.y + dy as i32;
                if x >= 0 && y >= 0 {
                    self.set(x as usize, y as usize, v);
                }
            }
        }
    }

    /// Remove every full row, unshifting a blank row at the top for each.
    /// Backward scan; the index is decremented only when no row was removed
    /// there, so the row that fell into the slot is examined again.
    /// Returns the cleared row indices in scan order.
    pub fn sweep_full_rows(&mut self) -> Vec<usize> {
        let mut cleared = Vec::new();
        let mut y = self.height;
        while y > 0 {
            let row = y - 1;
            if self.cells[row].iter().all(|&c| c != 0) {
                self.cells.remove(row);
                self.cells.insert(0, vec![0; self.width]);
                cleared.push(row);
            } else {
                y -= 1;
            }
        }
        cleared
    }
}

/// Side effects for external collaborators (bell, row flash, score display),
/// drained by the app each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    LineCleared { row: usize },
    ScoreChanged { score: u32, level: u32 },
    /// Emitted with the pre-reset score; by the time the app sees this the
    /// grid is empty and the score is back to zero.
    GameOver { final_score: u32 },
}

/// Small LCG; uniform piece picks, reproducible under `--seed`.
#[derive(Debug, Clone)]
pub struct PieceRng {
    state: u32,
}

impl PieceRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    pub fn next_kind(&mut self) -> PieceKind {
        PieceKind::ALL[(self.next() as usize) % PieceKind::ALL.len()]
    }
}

/// Game state: grid, falling piece, score/level, drop scheduler, pending
/// events.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub piece: ActivePiece,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    drop_accum: Duration,
    drop_interval: Duration,
    base_drop_ms: u64,
    drop_step_ms: u64,
    min_drop_ms: u64,
    rng: PieceRng,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        let mut rng = PieceRng::new(config.seed);
        let kind = rng.next_kind();
        let piece = spawn_at_top(config.cols as usize, kind);
        let mut state = Self {
            grid: Grid::new(config.cols, config.rows),
            piece,
            score: 0,
            level: 1,
            lines_cleared: 0,
            drop_accum: Duration::ZERO,
            drop_interval: Duration::ZERO,
            base_drop_ms: config.base_drop_ms,
            drop_step_ms: config.drop_step_ms,
            min_drop_ms: config.min_drop_ms,
            rng,
            events: Vec::new(),
        };
        state.drop_interval = state.interval_for_level(1);
        state
    }

    /// Lifecycle reset: empty grid, zero score, level 1, fresh piece. The only
    /// (re)initialisation entry point.
    pub fn restart(&mut self) {
        self.grid.clear();
        self.events.clear();
        self.lines_cleared = 0;
        self.drop_accum = Duration::ZERO;
        self.set_score(0);
        self.spawn_piece();
    }

    pub fn drop_interval(&self) -> Duration {
        self.drop_interval
    }

    /// Take the events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Shift the piece horizontally; a colliding shift is reverted.
    pub fn move_piece(&mut self, dx: i32) {
        self.piece.x += dx;
        if self.grid.collides(&self.piece) {
            self.piece.x -= dx;
        }
    }

    /// Rotate the piece clockwise; if the rotated shape collides, the
    /// pre-rotation shape is restored (net no-op).
    pub fn rotate_piece(&mut self) {
        let before = self.piece.shape.clone();
        rotate_cw(&mut self.piece.shape);
        if self.grid.collides(&self.piece) {
            self.piece.shape = before;
        }
    }

    /// One descent step, manual or scheduler-forced. Landing merges the piece
    /// at its last valid row, sweeps full rows, and spawns the next piece.
    /// The drop accumulator resets either way.
    pub fn drop_piece(&mut self) {
        self.piece.y += 1;
        self.drop_accum = Duration::ZERO;
        if self.grid.collides(&self.piece) {
            self.piece.y -= 1;
            self.grid.merge(&self.piece);
            self.sweep();
            self.spawn_piece();
        }
    }

    /// Advance the drop scheduler by one frame's elapsed wall-clock time.
    /// Crossing the interval performs exactly one forced drop; the
    /// accumulator then resets fully, so a long pause never causes catch-up
    /// drops. Also eases the render offset toward the logical row.
    pub fn tick(&mut self, delta: Duration) {
        self.drop_accum += delta;
        if self.drop_accum > self.drop_interval {
            self.drop_piece();
        }
        let target = self.piece.y as f32;
        let t = (delta.as_secs_f32() * VISUAL_FALL_RATE).min(1.0);
        self.piece.visual_y += (target - self.piece.visual_y) * t;
        if (target - self.piece.visual_y).abs() < 0.05 {
            self.piece.visual_y = target;
        }
    }

    /// Sweep full rows and apply the doubling rule: the first cleared line is
    /// worth 10, each further line in the same sweep worth double the
    /// previous one. Score (and therefore level) updates after every line.
    fn sweep(&mut self) {
        let cleared = self.grid.sweep_full_rows();
        let mut multiplier = 1u32;
        for &row in &cleared {
            self.events.push(GameEvent::LineCleared { row });
            self.set_score(self.score + multiplier * 10);
            multiplier *= 2;
        }
        self.lines_cleared += cleared.len() as u32;
    }

    /// Spawn a fresh random piece at the top centre. An immediate overlap
    /// with settled material is the game-over condition: the whole grid
    /// empties, the score resets, and a `GameOver` event carries the final
    /// score. The engine stays usable afterwards.
    fn spawn_piece(&mut self) {
        let kind = self.rng.next_kind();
        self.piece = spawn_at_top(self.grid.width, kind);
        if self.grid.collides(&self.piece) {
            let final_score = self.score;
            self.grid.clear();
            self.lines_cleared = 0;
            self.set_score(0);
            self.events.push(GameEvent::GameOver { final_score });
        }
    }

    /// Set the score and recompute level and drop interval from it.
    fn set_score(&mut self, score: u32) {
        self.score = score;
        self.level = score / 100 + 1;
        self.drop_interval = self.interval_for_level(self.level);
        self.events.push(GameEvent::ScoreChanged {
            score: self.score,
            level: self.level,
        });
    }

    /// Interval shrinks one step per level, clamped to the configured
    /// minimum so it never reaches zero at high levels.
    fn interval_for_level(&self, level: u32) -> Duration {
        let shrink = u64::from(level.saturating_sub(1)) * self.drop_step_ms;
        Duration::from_millis(self.base_drop_ms.saturating_sub(shrink).max(self.min_drop_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> crate::GameConfig {
        crate::GameConfig {
            cols: 10,
            rows: 20,
            base_drop_ms: 1000,
            drop_step_ms: 100,
            min_drop_ms: 100,
            seed: 7,
        }
    }

    fn state_with_piece(kind: PieceKind) -> GameState {
        let mut state = GameState::new(&test_config());
        state.piece = spawn_at_top(state.grid.width, kind);
        state
    }

    #[test]
    fn test_templates_are_square() {
        for kind in PieceKind::ALL {
            let shape = kind.template();
            for row in &shape {
                assert_eq!(row.len(), shape.len());
            }
        }
    }

    #[test]
    fn test_spawn_does_not_collide_on_empty_grid() {
        let state = GameState::new(&test_config());
        assert!(!state.grid.collides(&state.piece));
    }

    #[test]
    fn test_spawn_is_centred() {
        let state = state_with_piece(PieceKind::O);
        assert_eq!(state.piece.x, 4);
        assert_eq!(state.piece.y, 0);
    }

    #[test]
    fn test_collides_out_of_bounds() {
        let grid = Grid::new(10, 20);
        let mut piece = spawn_at_top(10, PieceKind::O);
        piece.x = -1;
        assert!(grid.collides(&piece));
        piece.x = 9;
        assert!(grid.collides(&piece));
        piece.x = 4;
        piece.y = 19;
        assert!(grid.collides(&piece));
    }

    #[test]
    fn test_collides_with_settled_material() {
        let mut grid = Grid::new(10, 20);
        let piece = spawn_at_top(10, PieceKind::O);
        assert!(!grid.collides(&piece));
        grid.set(4, 1, 1);
        assert!(grid.collides(&piece));
    }

    #[test]
    fn test_merge_writes_piece_values() {
        let mut grid = Grid::new(10, 20);
        let mut piece = spawn_at_top(10, PieceKind::O);
        piece.y = 18;
        grid.merge(&piece);
        assert_eq!(grid.get(4, 18), Some(2));
        assert_eq!(grid.get(5, 19), Some(2));
        assert_eq!(grid.get(3, 18), Some(0));
    }

    #[test]
    fn test_move_round_trip_in_free_space() {
        let mut state = GameState::new(&test_config());
        let x0 = state.piece.x;
        state.move_piece(1);
        state.move_piece(-1);
        assert_eq!(state.piece.x, x0);
    }

    #[test]
    fn test_move_reverts_at_wall() {
        let mut state = state_with_piece(PieceKind::O);
        for _ in 0..20 {
            state.move_piece(-1);
        }
        assert_eq!(state.piece.x, 0);
        state.move_piece(-1);
        assert_eq!(state.piece.x, 0);
    }

    #[test]
    fn test_rotation_four_times_is_identity() {
        for kind in PieceKind::ALL {
            let mut shape = kind.template();
            for _ in 0..4 {
                rotate_cw(&mut shape);
            }
            assert_eq!(shape, kind.template());
        }
    }

    #[test]
    fn test_blocked_rotation_leaves_shape_unchanged() {
        // Vertical I against the right wall: the rotated bar would poke past
        // the edge, so the rotation must revert.
        let mut state = state_with_piece(PieceKind::I);
        state.piece.x = 8;
        let before = state.piece.clone();
        state.rotate_piece();
        assert_eq!(state.piece.shape, before.shape);
        assert_eq!(state.piece.x, before.x);
    }

    #[test]
    fn test_sweep_is_noop_without_full_rows() {
        let mut state = GameState::new(&test_config());
        for x in 0..9 {
            state.grid.set(x, 19, 1);
        }
        let grid_before = state.grid.clone();
        let score_before = state.score;
        state.sweep();
        assert_eq!(state.grid, grid_before);
        assert_eq!(state.score, score_before);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_sweep_scoring_doubles_per_line() {
        let mut state = GameState::new(&test_config());
        for y in 17..20 {
            for x in 0..10 {
                state.grid.set(x, y, 1);
            }
        }
        state.sweep();
        assert_eq!(state.score, 70); // 10 + 20 + 40
        assert_eq!(state.lines_cleared, 3);
        let lines = state
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::LineCleared { .. }))
            .count();
        assert_eq!(lines, 3);
    }

    #[test]
    fn test_sweep_scoring_four_lines() {
        let mut state = GameState::new(&test_config());
        for y in 16..20 {
            for x in 0..10 {
                state.grid.set(x, y, 3);
            }
        }
        state.sweep();
        assert_eq!(state.score, 150); // 10 + 20 + 40 + 80
    }

    #[test]
    fn test_level_and_interval_follow_score() {
        let mut state = GameState::new(&test_config());
        state.set_score(100);
        assert_eq!(state.level, 2);
        assert_eq!(state.drop_interval(), Duration::from_millis(900));
        state.set_score(0);
        assert_eq!(state.level, 1);
        assert_eq!(state.drop_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_interval_clamps_at_minimum() {
        let mut state = GameState::new(&test_config());
        state.set_score(100_000);
        assert_eq!(state.drop_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_scheduler_one_drop_per_crossing() {
        let mut state = GameState::new(&test_config());
        state.tick(Duration::from_millis(500));
        assert_eq!(state.piece.y, 0);
        state.tick(Duration::from_millis(600));
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_scheduler_no_catch_up_after_long_pause() {
        let mut state = GameState::new(&test_config());
        state.tick(Duration::from_secs(10));
        assert_eq!(state.piece.y, 1);
        // Accumulator fully reset: the next short tick must not drop again.
        state.tick(Duration::from_millis(500));
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_manual_drop_resets_scheduler() {
        let mut state = GameState::new(&test_config());
        state.tick(Duration::from_millis(900));
        state.drop_piece();
        assert_eq!(state.piece.y, 1);
        state.tick(Duration::from_millis(200));
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_game_over_resets_score_and_grid() {
        let mut state = GameState::new(&test_config());
        state.set_score(250);
        for y in 0..3 {
            for x in 0..10 {
                state.grid.set(x, y, 1);
            }
        }
        state.drain_events();
        state.spawn_piece();
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::GameOver { final_score: 250 }));
        assert_eq!(state.score, 0);
        assert_eq!(state.level, 1);
        for y in 0..state.grid.height {
            for x in 0..state.grid.width {
                assert_eq!(state.grid.get(x, y), Some(0));
            }
        }
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut state = GameState::new(&test_config());
        state.set_score(140);
        state.grid.set(3, 19, 5);
        state.restart();
        assert_eq!(state.score, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.lines_cleared, 0);
        assert_eq!(state.grid.get(3, 19), Some(0));
        assert_eq!(state.piece.y, 0);
    }

    #[test]
    fn test_rng_is_deterministic_per_seed() {
        let mut a = PieceRng::new(42);
        let mut b = PieceRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.next_kind(), b.next_kind());
        }
    }

    #[test]
    fn test_o_piece_falls_to_the_floor() {
        // On an empty 10x20 grid the O spawns at x = 4; nineteen drops later
        // it has merged into the bottom two rows and a new piece is falling.
        let mut state = state_with_piece(PieceKind::O);
        assert!(!state.grid.collides(&state.piece));
        for _ in 0..19 {
            state.drop_piece();
        }
        for x in 4..6 {
            assert_eq!(state.grid.get(x, 18), Some(2));
            assert_eq!(state.grid.get(x, 19), Some(2));
        }
        assert_eq!(state.piece.y, 0);
    }

    #[test]
    fn test_o_piece_completes_and_clears_bottom_row() {
        // Bottom row full except the two columns the O will occupy; landing
        // completes the row, the sweep removes it, a blank row appears at the
        // top, and the O's upper half compacts down one row.
        let mut state = state_with_piece(PieceKind::O);
        for x in 0..10 {
            if x != 4 && x != 5 {
                state.grid.set(x, 19, 1);
            }
        }
        state.drain_events();
        for _ in 0..19 {
            state.drop_piece();
        }
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::LineCleared { row: 19 }));
        assert_eq!(state.score, 10);
        for x in 0..10 {
            assert_eq!(state.grid.get(x, 0), Some(0));
        }
        // Only the O's upper half remains, shifted into the bottom row.
        assert_eq!(state.grid.get(4, 19), Some(2));
        assert_eq!(state.grid.get(5, 19), Some(2));
        assert_eq!(state.grid.get(0, 19), Some(0));
    }
}
