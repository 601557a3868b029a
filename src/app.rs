//! App: terminal init, main loop, tick, key/swipe handling, cue dispatch.

use crate::game::{GameEvent, GameState};
use crate::input::{Action, key_to_action, swipe_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Event-poll budget per frame (~60 fps).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    last_frame: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Mouse-drag origin for swipe gestures.
    drag_start: Option<(u16, u16)>,
    /// Score carried by the last `GameOver` event (the engine has already
    /// zeroed its own by then).
    final_score: u32,
    /// Session-local best; never persisted.
    best_score: u32,
    /// Rows cleared by the most recent sweep, flashed by the renderer.
    flash_rows: Vec<usize>,
    /// TachyonFX fade for the row flash (created when the flash starts).
    line_flash_effect: Option<Effect>,
    /// Last time we processed the flash effect (for delta).
    line_flash_process_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(&config);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            args,
            theme,
            state,
            screen,
            paused: false,
            last_frame: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            drag_start: None,
            final_score: 0,
            best_score: 0,
            flash_rows: Vec::new(),
            line_flash_effect: None,
            line_flash_process_time: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let delta = now.duration_since(self.last_frame);
            self.last_frame = now;

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                self.state.tick(delta);
                self.dispatch_events();
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    self.final_score,
                    self.best_score,
                    &self.flash_rows,
                    &mut self.line_flash_effect,
                    &mut self.line_flash_process_time,
                    now,
                    self.args.no_animation,
                    f.area(),
                )
            })?;

            if self.line_flash_effect.as_ref().is_some_and(Effect::done) {
                self.flash_rows.clear();
                self.line_flash_effect = None;
                self.line_flash_process_time = None;
            }

            let timeout = Duration::from_millis(FRAME_MS);
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) => {
                            if self.handle_key(key) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Drain engine events into cues: terminal bell for line clears and game
    /// over (fire-and-forget), row flash as the haptic stand-in, screen
    /// transition on game over.
    fn dispatch_events(&mut self) {
        for ev in self.state.drain_events() {
            match ev {
                GameEvent::LineCleared { row } => {
                    ring_bell();
                    if !self.args.no_animation {
                        self.flash_rows.push(row);
                        self.line_flash_effect = None;
                        self.line_flash_process_time = None;
                    }
                }
                GameEvent::ScoreChanged { score, .. } => {
                    self.best_score = self.best_score.max(score);
                }
                GameEvent::GameOver { final_score } => {
                    ring_bell();
                    self.final_score = final_score;
                    self.best_score = self.best_score.max(final_score);
                    self.screen = Screen::GameOver;
                    self.repeat_state = None;
                    self.last_repeat_fire = None;
                }
            }
        }
    }

    /// The lifecycle start trigger: full engine reset, then play.
    fn start_game(&mut self) {
        self.state.restart();
        self.screen = Screen::Playing;
        self.paused = false;
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.drag_start = None;
        self.flash_rows.clear();
        self.line_flash_effect = None;
        self.line_flash_process_time = None;
        self.last_frame = Instant::now();
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::MoveLeft => self.state.move_piece(-1),
            Action::MoveRight => self.state.move_piece(1),
            Action::Rotate => self.state.rotate_piece(),
            Action::SoftDrop => self.state.drop_piece(),
            Action::Pause | Action::Start | Action::Quit | Action::None => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(action, Action::MoveLeft | Action::MoveRight | Action::SoftDrop) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);

        // Ignore OS repeats; only process the first Press. A Release ends our
        // own key repeat.
        if key.kind != KeyEventKind::Press {
            if key.kind == KeyEventKind::Release
                && self.repeat_state.map(|(a, _)| a) == Some(action)
            {
                self.repeat_state = None;
                self.last_repeat_fire = None;
            }
            return false;
        }
        if self.repeat_state.map(|(a, _)| a) == Some(action) {
            return false;
        }

        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return true,
                Action::Start => self.start_game(),
                _ => {}
            },
            Screen::Playing => {
                if self.paused {
                    match action {
                        Action::Pause | Action::Start => self.paused = false,
                        Action::Quit => return true,
                        _ => {}
                    }
                } else {
                    match action {
                        Action::Pause => self.paused = true,
                        Action::Quit => return true,
                        Action::None | Action::Start => {}
                        _ => {
                            self.apply_action(action);
                            if matches!(
                                action,
                                Action::MoveLeft | Action::MoveRight | Action::SoftDrop
                            ) {
                                self.repeat_state = Some((action, Instant::now()));
                                self.last_repeat_fire = None;
                            }
                        }
                    }
                }
            }
            Screen::GameOver => match action {
                Action::Quit => return true,
                Action::Start => self.start_game(),
                _ => {
                    if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                        self.start_game();
                    }
                }
            },
        }
        false
    }

    /// Left-button drags act as swipes: sideways to move, down to soft-drop,
    /// up to rotate.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_start = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some((sx, sy)) = self.drag_start.take() else {
                    return;
                };
                if self.screen != Screen::Playing || self.paused {
                    return;
                }
                // Board cells are two terminal columns wide; halve dx so both
                // axes are measured in cells.
                let dx = (i32::from(mouse.column) - i32::from(sx)) / 2;
                let dy = i32::from(mouse.row) - i32::from(sy);
                self.apply_action(swipe_to_action(dx, dy));
            }
            _ => {}
        }
    }
}

/// Audio-cue stand-in: the terminal bell. Best-effort, errors dropped.
fn ring_bell() {
    let mut out = std::io::stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}
