//! Layout and drawing: menu, playfield, sidebar, pause, game over, line flash.

use crate::app::Screen;
use crate::game::GameState;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position as LayoutPosition, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is two terminal columns wide and one row tall.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 22;
/// Duration of the line-clear flash fade in ms.
const LINE_FLASH_MS: u32 = 350;

/// Playfield size in terminal cells (board + border) for given grid dimensions.
fn playfield_pixel_size(width: u16, height: u16) -> (u16, u16) {
    (width * CELL_WIDTH + 2, height * CELL_HEIGHT + 2)
}

/// Board inner rect (no border) for given area and state; matches draw_game layout.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (pw, ph) = playfield_pixel_size(state.grid.width as u16, state.grid.height as u16);
    let total_w = pw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(ph) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (state.grid.width as u16 * CELL_WIDTH).min(area.width.saturating_sub(2)),
        height: (state.grid.height as u16 * CELL_HEIGHT).min(area.height.saturating_sub(2)),
    }
}

/// Draw current screen (menu, game, game over), with optional pause overlay.
/// While `flash_rows` is non-empty and animation is on, applies the TachyonFX
/// flash to those rows and updates `line_flash_effect` / `line_flash_process_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    final_score: u32,
    best_score: u32,
    flash_rows: &[usize],
    line_flash_effect: &mut Option<Effect>,
    line_flash_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
    area: Rect,
) {
    match screen {
        Screen::Menu => draw_menu(frame, theme, area),
        Screen::Playing => {
            draw_game(frame, state, theme, best_score, area);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !flash_rows.is_empty() && !no_animation {
                apply_line_flash(
                    frame,
                    state,
                    flash_rows,
                    area,
                    line_flash_effect,
                    line_flash_process_time,
                    now,
                );
            }
        }
        Screen::GameOver => draw_game_over(frame, theme, final_score, best_score, area),
    }
}

/// Create or update the line-clear flash and process it (fade the cleared
/// rows back in from white).
fn apply_line_flash(
    frame: &mut Frame,
    state: &GameState,
    flash_rows: &[usize],
    area: Rect,
    line_flash_effect: &mut Option<Effect>,
    line_flash_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = line_flash_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *line_flash_process_time = Some(now);

    if line_flash_effect.is_none() {
        let mut flashing = HashSet::new();
        for &row in flash_rows {
            let ry = board.y + (row as u16) * CELL_HEIGHT;
            for rx in board.x..board.x + board.width {
                flashing.insert((rx, ry));
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: LayoutPosition| {
            flashing.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (LINE_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board);
        *line_flash_effect = Some(effect);
    }

    if let Some(effect) = line_flash_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 44u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Neon ", Style::default().fg(theme.pieces[0]).bold()),
        Span::styled(" tris ", Style::default().fg(theme.pieces[1]).bold()),
    ]);

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " Stack pieces, clear rows, keep up. ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " [ ENTER / SPACE — START ] ",
            Style::default().fg(Color::Black).bg(theme.title).bold(),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↔ ", Style::default().fg(theme.pieces[6])),
            Span::from("MOVE   "),
            Span::styled(" ↑ ", Style::default().fg(theme.pieces[6])),
            Span::from("ROTATE   "),
            Span::styled(" ↓ ", Style::default().fg(theme.pieces[6])),
            Span::from("DROP"),
        ]),
        Line::from(Span::styled(
            " mouse swipes work too ",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(theme.pieces[0]),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, theme: &Theme, final_score: u32, best_score: u32, area: Rect) {
    let popup_w = 32u16;
    let popup_h = 10u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", final_score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", best_score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Neontris ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: playfield + sidebar; use full area and center the board.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, best_score: u32, area: Rect) {
    let (pw, ph) = playfield_pixel_size(state.grid.width as u16, state.grid.height as u16);
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);

    let (playfield_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(vert_chunks[1]);
        (inner[0], inner[1])
    };

    draw_playfield(frame, state, theme, playfield_area);
    draw_sidebar(frame, state, theme, best_score, sidebar_area);
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Neontris ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: (state.grid.width as u16 * CELL_WIDTH).min(inner.width),
        height: (state.grid.height as u16 * CELL_HEIGHT).min(inner.height),
    };

    let buf = frame.buffer_mut();

    // Settled material; cell value picks the colour.
    for y in 0..state.grid.height {
        for x in 0..state.grid.width {
            let v = state.grid.get(x, y).unwrap_or(0);
            let color = if v != 0 { theme.piece_color(v) } else { theme.bg };
            paint_cell(buf, board, x as i32, y as i32, color);
        }
    }

    // Falling piece, drawn at its eased render row.
    let piece = &state.piece;
    let vy = piece.visual_y.round() as i32;
    for (dy, row) in piece.shape.iter().enumerate() {
        for (dx, &v) in row.iter().enumerate() {
            if v != 0 {
                paint_cell(
                    buf,
                    board,
                    piece.x + dx as i32,
                    vy + dy as i32,
                    theme.piece_color(v),
                );
            }
        }
    }
}

/// Paint one grid cell (two terminal columns) if it lies inside the board.
fn paint_cell(buf: &mut ratatui::buffer::Buffer, board: Rect, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 {
        return;
    }
    let rx = board.x + (x as u16) * CELL_WIDTH;
    let ry = board.y + (y as u16) * CELL_HEIGHT;
    if rx >= board.x + board.width || ry >= board.y + board.height {
        return;
    }
    for cx in rx..(rx + CELL_WIDTH).min(board.x + board.width) {
        buf[(cx, ry)].set_symbol(" ").set_style(Style::default().bg(color));
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, best_score: u32, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Status ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let value_style = Style::default().fg(theme.main_fg);
    let label_style = Style::default().fg(theme.inactive_fg);
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" Score ", label_style),
            Span::styled(format!("{:>10}", state.score), value_style.bold()),
        ]),
        Line::from(vec![
            Span::styled(" Level ", label_style),
            Span::styled(format!("{:>10}", state.level), value_style),
        ]),
        Line::from(vec![
            Span::styled(" Lines ", label_style),
            Span::styled(format!("{:>10}", state.lines_cleared), value_style),
        ]),
        Line::from(vec![
            Span::styled(" Best  ", label_style),
            Span::styled(format!("{:>10}", best_score), value_style),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Piece ", label_style),
            Span::styled(format!("{:>10}", state.piece.kind.name()), value_style),
        ]),
        Line::from(vec![
            Span::styled(" Speed ", label_style),
            Span::styled(
                format!("{:>8}ms", state.drop_interval().as_millis()),
                value_style,
            ),
        ]),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(" ↔ move    ↑ rotate", label_style)),
        Line::from(Span::styled(" ↓ drop    P pause", label_style)),
        Line::from(Span::styled(" Q quit", label_style)),
    ];
    Paragraph::new(lines).render(inner, frame.buffer_mut());
}
