use anyhow::Result;
use clap::Parser;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io::stdout;

use blockdrop::config::Config;
use blockdrop::game::{Cell, GameState, PieceProvider, RandomPieceProvider, ShapeKind};
use blockdrop::input::InputListener;
use blockdrop::logging;
use blockdrop::session::{self, Session, TickDriver};

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";
const INFO_WIDTH: u16 = 14;
const HELP: &str = "←→ move  ↓ drop  ↑ rotate  q quit";

// ============================================================================
// Color Mapping
// ============================================================================

fn shape_color(kind: ShapeKind) -> Color {
    match kind {
        ShapeKind::I => Color::Cyan,
        ShapeKind::O => Color::Yellow,
        ShapeKind::T => Color::Magenta,
        ShapeKind::S => Color::Green,
        ShapeKind::Z => Color::Red,
        ShapeKind::J => Color::Blue,
        ShapeKind::L => Color::Rgb(255, 165, 0),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, state: &GameState) {
    let area = frame.size();
    let grid_width = state.board.cols() as u16 * CELL_WIDTH + 2;
    let grid_height = state.board.rows() as u16 + 2;
    let board = fit(area, grid_width + INFO_WIDTH, grid_height + 1);

    let [play, help] = Layout::vertical([Constraint::Length(grid_height), Constraint::Length(1)])
        .areas(board);
    let [grid, info] =
        Layout::horizontal([Constraint::Length(grid_width), Constraint::Length(INFO_WIDTH)])
            .areas(play);

    render_grid(frame, state, grid);
    render_info(frame, state, info);
    frame.render_widget(
        Paragraph::new(HELP)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        help,
    );
}

// Centers a `width` x `height` box in `area`, clipped to its size.
fn fit(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_grid(frame: &mut Frame, state: &GameState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockdrop ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = state
        .render_grid()
        .iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => Span::raw(EMPTY_CHAR),
                    Cell::Filled(kind) => {
                        Span::styled(BLOCK_CHAR, Style::default().fg(shape_color(*kind)))
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, state: &GameState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Score ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(state.score.to_string())];
    if state.is_game_over {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "GAME OVER",
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from("q to quit"));
    }
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

// ============================================================================
// Main Loop
// ============================================================================

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    if let Some(path) = &config.log_file {
        logging::init_log_file(path, config.log_level)?;
    }

    let provider: Box<dyn PieceProvider> = match config.seed {
        Some(seed) => Box::new(RandomPieceProvider::seeded(seed)),
        None => Box::new(RandomPieceProvider::new()),
    };
    let mut session = Session::new(config.rules(), provider)?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = run(&mut session, &config);

    // Always try to restore the terminal.
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);

    result
}

fn run(session: &mut Session, config: &Config) -> Result<()> {
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let (sender, receiver) = session::channel();
    let _ticks = TickDriver::spawn(config.tick_period(), sender.clone());
    let _input = InputListener::spawn(sender);

    session.run(&receiver, |state| {
        terminal.draw(|frame| render(frame, state))?;
        Ok(())
    })
}
