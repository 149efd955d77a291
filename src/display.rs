use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chart::{ChartRenderer, Rendered, TerminalRasterizer};

/// Local chart window in the terminal.
///
/// Blocks the calling thread (run it under `spawn_blocking`). Redraws
/// every `refresh`, shows "Loading..." until two rounds exist, and
/// cancels `shutdown` when the user presses `q`, Esc or Ctrl-C. Raw
/// mode swallows SIGINT, so Ctrl-C has to be handled here.
pub fn run(
    renderer: ChartRenderer<TerminalRasterizer>,
    refresh: Duration,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let mut guard = TerminalGuard::enable()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    guard.alternate = true;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_loop(&mut terminal, &renderer, refresh, &shutdown);

    drop(guard);
    terminal.show_cursor()?;

    if let Err(e) = &res {
        warn!(error = %e, "terminal display failed");
    }
    info!("terminal display closed");
    res
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    renderer: &ChartRenderer<TerminalRasterizer>,
    refresh: Duration,
    shutdown: &CancellationToken,
) -> io::Result<()> {
    while !shutdown.is_cancelled() {
        let rendered = renderer.render();
        terminal.draw(|f| draw(f, &rendered))?;

        // Key polling doubles as the refresh timer
        if event::poll(refresh)? {
            if let Event::Key(key) = event::read()? {
                if is_quit(&key) {
                    info!("quit requested from terminal display");
                    shutdown.cancel();
                }
            }
        }
    }
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Raw mode (and the alternate screen once entered) are undone on drop,
/// including when setup fails halfway.
struct TerminalGuard {
    alternate: bool,
}

impl TerminalGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { alternate: false })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.alternate {
            if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
                warn!(error = %e, "could not leave the alternate screen");
            }
        }
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "could not restore the terminal");
        }
    }
}

fn draw(f: &mut Frame, rendered: &Rendered<Buffer>) {
    let area = f.size();
    match rendered {
        Rendered::Chart { image, .. } => blit(image, f.buffer_mut(), area),
        Rendered::NoData => {
            let placeholder = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Loading...",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("waiting for two measurement rounds  (q to quit)"),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" latency-blip "));
            f.render_widget(placeholder, area);
        }
    }
}

/// Copy the rendered chart into the frame, clipped to whatever fits.
fn blit(image: &Buffer, frame: &mut Buffer, area: Rect) {
    let width = image.area.width.min(area.width);
    let height = image.area.height.min(area.height);
    for y in 0..height {
        for x in 0..width {
            let cell = image.get(image.area.x + x, image.area.y + y).clone();
            *frame.get_mut(area.x + x, area.y + y) = cell;
        }
    }
}
