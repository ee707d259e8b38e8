//! Terminal runtime.
//!
//! Renders the canvas as colored cells at the top of the terminal using
//! crossterm, ticking at a fixed frame rate. Rows below the canvas are left
//! to the harness console.

use std::io::{Write, stdout};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{self, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use parking_lot::Mutex;

use super::{Canvas, Color, FrameHandler, InitSettings, Runtime, RuntimeError, Screen};
use crate::shutdown::{is_shutdown, request_shutdown};

pub use super::headless::RESOURCE_EXTENSION;

struct TerminalState {
    screen: Screen,
    /// Last frame written to the terminal, for row diffing
    shown: Option<Screen>,
    fps: u32,
}

/// Crossterm-backed runtime.
pub struct TerminalRuntime {
    state: Mutex<Option<TerminalState>>,
}

impl TerminalRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }
}

impl Default for TerminalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the terminal however the frame loop exits.
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut out = stdout();
        queue!(out, ResetColor, cursor::Show).ok();
        out.flush().ok();
        terminal::disable_raw_mode().ok();
    }
}

impl Runtime for TerminalRuntime {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn resource_extension(&self) -> &'static str {
        RESOURCE_EXTENSION
    }

    fn init(&self, settings: &InitSettings) -> Result<(), RuntimeError> {
        let mut out = stdout();
        queue!(
            out,
            terminal::SetTitle(&settings.title),
            Clear(ClearType::All),
            cursor::Hide
        )?;
        out.flush()?;

        *self.state.lock() = Some(TerminalState {
            screen: Screen::new(settings.width, settings.height),
            shown: None,
            fps: settings.fps.max(1),
        });
        Ok(())
    }

    fn run(&self, frame: &mut dyn FrameHandler) -> Result<(), RuntimeError> {
        let fps = match self.state.lock().as_ref() {
            Some(state) => state.fps,
            None => return Err(RuntimeError::NotInitialized("terminal")),
        };

        terminal::enable_raw_mode()?;
        let _guard = RawModeGuard;

        let tick = Duration::from_secs(1) / fps;
        let mut next = Instant::now();

        while !is_shutdown() {
            poll_quit_keys()?;

            frame.update();
            if let Some(state) = self.state.lock().as_mut() {
                frame.draw(&mut state.screen);
                present(state)?;
            }

            next += tick;
            match next.checked_duration_since(Instant::now()) {
                Some(wait) => std::thread::sleep(wait),
                // Running behind: drop the backlog instead of spinning
                None => next = Instant::now(),
            }
        }

        Ok(())
    }

    fn console_row(&self) -> Option<u16> {
        self.state
            .lock()
            .as_ref()
            .map(|s| s.screen.height().saturating_add(1))
    }
}

/// Drain pending input; Esc, `q` and Ctrl+C quit.
fn poll_quit_keys() -> Result<(), RuntimeError> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            let ctrl_c = code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL);
            if matches!(code, KeyCode::Esc | KeyCode::Char('q')) || ctrl_c {
                request_shutdown();
            }
        }
    }
    Ok(())
}

/// Write rows that changed since the last frame.
fn present(state: &mut TerminalState) -> Result<(), RuntimeError> {
    let buf = render(state)?;
    if !buf.is_empty() {
        let mut out = stdout().lock();
        out.write_all(&buf)?;
        out.flush()?;
    }
    state.shown = Some(state.screen.clone());
    Ok(())
}

/// Encode changed rows as terminal commands.
fn render(state: &TerminalState) -> Result<Vec<u8>, RuntimeError> {
    let screen = &state.screen;
    let width = usize::from(screen.width());
    let mut buf = Vec::new();

    for (y, row) in screen.cells().chunks(width.max(1)).enumerate() {
        let unchanged = state.shown.as_ref().is_some_and(|shown| {
            shown.cells().chunks(width.max(1)).nth(y) == Some(row)
        });
        if unchanged {
            continue;
        }

        let row_index = u16::try_from(y).unwrap_or(u16::MAX);
        queue!(buf, cursor::MoveTo(0, row_index))?;
        let mut pen: Option<(Color, Color)> = None;
        for cell in row {
            if pen != Some((cell.fg, cell.bg)) {
                queue!(
                    buf,
                    SetForegroundColor(to_term_color(cell.fg)),
                    SetBackgroundColor(to_term_color(cell.bg))
                )?;
                pen = Some((cell.fg, cell.bg));
            }
            queue!(buf, Print(cell.ch))?;
        }
        queue!(buf, ResetColor)?;
    }

    Ok(buf)
}

fn to_term_color(color: Color) -> style::Color {
    let (r, g, b) = match color {
        Color::Black => (0x00, 0x00, 0x00),
        Color::Navy => (0x1d, 0x2b, 0x53),
        Color::Purple => (0x7e, 0x25, 0x53),
        Color::Green => (0x00, 0x87, 0x51),
        Color::Brown => (0xab, 0x52, 0x36),
        Color::DarkBlue => (0x3b, 0x5d, 0xc9),
        Color::LightBlue => (0x9c, 0xc3, 0xff),
        Color::White => (0xf0, 0xf0, 0xf0),
        Color::Red => (0xe0, 0x22, 0x3a),
        Color::Orange => (0xff, 0xa3, 0x00),
        Color::Yellow => (0xff, 0xec, 0x27),
        Color::Lime => (0x00, 0xe4, 0x36),
        Color::Cyan => (0x29, 0xad, 0xff),
        Color::Gray => (0x83, 0x76, 0x9c),
        Color::Pink => (0xff, 0x77, 0xa8),
        Color::Peach => (0xff, 0xcc, 0xaa),
    };
    style::Color::Rgb { r, g, b }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_requires_init() {
        struct Nop;
        impl FrameHandler for Nop {
            fn update(&mut self) {}
            fn draw(&mut self, _: &mut dyn Canvas) {}
        }

        let runtime = TerminalRuntime::new();
        assert!(runtime.console_row().is_none());
        assert!(matches!(
            runtime.run(&mut Nop),
            Err(RuntimeError::NotInitialized("terminal"))
        ));
    }

    #[test]
    fn test_render_skips_unchanged_rows() {
        let mut state = TerminalState {
            screen: Screen::new(4, 2),
            shown: None,
            fps: 30,
        };
        let full = String::from_utf8(render(&state).unwrap()).unwrap();
        assert!(full.contains("\u{1b}[1;1H"));
        assert!(full.contains("\u{1b}[2;1H"));

        state.shown = Some(state.screen.clone());
        assert!(render(&state).unwrap().is_empty());

        state.screen.text(0, 1, "hi", Color::Red, None);
        let diff = String::from_utf8(render(&state).unwrap()).unwrap();
        assert!(!diff.contains("\u{1b}[1;1H"));
        assert!(diff.contains("\u{1b}[2;1H"));
        assert!(diff.contains('h'));
    }

    #[test]
    fn test_palette_is_distinct() {
        let colors: std::collections::HashSet<_> = (0..16u8)
            .map(|i| format!("{:?}", to_term_color(Color::from_index(i))))
            .collect();
        assert_eq!(colors.len(), 16);
    }
}
