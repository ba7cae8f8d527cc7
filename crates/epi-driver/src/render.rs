//! Terminal rendering of published frames.

use epi_core::CellState;
use epi_world::{Frame, Observer};
use std::io::{self, Write};
use tracing::warn;

fn glyph(state: CellState) -> char {
    match state {
        CellState::Susceptible => '.',
        CellState::Infected => '#',
        CellState::Recovered => 'o',
    }
}

/// Draws each frame as a block of glyphs followed by a counts line
pub struct TerminalRenderer<W> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        let mut text = String::with_capacity(frame.cells.len() * 2 + 64);
        for row in frame.rows() {
            for state in row {
                text.push(glyph(*state));
                text.push(' ');
            }
            text.pop();
            text.push('\n');
        }
        text.push_str(&format!(
            "step {:>3} | S {:>3}  I {:>3}  R {:>3}\n\n",
            frame.step, frame.counts.susceptible, frame.counts.infected, frame.counts.recovered
        ));

        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> Observer for TerminalRenderer<W> {
    fn on_frame(&mut self, frame: &Frame) {
        if let Err(e) = self.draw(frame) {
            warn!("Failed to render frame {}: {}", frame.step, e);
        }
    }
}
