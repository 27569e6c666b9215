//! Frame presentation: one buffer, one write, one flush.
//!
//! A frame is the cursor placement prefix plus the complete sixel payload,
//! assembled in a reused buffer and handed to the session in a single
//! [`write`](TerminalSession::write) followed by a single
//! [`flush`](TerminalSession::flush). The terminal never sees a partial
//! frame, and input echo cannot land inside one.

use std::io;

use sixterm_backend::TerminalSession;
use sixterm_backend::sequences::{
    self, CURSOR_HOME, CURSOR_RESTORE, CURSOR_SAVE, write_cursor_position, write_cursor_up,
};
use sixterm_render::{ColorPalette, PixelCanvas, SixelEncoder, band_count};

/// Where each frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Below the cursor position saved by [`reserve_inline_area`].
    #[default]
    Inline,
    /// At a fixed 1-indexed cell.
    At { row: u16, col: u16 },
    /// At the top-left corner (alternate screen).
    Home,
}

/// Terminal text rows a sixel image of `height` pixels occupies, assuming
/// one band per row.
#[must_use]
pub const fn sixel_rows(height: u32) -> u32 {
    band_count(height)
}

/// Rows to reserve for an inline image: enough for the image plus one, but
/// no more than a third of the terminal (and never fewer than 8).
#[must_use]
pub fn inline_rows(image_height: u32, terminal_rows: u16) -> u16 {
    let wanted = sixel_rows(image_height).saturating_add(1);
    let cap = u32::from((terminal_rows / 3).max(8));
    u16::try_from(wanted.min(cap)).unwrap_or(u16::MAX)
}

/// Scroll room for an inline image and save the cursor at its top.
///
/// Writes `rows` newlines, moves back up, and saves the cursor, so frames
/// presented with [`Placement::Inline`] always start at the same spot.
/// Returns the number of rows reserved.
pub fn reserve_inline_area<S: TerminalSession + ?Sized>(
    session: &mut S,
    image_height: u32,
) -> io::Result<u16> {
    let (_, terminal_rows) = session.size()?;
    let rows = inline_rows(image_height, terminal_rows);
    let mut buf = vec![b'\n'; usize::from(rows)];
    write_cursor_up(rows, &mut buf)?;
    buf.extend_from_slice(CURSOR_SAVE);
    session.write(&buf)?;
    session.flush()?;
    tracing::debug!(rows, terminal_rows, "inline area reserved");
    Ok(rows)
}

/// Encodes canvases and writes them as whole frames.
#[derive(Debug, Default)]
pub struct FramePresenter {
    placement: Placement,
    encoder: SixelEncoder,
    buf: Vec<u8>,
    frames: u64,
    bytes: u64,
}

impl FramePresenter {
    #[must_use]
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: SixelEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    /// Frames written so far.
    #[must_use]
    pub const fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Bytes written so far, prefixes included.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Encode `canvas` and write it as one frame. Returns the frame size.
    pub fn present<S: TerminalSession + ?Sized>(
        &mut self,
        session: &mut S,
        canvas: &PixelCanvas,
        palette: &ColorPalette,
    ) -> io::Result<usize> {
        self.buf.clear();
        match self.placement {
            Placement::Inline => {
                self.buf.extend_from_slice(CURSOR_RESTORE);
                self.buf.push(b'\n');
            }
            Placement::At { row, col } => write_cursor_position(row, col, &mut self.buf)?,
            Placement::Home => self.buf.extend_from_slice(CURSOR_HOME),
        }
        self.encoder.encode_into(canvas, palette, &mut self.buf);
        session.write(&self.buf)?;
        session.flush()?;
        self.frames += 1;
        self.bytes += self.buf.len() as u64;
        tracing::trace!(
            frame = self.frames,
            bytes = self.buf.len(),
            placement = ?self.placement,
            "frame presented"
        );
        Ok(self.buf.len())
    }

    /// Clear the screen before the next frame (alternate-screen apps).
    pub fn clear<S: TerminalSession + ?Sized>(&mut self, session: &mut S) -> io::Result<()> {
        session.write(sequences::CLEAR_SCREEN)?;
        session.flush()
    }
}
