//! App loop drivers.
//!
//! An [`App`] owns its state and palette; the drivers own the session, the
//! canvas and the presenter. Each iteration drains input, advances time,
//! renders if something changed and the render interval has passed, then
//! sleeps briefly. The session is always shut down on the way out.
//!
//! Two scheduling models are offered:
//!
//! - [`run_threaded`]: a background [`InputThread`] decodes input; the loop
//!   drains its queue without blocking.
//! - [`run_cooperative`]: one thread alternates short input polls with
//!   rendering.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use sixterm_backend::{SessionError, SessionGuard, TerminalSession};
use sixterm_core::{Event, TerminalConfig};
use sixterm_render::{ColorPalette, PixelCanvas};

use crate::input_thread::InputThread;
use crate::presenter::{FramePresenter, Placement, reserve_inline_area};
use crate::pump::CooperativePump;

/// Sleep between iterations of the threaded loop.
pub const THREADED_FRAME_SLEEP: Duration = Duration::from_millis(16);

/// Target iteration length of the cooperative loop.
pub const COOPERATIVE_FRAME_BUDGET: Duration = Duration::from_millis(5);

/// The cooperative loop always yields at least this long.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// What the loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    /// Nothing visible changed.
    #[default]
    Continue,
    /// Render a new frame when the render interval allows.
    Redraw,
    /// Leave the loop and restore the terminal.
    Quit,
}

/// An application driven by [`run_threaded`] or [`run_cooperative`].
pub trait App {
    /// Canvas size in pixels. Checked before every render.
    fn canvas_size(&self) -> (u32, u32);

    /// Colors the canvas indices refer to.
    fn palette(&self) -> &ColorPalette;

    /// React to one input event.
    fn handle_event(&mut self, event: Event) -> Control;

    /// Advance time by `dt`. Return `true` if the next frame differs.
    fn tick(&mut self, dt: Duration) -> bool {
        let _ = dt;
        false
    }

    /// Draw the current state. The canvas is reset to index 0 first.
    fn render(&self, canvas: &mut PixelCanvas);
}

/// Counters reported when a loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Frames written to the terminal.
    pub frames: u64,
    /// Input events handed to the app.
    pub events: u64,
    /// Bytes written by the presenter.
    pub bytes: u64,
}

// ── Frame scheduling ─────────────────────────────────────────────────────

/// Render state shared by both drivers.
struct FrameScheduler {
    presenter: FramePresenter,
    canvas: PixelCanvas,
    min_interval: Duration,
    last_render: Option<Instant>,
    last_tick: Instant,
    dirty: bool,
    events: u64,
}

impl FrameScheduler {
    /// Prepare the screen for the first frame.
    ///
    /// Alternate-screen sessions are cleared and draw from the home
    /// position; inline sessions reserve rows below the cursor.
    fn start<S, A>(session: &mut S, app: &A, config: &TerminalConfig) -> io::Result<Self>
    where
        S: TerminalSession + ?Sized,
        A: App + ?Sized,
    {
        let (width, height) = app.canvas_size();
        let presenter = if config.alternate_screen {
            let mut presenter = FramePresenter::new(Placement::Home);
            presenter.clear(session)?;
            presenter
        } else {
            reserve_inline_area(session, height)?;
            FramePresenter::new(Placement::Inline)
        };
        Ok(Self {
            presenter,
            canvas: PixelCanvas::new(width, height),
            min_interval: config.min_render_interval,
            last_render: None,
            last_tick: Instant::now(),
            dirty: true,
            events: 0,
        })
    }

    /// Hand one event to the app. Returns `true` on quit.
    fn dispatch<A: App + ?Sized>(&mut self, app: &mut A, event: Event) -> bool {
        self.events += 1;
        match app.handle_event(event) {
            Control::Continue => false,
            Control::Redraw => {
                self.dirty = true;
                false
            }
            Control::Quit => {
                tracing::debug!(?event, "quit requested");
                true
            }
        }
    }

    fn tick<A: App + ?Sized>(&mut self, app: &mut A) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        if app.tick(dt) {
            self.dirty = true;
        }
    }

    /// Render and present if a change is pending and the interval allows.
    fn render_if_due<S, A>(&mut self, session: &mut S, app: &A) -> io::Result<bool>
    where
        S: TerminalSession + ?Sized,
        A: App + ?Sized,
    {
        if !self.dirty {
            return Ok(false);
        }
        let now = Instant::now();
        if self
            .last_render
            .is_some_and(|last| now.duration_since(last) < self.min_interval)
        {
            return Ok(false);
        }
        let (width, height) = app.canvas_size();
        if (width, height) != (self.canvas.width(), self.canvas.height()) {
            self.canvas.resize(width, height, 0);
        } else {
            self.canvas.fill(0);
        }
        app.render(&mut self.canvas);
        self.presenter.present(session, &self.canvas, app.palette())?;
        self.last_render = Some(now);
        self.dirty = false;
        Ok(true)
    }

    fn stats(&self) -> RunStats {
        RunStats {
            frames: self.presenter.frames_presented(),
            events: self.events,
            bytes: self.presenter.bytes_written(),
        }
    }
}

// ── Drivers ──────────────────────────────────────────────────────────────

/// Run `app` with a background input thread until it quits.
///
/// The session enters raw mode with the features `config` asks for and is
/// restored before this returns, whether the loop ended normally or not.
///
/// # Errors
///
/// A restore failure takes precedence over a loop failure; a loop failure
/// is logged if both happen.
pub fn run_threaded<S, A>(
    session: S,
    app: &mut A,
    config: &TerminalConfig,
) -> Result<RunStats, SessionError>
where
    S: TerminalSession,
    A: App + ?Sized,
{
    let mut guard = SessionGuard::enter(session, config)?;
    let result = drive_threaded(&mut *guard, app, config);
    conclude(guard, result)
}

/// Run `app` on the calling thread only, until it quits.
///
/// Same session handling as [`run_threaded`].
pub fn run_cooperative<S, A>(
    session: S,
    app: &mut A,
    config: &TerminalConfig,
) -> Result<RunStats, SessionError>
where
    S: TerminalSession,
    A: App + ?Sized,
{
    let mut guard = SessionGuard::enter(session, config)?;
    let result = drive_cooperative(&mut *guard, app, config);
    conclude(guard, result)
}

fn conclude<S: TerminalSession>(
    guard: SessionGuard<S>,
    result: io::Result<RunStats>,
) -> Result<RunStats, SessionError> {
    match (result, guard.finish()) {
        (Ok(stats), Ok(())) => {
            tracing::info!(
                frames = stats.frames,
                events = stats.events,
                bytes = stats.bytes,
                "app loop finished"
            );
            Ok(stats)
        }
        (Err(err), Ok(())) => Err(SessionError::Io(err)),
        (Ok(_), Err(restore)) => Err(restore),
        (Err(err), Err(restore)) => {
            tracing::error!(error = %err, "app loop failed before restore");
            Err(restore)
        }
    }
}

fn drive_threaded<S, A>(session: &mut S, app: &mut A, config: &TerminalConfig) -> io::Result<RunStats>
where
    S: TerminalSession + ?Sized,
    A: App + ?Sized,
{
    let mut frames = FrameScheduler::start(session, app, config)?;
    let input = InputThread::spawn(session.try_clone_input()?, config)?;
    frames.render_if_due(session, app)?;
    loop {
        if input.drain().any(|event| frames.dispatch(app, event)) {
            break;
        }
        if let Some(err) = input.check_error() {
            // Events sent before the failure are already queued.
            if input.drain().any(|event| frames.dispatch(app, event)) {
                break;
            }
            return Err(err);
        }
        frames.tick(app);
        frames.render_if_due(session, app)?;
        thread::sleep(THREADED_FRAME_SLEEP);
    }
    if !input.stop() {
        tracing::debug!("input thread detached at shutdown");
    }
    Ok(frames.stats())
}

fn drive_cooperative<S, A>(
    session: &mut S,
    app: &mut A,
    config: &TerminalConfig,
) -> io::Result<RunStats>
where
    S: TerminalSession + ?Sized,
    A: App + ?Sized,
{
    let mut frames = FrameScheduler::start(session, app, config)?;
    let pump = CooperativePump::new();
    let mut events = Vec::new();
    frames.render_if_due(session, app)?;
    loop {
        let started = Instant::now();
        events.clear();
        pump.pump(session, &mut events)?;
        if events.drain(..).any(|event| frames.dispatch(app, event)) {
            break;
        }
        frames.tick(app);
        frames.render_if_due(session, app)?;
        let remaining = COOPERATIVE_FRAME_BUDGET.saturating_sub(started.elapsed());
        thread::sleep(remaining.max(MIN_SLEEP));
    }
    Ok(frames.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixterm_backend::{SessionFeatures, write_cleanup_sequence};
    use sixterm_core::KeyEvent;
    use sixterm_tty::HeadlessSession;
    use std::cell::Cell;

    /// Toggles a dot on `r`, counts ticks and renders.
    struct Dot {
        palette: ColorPalette,
        lit: bool,
        ticks: u32,
        renders: Cell<u32>,
    }

    impl Dot {
        fn new() -> Self {
            let mut palette = ColorPalette::new();
            palette.register("background", 0, 0, 0).unwrap();
            palette.register("dot", 255, 200, 0).unwrap();
            Self {
                palette,
                lit: false,
                ticks: 0,
                renders: Cell::new(0),
            }
        }
    }

    impl App for Dot {
        fn canvas_size(&self) -> (u32, u32) {
            (12, 12)
        }

        fn palette(&self) -> &ColorPalette {
            &self.palette
        }

        fn handle_event(&mut self, event: Event) -> Control {
            match event.as_key() {
                Some(key) if key.is_quit() => Control::Quit,
                Some(KeyEvent::Char('r')) => {
                    self.lit = !self.lit;
                    Control::Redraw
                }
                _ => Control::Continue,
            }
        }

        fn tick(&mut self, _dt: Duration) -> bool {
            self.ticks += 1;
            false
        }

        fn render(&self, canvas: &mut PixelCanvas) {
            self.renders.set(self.renders.get() + 1);
            if self.lit {
                canvas.set(6, 6, 1);
            }
        }
    }

    fn config() -> TerminalConfig {
        TerminalConfig {
            escape_timeout: Duration::from_millis(5),
            input_poll_interval: Duration::from_millis(10),
            min_render_interval: Duration::ZERO,
            mouse: true,
            alternate_screen: false,
            ..TerminalConfig::default()
        }
    }

    fn cleanup_for(config: &TerminalConfig) -> Vec<u8> {
        let features = SessionFeatures {
            cursor_hidden: true,
            alternate_screen: config.alternate_screen,
            mouse_capture: config.mouse,
        };
        let mut buf = Vec::new();
        write_cleanup_sequence(&features, &mut buf).unwrap();
        buf
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn threaded_quits_and_restores() {
        let config = config();
        let session = HeadlessSession::new(80, 24);
        let output = session.output();
        session.input().push(b"q");
        let mut app = Dot::new();
        let stats = run_threaded(session, &mut app, &config).unwrap();

        assert_eq!(stats.events, 1);
        assert_eq!(stats.frames, 1);
        assert_eq!(app.renders.get(), 1);
        let bytes = output.bytes();
        assert!(contains(&bytes, b"\x1b[s"));
        assert!(contains(&bytes, b"\x1b[u\n\x1bPq"));
        assert!(bytes.ends_with(&cleanup_for(&config)));
        assert_eq!(output.raw_transitions(), (1, 1));
    }

    #[test]
    fn cooperative_quits_and_restores() {
        let config = config();
        let session = HeadlessSession::new(80, 24);
        let output = session.output();
        session.input().push(b"xq");
        let mut app = Dot::new();
        let stats = run_cooperative(session, &mut app, &config).unwrap();

        assert_eq!(stats.events, 2);
        assert_eq!(stats.frames, 1);
        assert!(stats.bytes > 0);
        assert!(output.bytes().ends_with(&cleanup_for(&config)));
        assert_eq!(output.raw_transitions(), (1, 1));
    }

    #[test]
    fn redraw_renders_a_new_frame() {
        let config = config();
        let session = HeadlessSession::new(80, 24);
        let input = session.input();
        input.push(b"r");
        let pusher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(80));
            input.push(b"q");
        });
        let mut app = Dot::new();
        let stats = run_cooperative(session, &mut app, &config).unwrap();
        pusher.join().unwrap();

        assert_eq!(stats.frames, 2);
        assert_eq!(app.renders.get(), 2);
        assert!(app.lit);
        assert!(app.ticks > 0);
    }

    #[test]
    fn renders_are_rate_limited() {
        let config = TerminalConfig {
            min_render_interval: Duration::from_secs(3600),
            ..config()
        };
        let session = HeadlessSession::new(80, 24);
        let input = session.input();
        input.push(b"r");
        let pusher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            input.push(b"rr");
            thread::sleep(Duration::from_millis(40));
            input.push(b"q");
        });
        let mut app = Dot::new();
        let stats = run_threaded(session, &mut app, &config).unwrap();
        pusher.join().unwrap();

        assert_eq!(stats.events, 4);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn alternate_screen_draws_from_home() {
        let config = TerminalConfig {
            alternate_screen: true,
            ..config()
        };
        let session = HeadlessSession::new(80, 24);
        let output = session.output();
        session.input().push(b"q");
        let mut app = Dot::new();
        run_cooperative(session, &mut app, &config).unwrap();

        let bytes = output.bytes();
        assert!(contains(&bytes, b"\x1b[2J"));
        assert!(contains(&bytes, b"\x1b[H\x1bPq"));
        assert!(!contains(&bytes, b"\x1b[s"));
        assert!(bytes.ends_with(&cleanup_for(&config)));
    }

    #[test]
    fn works_through_trait_objects() {
        let config = config();
        let session = HeadlessSession::new(80, 24);
        session.input().push(b"q");
        let boxed: Box<dyn TerminalSession> = Box::new(session);
        let mut app = Dot::new();
        let app: &mut dyn App = &mut app;
        let stats = run_cooperative(boxed, app, &config).unwrap();
        assert_eq!(stats.events, 1);
    }
}
