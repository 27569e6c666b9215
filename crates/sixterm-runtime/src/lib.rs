#![forbid(unsafe_code)]

//! sixterm runtime
//!
//! Ties sessions, the input decoder and the sixel encoder into a running
//! application.
//!
//! # Key Components
//!
//! - [`App`] - Trait for application state, input handling and drawing
//! - [`run_threaded`] / [`run_cooperative`] - Loop drivers for the two
//!   scheduling models
//! - [`InputThread`] - Background reader feeding a FIFO event queue
//! - [`CooperativePump`] - Short-timeout polling on the render thread
//! - [`FramePresenter`] - Whole-frame writes with inline or positioned
//!   placement
//! - [`stop_pair`] - Cooperative stop signal for background work
//!
//! # Scheduling models
//!
//! With an input thread, decoding never delays a frame and the render loop
//! drains events without blocking. The cooperative model keeps everything on
//! one thread and polls input with a 1 ms timeout between renders. Both
//! deliver events in decode order and write each frame with a single
//! write and flush.

pub mod app;
pub mod input_thread;
pub mod presenter;
pub mod pump;
pub mod stop;

pub use app::{
    App, COOPERATIVE_FRAME_BUDGET, Control, RunStats, THREADED_FRAME_SLEEP, run_cooperative,
    run_threaded,
};
pub use input_thread::InputThread;
pub use presenter::{FramePresenter, Placement, inline_rows, reserve_inline_area, sixel_rows};
pub use pump::{CooperativePump, DEFAULT_MAX_EVENTS, DEFAULT_STEP_TIMEOUT};
pub use stop::{StopHandle, StopToken, stop_pair};
