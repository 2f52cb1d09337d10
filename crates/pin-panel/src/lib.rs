//! The panel driver and the display service façade: a bit-packed
//! framebuffer, rasterization primitives, the reset/init/refresh/sleep
//! protocol, and a mutex-serialized façade with refresh-mode policy and
//! per-operation deadlines.

pub mod color;
pub mod display_service;
pub mod panel;
pub mod scheduler;
pub mod timing;

pub use color::Color;
pub use display_service::{DisplayGuard, DisplayService};
pub use panel::{Panel, RefreshMode, HEIGHT, WIDTH};
