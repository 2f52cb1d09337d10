//! The canvas scene model and persistence engine: element/canvas types,
//! the canonical JSON wire schema, deterministic rasterization into a
//! panel framebuffer, and [`engine::CanvasEngine`]'s
//! CRUD-over-[`pin_config::KvStore`] orchestration.

pub mod engine;
pub mod error;
pub mod json;
pub mod render;
pub mod types;

pub use engine::CanvasEngine;
pub use error::CanvasError;
pub use types::{
    Bounds, Canvas, Element, ElementKind, ImageFormat, ImageStoreEntry, ShapeKind, TextAlign,
    MAX_CANVAS_ID_LEN, MAX_CANVAS_NAME_LEN, MAX_ELEMENTS, MAX_ELEMENT_ID_LEN, MAX_IMAGE_BYTES,
    MAX_IMAGE_ID_LEN, MAX_TEXT_LEN,
};
