//! The canvas scene model: a persisted, z-ordered sequence of elements,
//! with an exhaustively matched enum distinguishing element kinds rather
//! than a discriminant-plus-union pair.

use pin_panel::Color;

pub const MAX_ELEMENTS: usize = 50;
pub const MAX_CANVAS_ID_LEN: usize = 31;
pub const MAX_CANVAS_NAME_LEN: usize = 63;
pub const MAX_ELEMENT_ID_LEN: usize = 31;
pub const MAX_TEXT_LEN: usize = 511;
pub const MAX_IMAGE_ID_LEN: usize = 31;
pub const MAX_IMAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Bmp,
    Png,
    Jpg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Line,
    Circle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

impl Bounds {
    pub fn center(&self) -> (i32, i32) {
        (
            self.x as i32 + self.w as i32 / 2,
            self.y as i32 + self.h as i32 / 2,
        )
    }

    pub fn top_left(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }

    pub fn bottom_right(&self) -> (i32, i32) {
        (self.x as i32 + self.w as i32 - 1, self.y as i32 + self.h as i32 - 1)
    }
}

/// Per-kind fields. `bounds`/`z_index`/`visible` live on [`Element`] itself,
/// per the Design Notes: keep them at the element level, not duplicated
/// inside each variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text {
        text: String,
        font_size: u8,
        color: Color,
        align: TextAlign,
        bold: bool,
        italic: bool,
    },
    Image {
        image_id: String,
        format: ImageFormat,
        maintain_aspect: bool,
        opacity: u8,
    },
    Shape {
        shape: ShapeKind,
        fill_color: Color,
        border_color: Color,
        border_width: u8,
        filled: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub bounds: Bounds,
    pub z_index: u8,
    pub visible: bool,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub id: String,
    pub name: String,
    pub background_color: Color,
    pub created_time: u32,
    pub modified_time: u32,
    pub elements: Vec<Element>,
}

impl Canvas {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            background_color: Color::White,
            created_time: now,
            modified_time: now,
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageStoreEntry {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub size: u32,
    pub stored_time: u32,
}
