//! Canonical canvas JSON schema and conversion to/from the internal
//! [`Canvas`] model. Unknown fields are ignored on import; `type` is the
//! element kind discriminant (0=Text, 1=Image, 2=Rect, 3=Line, 4=Circle)
//! and kind-specific fields live under `props`.

use crate::error::CanvasError;
use crate::types::{
    Bounds, Canvas, Element, ElementKind, ImageFormat, ShapeKind, TextAlign,
};
use pin_panel::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CanvasDto {
    id: String,
    name: String,
    background_color: u8,
    created_time: u32,
    modified_time: u32,
    elements: Vec<ElementDto>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ElementDto {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    z_index: u8,
    visible: bool,
    props: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextProps {
    text: String,
    font_size: u8,
    color: u8,
    align: u8,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageProps {
    image_id: String,
    format: u8,
    maintain_aspect_ratio: bool,
    opacity: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShapeProps {
    fill_color: u8,
    border_color: u8,
    border_width: u8,
    filled: bool,
}

fn color_to_u8(c: Color) -> u8 {
    c.as_nibble()
}

fn color_from_u8(v: u8) -> Result<Color, CanvasError> {
    Color::try_from(v).map_err(|_| CanvasError::InvalidArgument(format!("color out of range: {v}")))
}

fn align_to_u8(a: TextAlign) -> u8 {
    match a {
        TextAlign::Left => 0,
        TextAlign::Center => 1,
        TextAlign::Right => 2,
    }
}

fn align_from_u8(v: u8) -> Result<TextAlign, CanvasError> {
    match v {
        0 => Ok(TextAlign::Left),
        1 => Ok(TextAlign::Center),
        2 => Ok(TextAlign::Right),
        other => Err(CanvasError::InvalidArgument(format!("align out of range: {other}"))),
    }
}

fn image_format_to_u8(f: ImageFormat) -> u8 {
    match f {
        ImageFormat::Bmp => 0,
        ImageFormat::Png => 1,
        ImageFormat::Jpg => 2,
    }
}

fn image_format_from_u8(v: u8) -> Result<ImageFormat, CanvasError> {
    match v {
        0 => Ok(ImageFormat::Bmp),
        1 => Ok(ImageFormat::Png),
        2 => Ok(ImageFormat::Jpg),
        other => Err(CanvasError::InvalidArgument(format!("image format out of range: {other}"))),
    }
}

const KIND_TEXT: u8 = 0;
const KIND_IMAGE: u8 = 1;
const KIND_RECT: u8 = 2;
const KIND_LINE: u8 = 3;
const KIND_CIRCLE: u8 = 4;

fn element_to_dto(e: &Element) -> Result<ElementDto, CanvasError> {
    let (kind, props) = match &e.kind {
        ElementKind::Text {
            text,
            font_size,
            color,
            align,
            bold,
            italic,
        } => (
            KIND_TEXT,
            serde_json::to_value(TextProps {
                text: text.clone(),
                font_size: *font_size,
                color: color_to_u8(*color),
                align: align_to_u8(*align),
                bold: *bold,
                italic: *italic,
            })
            .expect("text props serialize"),
        ),
        ElementKind::Image {
            image_id,
            format,
            maintain_aspect,
            opacity,
        } => (
            KIND_IMAGE,
            serde_json::to_value(ImageProps {
                image_id: image_id.clone(),
                format: image_format_to_u8(*format),
                maintain_aspect_ratio: *maintain_aspect,
                opacity: *opacity,
            })
            .expect("image props serialize"),
        ),
        ElementKind::Shape {
            shape,
            fill_color,
            border_color,
            border_width,
            filled,
        } => {
            let kind = match shape {
                ShapeKind::Rect => KIND_RECT,
                ShapeKind::Line => KIND_LINE,
                ShapeKind::Circle => KIND_CIRCLE,
            };
            (
                kind,
                serde_json::to_value(ShapeProps {
                    fill_color: color_to_u8(*fill_color),
                    border_color: color_to_u8(*border_color),
                    border_width: *border_width,
                    filled: *filled,
                })
                .expect("shape props serialize"),
            )
        }
    };

    Ok(ElementDto {
        id: e.id.clone(),
        kind,
        x: e.bounds.x,
        y: e.bounds.y,
        width: e.bounds.w,
        height: e.bounds.h,
        z_index: e.z_index,
        visible: e.visible,
        props,
    })
}

fn element_from_dto(dto: ElementDto) -> Result<Element, CanvasError> {
    let kind = match dto.kind {
        KIND_TEXT => {
            let p: TextProps = serde_json::from_value(dto.props)
                .map_err(|e| CanvasError::InvalidArgument(format!("text props: {e}")))?;
            ElementKind::Text {
                text: p.text,
                font_size: p.font_size,
                color: color_from_u8(p.color)?,
                align: align_from_u8(p.align)?,
                bold: p.bold,
                italic: p.italic,
            }
        }
        KIND_IMAGE => {
            let p: ImageProps = serde_json::from_value(dto.props)
                .map_err(|e| CanvasError::InvalidArgument(format!("image props: {e}")))?;
            ElementKind::Image {
                image_id: p.image_id,
                format: image_format_from_u8(p.format)?,
                maintain_aspect: p.maintain_aspect_ratio,
                opacity: p.opacity,
            }
        }
        KIND_RECT | KIND_LINE | KIND_CIRCLE => {
            let p: ShapeProps = serde_json::from_value(dto.props)
                .map_err(|e| CanvasError::InvalidArgument(format!("shape props: {e}")))?;
            let shape = match dto.kind {
                KIND_RECT => ShapeKind::Rect,
                KIND_LINE => ShapeKind::Line,
                _ => ShapeKind::Circle,
            };
            ElementKind::Shape {
                shape,
                fill_color: color_from_u8(p.fill_color)?,
                border_color: color_from_u8(p.border_color)?,
                border_width: p.border_width,
                filled: p.filled,
            }
        }
        other => return Err(CanvasError::InvalidArgument(format!("unknown element type: {other}"))),
    };

    Ok(Element {
        id: dto.id,
        bounds: Bounds {
            x: dto.x,
            y: dto.y,
            w: dto.width,
            h: dto.height,
        },
        z_index: dto.z_index,
        visible: dto.visible,
        kind,
    })
}

/// Parses a single element DTO, e.g. the `element` field of a
/// `POST /api/canvas/element` request body.
pub fn parse_element(value: serde_json::Value) -> Result<Element, CanvasError> {
    let dto: ElementDto =
        serde_json::from_value(value).map_err(|e| CanvasError::InvalidArgument(format!("parse element: {e}")))?;
    element_from_dto(dto)
}

pub fn export(canvas: &Canvas) -> Result<String, CanvasError> {
    let dto = CanvasDto {
        id: canvas.id.clone(),
        name: canvas.name.clone(),
        background_color: color_to_u8(canvas.background_color),
        created_time: canvas.created_time,
        modified_time: canvas.modified_time,
        elements: canvas
            .elements
            .iter()
            .map(element_to_dto)
            .collect::<Result<Vec<_>, _>>()?,
    };
    serde_json::to_string(&dto).map_err(|e| CanvasError::InvalidArgument(format!("serialize: {e}")))
}

pub fn import(json: &str) -> Result<Canvas, CanvasError> {
    let dto: CanvasDto =
        serde_json::from_str(json).map_err(|e| CanvasError::InvalidArgument(format!("parse: {e}")))?;
    Ok(Canvas {
        id: dto.id,
        name: dto.name,
        background_color: color_from_u8(dto.background_color)?,
        created_time: dto.created_time,
        modified_time: dto.modified_time,
        elements: dto
            .elements
            .into_iter()
            .map(element_from_dto)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
