//! Deterministic rasterization of a [`Canvas`] into a panel framebuffer.

use crate::types::{Canvas, Element, ElementKind, ShapeKind, TextAlign};
use pin_bus::PanelBus;
use pin_panel::Panel;
use pin_text::grapheme_count;

/// Render `canvas` into `panel`: fills the background, then draws elements
/// in ascending `z_index` order (stable for ties), skipping invisible ones.
/// Bounds are clipped at draw time by the panel's own pixel primitives,
/// never at store time.
pub fn render<B: PanelBus>(canvas: &Canvas, panel: &mut Panel<B>) {
    panel.clear(canvas.background_color);

    let mut order: Vec<&Element> = canvas.elements.iter().filter(|e| e.visible).collect();
    order.sort_by_key(|e| e.z_index);

    for element in order {
        render_element(element, panel);
    }
}

fn render_element<B: PanelBus>(element: &Element, panel: &mut Panel<B>) {
    let b = &element.bounds;
    let (x, y, w, h) = (b.x as i32, b.y as i32, b.w as i32, b.h as i32);

    match &element.kind {
        ElementKind::Text {
            text,
            font_size,
            color,
            align,
            ..
        } => render_text(panel, x, y, w, *font_size, *color, *align, text),
        ElementKind::Image { .. } => render_image_placeholder(panel, x, y, w, h),
        ElementKind::Shape {
            shape,
            fill_color,
            border_color,
            border_width,
            filled,
        } => render_shape(panel, b, *shape, *fill_color, *border_color, *border_width, *filled),
    }
}

/// Placeholder text rendering: a filled rectangle per grapheme cluster,
/// `font_size/2 x font_size` cells, honoring alignment inside `bounds`.
/// Real font rendering may replace this but must preserve the API.
fn render_text<B: PanelBus>(
    panel: &mut Panel<B>,
    x: i32,
    y: i32,
    w: i32,
    font_size: u8,
    color: pin_panel::Color,
    align: TextAlign,
    text: &str,
) {
    let cell_w = (font_size as i32 / 2).max(1);
    let cell_h = font_size as i32;
    let count = grapheme_count(text) as i32;
    if count == 0 {
        return;
    }
    let run_width = cell_w * count;
    let slack = (w - run_width).max(0);
    let start_x = match align {
        TextAlign::Left => x,
        TextAlign::Center => x + slack / 2,
        TextAlign::Right => x + slack,
    };
    for i in 0..count {
        panel.draw_rect(start_x + cell_w * i, y, cell_w, cell_h, color, true);
    }
}

/// Outlined rectangle with both diagonals, drawn in place of an image
/// when decoding is unavailable.
fn render_image_placeholder<B: PanelBus>(panel: &mut Panel<B>, x: i32, y: i32, w: i32, h: i32) {
    let color = pin_panel::Color::Black;
    panel.draw_rect(x, y, w, h, color, false);
    panel.draw_line(x, y, x + w - 1, y + h - 1, color);
    panel.draw_line(x + w - 1, y, x, y + h - 1, color);
}

fn render_shape<B: PanelBus>(
    panel: &mut Panel<B>,
    bounds: &crate::types::Bounds,
    shape: ShapeKind,
    fill_color: pin_panel::Color,
    border_color: pin_panel::Color,
    border_width: u8,
    filled: bool,
) {
    let (x, y) = bounds.top_left();
    let (w, h) = (bounds.w as i32, bounds.h as i32);
    match shape {
        ShapeKind::Rect => {
            if filled {
                panel.draw_rect(x, y, w, h, fill_color, true);
            }
            for i in 0..border_width.max(1) as i32 {
                panel.draw_rect(x + i, y + i, w - 2 * i, h - 2 * i, border_color, false);
            }
        }
        ShapeKind::Line => {
            let (x1, y1) = bounds.bottom_right();
            panel.draw_line(x, y, x1, y1, border_color);
        }
        ShapeKind::Circle => {
            let (cx, cy) = bounds.center();
            let r = (w.min(h)) / 2;
            if filled {
                panel.draw_circle(cx, cy, r, fill_color, true);
            }
            panel.draw_circle(cx, cy, r, border_color, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bounds, Element};
    use pin_bus::SimulatedBus;
    use pin_panel::{Color, Panel};

    fn test_panel() -> Panel<SimulatedBus> {
        Panel::init(SimulatedBus::new()).unwrap()
    }

    fn rect_element(id: &str, x: i16, y: i16, w: u16, h: u16, z: u8, color: Color) -> Element {
        Element {
            id: id.to_string(),
            bounds: Bounds { x, y, w, h },
            z_index: z,
            visible: true,
            kind: ElementKind::Shape {
                shape: ShapeKind::Rect,
                fill_color: color,
                border_color: color,
                border_width: 1,
                filled: true,
            },
        }
    }

    #[test]
    fn s2_z_order_back_to_front() {
        let mut canvas = Canvas::new("c", "C", 0);
        canvas.elements.push(rect_element("a", 0, 0, 10, 10, 1, Color::Red));
        canvas.elements.push(rect_element("b", 5, 0, 10, 10, 2, Color::Blue));
        let mut panel = test_panel();
        render(&canvas, &mut panel);
        assert_eq!(panel.get_pixel(7, 5), Some(Color::Blue));
        assert_eq!(panel.get_pixel(2, 5), Some(Color::Red));
    }

    #[test]
    fn invisible_elements_are_skipped() {
        let mut canvas = Canvas::new("c", "C", 0);
        let mut hidden = rect_element("a", 0, 0, 10, 10, 1, Color::Red);
        hidden.visible = false;
        canvas.elements.push(hidden);
        let mut panel = test_panel();
        render(&canvas, &mut panel);
        assert_eq!(panel.get_pixel(5, 5), Some(canvas.background_color));
    }

    #[test]
    fn background_fills_before_elements() {
        let mut canvas = Canvas::new("c", "C", 0);
        canvas.background_color = Color::Yellow;
        let mut panel = test_panel();
        render(&canvas, &mut panel);
        assert_eq!(panel.get_pixel(0, 0), Some(Color::Yellow));
    }
}
