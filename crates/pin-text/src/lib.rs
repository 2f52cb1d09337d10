//! Text-measurement helpers used by the canvas engine's placeholder text
//! renderer: grapheme counting and advisory glyph-cell width. Real font
//! shaping is out of scope; the canvas engine draws one filled cell per
//! grapheme rather than a true glyph outline.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Number of user-perceived characters (extended grapheme clusters) in `s`.
/// This, not `s.len()` or `s.chars().count()`, is what the placeholder
/// renderer advances by per glyph cell.
pub fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Advisory terminal-style column width of `s`, used only to size the
/// placeholder rectangle run; zero-width and combining sequences collapse
/// to their base cell rather than each claiming a cell of their own.
pub fn advisory_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}
