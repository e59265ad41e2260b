//! Inline formatting context construction
//!
//! Accumulates inline-level content (text runs, inline boxes,
//! inline-blocks) for one block container and breaks it into lines.
//! Greedy first-fit breaking: a word that does not fit a non-empty line
//! starts the next one, and a word wider than the available width
//! overflows its line rather than being split.
//!
//! Reference: CSS 2.2 §9.4.2 (inline formatting contexts) and §10.8
//! (line height calculations, simplified to a single font per context).
//!
//! Vertical alignment is baseline-only: text sits on the baseline by its
//! ascender, an inline-block sits on the baseline with its bottom margin
//! edge. Line height is the maximum ascent plus maximum descent of the
//! items on the line.

use crate::dom::ElementRef;
use crate::error::LayoutError;
use crate::error::Result;
use crate::geometry::EdgeOffsets;
use crate::geometry::Point;
use crate::geometry::Size;
use crate::geometry::Unit;
use crate::style::values::Rgba;
use crate::text::FontHandle;
use crate::tree::box_tree::BlockRef;
use crate::tree::box_tree::IfcId;
use crate::tree::box_tree::InlineBlockItem;
use crate::tree::box_tree::InlineFormattingContext;
use crate::tree::box_tree::InlineItem;
use crate::tree::box_tree::LineBox;
use crate::tree::box_tree::PositionedGlyph;
use crate::tree::box_tree::TextRun;

const MAX_INLINE_ITEMS: usize = u16::MAX as usize;

/// How an item on the current line gets its vertical position once the
/// line's baseline is known.
enum ItemAlign {
  /// Text: top = baseline - ascender
  Text,
  /// Inline-block: bottom margin edge on the baseline
  InlineBlock { height: Unit, margin_bottom: Unit },
}

/// Builder for one inline formatting context.
pub struct InlineLayout {
  avail_width: Unit,
  ascender: Unit,
  descender: Unit,
  items: Vec<InlineItem>,
  lines: Vec<LineBox>,
  line_first_item: u32,
  /// Pending items of the current line: (item index, alignment)
  line_items: Vec<(usize, ItemAlign)>,
  cursor_x: Unit,
  line_top: Unit,
  pending_space: Unit,
  has_line_content: bool,
  line_max_ascent: Unit,
  line_max_descent: Unit,
  max_line_width: Unit,
}

impl InlineLayout {
  pub fn new(avail_width: Unit, font: &dyn FontHandle) -> Self {
    Self {
      avail_width,
      ascender: font.ascender(),
      descender: font.descender(),
      items: Vec::new(),
      lines: Vec::new(),
      line_first_item: 0,
      line_items: Vec::new(),
      cursor_x: 0,
      line_top: 0,
      pending_space: 0,
      has_line_content: false,
      line_max_ascent: 0,
      line_max_descent: 0,
      max_line_width: 0,
    }
  }

  /// True if nothing has been laid out; an empty run produces no IFC.
  pub fn is_empty(&self) -> bool {
    self.items.is_empty() && !self.has_line_content
  }

  /// Shapes and places a text element's content.
  ///
  /// Whitespace collapses: a run of spaces is one break opportunity with
  /// the advance of its first glyph, and leading/trailing spaces on a
  /// line disappear.
  pub fn add_text(
    &mut self,
    element: ElementRef,
    text: &str,
    font: &dyn FontHandle,
  ) -> Result<()> {
    let glyphs = font.shape_text(text);
    let bytes = text.as_bytes();
    let is_space = |glyph: &crate::text::ShapedGlyph| {
      matches!(
        bytes.get(glyph.cluster as usize),
        Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'\x0C')
      )
    };

    let mut index = 0;
    while index < glyphs.len() {
      if is_space(&glyphs[index]) {
        if self.has_line_content {
          self.pending_space = glyphs[index].advance;
        }
        while index < glyphs.len() && is_space(&glyphs[index]) {
          index += 1;
        }
        continue;
      }
      let word_start = index;
      let mut width = 0;
      while index < glyphs.len() && !is_space(&glyphs[index]) {
        width += glyphs[index].advance;
        index += 1;
      }
      self.place_word(element, &glyphs[word_start..index], width)?;
    }
    Ok(())
  }

  fn place_word(
    &mut self,
    element: ElementRef,
    glyphs: &[crate::text::ShapedGlyph],
    width: Unit,
  ) -> Result<()> {
    let advance_before = self.space_before(width);
    let x = self.cursor_x + advance_before;
    let mut positioned = Vec::with_capacity(glyphs.len());
    let mut pen = 0;
    for glyph in glyphs {
      positioned.push(PositionedGlyph {
        id: glyph.id,
        x: pen,
      });
      pen += glyph.advance;
    }
    let item_index = self.push_item(InlineItem::TextRun(TextRun {
      element,
      origin: Point::new(x, 0),
      glyphs: positioned,
      color: Rgba::BLACK,
    }))?;
    self.line_items.push((item_index, ItemAlign::Text));
    self.line_max_ascent = self.line_max_ascent.max(self.ascender);
    self.line_max_descent = self.line_max_descent.max(self.descender);
    self.cursor_x = x + width;
    self.has_line_content = true;
    self.pending_space = 0;
    Ok(())
  }

  /// Places a completed inline-block on the line. `size` is its border
  /// box; the margin box participates in line breaking and alignment.
  pub fn add_inline_block(
    &mut self,
    block: BlockRef,
    size: Size,
    margins: EdgeOffsets,
  ) -> Result<()> {
    let outer_width = size.width + margins.horizontal();
    let outer_height = size.height + margins.vertical();
    let advance_before = self.space_before(outer_width);
    let x = self.cursor_x + advance_before + margins.left;
    let item_index = self.push_item(InlineItem::InlineBlock(InlineBlockItem {
      block,
      origin: Point::new(x, 0),
    }))?;
    self.line_items.push((
      item_index,
      ItemAlign::InlineBlock {
        height: size.height,
        margin_bottom: margins.bottom,
      },
    ));
    self.line_max_ascent = self.line_max_ascent.max(outer_height);
    self.cursor_x = x + size.width + margins.right;
    self.has_line_content = true;
    self.pending_space = 0;
    Ok(())
  }

  /// Opens an inline box (`span`-like); `start_advance` is the sum of its
  /// left margin, border, and padding.
  pub fn open_inline_box(&mut self, element: ElementRef, start_advance: Unit) -> Result<()> {
    self.push_item(InlineItem::InlineBoxStart { element })?;
    self.cursor_x += self.take_pending_space() + start_advance;
    Ok(())
  }

  /// Closes the innermost inline box; `end_advance` mirrors
  /// `start_advance` for the right edges.
  pub fn close_inline_box(&mut self, end_advance: Unit) -> Result<()> {
    self.push_item(InlineItem::InlineBoxEnd)?;
    self.cursor_x += end_advance;
    Ok(())
  }

  /// Collapsed space to add before an item of `width`, breaking the line
  /// first if the item cannot fit.
  fn space_before(&mut self, width: Unit) -> Unit {
    let space = if self.has_line_content {
      self.pending_space
    } else {
      0
    };
    if self.has_line_content && self.cursor_x + space + width > self.avail_width {
      self.finish_line();
      return 0;
    }
    space
  }

  fn take_pending_space(&mut self) -> Unit {
    if self.has_line_content {
      std::mem::take(&mut self.pending_space)
    } else {
      self.pending_space = 0;
      0
    }
  }

  fn push_item(&mut self, item: InlineItem) -> Result<usize> {
    if self.items.len() >= MAX_INLINE_ITEMS {
      return Err(LayoutError::TooManyInlineBoxes);
    }
    self.items.push(item);
    Ok(self.items.len() - 1)
  }

  fn finish_line(&mut self) {
    if self.line_items.is_empty() && !self.has_line_content {
      return;
    }
    let baseline = self.line_top + self.line_max_ascent;
    for (index, align) in self.line_items.drain(..) {
      let y = match align {
        ItemAlign::Text => baseline - self.ascender,
        ItemAlign::InlineBlock {
          height,
          margin_bottom,
        } => baseline - height - margin_bottom,
      };
      match &mut self.items[index] {
        InlineItem::TextRun(run) => run.origin.y = y,
        InlineItem::InlineBlock(item) => item.origin.y = y,
        _ => {}
      }
    }
    self.max_line_width = self.max_line_width.max(self.cursor_x);
    self.lines.push(LineBox {
      top: self.line_top,
      baseline,
      items: (self.line_first_item, self.items.len() as u32),
    });
    self.line_top += self.line_max_ascent + self.line_max_descent;
    self.line_first_item = self.items.len() as u32;
    self.cursor_x = 0;
    self.pending_space = 0;
    self.has_line_content = false;
    self.line_max_ascent = 0;
    self.line_max_descent = 0;
  }

  /// Finishes the context. Returns the laid-out IFC and the widest line,
  /// which shrink-to-fit sizing consumes.
  pub fn finish(
    mut self,
    id: IfcId,
    parent_block: BlockRef,
    origin: Point,
  ) -> (InlineFormattingContext, Unit) {
    self.finish_line();
    let max_line_width = self.max_line_width;
    (
      InlineFormattingContext {
        id,
        parent_block,
        origin,
        height: self.line_top,
        lines: self.lines,
        items: self.items,
      },
      max_line_width,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::px;
  use crate::text::MonospaceFont;
  use crate::tree::box_tree::BlockIndex;
  use crate::tree::box_tree::SubtreeId;

  const FONT: MonospaceFont = MonospaceFont::new(px(8), px(12), px(4));

  fn finish(layout: InlineLayout) -> (InlineFormattingContext, Unit) {
    layout.finish(
      IfcId(0),
      BlockRef {
        subtree: SubtreeId(0),
        index: BlockIndex(0),
      },
      Point::ZERO,
    )
  }

  #[test]
  fn test_single_line_text() {
    let mut layout = InlineLayout::new(px(400), &FONT);
    layout.add_text(ElementRef(0), "hi there", &FONT).unwrap();
    let (ifc, widest) = finish(layout);

    assert_eq!(ifc.lines.len(), 1);
    assert_eq!(ifc.height, px(16));
    assert_eq!(ifc.lines[0].baseline, px(12));
    // Two words and one collapsed space: 2 + 1 + 5 advances.
    assert_eq!(widest, px(8 * 8));
    assert_eq!(ifc.items.len(), 2);
    let InlineItem::TextRun(second) = &ifc.items[1] else {
      panic!("expected a text run");
    };
    assert_eq!(second.origin, Point::new(px(3 * 8), 0));
    assert_eq!(second.glyphs.len(), 5);
  }

  #[test]
  fn test_wraps_at_word_boundary() {
    // 10 columns: "aaaa bbbb" fits, "cccc" wraps.
    let mut layout = InlineLayout::new(px(80), &FONT);
    layout
      .add_text(ElementRef(0), "aaaa bbbb cccc", &FONT)
      .unwrap();
    let (ifc, widest) = finish(layout);

    assert_eq!(ifc.lines.len(), 2);
    assert_eq!(ifc.height, px(32));
    assert_eq!(ifc.lines[1].top, px(16));
    assert_eq!(widest, px(72));
    let InlineItem::TextRun(wrapped) = &ifc.items[2] else {
      panic!("expected a text run");
    };
    assert_eq!(wrapped.origin, Point::new(0, px(16)));
  }

  #[test]
  fn test_overlong_word_overflows_its_own_line() {
    let mut layout = InlineLayout::new(px(40), &FONT);
    layout
      .add_text(ElementRef(0), "tiny enormousword", &FONT)
      .unwrap();
    let (ifc, _) = finish(layout);
    assert_eq!(ifc.lines.len(), 2);
    let InlineItem::TextRun(long) = &ifc.items[1] else {
      panic!("expected a text run");
    };
    // Starts at the line edge even though it overflows.
    assert_eq!(long.origin.x, 0);
  }

  #[test]
  fn test_leading_whitespace_collapses() {
    let mut layout = InlineLayout::new(px(400), &FONT);
    layout.add_text(ElementRef(0), "   lead", &FONT).unwrap();
    let (ifc, widest) = finish(layout);
    let InlineItem::TextRun(run) = &ifc.items[0] else {
      panic!("expected a text run");
    };
    assert_eq!(run.origin.x, 0);
    assert_eq!(widest, px(32));
  }

  #[test]
  fn test_inline_block_sits_on_baseline() {
    let mut layout = InlineLayout::new(px(400), &FONT);
    layout.add_text(ElementRef(0), "a", &FONT).unwrap();
    let target = BlockRef {
      subtree: SubtreeId(1),
      index: BlockIndex(0),
    };
    layout
      .add_inline_block(target, Size::new(px(20), px(30)), EdgeOffsets::all(px(2)))
      .unwrap();
    let (ifc, _) = finish(layout);

    // Ascent is the inline-block's margin box height (34px), taller than
    // the font's ascender.
    assert_eq!(ifc.lines[0].baseline, px(34));
    assert_eq!(ifc.height, px(34 + 4));
    let InlineItem::InlineBlock(item) = &ifc.items[1] else {
      panic!("expected an inline block");
    };
    // Border box bottom plus bottom margin lands on the baseline.
    assert_eq!(item.origin.y + px(30) + px(2), ifc.lines[0].baseline);
    // No whitespace between the glyph and the box: x = glyph advance plus
    // the box's left margin.
    assert_eq!(item.origin.x, px(8) + px(2));
  }

  #[test]
  fn test_inline_box_markers_advance_cursor() {
    let mut layout = InlineLayout::new(px(400), &FONT);
    layout.open_inline_box(ElementRef(1), px(5)).unwrap();
    layout.add_text(ElementRef(2), "x", &FONT).unwrap();
    layout.close_inline_box(px(5)).unwrap();
    layout.add_text(ElementRef(3), "y", &FONT).unwrap();
    let (ifc, _) = finish(layout);

    assert_eq!(ifc.items.len(), 4);
    let InlineItem::TextRun(x_run) = &ifc.items[1] else {
      panic!("expected a text run");
    };
    assert_eq!(x_run.origin.x, px(5));
    let InlineItem::TextRun(y_run) = &ifc.items[3] else {
      panic!("expected a text run");
    };
    // x + glyph + closing edge + no pending space (no whitespace).
    assert_eq!(y_run.origin.x, px(5 + 8 + 5));
  }
}
