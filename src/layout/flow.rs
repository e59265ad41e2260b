//! Normal-flow block layout
//!
//! The box-generation pass: walks the element tree, computes used sizes,
//! and emits the block subtrees, inline formatting contexts, and stacking
//! contexts of the box tree.
//!
//! Like the CSS parser, the engine is a stack machine. One frame per open
//! block container (plus lightweight frames for open inline elements);
//! each step consumes one child of the top frame or finalizes it. Nesting
//! depth is bounded by the input document, not by the native stack.
//!
//! References: CSS 2.2 §9.2 (box generation), §10.3.3 (block width
//! solving), §10.6.3 (auto heights). Margin collapsing is not
//! implemented; adjacent margins accumulate.
//!
//! # Independent subtrees
//!
//! Inline-blocks and absolutely positioned boxes are laid out into their
//! own block subtrees: their content does not interact with the
//! surrounding flow, and each one roots a (non-parentable) stacking
//! context. The subtree root's position is carried by the inline item or
//! the resolved insets, not by its offsets column.

use crate::dom::ElementCategory;
use crate::dom::ElementRef;
use crate::dom::ElementTree;
use crate::error::LayoutError;
use crate::error::Result;
use crate::geometry::EdgeOffsets;
use crate::geometry::Point;
use crate::geometry::Size;
use crate::geometry::Unit;
use crate::layout::inline::InlineLayout;
use crate::layout::stacking::StackingContextInfo;
use crate::layout::stacking::StackingContextManager;
use crate::style::computed::BoxStyle;
use crate::style::computed::LengthAuto;
use crate::style::values::Display;
use crate::style::values::Position;
use crate::style::values::ZIndex;
use crate::style::Stage;
use crate::style::StyleComputer;
use crate::text::FontHandle;
use crate::tree::box_tree::BlockIndex;
use crate::tree::box_tree::BlockRef;
use crate::tree::box_tree::BoxOffsets;
use crate::tree::box_tree::BoxSize;
use crate::tree::box_tree::BoxTree;
use crate::tree::box_tree::SubtreeId;

/// Runs the box-generation pass.
pub(crate) fn run_box_pass(
  elements: &ElementTree,
  root: ElementRef,
  font: &dyn FontHandle,
  viewport: Size,
) -> Result<BoxTree> {
  if root.0 >= elements.len() {
    return Err(LayoutError::InvalidValue);
  }
  let mut engine = FlowEngine {
    elements,
    computer: StyleComputer::new(elements),
    font,
    tree: BoxTree::default(),
    sc: StackingContextManager::new(),
    stack: Vec::new(),
    viewport,
  };
  engine.setup(root)?;
  while !engine.stack.is_empty() {
    engine.step()?;
  }
  engine.tree.stacking_contexts = engine.sc.finish();
  Ok(engine.tree)
}

enum BlockKind {
  /// The initial containing block
  Initial,
  /// A block in its parent's normal flow
  InFlow,
  /// Root block of an inline-block's subtree
  InlineBlockRoot { width_auto: bool },
  /// Root block of an absolutely positioned subtree
  AbsoluteRoot {
    width_auto: bool,
    left: Option<Unit>,
    right: Option<Unit>,
    top: Option<Unit>,
    bottom: Option<Unit>,
    static_position: Point,
  },
}

struct BlockFrame {
  element: Option<ElementRef>,
  kind: BlockKind,
  subtree: SubtreeId,
  block: BlockIndex,
  next_child: u32,
  children_end: u32,
  content_width: Unit,
  min_width: Unit,
  max_width: Option<Unit>,
  definite_height: Option<Unit>,
  min_height: Unit,
  max_height: Option<Unit>,
  margins: EdgeOffsets,
  border: EdgeOffsets,
  padding: EdgeOffsets,
  offsets: BoxOffsets,
  relative_offset: Point,
  auto_height: Unit,
  max_inline_width: Unit,
  had_block_child: bool,
  ifc: Option<InlineLayout>,
  ifc_start_y: Unit,
  /// Content-box origin in viewport space, for static positions of
  /// absolute descendants
  abs_content_origin: Point,
}

struct InlineFrame {
  next_child: u32,
  children_end: u32,
  end_advance: Unit,
}

enum Frame {
  Block(BlockFrame),
  Inline(InlineFrame),
}

struct FlowEngine<'a> {
  elements: &'a ElementTree,
  computer: StyleComputer<'a>,
  font: &'a dyn FontHandle,
  tree: BoxTree,
  sc: StackingContextManager,
  stack: Vec<Frame>,
  viewport: Size,
}

impl FlowEngine<'_> {
  fn setup(&mut self, root: ElementRef) -> Result<()> {
    let subtree = self.tree.new_subtree()?;
    let icb = self.tree.subtree_mut(subtree).push_block(None)?;
    let icb_ref = BlockRef {
      subtree,
      index: icb,
    };
    // A text-only document still needs a context to host its lines; an
    // element root pushes its own context instead.
    let info = if self.elements.category(root) == ElementCategory::Text {
      StackingContextInfo::Parentable(0)
    } else {
      StackingContextInfo::None
    };
    if let Some(id) = self.sc.push(info, icb_ref)? {
      self.tree.subtree_mut(subtree).set_stacking_context(icb, id);
    }
    self.stack.push(Frame::Block(BlockFrame {
      element: None,
      kind: BlockKind::Initial,
      subtree,
      block: icb,
      next_child: root.0,
      children_end: root.0 + 1,
      content_width: self.viewport.width,
      min_width: 0,
      max_width: None,
      definite_height: Some(self.viewport.height),
      min_height: 0,
      max_height: None,
      margins: EdgeOffsets::ZERO,
      border: EdgeOffsets::ZERO,
      padding: EdgeOffsets::ZERO,
      offsets: BoxOffsets::default(),
      relative_offset: Point::ZERO,
      auto_height: 0,
      max_inline_width: 0,
      had_block_child: false,
      ifc: None,
      ifc_start_y: 0,
      abs_content_origin: Point::ZERO,
    }));
    Ok(())
  }

  fn step(&mut self) -> Result<()> {
    let top = self.stack.len() - 1;
    match &self.stack[top] {
      Frame::Block(_) => self.step_block(top),
      Frame::Inline(_) => self.step_inline(top),
    }
  }

  // ==========================================================================
  // Child dispatch
  // ==========================================================================

  fn step_block(&mut self, top: usize) -> Result<()> {
    let (next_child, children_end, initial) = {
      let Frame::Block(frame) = &self.stack[top] else {
        unreachable!()
      };
      (
        frame.next_child,
        frame.children_end,
        matches!(frame.kind, BlockKind::Initial),
      )
    };

    if next_child >= children_end {
      self.close_ifc(top)?;
      return self.finalize_block();
    }

    let child = ElementRef(next_child);
    self.advance_past(top, child);

    match self.elements.category(child) {
      ElementCategory::Text => self.handle_text_child(top, child),
      ElementCategory::Normal => {
        self.computer.push_element(Stage::BoxGen, child);
        let mut style = self.computer.current_box_style().clone();
        // The root box is always block-level.
        if initial && !matches!(style.display, Display::None | Display::Block) {
          style.display = Display::Block;
          self.computer.set_computed_box_style(style.clone());
        }
        match style.display {
          Display::None => {
            self.computer.advance_element();
            Ok(())
          }
          _ if style.position == Position::Absolute => self.start_absolute(top, child, &style),
          Display::Block => {
            self.close_ifc(top)?;
            self.start_in_flow_block(top, child, &style, initial)
          }
          Display::InlineBlock => self.start_inline_block(child, &style),
          Display::Inline => self.start_inline(top, child, &style),
        }
      }
    }
  }

  fn step_inline(&mut self, top: usize) -> Result<()> {
    let (next_child, children_end) = {
      let Frame::Inline(frame) = &self.stack[top] else {
        unreachable!()
      };
      (frame.next_child, frame.children_end)
    };

    if next_child >= children_end {
      let Some(Frame::Inline(frame)) = self.stack.pop() else {
        unreachable!()
      };
      let host = self.host_block_index();
      let Frame::Block(block) = &mut self.stack[host] else {
        unreachable!()
      };
      if let Some(ifc) = block.ifc.as_mut() {
        ifc.close_inline_box(frame.end_advance)?;
      }
      self.computer.pop_element();
      return Ok(());
    }

    let child = ElementRef(next_child);
    self.advance_past(top, child);
    let host = self.host_block_index();

    match self.elements.category(child) {
      ElementCategory::Text => self.handle_text_child(host, child),
      ElementCategory::Normal => {
        self.computer.push_element(Stage::BoxGen, child);
        let style = self.computer.current_box_style().clone();
        match style.display {
          Display::None => {
            self.computer.advance_element();
            Ok(())
          }
          _ if style.position == Position::Absolute => self.start_absolute(host, child, &style),
          // A block-level box inside an inline would need anonymous box
          // fission; it is laid out as an atomic inline instead.
          Display::Block | Display::InlineBlock => self.start_inline_block(child, &style),
          Display::Inline => self.start_inline(host, child, &style),
        }
      }
    }
  }

  fn advance_past(&mut self, frame_index: usize, child: ElementRef) {
    let end = self.elements.subtree_end(child);
    match &mut self.stack[frame_index] {
      Frame::Block(frame) => frame.next_child = end,
      Frame::Inline(frame) => frame.next_child = end,
    }
  }

  /// Index of the innermost block frame (the one owning the current
  /// inline formatting context).
  fn host_block_index(&self) -> usize {
    self
      .stack
      .iter()
      .rposition(|frame| matches!(frame, Frame::Block(_)))
      .expect("a block frame below every inline frame")
  }

  fn handle_text_child(&mut self, block_index: usize, child: ElementRef) -> Result<()> {
    let text = self.elements.text(child);
    let blank = text.chars().all(char::is_whitespace);
    let has_ifc = {
      let Frame::Block(frame) = &self.stack[block_index] else {
        unreachable!()
      };
      frame.ifc.is_some()
    };
    // Whitespace between blocks does not open an inline context.
    if blank && !has_ifc {
      return Ok(());
    }
    self.ensure_ifc(block_index)?;
    let font = self.font;
    let Frame::Block(frame) = &mut self.stack[block_index] else {
      unreachable!()
    };
    frame
      .ifc
      .as_mut()
      .expect("inline context just ensured")
      .add_text(child, text, font)
  }

  fn start_inline(&mut self, host_index: usize, child: ElementRef, style: &BoxStyle) -> Result<()> {
    self.ensure_ifc(host_index)?;
    let (start_advance, end_advance) = {
      let Frame::Block(frame) = &self.stack[host_index] else {
        unreachable!()
      };
      let cb = frame.content_width;
      let start = style.margin.left.resolve(cb).unwrap_or(0)
        + style.border.left
        + style.padding.left.resolve(cb);
      let end = style.margin.right.resolve(cb).unwrap_or(0)
        + style.border.right
        + style.padding.right.resolve(cb);
      (start, end)
    };
    {
      let Frame::Block(frame) = &mut self.stack[host_index] else {
        unreachable!()
      };
      frame
        .ifc
        .as_mut()
        .expect("inline context just ensured")
        .open_inline_box(child, start_advance)?;
    }
    self.stack.push(Frame::Inline(InlineFrame {
      next_child: child.0 + 1,
      children_end: self.elements.subtree_end(child),
      end_advance,
    }));
    Ok(())
  }

  // ==========================================================================
  // Block starts
  // ==========================================================================

  fn start_in_flow_block(
    &mut self,
    parent_index: usize,
    child: ElementRef,
    style: &BoxStyle,
    parent_is_initial: bool,
  ) -> Result<()> {
    let (subtree, cb_width, cb_height, flow_y, parent_abs) = {
      let Frame::Block(parent) = &mut self.stack[parent_index] else {
        unreachable!()
      };
      parent.had_block_child = true;
      (
        parent.subtree,
        parent.content_width,
        parent.definite_height,
        parent.auto_height,
        parent.abs_content_origin,
      )
    };

    let horizontal = solve_block_width(style, cb_width);
    let vertical = resolve_vertical_edges(style, cb_width);
    let margins = EdgeOffsets {
      top: vertical.margin_top,
      right: horizontal.margin_right,
      bottom: vertical.margin_bottom,
      left: horizontal.margin_left,
    };
    let padding = EdgeOffsets {
      top: vertical.padding_top,
      right: horizontal.padding_right,
      bottom: vertical.padding_bottom,
      left: horizontal.padding_left,
    };
    let heights = resolve_heights(style, cb_height);

    let block = self.tree.subtree_mut(subtree).push_block(Some(child))?;
    let block_ref = BlockRef {
      subtree,
      index: block,
    };
    self.tree.record_element_block(child, block_ref);

    let border_origin = Point::new(margins.left, flow_y + margins.top);
    let content_origin = border_origin.translate(Point::new(
      style.border.left + padding.left,
      style.border.top + padding.top,
    ));
    let offsets = BoxOffsets {
      border: border_origin,
      content: content_origin,
    };

    // The root's context ignores any declared z-index.
    let info = if parent_is_initial {
      StackingContextInfo::Parentable(0)
    } else {
      match style.position {
        Position::Relative => StackingContextInfo::Parentable(used_z_index(style.z_index)),
        _ => StackingContextInfo::None,
      }
    };
    if let Some(id) = self.sc.push(info, block_ref)? {
      self.tree.subtree_mut(subtree).set_stacking_context(block, id);
    }

    let relative_offset = if style.position == Position::Relative {
      relative_offsets(style, cb_width, cb_height)
    } else {
      Point::ZERO
    };

    self.stack.push(Frame::Block(BlockFrame {
      element: Some(child),
      kind: BlockKind::InFlow,
      subtree,
      block,
      next_child: child.0 + 1,
      children_end: self.elements.subtree_end(child),
      content_width: horizontal.width,
      min_width: style.min_width.resolve(cb_width),
      max_width: style.max_width.resolve(cb_width),
      definite_height: heights.definite,
      min_height: heights.min,
      max_height: heights.max,
      margins,
      border: style.border,
      padding,
      offsets,
      relative_offset,
      auto_height: 0,
      max_inline_width: 0,
      had_block_child: false,
      ifc: None,
      ifc_start_y: 0,
      abs_content_origin: parent_abs.translate(content_origin),
    }));
    Ok(())
  }

  fn start_inline_block(&mut self, child: ElementRef, style: &BoxStyle) -> Result<()> {
    let host_index = self.host_block_index();
    self.ensure_ifc(host_index)?;
    let (cb_width, parent_abs) = {
      let Frame::Block(host) = &self.stack[host_index] else {
        unreachable!()
      };
      (host.content_width, host.abs_content_origin)
    };

    let margins = resolve_margins_no_auto(style, cb_width);
    let padding = resolve_padding(style, cb_width);
    let min_width = style.min_width.resolve(cb_width);
    let max_width = style.max_width.resolve(cb_width);
    let (content_width, width_auto) = match style.width.resolve(cb_width) {
      Some(width) => (clamp_size(width, min_width, max_width), false),
      None => {
        let available = cb_width
          - margins.horizontal()
          - style.border.horizontal()
          - padding.horizontal();
        (available.max(0), true)
      }
    };
    // An inline-block's containing block has no definite height, so
    // percentage heights fall back to auto.
    let heights = resolve_heights(style, None);

    let subtree = self.tree.new_subtree()?;
    let block = self.tree.subtree_mut(subtree).push_block(Some(child))?;
    let block_ref = BlockRef {
      subtree,
      index: block,
    };
    self.tree.record_element_block(child, block_ref);

    let id = self
      .sc
      .push_without_block(StackingContextInfo::NonParentable(used_z_index(
        style.z_index,
      )))?
      .expect("non-parentable push returns an id");
    self.sc.set_block(id, block_ref);
    self.tree.subtree_mut(subtree).set_stacking_context(block, id);

    let content_origin = Point::new(
      style.border.left + padding.left,
      style.border.top + padding.top,
    );
    self.stack.push(Frame::Block(BlockFrame {
      element: Some(child),
      kind: BlockKind::InlineBlockRoot { width_auto },
      subtree,
      block,
      next_child: child.0 + 1,
      children_end: self.elements.subtree_end(child),
      content_width,
      min_width,
      max_width,
      definite_height: heights.definite,
      min_height: heights.min,
      max_height: heights.max,
      margins,
      border: style.border,
      padding,
      offsets: BoxOffsets {
        border: Point::ZERO,
        content: content_origin,
      },
      relative_offset: Point::ZERO,
      auto_height: 0,
      max_inline_width: 0,
      had_block_child: false,
      ifc: None,
      ifc_start_y: 0,
      abs_content_origin: parent_abs,
    }));
    Ok(())
  }

  fn start_absolute(
    &mut self,
    host_index: usize,
    child: ElementRef,
    style: &BoxStyle,
  ) -> Result<()> {
    let static_position = {
      let Frame::Block(host) = &self.stack[host_index] else {
        unreachable!()
      };
      host
        .abs_content_origin
        .translate(Point::new(0, host.auto_height))
    };

    // The containing block for absolutes is the initial containing
    // block.
    let cb = self.viewport;
    let margins = resolve_margins_no_auto(style, cb.width);
    let padding = resolve_padding(style, cb.width);
    let left = style.inset.left.resolve(cb.width);
    let right = style.inset.right.resolve(cb.width);
    let top = style.inset.top.resolve(cb.height);
    let bottom = style.inset.bottom.resolve(cb.height);

    let min_width = style.min_width.resolve(cb.width);
    let max_width = style.max_width.resolve(cb.width);
    let edges_h = margins.horizontal() + style.border.horizontal() + padding.horizontal();
    let (content_width, width_auto) = match style.width.resolve(cb.width) {
      Some(width) => (clamp_size(width, min_width, max_width), false),
      None => match (left, right) {
        (Some(left), Some(right)) => (
          clamp_size(cb.width - left - right - edges_h, min_width, max_width).max(0),
          false,
        ),
        _ => ((cb.width - edges_h).max(0), true),
      },
    };

    let mut heights = resolve_heights(style, Some(cb.height));
    if heights.definite.is_none() {
      if let (Some(top), Some(bottom)) = (top, bottom) {
        let edges_v = margins.vertical() + style.border.vertical() + padding.vertical();
        heights.definite = Some(
          clamp_size(cb.height - top - bottom - edges_v, heights.min, heights.max).max(0),
        );
      }
    }

    let subtree = self.tree.new_subtree()?;
    let block = self.tree.subtree_mut(subtree).push_block(Some(child))?;
    let block_ref = BlockRef {
      subtree,
      index: block,
    };
    self.tree.record_element_block(child, block_ref);

    let id = self
      .sc
      .push(
        StackingContextInfo::NonParentable(used_z_index(style.z_index)),
        block_ref,
      )?
      .expect("non-parentable push returns an id");
    self.tree.subtree_mut(subtree).set_stacking_context(block, id);

    let content_origin = Point::new(
      style.border.left + padding.left,
      style.border.top + padding.top,
    );
    self.stack.push(Frame::Block(BlockFrame {
      element: Some(child),
      kind: BlockKind::AbsoluteRoot {
        width_auto,
        left,
        right,
        top,
        bottom,
        static_position,
      },
      subtree,
      block,
      next_child: child.0 + 1,
      children_end: self.elements.subtree_end(child),
      content_width,
      min_width,
      max_width,
      definite_height: heights.definite,
      min_height: heights.min,
      max_height: heights.max,
      margins,
      border: style.border,
      padding,
      offsets: BoxOffsets {
        border: Point::ZERO,
        content: content_origin,
      },
      relative_offset: Point::ZERO,
      auto_height: 0,
      max_inline_width: 0,
      had_block_child: false,
      ifc: None,
      ifc_start_y: 0,
      abs_content_origin: Point::ZERO,
    }));
    Ok(())
  }

  // ==========================================================================
  // Inline formatting context lifecycle
  // ==========================================================================

  fn ensure_ifc(&mut self, block_index: usize) -> Result<()> {
    let font = self.font;
    let Frame::Block(frame) = &mut self.stack[block_index] else {
      unreachable!()
    };
    if frame.ifc.is_none() {
      frame.ifc = Some(InlineLayout::new(frame.content_width, font));
      frame.ifc_start_y = frame.auto_height;
    }
    Ok(())
  }

  fn close_ifc(&mut self, block_index: usize) -> Result<()> {
    let (ifc, parent_block, start_y) = {
      let Frame::Block(frame) = &mut self.stack[block_index] else {
        unreachable!()
      };
      let Some(ifc) = frame.ifc.take() else {
        return Ok(());
      };
      (
        ifc,
        BlockRef {
          subtree: frame.subtree,
          index: frame.block,
        },
        frame.ifc_start_y,
      )
    };
    if ifc.is_empty() {
      return Ok(());
    }
    let id = self.tree.next_ifc_id()?;
    let (ifc, max_line_width) = ifc.finish(id, parent_block, Point::new(0, start_y));
    let height = ifc.height;
    self.tree.push_ifc(ifc)?;
    self.sc.add_ifc(id);
    let Frame::Block(frame) = &mut self.stack[block_index] else {
      unreachable!()
    };
    frame.auto_height = start_y + height;
    frame.max_inline_width = frame.max_inline_width.max(max_line_width);
    Ok(())
  }

  // ==========================================================================
  // Finalization
  // ==========================================================================

  fn finalize_block(&mut self) -> Result<()> {
    let Some(Frame::Block(mut frame)) = self.stack.pop() else {
      unreachable!()
    };

    // Shrink-to-fit for auto-width independent roots: the widest laid
    // line, when the content was purely inline.
    let shrink = match &frame.kind {
      BlockKind::InlineBlockRoot { width_auto } => *width_auto,
      BlockKind::AbsoluteRoot { width_auto, .. } => *width_auto,
      _ => false,
    };
    if shrink && !frame.had_block_child {
      frame.content_width = clamp_size(
        frame.max_inline_width.min(frame.content_width),
        frame.min_width,
        frame.max_width,
      );
    }

    let content_height = clamp_size(
      frame.definite_height.unwrap_or(frame.auto_height),
      frame.min_height,
      frame.max_height,
    );
    let border_size = Size::new(
      frame.content_width + frame.padding.horizontal() + frame.border.horizontal(),
      content_height + frame.padding.vertical() + frame.border.vertical(),
    );

    if let BlockKind::AbsoluteRoot {
      left,
      right,
      top,
      bottom,
      static_position,
      ..
    } = &frame.kind
    {
      let x = match (left, right) {
        (Some(left), _) => left + frame.margins.left,
        (None, Some(right)) => {
          self.viewport.width - right - border_size.width - frame.margins.right
        }
        (None, None) => static_position.x + frame.margins.left,
      };
      let y = match (top, bottom) {
        (Some(top), _) => top + frame.margins.top,
        (None, Some(bottom)) => {
          self.viewport.height - bottom - border_size.height - frame.margins.bottom
        }
        (None, None) => static_position.y + frame.margins.top,
      };
      frame.offsets.border = Point::new(x, y);
    } else {
      frame.offsets.border = frame.offsets.border.translate(frame.relative_offset);
    }
    frame.offsets.content = frame.offsets.border.translate(Point::new(
      frame.border.left + frame.padding.left,
      frame.border.top + frame.padding.top,
    ));

    let subtree = self.tree.subtree_mut(frame.subtree);
    let skip = subtree.len() - frame.block.0;
    subtree.set_skip(frame.block, skip);
    subtree.set_geometry(
      frame.block,
      frame.offsets,
      BoxSize {
        border: border_size,
        content: Size::new(frame.content_width, content_height),
      },
      frame.border,
      frame.margins,
    );

    self.sc.pop();
    if frame.element.is_some() {
      self.computer.pop_element();
    }

    match frame.kind {
      BlockKind::Initial | BlockKind::AbsoluteRoot { .. } => Ok(()),
      BlockKind::InFlow => {
        let parent_index = self.host_block_index();
        let Frame::Block(parent) = &mut self.stack[parent_index] else {
          unreachable!()
        };
        parent.auto_height += frame.margins.vertical() + border_size.height;
        Ok(())
      }
      BlockKind::InlineBlockRoot { .. } => {
        let host_index = self.host_block_index();
        let block_ref = BlockRef {
          subtree: frame.subtree,
          index: frame.block,
        };
        let Frame::Block(host) = &mut self.stack[host_index] else {
          unreachable!()
        };
        host
          .ifc
          .as_mut()
          .expect("inline context open around an inline-block")
          .add_inline_block(block_ref, border_size, frame.margins)
      }
    }
  }
}

// ============================================================================
// Used-value solving
// ============================================================================

fn used_z_index(z_index: ZIndex) -> i32 {
  match z_index {
    ZIndex::Integer(z) => z,
    ZIndex::Auto => 0,
  }
}

fn clamp_size(value: Unit, min: Unit, max: Option<Unit>) -> Unit {
  let value = match max {
    Some(max) => value.min(max),
    None => value,
  };
  value.max(min)
}

struct UsedHorizontal {
  width: Unit,
  margin_left: Unit,
  margin_right: Unit,
  padding_left: Unit,
  padding_right: Unit,
}

/// CSS 2.2 §10.3.3: width and horizontal margins of a block in normal
/// flow. `auto` margins absorb free space (centering when both are
/// `auto`); over-constraint is resolved by overriding the right margin.
fn solve_block_width(style: &BoxStyle, cb_width: Unit) -> UsedHorizontal {
  let padding_left = style.padding.left.resolve(cb_width);
  let padding_right = style.padding.right.resolve(cb_width);
  let edges = style.border.horizontal() + padding_left + padding_right;
  let margin_left = style.margin.left.resolve(cb_width);
  let margin_right = style.margin.right.resolve(cb_width);
  let min_width = style.min_width.resolve(cb_width);
  let max_width = style.max_width.resolve(cb_width);

  match style.width.resolve(cb_width) {
    Some(width) => {
      let width = clamp_size(width, min_width, max_width);
      let free = cb_width - width - edges;
      let (margin_left, margin_right) = match (margin_left, margin_right) {
        (None, None) => {
          let half = (free.max(0)) / 2;
          (half, free.max(0) - half)
        }
        (None, Some(right)) => (free - right, right),
        (Some(left), None) => (left, free - left),
        (Some(left), Some(_)) => (left, free - left),
      };
      UsedHorizontal {
        width,
        margin_left,
        margin_right,
        padding_left,
        padding_right,
      }
    }
    None => {
      let margin_left = margin_left.unwrap_or(0);
      let margin_right_initial = margin_right.unwrap_or(0);
      let width = clamp_size(
        (cb_width - margin_left - margin_right_initial - edges).max(0),
        min_width,
        max_width,
      );
      let margin_right = cb_width - width - margin_left - edges;
      UsedHorizontal {
        width,
        margin_left,
        margin_right,
        padding_left,
        padding_right,
      }
    }
  }
}

struct UsedVertical {
  margin_top: Unit,
  margin_bottom: Unit,
  padding_top: Unit,
  padding_bottom: Unit,
}

/// Vertical margins and padding; percentages resolve against the
/// containing block's *width* (CSS 2.2 §8.3, §8.4), `auto` margins are
/// zero in the vertical axis.
fn resolve_vertical_edges(style: &BoxStyle, cb_width: Unit) -> UsedVertical {
  UsedVertical {
    margin_top: style.margin.top.resolve(cb_width).unwrap_or(0),
    margin_bottom: style.margin.bottom.resolve(cb_width).unwrap_or(0),
    padding_top: style.padding.top.resolve(cb_width),
    padding_bottom: style.padding.bottom.resolve(cb_width),
  }
}

fn resolve_margins_no_auto(style: &BoxStyle, cb_width: Unit) -> EdgeOffsets {
  EdgeOffsets {
    top: style.margin.top.resolve(cb_width).unwrap_or(0),
    right: style.margin.right.resolve(cb_width).unwrap_or(0),
    bottom: style.margin.bottom.resolve(cb_width).unwrap_or(0),
    left: style.margin.left.resolve(cb_width).unwrap_or(0),
  }
}

fn resolve_padding(style: &BoxStyle, cb_width: Unit) -> EdgeOffsets {
  EdgeOffsets {
    top: style.padding.top.resolve(cb_width),
    right: style.padding.right.resolve(cb_width),
    bottom: style.padding.bottom.resolve(cb_width),
    left: style.padding.left.resolve(cb_width),
  }
}

struct UsedHeights {
  definite: Option<Unit>,
  min: Unit,
  max: Option<Unit>,
}

/// Heights resolve against the containing block's height only when that
/// height is definite; otherwise percentages behave as `auto` (CSS 2.2
/// §10.5).
fn resolve_heights(style: &BoxStyle, cb_height: Option<Unit>) -> UsedHeights {
  let definite = match (style.height, cb_height) {
    (LengthAuto::Units(units), _) => Some(units),
    (LengthAuto::Percent(percent), Some(basis)) => {
      Some(((basis as f32) * percent / 100.0).round() as Unit)
    }
    _ => None,
  };
  let min = match (style.min_height, cb_height) {
    (crate::style::computed::Length::Units(units), _) => units,
    (crate::style::computed::Length::Percent(percent), Some(basis)) => {
      ((basis as f32) * percent / 100.0).round() as Unit
    }
    _ => 0,
  };
  let max = match (style.max_height, cb_height) {
    (crate::style::computed::LengthMax::Units(units), _) => Some(units),
    (crate::style::computed::LengthMax::Percent(percent), Some(basis)) => {
      Some(((basis as f32) * percent / 100.0).round() as Unit)
    }
    _ => None,
  };
  UsedHeights {
    definite: definite.map(|height| clamp_size(height, min, max)),
    min,
    max,
  }
}

/// Relative positioning offsets: `left`/`top` win over `right`/`bottom`.
fn relative_offsets(style: &BoxStyle, cb_width: Unit, cb_height: Option<Unit>) -> Point {
  let horizontal_basis = cb_width;
  let vertical_basis = cb_height.unwrap_or(0);
  let dx = match style.inset.left.resolve(horizontal_basis) {
    Some(left) => left,
    None => match style.inset.right.resolve(horizontal_basis) {
      Some(right) => -right,
      None => 0,
    },
  };
  let dy = match style.inset.top.resolve(vertical_basis) {
    Some(top) => top,
    None => match style.inset.bottom.resolve(vertical_basis) {
      Some(bottom) => -bottom,
      None => 0,
    },
  };
  Point::new(dx, dy)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::px;
  use crate::style::computed::Length;
  use crate::style::computed::LengthMax;

  fn style_with_width(width: LengthAuto) -> BoxStyle {
    BoxStyle {
      width,
      ..BoxStyle::default()
    }
  }

  #[test]
  fn test_auto_width_fills_containing_block() {
    let style = style_with_width(LengthAuto::Auto);
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.width, px(400));
    assert_eq!(used.margin_left, 0);
    assert_eq!(used.margin_right, 0);
  }

  #[test]
  fn test_auto_margins_center_definite_width() {
    let mut style = style_with_width(LengthAuto::Units(px(100)));
    style.margin.left = LengthAuto::Auto;
    style.margin.right = LengthAuto::Auto;
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.margin_left, px(150));
    assert_eq!(used.margin_right, px(150));
  }

  #[test]
  fn test_single_auto_margin_absorbs_free_space() {
    let mut style = style_with_width(LengthAuto::Units(px(100)));
    style.margin.left = LengthAuto::Auto;
    style.margin.right = LengthAuto::Units(px(20));
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.margin_left, px(280));
    assert_eq!(used.margin_right, px(20));
  }

  #[test]
  fn test_over_constrained_overrides_right_margin() {
    let mut style = style_with_width(LengthAuto::Units(px(300)));
    style.margin.left = LengthAuto::Units(px(50));
    style.margin.right = LengthAuto::Units(px(500));
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.margin_left, px(50));
    assert_eq!(used.margin_right, px(50));
  }

  #[test]
  fn test_negative_margins_allowed() {
    let mut style = style_with_width(LengthAuto::Units(px(500)));
    style.margin.left = LengthAuto::Units(px(0));
    let used = solve_block_width(&style, px(400));
    // Free space is negative; the right margin goes negative, no
    // clamping.
    assert_eq!(used.margin_right, px(-100));
  }

  #[test]
  fn test_width_clamping() {
    let mut style = style_with_width(LengthAuto::Units(px(500)));
    style.max_width = LengthMax::Units(px(200));
    style.min_width = Length::Units(px(50));
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.width, px(200));

    let mut style = style_with_width(LengthAuto::Units(px(10)));
    style.min_width = Length::Units(px(50));
    let used = solve_block_width(&style, px(400));
    assert_eq!(used.width, px(50));
  }

  #[test]
  fn test_percentage_heights_need_definite_basis() {
    let mut style = BoxStyle::default();
    style.height = LengthAuto::Percent(50.0);
    assert_eq!(resolve_heights(&style, Some(px(400))).definite, Some(px(200)));
    assert_eq!(resolve_heights(&style, None).definite, None);
  }

  #[test]
  fn test_relative_offsets_prefer_start_edges() {
    let mut style = BoxStyle::default();
    style.inset.left = LengthAuto::Units(px(10));
    style.inset.right = LengthAuto::Units(px(99));
    style.inset.bottom = LengthAuto::Units(px(7));
    let offset = relative_offsets(&style, px(100), None);
    assert_eq!(offset, Point::new(px(10), px(-7)));
  }
}
