//! Box tree
//!
//! The final output of layout: a forest of block subtrees plus the
//! stacking-context tree ordering their paint. Subtree 0 starts with the
//! initial containing block (block 0, sized to the viewport); additional
//! subtrees are opened for boxes that are laid out independently of their
//! surrounding flow (inline-blocks, absolutely positioned boxes).
//!
//! # Columns
//!
//! Like the component tree, each subtree is a set of parallel columns
//! indexed by [`BlockIndex`], skip-encoded: the subtree rooted at block
//! `i` occupies `[i, i + skip(i))`. Offsets are stored relative to the
//! parent block's content box; [`BlockSubtree::walk_absolute`] folds them
//! into absolute positions for consumers.
//!
//! # Index spaces
//!
//! Every id here is deliberately narrow (`u8`/`u16`). Exhausting an index
//! space is a typed error from layout, never a silent wrap.

use crate::dom::ElementRef;
use crate::error::LayoutError;
use crate::error::Result;
use crate::geometry::EdgeOffsets;
use crate::geometry::Point;
use crate::geometry::Size;
use crate::geometry::Unit;
use crate::images::ImageId;
use crate::style::computed::Edges;
use crate::style::values::BackgroundAttachment;
use crate::style::values::BackgroundBox;
use crate::style::values::BackgroundPosition;
use crate::style::values::BackgroundRepeat;
use crate::style::values::BackgroundSize;
use crate::style::values::Rgba;
use crate::text::GlyphId;
use rustc_hash::FxHashMap;

/// Identifier of a block subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubtreeId(pub u8);

/// Index of a block within one subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BlockIndex(pub u16);

/// A block across subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockRef {
  pub subtree: SubtreeId,
  pub index: BlockIndex,
}

/// Identifier of a stacking context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackingContextId(pub u16);

/// Identifier of an inline formatting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfcId(pub u16);

/// Border-box and content-box origins, relative to the parent block's
/// content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxOffsets {
  pub border: Point,
  pub content: Point,
}

/// Border-box and content-box sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxSize {
  pub border: Size,
  pub content: Size,
}

/// Resolved background of one block, written by the cosmetic pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
  pub color: Rgba,
  pub image: Option<ImageId>,
  pub repeat: BackgroundRepeat,
  pub attachment: BackgroundAttachment,
  pub position: BackgroundPosition,
  pub size: BackgroundSize,
  pub clip: BackgroundBox,
  pub origin: BackgroundBox,
}

impl Default for Background {
  fn default() -> Self {
    Self {
      color: Rgba::TRANSPARENT,
      image: None,
      repeat: BackgroundRepeat::default(),
      attachment: BackgroundAttachment::Scroll,
      position: BackgroundPosition::default(),
      size: BackgroundSize::default(),
      clip: BackgroundBox::BorderBox,
      origin: BackgroundBox::PaddingBox,
    }
  }
}

/// One block subtree: parallel columns, skip-encoded.
#[derive(Debug, Default)]
pub struct BlockSubtree {
  skips: Vec<u16>,
  offsets: Vec<BoxOffsets>,
  sizes: Vec<BoxSize>,
  borders: Vec<EdgeOffsets>,
  margins: Vec<EdgeOffsets>,
  border_colors: Vec<Edges<Rgba>>,
  backgrounds: Vec<Background>,
  stacking_contexts: Vec<Option<StackingContextId>>,
  elements: Vec<Option<ElementRef>>,
}

impl BlockSubtree {
  /// Number of blocks in this subtree.
  pub fn len(&self) -> u16 {
    self.skips.len() as u16
  }

  /// True if the subtree has no blocks.
  pub fn is_empty(&self) -> bool {
    self.skips.is_empty()
  }

  pub fn skip(&self, block: BlockIndex) -> u16 {
    self.skips[block.0 as usize]
  }

  pub fn offsets(&self, block: BlockIndex) -> BoxOffsets {
    self.offsets[block.0 as usize]
  }

  pub fn size(&self, block: BlockIndex) -> BoxSize {
    self.sizes[block.0 as usize]
  }

  pub fn border_widths(&self, block: BlockIndex) -> EdgeOffsets {
    self.borders[block.0 as usize]
  }

  pub fn margins(&self, block: BlockIndex) -> EdgeOffsets {
    self.margins[block.0 as usize]
  }

  pub fn border_colors(&self, block: BlockIndex) -> Edges<Rgba> {
    self.border_colors[block.0 as usize]
  }

  pub fn background(&self, block: BlockIndex) -> &Background {
    &self.backgrounds[block.0 as usize]
  }

  /// Stacking context owned by this block, if it is a context root.
  pub fn stacking_context(&self, block: BlockIndex) -> Option<StackingContextId> {
    self.stacking_contexts[block.0 as usize]
  }

  /// Element that generated this block; `None` for the initial
  /// containing block.
  pub fn element(&self, block: BlockIndex) -> Option<ElementRef> {
    self.elements[block.0 as usize]
  }

  /// Direct children of `block`.
  pub fn children(&self, block: BlockIndex) -> BlockChildren<'_> {
    BlockChildren {
      subtree: self,
      cursor: block.0 + 1,
      end: block.0 + self.skip(block),
    }
  }

  /// Calls `visit` for every block in preorder with the origin of its
  /// border box relative to the subtree root's containing block.
  pub fn walk_absolute(&self, mut visit: impl FnMut(BlockIndex, Point)) {
    // Stack of (subtree end, content origin of the enclosing block).
    let mut stack: Vec<(u16, Point)> = Vec::new();
    for index in 0..self.len() {
      while stack.last().is_some_and(|&(end, _)| index >= end) {
        stack.pop();
      }
      let parent_origin = stack.last().map(|&(_, origin)| origin).unwrap_or(Point::ZERO);
      let block = BlockIndex(index);
      let offsets = self.offsets(block);
      visit(block, parent_origin.translate(offsets.border));
      if self.skip(block) > 1 {
        stack.push((index + self.skip(block), parent_origin.translate(offsets.content)));
      }
    }
  }

  pub(crate) fn push_block(&mut self, element: Option<ElementRef>) -> Result<BlockIndex> {
    if self.skips.len() >= u16::MAX as usize {
      return Err(LayoutError::TooManyBlocks);
    }
    let index = BlockIndex(self.skips.len() as u16);
    self.skips.push(1);
    self.offsets.push(BoxOffsets::default());
    self.sizes.push(BoxSize::default());
    self.borders.push(EdgeOffsets::ZERO);
    self.margins.push(EdgeOffsets::ZERO);
    self.border_colors.push(Edges::uniform(Rgba::TRANSPARENT));
    self.backgrounds.push(Background::default());
    self.stacking_contexts.push(None);
    self.elements.push(element);
    Ok(index)
  }

  pub(crate) fn set_skip(&mut self, block: BlockIndex, skip: u16) {
    self.skips[block.0 as usize] = skip;
  }

  pub(crate) fn set_geometry(
    &mut self,
    block: BlockIndex,
    offsets: BoxOffsets,
    size: BoxSize,
    borders: EdgeOffsets,
    margins: EdgeOffsets,
  ) {
    self.offsets[block.0 as usize] = offsets;
    self.sizes[block.0 as usize] = size;
    self.borders[block.0 as usize] = borders;
    self.margins[block.0 as usize] = margins;
  }

  pub(crate) fn set_stacking_context(&mut self, block: BlockIndex, id: StackingContextId) {
    self.stacking_contexts[block.0 as usize] = Some(id);
  }

  pub(crate) fn set_cosmetics(
    &mut self,
    block: BlockIndex,
    background: Background,
    border_colors: Edges<Rgba>,
  ) {
    self.backgrounds[block.0 as usize] = background;
    self.border_colors[block.0 as usize] = border_colors;
  }
}

/// Iterator over the direct children of a block.
pub struct BlockChildren<'a> {
  subtree: &'a BlockSubtree,
  cursor: u16,
  end: u16,
}

impl Iterator for BlockChildren<'_> {
  type Item = BlockIndex;

  fn next(&mut self) -> Option<BlockIndex> {
    if self.cursor >= self.end {
      return None;
    }
    let block = BlockIndex(self.cursor);
    self.cursor += self.subtree.skip(block);
    Some(block)
  }
}

/// One glyph positioned within a text run, x relative to the run origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedGlyph {
  pub id: GlyphId,
  pub x: Unit,
}

/// An item laid out inside an inline formatting context.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineItem {
  /// A run of shaped glyphs from one text element
  TextRun(TextRun),
  /// An atomic inline: a block subtree participating in the line
  InlineBlock(InlineBlockItem),
  /// Start of an inline box (a `span`-like element); items until the
  /// matching `InlineBoxEnd` are inside it
  InlineBoxStart { element: ElementRef },
  InlineBoxEnd,
}

/// A run of glyphs sharing one origin and color.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
  pub element: ElementRef,
  /// Top-left of the run, relative to the IFC origin
  pub origin: Point,
  pub glyphs: Vec<PositionedGlyph>,
  /// Written by the cosmetic pass
  pub color: Rgba,
}

/// An inline-block placed on a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlineBlockItem {
  /// Root block of the inline-block's subtree
  pub block: BlockRef,
  /// Border-box top-left, relative to the IFC origin
  pub origin: Point,
}

/// One line box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBox {
  /// Top of the line, relative to the IFC origin
  pub top: Unit,
  /// Baseline position, relative to the IFC origin
  pub baseline: Unit,
  /// Range into [`InlineFormattingContext::items`]
  pub items: (u32, u32),
}

/// An inline formatting context: the lines and items laid out within one
/// block container.
#[derive(Debug)]
pub struct InlineFormattingContext {
  pub id: IfcId,
  /// Block whose content box hosts this IFC
  pub parent_block: BlockRef,
  /// Origin within the parent block's content box
  pub origin: Point,
  /// Total advance height of all lines
  pub height: Unit,
  pub lines: Vec<LineBox>,
  pub items: Vec<InlineItem>,
}

/// One entry of the stacking-context tree (skip-encoded, preorder).
#[derive(Debug, Clone, PartialEq)]
pub struct StackingContextEntry {
  pub skip: u16,
  pub id: StackingContextId,
  pub z_index: i32,
  /// Block owning this context
  pub block: BlockRef,
  /// Inline formatting contexts painted within this context
  pub ifcs: Vec<IfcId>,
}

/// The stacking-context tree: a skip-encoded array in paint order.
///
/// Children of one parent are sorted by z-index, stable for equal values
/// (document order).
#[derive(Debug, Default)]
pub struct StackingContextTree {
  entries: Vec<StackingContextEntry>,
}

impl StackingContextTree {
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entry(&self, index: usize) -> &StackingContextEntry {
    &self.entries[index]
  }

  /// Iterates the direct children of the context at `index`.
  pub fn children(&self, index: usize) -> StackingContextChildren<'_> {
    StackingContextChildren {
      tree: self,
      cursor: index + 1,
      end: index + self.entries[index].skip as usize,
    }
  }

  /// Finds the index of a context by id (linear scan; the tree is
  /// small).
  pub fn index_of(&self, id: StackingContextId) -> Option<usize> {
    self.entries.iter().position(|entry| entry.id == id)
  }

  pub(crate) fn insert(&mut self, at: usize, entry: StackingContextEntry) {
    self.entries.insert(at, entry);
  }

  pub(crate) fn entry_mut(&mut self, index: usize) -> &mut StackingContextEntry {
    &mut self.entries[index]
  }
}

/// Iterator over the direct children of a stacking context.
pub struct StackingContextChildren<'a> {
  tree: &'a StackingContextTree,
  cursor: usize,
  end: usize,
}

impl Iterator for StackingContextChildren<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    if self.cursor >= self.end {
      return None;
    }
    let index = self.cursor;
    self.cursor += self.tree.entries[index].skip as usize;
    Some(index)
  }
}

/// The complete output of layout.
///
/// Owns every block subtree, inline formatting context, and the
/// stacking-context tree. Dropping the box tree frees all of it in bulk;
/// nothing inside references caller memory.
#[derive(Debug, Default)]
pub struct BoxTree {
  subtrees: Vec<BlockSubtree>,
  ifcs: Vec<InlineFormattingContext>,
  pub stacking_contexts: StackingContextTree,
  element_blocks: FxHashMap<ElementRef, BlockRef>,
}

impl BoxTree {
  /// The viewport-sized block at the root of layout: block 0 of
  /// subtree 0.
  pub fn initial_containing_block(&self) -> BlockRef {
    BlockRef {
      subtree: SubtreeId(0),
      index: BlockIndex(0),
    }
  }

  /// Number of block subtrees.
  pub fn subtree_count(&self) -> usize {
    self.subtrees.len()
  }

  pub fn subtree(&self, id: SubtreeId) -> &BlockSubtree {
    &self.subtrees[id.0 as usize]
  }

  /// All inline formatting contexts, in creation order.
  pub fn ifcs(&self) -> &[InlineFormattingContext] {
    &self.ifcs
  }

  pub fn ifc(&self, id: IfcId) -> &InlineFormattingContext {
    &self.ifcs[id.0 as usize]
  }

  pub(crate) fn ifc_mut(&mut self, id: IfcId) -> &mut InlineFormattingContext {
    &mut self.ifcs[id.0 as usize]
  }

  /// The principal block an element generated, if any.
  pub fn block_for_element(&self, element: ElementRef) -> Option<BlockRef> {
    self.element_blocks.get(&element).copied()
  }

  pub(crate) fn new_subtree(&mut self) -> Result<SubtreeId> {
    if self.subtrees.len() > u8::MAX as usize {
      return Err(LayoutError::TooManyBlockSubtrees);
    }
    let id = SubtreeId(self.subtrees.len() as u8);
    self.subtrees.push(BlockSubtree::default());
    Ok(id)
  }

  pub(crate) fn subtree_mut(&mut self, id: SubtreeId) -> &mut BlockSubtree {
    &mut self.subtrees[id.0 as usize]
  }

  pub(crate) fn push_ifc(&mut self, ifc: InlineFormattingContext) -> Result<IfcId> {
    if self.ifcs.len() >= u16::MAX as usize {
      return Err(LayoutError::TooManyIfcs);
    }
    let id = IfcId(self.ifcs.len() as u16);
    debug_assert_eq!(ifc.id, id);
    self.ifcs.push(ifc);
    Ok(id)
  }

  pub(crate) fn next_ifc_id(&self) -> Result<IfcId> {
    if self.ifcs.len() >= u16::MAX as usize {
      return Err(LayoutError::TooManyIfcs);
    }
    Ok(IfcId(self.ifcs.len() as u16))
  }

  pub(crate) fn record_element_block(&mut self, element: ElementRef, block: BlockRef) {
    self.element_blocks.insert(element, block);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_subtree_capacity_is_enforced() {
    let mut tree = BoxTree::default();
    for _ in 0..=u8::MAX {
      tree.new_subtree().unwrap();
    }
    assert_eq!(tree.new_subtree(), Err(LayoutError::TooManyBlockSubtrees));
  }

  #[test]
  fn test_block_children_iteration() {
    let mut subtree = BlockSubtree::default();
    // root(skip 4) -> [a(skip 2) -> [b], c]
    let root = subtree.push_block(None).unwrap();
    let a = subtree.push_block(None).unwrap();
    let _b = subtree.push_block(None).unwrap();
    let c = subtree.push_block(None).unwrap();
    subtree.set_skip(root, 4);
    subtree.set_skip(a, 2);
    let children: Vec<_> = subtree.children(root).collect();
    assert_eq!(children, vec![a, c]);
  }

  #[test]
  fn test_walk_absolute_accumulates_offsets() {
    let mut subtree = BlockSubtree::default();
    let root = subtree.push_block(None).unwrap();
    let child = subtree.push_block(None).unwrap();
    subtree.set_skip(root, 2);
    subtree.set_geometry(
      root,
      BoxOffsets {
        border: Point::new(0, 0),
        content: Point::new(8, 8),
      },
      BoxSize::default(),
      EdgeOffsets::ZERO,
      EdgeOffsets::ZERO,
    );
    subtree.set_geometry(
      child,
      BoxOffsets {
        border: Point::new(4, 6),
        content: Point::new(4, 6),
      },
      BoxSize::default(),
      EdgeOffsets::ZERO,
      EdgeOffsets::ZERO,
    );
    let mut seen = Vec::new();
    subtree.walk_absolute(|block, origin| seen.push((block, origin)));
    assert_eq!(
      seen,
      vec![
        (root, Point::new(0, 0)),
        (child, Point::new(12, 14)),
      ]
    );
  }
}
