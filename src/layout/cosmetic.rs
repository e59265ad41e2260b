//! Cosmetic pass
//!
//! The second traversal over the element tree: resolves colors, border
//! colors, backgrounds, and text color, and writes them into the box
//! tree's cosmetic columns. Geometry is never touched here.
//!
//! The traversal mirrors the box-generation pass (same element order,
//! same style-computer stack discipline) so inheritance resolves
//! identically, but it is much simpler: every normal element is visited,
//! and elements that generated a block get their columns written.

use crate::dom::ElementCategory;
use crate::dom::ElementRef;
use crate::dom::ElementTree;
use crate::images::Images;
use crate::style::computed::CosmeticStyle;
use crate::style::values::BackgroundImage;
use crate::style::values::Rgba;
use crate::style::Stage;
use crate::style::StyleComputer;
use crate::tree::box_tree::Background;
use crate::tree::box_tree::BoxTree;
use crate::tree::box_tree::InlineItem;
use rustc_hash::FxHashMap;

/// Runs the cosmetic pass over a completed box tree.
pub(crate) fn run_cosmetic_pass(
  tree: &mut BoxTree,
  elements: &ElementTree,
  root: ElementRef,
  images: &Images,
) {
  let mut computer = StyleComputer::new(elements);
  let mut text_colors: FxHashMap<ElementRef, Rgba> = FxHashMap::default();

  // Stack of subtree end indices; popping one pops the computer.
  let mut open_ends: Vec<u32> = Vec::new();
  let mut cursor = root.0;
  let end = elements.subtree_end(root);
  while cursor < end {
    let element = ElementRef(cursor);
    while open_ends.last().is_some_and(|&open_end| cursor >= open_end) {
      open_ends.pop();
      computer.pop_element();
    }
    match elements.category(element) {
      ElementCategory::Text => {
        // Text takes the color of its parent element; the document root
        // itself may be text, in which case the initial color applies.
        let color = if computer.depth() > 0 {
          computer.current_cosmetic_style().color
        } else {
          CosmeticStyle::default().color
        };
        text_colors.insert(element, color);
        cursor += 1;
      }
      ElementCategory::Normal => {
        computer.push_element(Stage::Cosmetic, element);
        open_ends.push(elements.subtree_end(element));
        if let Some(block_ref) = tree.block_for_element(element) {
          let style = computer.current_cosmetic_style();
          let background = resolve_background(style, images);
          let border_colors = style.border_colors;
          tree
            .subtree_mut(block_ref.subtree)
            .set_cosmetics(block_ref.index, background, border_colors);
        }
        cursor += 1;
      }
    }
  }

  paint_text_runs(tree, &text_colors);
}

fn resolve_background(style: &CosmeticStyle, images: &Images) -> Background {
  let image = match &style.background.image {
    BackgroundImage::None => None,
    BackgroundImage::Url(url) => images.find_url(url),
  };
  Background {
    color: style.background.color,
    image,
    repeat: style.background.repeat,
    attachment: style.background.attachment,
    position: style.background.position,
    size: style.background.size,
    clip: style.background.clip,
    origin: style.background.origin,
  }
}

fn paint_text_runs(tree: &mut BoxTree, text_colors: &FxHashMap<ElementRef, Rgba>) {
  for index in 0..tree.ifcs().len() {
    let id = crate::tree::box_tree::IfcId(index as u16);
    let ifc = tree.ifc_mut(id);
    for item in &mut ifc.items {
      if let InlineItem::TextRun(run) = item {
        if let Some(&color) = text_colors.get(&run.element) {
          run.color = color;
        }
      }
    }
  }
}
