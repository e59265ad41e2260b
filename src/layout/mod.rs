//! Layout engine
//!
//! Two passes over the same element tree produce the box tree:
//!
//! 1. **Box generation** ([`flow`]): computes used sizes and positions,
//!    emits block subtrees and inline formatting contexts, and threads
//!    the stacking-context manager ([`stacking`]) through every block
//!    push and pop.
//! 2. **Cosmetics** ([`cosmetic`]): resolves colors, borders, and
//!    backgrounds into the finished tree without moving anything.
//!
//! [`do_layout`] is the public entry point.

pub mod cosmetic;
pub mod flow;
pub mod inline;
pub mod stacking;

use crate::dom::ElementRef;
use crate::dom::ElementTree;
use crate::error::Result;
use crate::geometry::Size;
use crate::images::Images;
use crate::text::FontHandle;
use crate::tree::box_tree::BoxTree;

/// Lays out `root` (and its subtree) into a box tree for the given
/// viewport.
///
/// The element tree and image table are read-only collaborators; the
/// font handle supplies shaping and metrics for inline layout. On error
/// the partially built tree is dropped in full.
///
/// Running layout twice over the same inputs yields structurally equal
/// box trees; there is no hidden state.
pub fn do_layout(
  elements: &ElementTree,
  root: ElementRef,
  font: &dyn FontHandle,
  images: &Images,
  viewport: Size,
) -> Result<BoxTree> {
  let mut tree = flow::run_box_pass(elements, root, font, viewport)?;
  cosmetic::run_cosmetic_pass(&mut tree, elements, root, images);
  Ok(tree)
}
