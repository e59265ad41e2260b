//! Element tree
//!
//! The input document the engine lays out. Like every tree in this crate
//! it is stored flat and skip-encoded: element `i` owns the index range
//! `(i, i + skip(i))`, so skipping a whole subtree is O(1) and the layout
//! passes can traverse siblings without touching their descendants.
//!
//! Elements come in two categories: `normal` elements with a tag name,
//! optional namespace, and attributes, and `text` elements that carry a
//! text run and nothing else. Each normal element additionally holds its
//! *cascaded declaration sets*: the declaration blocks that matched it,
//! in cascade order, either produced by
//! [`apply_stylesheet`](crate::css::stylesheet::apply_stylesheet) or
//! attached directly by the host.
//!
//! The tree is immutable once built; use [`ElementTreeBuilder`] to
//! construct it in document order.

use crate::css::stylesheet::CascadeOrigin;
use crate::css::stylesheet::Declaration;
use crate::css::stylesheet::NamespaceId;
use std::sync::Arc;

/// Index of an element in an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub u32);

/// The two element categories the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCategory {
  /// A container element with a name, attributes, and children
  Normal,
  /// A leaf holding a text run
  Text,
}

/// Specificity attached to declaration blocks the host installs directly
/// on an element (the `style` attribute position: above any selector).
pub const INLINE_STYLE_SPECIFICITY: u32 = u32::MAX;

/// One declaration block that matched an element, tagged with everything
/// the cascade needs to rank it.
#[derive(Debug, Clone)]
pub struct CascadedBlock {
  pub declarations: Arc<Vec<Declaration>>,
  pub origin: CascadeOrigin,
  pub specificity: u32,
}

/// A flat, skip-encoded document tree.
pub struct ElementTree {
  skips: Vec<u32>,
  categories: Vec<ElementCategory>,
  names: Vec<String>,
  namespaces: Vec<Option<NamespaceId>>,
  texts: Vec<String>,
  attributes: Vec<Vec<(String, String)>>,
  parents: Vec<Option<ElementRef>>,
  prev_siblings: Vec<Option<ElementRef>>,
  cascaded: Vec<Vec<CascadedBlock>>,
}

impl ElementTree {
  /// Number of elements.
  pub fn len(&self) -> u32 {
    self.skips.len() as u32
  }

  /// True if the tree holds no elements.
  pub fn is_empty(&self) -> bool {
    self.skips.is_empty()
  }

  /// Category of `element`.
  pub fn category(&self, element: ElementRef) -> ElementCategory {
    self.categories[element.0 as usize]
  }

  /// Size of the subtree rooted at `element`, itself included.
  pub fn skip(&self, element: ElementRef) -> u32 {
    self.skips[element.0 as usize]
  }

  /// Index just past the subtree rooted at `element`.
  pub fn subtree_end(&self, element: ElementRef) -> u32 {
    element.0 + self.skip(element)
  }

  /// Iterates the direct children of `element`.
  pub fn children(&self, element: ElementRef) -> ElementChildren<'_> {
    ElementChildren {
      tree: self,
      cursor: element.0 + 1,
      end: self.subtree_end(element),
    }
  }

  /// Parent of `element`, `None` for the root.
  pub fn parent(&self, element: ElementRef) -> Option<ElementRef> {
    self.parents[element.0 as usize]
  }

  /// Previous sibling of `element`, if any.
  pub fn previous_sibling(&self, element: ElementRef) -> Option<ElementRef> {
    self.prev_siblings[element.0 as usize]
  }

  /// Next sibling of `element`, if any.
  pub fn next_sibling(&self, element: ElementRef) -> Option<ElementRef> {
    let parent = self.parent(element)?;
    let candidate = self.subtree_end(element);
    if candidate < self.subtree_end(parent) {
      Some(ElementRef(candidate))
    } else {
      None
    }
  }

  /// Tag name of a normal element; empty for text elements.
  pub fn name(&self, element: ElementRef) -> &str {
    &self.names[element.0 as usize]
  }

  /// Namespace of a normal element.
  pub fn namespace(&self, element: ElementRef) -> Option<NamespaceId> {
    self.namespaces[element.0 as usize]
  }

  /// Text content of a text element; empty for normal elements.
  pub fn text(&self, element: ElementRef) -> &str {
    &self.texts[element.0 as usize]
  }

  /// Attribute lookup; names compare ASCII case-insensitively, values are
  /// returned verbatim.
  pub fn attribute(&self, element: ElementRef, name: &str) -> Option<&str> {
    self.attributes[element.0 as usize]
      .iter()
      .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  /// True if `element` has no children at all.
  pub fn has_no_children(&self, element: ElementRef) -> bool {
    self.skip(element) == 1
  }

  /// The declaration blocks that matched `element`, in cascade order.
  pub fn cascaded_blocks(&self, element: ElementRef) -> &[CascadedBlock] {
    &self.cascaded[element.0 as usize]
  }

  /// Installs a declaration block directly on an element, at inline-style
  /// precedence. Intended for hosts that carry per-element styles outside
  /// any stylesheet.
  pub fn add_declarations(
    &mut self,
    element: ElementRef,
    origin: CascadeOrigin,
    declarations: Vec<Declaration>,
  ) {
    self.cascaded[element.0 as usize].push(CascadedBlock {
      declarations: Arc::new(declarations),
      origin,
      specificity: INLINE_STYLE_SPECIFICITY,
    });
  }

  pub(crate) fn push_matched_block(&mut self, element: ElementRef, block: CascadedBlock) {
    self.cascaded[element.0 as usize].push(block);
  }
}

/// Iterator over the direct children of an element.
pub struct ElementChildren<'a> {
  tree: &'a ElementTree,
  cursor: u32,
  end: u32,
}

impl Iterator for ElementChildren<'_> {
  type Item = ElementRef;

  fn next(&mut self) -> Option<ElementRef> {
    if self.cursor >= self.end {
      return None;
    }
    let element = ElementRef(self.cursor);
    self.cursor = self.tree.subtree_end(element);
    Some(element)
  }
}

/// Builds an [`ElementTree`] in document order.
///
/// # Examples
///
/// ```
/// use boxflow::dom::ElementTreeBuilder;
///
/// let mut builder = ElementTreeBuilder::new();
/// let root = builder.open_element("div");
/// builder.attribute("id", "main");
/// builder.text("hello");
/// builder.close_element();
/// let tree = builder.finish();
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree.attribute(root, "id"), Some("main"));
/// ```
#[derive(Default)]
pub struct ElementTreeBuilder {
  tree: Option<ElementTree>,
  open: Vec<u32>,
  last_sibling: Vec<Option<ElementRef>>,
}

impl ElementTreeBuilder {
  pub fn new() -> Self {
    Self {
      tree: Some(ElementTree {
        skips: Vec::new(),
        categories: Vec::new(),
        names: Vec::new(),
        namespaces: Vec::new(),
        texts: Vec::new(),
        attributes: Vec::new(),
        parents: Vec::new(),
        prev_siblings: Vec::new(),
        cascaded: Vec::new(),
      }),
      open: Vec::new(),
      last_sibling: vec![None],
    }
  }

  fn append(&mut self, category: ElementCategory, name: &str, text: &str) -> ElementRef {
    let tree = self.tree.as_mut().expect("builder already finished");
    let element = ElementRef(tree.skips.len() as u32);
    let parent = self.open.last().map(|&index| ElementRef(index));
    let prev = self.last_sibling.last_mut().expect("sibling frame");
    tree.skips.push(1);
    tree.categories.push(category);
    tree.names.push(name.to_ascii_lowercase());
    tree.namespaces.push(None);
    tree.texts.push(text.to_string());
    tree.attributes.push(Vec::new());
    tree.parents.push(parent);
    tree.prev_siblings.push(*prev);
    tree.cascaded.push(Vec::new());
    *prev = Some(element);
    element
  }

  /// Opens a normal element; children follow until
  /// [`close_element`](Self::close_element).
  pub fn open_element(&mut self, name: &str) -> ElementRef {
    let element = self.append(ElementCategory::Normal, name, "");
    self.open.push(element.0);
    self.last_sibling.push(None);
    element
  }

  /// Sets the namespace of the innermost open element.
  pub fn namespace(&mut self, namespace: NamespaceId) {
    let tree = self.tree.as_mut().expect("builder already finished");
    let &index = self.open.last().expect("an open element");
    tree.namespaces[index as usize] = Some(namespace);
  }

  /// Adds an attribute to the innermost open element.
  pub fn attribute(&mut self, name: &str, value: &str) {
    let tree = self.tree.as_mut().expect("builder already finished");
    let &index = self.open.last().expect("an open element");
    tree.attributes[index as usize].push((name.to_ascii_lowercase(), value.to_string()));
  }

  /// Appends a text leaf under the innermost open element.
  pub fn text(&mut self, text: &str) -> ElementRef {
    self.append(ElementCategory::Text, "", text)
  }

  /// Closes the innermost open element, fixing up its skip.
  pub fn close_element(&mut self) {
    let tree = self.tree.as_mut().expect("builder already finished");
    let index = self.open.pop().expect("an open element");
    self.last_sibling.pop();
    tree.skips[index as usize] = tree.skips.len() as u32 - index;
  }

  /// Finishes the tree. Any still-open elements are closed.
  pub fn finish(mut self) -> ElementTree {
    while !self.open.is_empty() {
      self.close_element();
    }
    self.tree.take().expect("builder already finished")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> (ElementTree, Vec<ElementRef>) {
    // <div><p>one</p><p><span/>two</p></div>
    let mut builder = ElementTreeBuilder::new();
    let mut refs = Vec::new();
    refs.push(builder.open_element("div"));
    refs.push(builder.open_element("p"));
    refs.push(builder.text("one"));
    builder.close_element();
    refs.push(builder.open_element("p"));
    refs.push(builder.open_element("span"));
    builder.close_element();
    refs.push(builder.text("two"));
    builder.close_element();
    builder.close_element();
    (builder.finish(), refs)
  }

  #[test]
  fn test_skip_encoding() {
    let (tree, refs) = sample();
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.skip(refs[0]), 6);
    assert_eq!(tree.skip(refs[1]), 2);
    assert_eq!(tree.skip(refs[3]), 3);
    assert_eq!(tree.subtree_end(refs[0]), 6);
  }

  #[test]
  fn test_navigation() {
    let (tree, refs) = sample();
    let children: Vec<_> = tree.children(refs[0]).collect();
    assert_eq!(children, vec![refs[1], refs[3]]);
    assert_eq!(tree.parent(refs[1]), Some(refs[0]));
    assert_eq!(tree.parent(refs[0]), None);
    assert_eq!(tree.previous_sibling(refs[3]), Some(refs[1]));
    assert_eq!(tree.next_sibling(refs[1]), Some(refs[3]));
    assert_eq!(tree.next_sibling(refs[3]), None);
  }

  #[test]
  fn test_categories_and_content() {
    let (tree, refs) = sample();
    assert_eq!(tree.category(refs[0]), ElementCategory::Normal);
    assert_eq!(tree.category(refs[2]), ElementCategory::Text);
    assert_eq!(tree.name(refs[1]), "p");
    assert_eq!(tree.text(refs[2]), "one");
    assert!(tree.has_no_children(refs[4]));
    assert!(!tree.has_no_children(refs[0]));
  }

  #[test]
  fn test_attribute_names_case_insensitive() {
    let mut builder = ElementTreeBuilder::new();
    let e = builder.open_element("div");
    builder.attribute("Data-X", "Value");
    let tree = builder.finish();
    assert_eq!(tree.attribute(e, "data-x"), Some("Value"));
    assert_eq!(tree.attribute(e, "DATA-X"), Some("Value"));
    assert_eq!(tree.attribute(e, "other"), None);
  }
}
