//! Selector parsing and matching
//!
//! Implements the Selectors Level 3 subset the engine matches against its
//! element tree: type and universal selectors (with namespaces), classes,
//! ids, attribute selectors, a handful of structural pseudo-classes, and
//! the four combinators.
//!
//! Reference: <https://www.w3.org/TR/selectors-3/>
//!
//! Parsing consumes a component subrange (a rule prelude) directly rather
//! than going through a [`ValueSource`](crate::css::values::ValueSource):
//! selectors are the one grammar in CSS where whitespace is significant
//! (`a b` is a descendant combinator, `a.b` is a compound), so the cursor
//! here keeps whitespace visible and checks adjacency by component index.
//!
//! Matching is right-to-left: the rightmost compound is checked against
//! the candidate element, then combinators walk ancestors and preceding
//! siblings. Sibling combinators only consider element siblings, never
//! text.

use crate::css::component_tree::ComponentExtra;
use crate::css::component_tree::ComponentIndex;
use crate::css::component_tree::ComponentTag;
use crate::css::component_tree::ComponentTree;
use crate::css::stylesheet::NamespaceId;
use crate::dom::ElementCategory;
use crate::dom::ElementRef;
use crate::dom::ElementTree;
use rustc_hash::FxHashMap;

/// Namespace declarations in scope while parsing a selector list.
pub struct NamespacePrefixes<'a> {
  pub prefixes: &'a FxHashMap<String, NamespaceId>,
  pub default_namespace: Option<NamespaceId>,
}

/// A combinator between two compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
  /// `a b`
  Descendant,
  /// `a > b`
  Child,
  /// `a + b`
  NextSibling,
  /// `a ~ b`
  SubsequentSibling,
}

/// Namespace constraint of a type or universal selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceConstraint {
  /// `*|e`: any namespace, or none
  Any,
  /// `|e`: no namespace
  NoNamespace,
  /// `ns|e`, or an unprefixed selector under a default namespace
  Specific(NamespaceId),
}

/// A type or universal selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSelector {
  pub namespace: NamespaceConstraint,
  /// `None` is the universal selector `*`
  pub name: Option<String>,
}

/// Attribute selector operators, Selectors 3 §6.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
  /// `=`
  Equal,
  /// `~=`
  Includes,
  /// `|=`
  DashMatch,
  /// `^=`
  Prefix,
  /// `$=`
  Suffix,
  /// `*=`
  Substring,
}

/// `[name]` or `[name <op> value]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
  pub name: String,
  pub operation: Option<(AttrOperator, String)>,
}

/// The structural pseudo-classes the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
  Root,
  Empty,
  FirstChild,
  LastChild,
  OnlyChild,
}

/// A simple selector other than the type selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
  Id(String),
  Class(String),
  Attribute(AttributeSelector),
  PseudoClass(PseudoClass),
}

/// A compound selector: an optional type selector plus simple selectors,
/// all constraining one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
  pub type_selector: Option<TypeSelector>,
  pub simple: Vec<SimpleSelector>,
}

/// A complex selector: compounds in document order with combinators
/// between them, plus its precomputed specificity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
  pub compounds: Vec<CompoundSelector>,
  /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
  pub combinators: Vec<Combinator>,
  pub specificity: u32,
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
  pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
  /// Matches the list against an element; returns the highest specificity
  /// among the matching selectors.
  pub fn match_element(&self, tree: &ElementTree, element: ElementRef) -> Option<u32> {
    self
      .selectors
      .iter()
      .filter(|selector| selector_matches(selector, tree, element))
      .map(|selector| selector.specificity)
      .max()
  }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a selector list from the component range `[start, end)`.
///
/// Returns `None` if any selector in the list is invalid; per the
/// standard, one bad selector poisons the whole list (and therefore the
/// rule).
pub fn parse_selector_list(
  tree: &ComponentTree,
  start: ComponentIndex,
  end: ComponentIndex,
  namespaces: &NamespacePrefixes,
) -> Option<SelectorList> {
  let mut cursor = Cursor { tree, pos: start, end };
  let mut selectors = Vec::new();
  loop {
    let selector = parse_complex(&mut cursor, namespaces)?;
    selectors.push(selector);
    cursor.skip_space();
    match cursor.peek_tag() {
      None => break,
      Some(ComponentTag::TokenComma) => cursor.advance(),
      Some(_) => return None,
    }
  }
  if selectors.is_empty() {
    return None;
  }
  Some(SelectorList { selectors })
}

struct Cursor<'a> {
  tree: &'a ComponentTree,
  pos: ComponentIndex,
  end: ComponentIndex,
}

impl Cursor<'_> {
  fn peek(&self) -> Option<ComponentIndex> {
    (self.pos < self.end).then_some(self.pos)
  }

  fn peek_tag(&self) -> Option<ComponentTag> {
    self.peek().map(|index| self.tree.tag(index))
  }

  fn advance(&mut self) {
    if self.pos < self.end {
      self.pos = self.tree.next_sibling(self.pos);
    }
  }

  /// Skips whitespace and comments; returns true if anything was
  /// skipped.
  fn skip_space(&mut self) -> bool {
    let mut skipped = false;
    while matches!(
      self.peek_tag(),
      Some(ComponentTag::TokenWhitespace) | Some(ComponentTag::TokenComment)
    ) {
      self.advance();
      skipped = true;
    }
    skipped
  }

  fn delim(&self) -> Option<char> {
    let index = self.peek()?;
    match (self.tree.tag(index), self.tree.extra(index)) {
      (ComponentTag::TokenDelim, ComponentExtra::Codepoint(c)) => Some(c),
      _ => None,
    }
  }
}

fn parse_complex(cursor: &mut Cursor, namespaces: &NamespacePrefixes) -> Option<ComplexSelector> {
  cursor.skip_space();
  let mut specificity = SpecificityCounter::default();
  let mut compounds = vec![parse_compound(cursor, namespaces, &mut specificity)?];
  let mut combinators = Vec::new();
  loop {
    let had_space = cursor.skip_space();
    let combinator = match cursor.peek_tag() {
      None | Some(ComponentTag::TokenComma) => break,
      _ => match cursor.delim() {
        Some('>') => {
          cursor.advance();
          cursor.skip_space();
          Combinator::Child
        }
        Some('+') => {
          cursor.advance();
          cursor.skip_space();
          Combinator::NextSibling
        }
        Some('~') => {
          cursor.advance();
          cursor.skip_space();
          Combinator::SubsequentSibling
        }
        _ if had_space => Combinator::Descendant,
        _ => return None,
      },
    };
    compounds.push(parse_compound(cursor, namespaces, &mut specificity)?);
    combinators.push(combinator);
  }
  Some(ComplexSelector {
    compounds,
    combinators,
    specificity: specificity.encode(),
  })
}

#[derive(Default)]
struct SpecificityCounter {
  ids: u32,
  classes: u32,
  types: u32,
}

impl SpecificityCounter {
  /// Packs (a, b, c) into one orderable integer, each component
  /// saturated at 1023.
  fn encode(&self) -> u32 {
    (self.ids.min(1023) << 20) | (self.classes.min(1023) << 10) | self.types.min(1023)
  }
}

fn parse_compound(
  cursor: &mut Cursor,
  namespaces: &NamespacePrefixes,
  specificity: &mut SpecificityCounter,
) -> Option<CompoundSelector> {
  let mut compound = CompoundSelector::default();

  if let Some(type_selector) = parse_type_selector(cursor, namespaces)? {
    if type_selector.name.is_some() {
      specificity.types += 1;
    }
    compound.type_selector = Some(type_selector);
  }

  loop {
    let Some(index) = cursor.peek() else { break };
    match cursor.tree.tag(index) {
      ComponentTag::TokenHashId => {
        compound
          .simple
          .push(SimpleSelector::Id(cursor.tree.copy_name_exact(index)));
        specificity.ids += 1;
        cursor.advance();
      }
      // A hash that is not a valid identifier (e.g. `#12`) is not a
      // selector.
      ComponentTag::TokenHashUnrestricted => return None,
      ComponentTag::TokenDelim if cursor.delim() == Some('.') => {
        cursor.advance();
        let name = cursor.peek()?;
        if cursor.tree.tag(name) != ComponentTag::TokenIdent {
          return None;
        }
        compound
          .simple
          .push(SimpleSelector::Class(cursor.tree.copy_name_exact(name)));
        specificity.classes += 1;
        cursor.advance();
      }
      ComponentTag::SimpleBlockBracket => {
        let attribute = parse_attribute(cursor.tree, index)?;
        compound.simple.push(SimpleSelector::Attribute(attribute));
        specificity.classes += 1;
        cursor.advance();
      }
      ComponentTag::TokenColon => {
        cursor.advance();
        let name = cursor.peek()?;
        if cursor.tree.tag(name) != ComponentTag::TokenIdent {
          // `::` pseudo-elements and anything functional are unsupported.
          return None;
        }
        let pseudo = [
          ("root", PseudoClass::Root),
          ("empty", PseudoClass::Empty),
          ("first-child", PseudoClass::FirstChild),
          ("last-child", PseudoClass::LastChild),
          ("only-child", PseudoClass::OnlyChild),
        ]
        .iter()
        .find(|(keyword, _)| cursor.tree.ident_eq(name, keyword))
        .map(|(_, pseudo)| *pseudo)?;
        compound.simple.push(SimpleSelector::PseudoClass(pseudo));
        specificity.classes += 1;
        cursor.advance();
      }
      _ => break,
    }
  }

  if compound.type_selector.is_none() && compound.simple.is_empty() {
    return None;
  }
  Some(compound)
}

/// Parses `ns|name`, `*|name`, `|name`, `name`, or `*` at the cursor.
/// Returns `Ok(None)`-style `Some(None)` when no type selector is
/// present; `None` means the selector is invalid (unknown prefix).
fn parse_type_selector(
  cursor: &mut Cursor,
  namespaces: &NamespacePrefixes,
) -> Option<Option<TypeSelector>> {
  let tree = cursor.tree;
  let Some(first) = cursor.peek() else {
    return Some(None);
  };

  // Detect an explicit namespace separator: the `|` must be the component
  // immediately after the prefix, and the name immediately after that.
  let is_bar = |index: ComponentIndex| {
    tree.tag(index) == ComponentTag::TokenDelim
      && matches!(tree.extra(index), ComponentExtra::Codepoint('|'))
  };

  let default_constraint = match namespaces.default_namespace {
    Some(id) => NamespaceConstraint::Specific(id),
    None => NamespaceConstraint::Any,
  };

  match tree.tag(first) {
    ComponentTag::TokenIdent => {
      if is_bar(first + 1) && first + 2 < cursor.end {
        let prefix = tree.copy_name(first);
        let namespace = *namespaces.prefixes.get(&prefix)?;
        cursor.advance();
        cursor.advance();
        let name = parse_type_name(cursor)?;
        Some(Some(TypeSelector {
          namespace: NamespaceConstraint::Specific(namespace),
          name,
        }))
      } else {
        let name = tree.copy_name(first);
        cursor.advance();
        Some(Some(TypeSelector {
          namespace: default_constraint,
          name: Some(name),
        }))
      }
    }
    ComponentTag::TokenDelim if cursor.delim() == Some('*') => {
      if is_bar(first + 1) && first + 2 < cursor.end {
        cursor.advance();
        cursor.advance();
        let name = parse_type_name(cursor)?;
        Some(Some(TypeSelector {
          namespace: NamespaceConstraint::Any,
          name,
        }))
      } else {
        cursor.advance();
        Some(Some(TypeSelector {
          namespace: default_constraint,
          name: None,
        }))
      }
    }
    ComponentTag::TokenDelim if cursor.delim() == Some('|') => {
      cursor.advance();
      let name = parse_type_name(cursor)?;
      Some(Some(TypeSelector {
        namespace: NamespaceConstraint::NoNamespace,
        name,
      }))
    }
    _ => Some(None),
  }
}

/// The `name` part after a namespace separator: an identifier or `*`.
fn parse_type_name(cursor: &mut Cursor) -> Option<Option<String>> {
  let index = cursor.peek()?;
  match cursor.tree.tag(index) {
    ComponentTag::TokenIdent => {
      let name = cursor.tree.copy_name(index);
      cursor.advance();
      Some(Some(name))
    }
    ComponentTag::TokenDelim if cursor.delim() == Some('*') => {
      cursor.advance();
      Some(None)
    }
    _ => None,
  }
}

/// Parses the inside of a `[...]` block as an attribute selector.
fn parse_attribute(tree: &ComponentTree, block: ComponentIndex) -> Option<AttributeSelector> {
  let mut cursor = Cursor {
    tree,
    pos: block + 1,
    end: tree.next_sibling(block),
  };
  cursor.skip_space();
  let name_index = cursor.peek()?;
  if tree.tag(name_index) != ComponentTag::TokenIdent {
    return None;
  }
  let name = tree.copy_name(name_index);
  cursor.advance();
  cursor.skip_space();

  let Some(op_index) = cursor.peek() else {
    return Some(AttributeSelector {
      name,
      operation: None,
    });
  };

  // Two-character operators arrive as two adjacent delim components.
  let operator = match cursor.delim() {
    Some('=') => {
      cursor.advance();
      AttrOperator::Equal
    }
    Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
      let eq = op_index + 1;
      let is_eq = eq < cursor.end
        && tree.tag(eq) == ComponentTag::TokenDelim
        && matches!(tree.extra(eq), ComponentExtra::Codepoint('='));
      if !is_eq {
        return None;
      }
      cursor.advance();
      cursor.advance();
      match c {
        '~' => AttrOperator::Includes,
        '|' => AttrOperator::DashMatch,
        '^' => AttrOperator::Prefix,
        '$' => AttrOperator::Suffix,
        _ => AttrOperator::Substring,
      }
    }
    _ => return None,
  };

  cursor.skip_space();
  let value_index = cursor.peek()?;
  let value = match tree.tag(value_index) {
    ComponentTag::TokenIdent => tree.copy_name_exact(value_index),
    ComponentTag::TokenString => tree.string_value(value_index),
    _ => return None,
  };
  cursor.advance();
  cursor.skip_space();
  if cursor.peek().is_some() {
    return None;
  }
  Some(AttributeSelector {
    name,
    operation: Some((operator, value)),
  })
}

// ============================================================================
// Matching
// ============================================================================

/// Matches one complex selector against an element, right to left.
pub fn selector_matches(
  selector: &ComplexSelector,
  tree: &ElementTree,
  element: ElementRef,
) -> bool {
  matches_from(selector, tree, selector.compounds.len() - 1, element)
}

fn matches_from(
  selector: &ComplexSelector,
  tree: &ElementTree,
  compound_index: usize,
  element: ElementRef,
) -> bool {
  if !compound_matches(&selector.compounds[compound_index], tree, element) {
    return false;
  }
  if compound_index == 0 {
    return true;
  }
  match selector.combinators[compound_index - 1] {
    Combinator::Child => match tree.parent(element) {
      Some(parent) => matches_from(selector, tree, compound_index - 1, parent),
      None => false,
    },
    Combinator::Descendant => {
      let mut ancestor = tree.parent(element);
      while let Some(candidate) = ancestor {
        if matches_from(selector, tree, compound_index - 1, candidate) {
          return true;
        }
        ancestor = tree.parent(candidate);
      }
      false
    }
    Combinator::NextSibling => match previous_element_sibling(tree, element) {
      Some(sibling) => matches_from(selector, tree, compound_index - 1, sibling),
      None => false,
    },
    Combinator::SubsequentSibling => {
      let mut sibling = previous_element_sibling(tree, element);
      while let Some(candidate) = sibling {
        if matches_from(selector, tree, compound_index - 1, candidate) {
          return true;
        }
        sibling = previous_element_sibling(tree, candidate);
      }
      false
    }
  }
}

/// Nearest preceding sibling of `Normal` category; text leaves are not
/// elements and do not participate in sibling combinators.
fn previous_element_sibling(tree: &ElementTree, element: ElementRef) -> Option<ElementRef> {
  let mut current = tree.previous_sibling(element);
  while let Some(sibling) = current {
    if tree.category(sibling) == ElementCategory::Normal {
      return Some(sibling);
    }
    current = tree.previous_sibling(sibling);
  }
  None
}

fn next_element_sibling(tree: &ElementTree, element: ElementRef) -> Option<ElementRef> {
  let mut current = tree.next_sibling(element);
  while let Some(sibling) = current {
    if tree.category(sibling) == ElementCategory::Normal {
      return Some(sibling);
    }
    current = tree.next_sibling(sibling);
  }
  None
}

fn compound_matches(compound: &CompoundSelector, tree: &ElementTree, element: ElementRef) -> bool {
  if tree.category(element) != ElementCategory::Normal {
    return false;
  }
  if let Some(type_selector) = &compound.type_selector {
    let namespace_ok = match type_selector.namespace {
      NamespaceConstraint::Any => true,
      NamespaceConstraint::NoNamespace => tree.namespace(element).is_none(),
      NamespaceConstraint::Specific(id) => tree.namespace(element) == Some(id),
    };
    if !namespace_ok {
      return false;
    }
    if let Some(name) = &type_selector.name {
      if !tree.name(element).eq_ignore_ascii_case(name) {
        return false;
      }
    }
  }
  compound
    .simple
    .iter()
    .all(|simple| simple_matches(simple, tree, element))
}

fn simple_matches(simple: &SimpleSelector, tree: &ElementTree, element: ElementRef) -> bool {
  match simple {
    SimpleSelector::Id(id) => tree.attribute(element, "id") == Some(id.as_str()),
    SimpleSelector::Class(class) => tree
      .attribute(element, "class")
      .is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class)),
    SimpleSelector::Attribute(attribute) => attribute_matches(attribute, tree, element),
    SimpleSelector::PseudoClass(pseudo) => match pseudo {
      PseudoClass::Root => tree.parent(element).is_none(),
      PseudoClass::Empty => tree.has_no_children(element),
      PseudoClass::FirstChild => {
        tree.parent(element).is_some() && previous_element_sibling(tree, element).is_none()
      }
      PseudoClass::LastChild => {
        tree.parent(element).is_some() && next_element_sibling(tree, element).is_none()
      }
      PseudoClass::OnlyChild => {
        tree.parent(element).is_some()
          && previous_element_sibling(tree, element).is_none()
          && next_element_sibling(tree, element).is_none()
      }
    },
  }
}

fn attribute_matches(
  attribute: &AttributeSelector,
  tree: &ElementTree,
  element: ElementRef,
) -> bool {
  let Some(value) = tree.attribute(element, &attribute.name) else {
    return false;
  };
  let Some((operator, expected)) = &attribute.operation else {
    return true;
  };
  match operator {
    AttrOperator::Equal => value == expected,
    AttrOperator::Includes => value.split_ascii_whitespace().any(|part| part == expected),
    AttrOperator::DashMatch => {
      value == expected
        || (value.len() > expected.len()
          && value.starts_with(expected.as_str())
          && value.as_bytes()[expected.len()] == b'-')
    }
    AttrOperator::Prefix => !expected.is_empty() && value.starts_with(expected.as_str()),
    AttrOperator::Suffix => !expected.is_empty() && value.ends_with(expected.as_str()),
    AttrOperator::Substring => !expected.is_empty() && value.contains(expected.as_str()),
  }
}
