//! Component tree
//!
//! Parsed CSS is stored as a flat, densely packed sequence of tagged nodes
//! rather than an owning pointer tree. Every node records the size of its
//! subtree through `next_sibling`, so a consumer can skip a whole rule,
//! block, or function in O(1) and enumerate children without touching the
//! nodes in between. The cascade and the value parsers traverse the same
//! node set several times; the flat encoding keeps those passes
//! cache-friendly.
//!
//! # Structure
//!
//! Node `i` owns the half-open index range `(i, next_sibling(i))`: every
//! node in it is a descendant, and no descendant's `next_sibling` points
//! past it. Leaf tokens have `next_sibling == i + 1`.
//!
//! The tree owns a copy of the source text. Nodes store only their byte
//! offset; token extents are recovered by re-running the tokenizer from the
//! offset, which is cheap because tokens are self-delimiting.

use crate::css::tokenizer;
use crate::css::tokenizer::DimensionUnit;
use crate::css::tokenizer::Token;
use std::fmt;

/// Index of a node in a [`ComponentTree`].
pub type ComponentIndex = u32;

/// Tag of a component-tree node.
///
/// Container tags own the index range up to their `next_sibling`; the
/// `Token*` tags are leaves carried over from the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentTag {
  /// Top-level list of rules; always the root node of a parsed stylesheet
  RuleList,
  /// An at-rule: `@name prelude... { body }` or `@name prelude... ;`
  AtRule,
  /// A qualified rule: `prelude... { body }`
  QualifiedRule,
  /// `{ ... }`
  SimpleBlockCurly,
  /// `[ ... ]`
  SimpleBlockBracket,
  /// `( ... )`
  SimpleBlockParen,
  /// `name( ... )`
  Function,

  TokenIdent,
  TokenAtKeyword,
  TokenString,
  TokenBadString,
  TokenUrl,
  TokenBadUrl,
  TokenNumber,
  TokenInteger,
  TokenDimension,
  TokenPercentage,
  TokenDelim,
  TokenColon,
  TokenSemicolon,
  TokenComma,
  TokenWhitespace,
  TokenComment,
  TokenCdo,
  TokenCdc,
  TokenHashId,
  TokenHashUnrestricted,
  TokenLeftCurly,
  TokenRightCurly,
  TokenLeftBracket,
  TokenRightBracket,
  TokenLeftParen,
  TokenRightParen,
}

impl ComponentTag {
  /// True for tags that may own descendants.
  pub fn is_container(self) -> bool {
    matches!(
      self,
      ComponentTag::RuleList
        | ComponentTag::AtRule
        | ComponentTag::QualifiedRule
        | ComponentTag::SimpleBlockCurly
        | ComponentTag::SimpleBlockBracket
        | ComponentTag::SimpleBlockParen
        | ComponentTag::Function
    )
  }
}

/// Per-tag payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ComponentExtra {
  #[default]
  None,
  /// `TokenDelim`: the delimiter code point
  Codepoint(char),
  /// `TokenNumber` / `TokenPercentage`: the parsed numeric value
  Number(f64),
  /// `TokenInteger`: the parsed value, `0` if out of `i32` range
  Integer(i32),
  /// `TokenDimension`: the parsed value and its unit
  Dimension { value: f64, unit: DimensionUnit },
  /// `AtRule` / `QualifiedRule`: index of the `{}` block ending the
  /// prelude, if the rule has one
  BodyIndex(ComponentIndex),
}

/// A parsed CSS fragment: flat node columns plus the source text they
/// index into.
///
/// Produced by [`parse_stylesheet`](crate::css::parser::parse_stylesheet)
/// and [`parse_list_of_component_values`](crate::css::parser::parse_list_of_component_values).
/// All parsed state is owned by the tree and freed in bulk when it drops.
pub struct ComponentTree {
  source: String,
  tags: Vec<ComponentTag>,
  locations: Vec<u32>,
  next_siblings: Vec<ComponentIndex>,
  extras: Vec<ComponentExtra>,
}

impl ComponentTree {
  pub(crate) fn new(source: String) -> Self {
    Self {
      source,
      tags: Vec::new(),
      locations: Vec::new(),
      next_siblings: Vec::new(),
      extras: Vec::new(),
    }
  }

  /// Number of nodes in the tree.
  pub fn len(&self) -> ComponentIndex {
    self.tags.len() as ComponentIndex
  }

  /// True if the tree has no nodes.
  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }

  /// The source text this tree was parsed from.
  pub fn source(&self) -> &str {
    &self.source
  }

  /// Tag of node `index`.
  pub fn tag(&self, index: ComponentIndex) -> ComponentTag {
    self.tags[index as usize]
  }

  /// Byte offset of the first token of node `index`.
  pub fn location(&self, index: ComponentIndex) -> usize {
    self.locations[index as usize] as usize
  }

  /// Index just past the subtree rooted at `index`.
  pub fn next_sibling(&self, index: ComponentIndex) -> ComponentIndex {
    self.next_siblings[index as usize]
  }

  /// Payload of node `index`.
  pub fn extra(&self, index: ComponentIndex) -> ComponentExtra {
    self.extras[index as usize]
  }

  /// Iterates the direct children of container node `index`.
  pub fn children(&self, index: ComponentIndex) -> Children<'_> {
    Children {
      tree: self,
      cursor: index + 1,
      end: self.next_sibling(index),
    }
  }

  /// Re-tokenizes the leaf token at node `index` to recover its extent.
  pub fn token_at(&self, index: ComponentIndex) -> Token {
    tokenizer::next_token(&self.source, self.location(index))
  }

  /// Raw source text of the leaf token at node `index`.
  pub fn token_text(&self, index: ComponentIndex) -> &str {
    let token = self.token_at(index);
    &self.source[token.start..token.end]
  }

  /// Byte offset of the name of an ident-carrying node: the identifier
  /// itself, the part after `@` or `#`, or a function's name.
  pub fn name_offset(&self, index: ComponentIndex) -> usize {
    match self.tag(index) {
      ComponentTag::AtRule
      | ComponentTag::TokenAtKeyword
      | ComponentTag::TokenHashId
      | ComponentTag::TokenHashUnrestricted => self.location(index) + 1,
      _ => self.location(index),
    }
  }

  /// Compares the name of node `index` against an ASCII needle, ignoring
  /// case, without materializing the identifier.
  pub fn ident_eq(&self, index: ComponentIndex, needle: &str) -> bool {
    tokenizer::ident_eq_ignore_case(&self.source, self.name_offset(index), needle)
  }

  /// Copies the (case-folded) name of node `index`.
  pub fn copy_name(&self, index: ComponentIndex) -> String {
    tokenizer::copy_ident(&self.source, self.name_offset(index))
  }

  /// Copies the name of node `index` without case folding. Ids, classes,
  /// and attribute values are case-sensitive.
  pub fn copy_name_exact(&self, index: ComponentIndex) -> String {
    tokenizer::copy_ident_exact(&self.source, self.name_offset(index))
  }

  /// Decoded contents of a `TokenString` node.
  pub fn string_value(&self, index: ComponentIndex) -> String {
    let token = self.token_at(index);
    tokenizer::string_contents(&self.source, &token)
  }

  /// Decoded contents of a `TokenUrl` node.
  pub fn url_value(&self, index: ComponentIndex) -> String {
    let token = self.token_at(index);
    tokenizer::url_contents(&self.source, &token)
  }

  /// Serializes a single subtree back to CSS text (whitespace
  /// normalized). Used to hand function values such as `rgb(...)` to
  /// out-of-tree micro-parsers.
  pub fn subtree_css(&self, index: ComponentIndex) -> String {
    let mut out = String::new();
    self.serialize_node(index, &mut out);
    out.trim_end().to_string()
  }

  /// Serializes the tree back to CSS text.
  ///
  /// Whitespace is normalized to single spaces between tokens; the
  /// non-whitespace token sequence round-trips through the parser.
  pub fn to_css_string(&self) -> String {
    let mut out = String::new();
    if !self.is_empty() {
      self.serialize_range(0, self.len(), &mut out);
    }
    out
  }

  fn serialize_range(&self, start: ComponentIndex, end: ComponentIndex, out: &mut String) {
    let mut index = start;
    while index < end {
      self.serialize_node(index, out);
      index = self.next_sibling(index);
    }
  }

  fn serialize_node(&self, index: ComponentIndex, out: &mut String) {
    let end = self.next_sibling(index);
    match self.tag(index) {
      ComponentTag::RuleList => self.serialize_range(index + 1, end, out),
      ComponentTag::AtRule | ComponentTag::QualifiedRule => {
        if self.tag(index) == ComponentTag::AtRule {
          out.push_str(self.token_text(index));
          out.push(' ');
        }
        let body = match self.extra(index) {
          ComponentExtra::BodyIndex(body) => Some(body),
          _ => None,
        };
        self.serialize_range(index + 1, body.unwrap_or(end), out);
        match body {
          Some(body) => self.serialize_node(body, out),
          None => out.push(';'),
        }
      }
      ComponentTag::SimpleBlockCurly => {
        out.push('{');
        self.serialize_range(index + 1, end, out);
        out.push('}');
      }
      ComponentTag::SimpleBlockBracket => {
        out.push('[');
        self.serialize_range(index + 1, end, out);
        out.push(']');
      }
      ComponentTag::SimpleBlockParen => {
        out.push('(');
        self.serialize_range(index + 1, end, out);
        out.push(')');
      }
      ComponentTag::Function => {
        let token = self.token_at(index);
        out.push_str(&self.source[token.start..token.end]);
        self.serialize_range(index + 1, end, out);
        out.push(')');
      }
      ComponentTag::TokenWhitespace => out.push(' '),
      _ => {
        out.push_str(self.token_text(index));
        out.push(' ');
      }
    }
  }

  // Mutation is reserved for the parser.

  pub(crate) fn append(
    &mut self,
    tag: ComponentTag,
    location: usize,
    extra: ComponentExtra,
  ) -> ComponentIndex {
    let index = self.len();
    self.tags.push(tag);
    self.locations.push(location as u32);
    // Leaf assumption; containers are fixed up on pop.
    self.next_siblings.push(index + 1);
    self.extras.push(extra);
    index
  }

  pub(crate) fn set_next_sibling(&mut self, index: ComponentIndex, next: ComponentIndex) {
    self.next_siblings[index as usize] = next;
  }

  pub(crate) fn set_extra(&mut self, index: ComponentIndex, extra: ComponentExtra) {
    self.extras[index as usize] = extra;
  }

  pub(crate) fn truncate(&mut self, len: ComponentIndex) {
    self.tags.truncate(len as usize);
    self.locations.truncate(len as usize);
    self.next_siblings.truncate(len as usize);
    self.extras.truncate(len as usize);
  }
}

impl fmt::Debug for ComponentTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "ComponentTree ({} nodes)", self.len())?;
    let mut stack: Vec<ComponentIndex> = Vec::new();
    for index in 0..self.len() {
      while let Some(&end) = stack.last() {
        if index >= end {
          stack.pop();
        } else {
          break;
        }
      }
      writeln!(
        f,
        "{}{:?} @{} -> {}",
        "  ".repeat(stack.len()),
        self.tag(index),
        self.location(index),
        self.next_sibling(index),
      )?;
      if self.tag(index).is_container() {
        stack.push(self.next_sibling(index));
      }
    }
    Ok(())
  }
}

/// Iterator over the direct children of a container node.
pub struct Children<'a> {
  tree: &'a ComponentTree,
  cursor: ComponentIndex,
  end: ComponentIndex,
}

impl Iterator for Children<'_> {
  type Item = ComponentIndex;

  fn next(&mut self) -> Option<ComponentIndex> {
    if self.cursor >= self.end {
      return None;
    }
    let index = self.cursor;
    self.cursor = self.tree.next_sibling(index);
    Some(index)
  }
}
