//! Stylesheet assembly
//!
//! Walks a parsed component tree's top-level rule list and assembles a
//! [`Stylesheet`]: an ordered list of style rules (selector list plus
//! declarations) and the namespace declarations in scope.
//!
//! Everything here follows the error policy of CSS Cascading 4: a rule
//! with an invalid selector list is dropped, an invalid declaration is
//! dropped while its block continues, and unknown at-rules are logged and
//! skipped. Nothing in this module fails.

use crate::css::component_tree::ComponentExtra;
use crate::css::component_tree::ComponentIndex;
use crate::css::component_tree::ComponentTag;
use crate::css::component_tree::ComponentTree;
use crate::css::parser::parse_list_of_component_values;
use crate::css::selectors::parse_selector_list;
use crate::css::selectors::NamespacePrefixes;
use crate::css::selectors::SelectorList;
use crate::css::values;
use crate::css::values::ValueSource;
use crate::dom::CascadedBlock;
use crate::dom::ElementCategory;
use crate::dom::ElementRef;
use crate::dom::ElementTree;
use crate::style::values::CssWideKeyword;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Identifier of an interned namespace URL in an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(pub u16);

/// Shared interning environment for namespace URLs.
///
/// Element trees and stylesheets built against the same environment agree
/// on namespace identity, so matching compares small ids instead of URLs.
#[derive(Debug, Default)]
pub struct Environment {
  urls: Vec<String>,
  by_url: FxHashMap<String, u16>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Interns a namespace URL, returning its stable id.
  pub fn intern_namespace(&mut self, url: &str) -> NamespaceId {
    if let Some(&id) = self.by_url.get(url) {
      return NamespaceId(id);
    }
    let id = self.urls.len() as u16;
    self.urls.push(url.to_string());
    self.by_url.insert(url.to_string(), id);
    NamespaceId(id)
  }

  /// URL of an interned namespace.
  pub fn namespace_url(&self, id: NamespaceId) -> &str {
    &self.urls[id.0 as usize]
  }
}

/// Cascade origins, in the precedence scheme of Cascading 4 §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOrigin {
  UserAgent,
  Author,
}

/// The properties the engine lays out or paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyId {
  Display,
  Position,
  ZIndex,
  Width,
  MinWidth,
  MaxWidth,
  Height,
  MinHeight,
  MaxHeight,
  MarginTop,
  MarginRight,
  MarginBottom,
  MarginLeft,
  PaddingTop,
  PaddingRight,
  PaddingBottom,
  PaddingLeft,
  BorderTopWidth,
  BorderRightWidth,
  BorderBottomWidth,
  BorderLeftWidth,
  BorderTopStyle,
  BorderRightStyle,
  BorderBottomStyle,
  BorderLeftStyle,
  Top,
  Right,
  Bottom,
  Left,
  Color,
  BackgroundColor,
  BorderTopColor,
  BorderRightColor,
  BorderBottomColor,
  BorderLeftColor,
  BackgroundImage,
  BackgroundRepeat,
  BackgroundAttachment,
  BackgroundPosition,
  BackgroundSize,
  BackgroundClip,
  BackgroundOrigin,
}

impl PropertyId {
  /// Whether the property inherits by default (Cascading 4 §7.1); drives
  /// `unset` resolution and plain inheritance.
  pub fn is_inherited(self) -> bool {
    matches!(self, PropertyId::Color)
  }
}

/// A parsed declaration value, tagged by value shape.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredValue {
  CssWide(CssWideKeyword),
  Display(crate::style::values::Display),
  Position(crate::style::values::Position),
  ZIndex(crate::style::values::ZIndex),
  LengthPercentage(crate::style::values::LengthPercentage),
  LengthPercentageAuto(crate::style::values::LengthPercentageAuto),
  MaxSize(crate::style::values::MaxSize),
  BorderWidth(crate::style::values::BorderWidth),
  BorderStyle(crate::style::values::BorderStyle),
  Color(crate::style::values::ColorValue),
  BackgroundImage(crate::style::values::BackgroundImage),
  BackgroundRepeat(crate::style::values::BackgroundRepeat),
  BackgroundAttachment(crate::style::values::BackgroundAttachment),
  BackgroundPosition(crate::style::values::BackgroundPosition),
  BackgroundSize(crate::style::values::BackgroundSize),
  BackgroundBox(crate::style::values::BackgroundBox),
}

/// One valid declaration: `property: value [!important]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
  pub property: PropertyId,
  pub value: DeclaredValue,
  pub important: bool,
}

/// One style rule: selectors plus the declarations they apply.
#[derive(Debug, Clone)]
pub struct StyleRule {
  pub selectors: SelectorList,
  pub declarations: Arc<Vec<Declaration>>,
}

/// An assembled stylesheet.
///
/// Owns all rule and selector memory; dropping the stylesheet frees it in
/// bulk.
#[derive(Debug, Default)]
pub struct Stylesheet {
  pub rules: Vec<StyleRule>,
  namespace_prefixes: FxHashMap<String, NamespaceId>,
  default_namespace: Option<NamespaceId>,
}

impl Stylesheet {
  /// The namespace bound to `prefix`, if declared.
  pub fn namespace_for_prefix(&self, prefix: &str) -> Option<NamespaceId> {
    self.namespace_prefixes.get(prefix).copied()
  }

  /// The default namespace, if declared.
  pub fn default_namespace(&self) -> Option<NamespaceId> {
    self.default_namespace
  }
}

/// Assembles a stylesheet from a parsed component tree.
///
/// `env` interns namespace URLs so ids are shared with the element tree.
pub fn build_stylesheet(tree: &ComponentTree, env: &mut Environment) -> Stylesheet {
  let mut sheet = Stylesheet::default();
  if tree.is_empty() || tree.tag(0) != ComponentTag::RuleList {
    return sheet;
  }
  for rule in tree.children(0) {
    match tree.tag(rule) {
      ComponentTag::AtRule => {
        if tree.ident_eq(rule, "namespace") {
          handle_namespace_rule(tree, rule, env, &mut sheet);
        } else if tree.ident_eq(rule, "import") {
          log::warn!("@import is not supported; rule ignored");
        } else {
          log::warn!("unknown at-rule @{}; rule ignored", tree.copy_name(rule));
        }
      }
      ComponentTag::QualifiedRule => {
        let ComponentExtra::BodyIndex(body) = tree.extra(rule) else {
          continue;
        };
        let namespaces = NamespacePrefixes {
          prefixes: &sheet.namespace_prefixes,
          default_namespace: sheet.default_namespace,
        };
        let Some(selectors) = parse_selector_list(tree, rule + 1, body, &namespaces) else {
          continue;
        };
        let declarations = parse_declaration_list(tree, body + 1, tree.next_sibling(body));
        sheet.rules.push(StyleRule {
          selectors,
          declarations: Arc::new(declarations),
        });
      }
      _ => {}
    }
  }
  sheet
}

/// `@namespace [prefix]? <url or string> ;`: anything more invalidates
/// the rule.
fn handle_namespace_rule(
  tree: &ComponentTree,
  rule: ComponentIndex,
  env: &mut Environment,
  sheet: &mut Stylesheet,
) {
  if !matches!(tree.extra(rule), ComponentExtra::None) {
    log::warn!("@namespace with a block; rule ignored");
    return;
  }
  let mut source = ValueSource::new(tree, rule + 1, tree.next_sibling(rule));
  let mut prefix = None;
  if let Some(item) = source.expect(values::ItemType::Keyword) {
    prefix = Some(tree.copy_name(item.index));
  }
  let url = match source.next() {
    Some(item) if item.kind == values::ItemType::Url => tree.url_value(item.index),
    Some(item) if item.kind == values::ItemType::String => tree.string_value(item.index),
    _ => {
      log::warn!("@namespace without a namespace URL; rule ignored");
      return;
    }
  };
  if !source.is_exhausted() {
    log::warn!("@namespace with trailing tokens; rule ignored");
    return;
  }
  let id = env.intern_namespace(&url);
  match prefix {
    Some(prefix) => {
      sheet.namespace_prefixes.insert(prefix, id);
    }
    None => sheet.default_namespace = Some(id),
  }
}

/// Parses the declarations in the component range `[start, end)`.
///
/// Invalid declarations are dropped individually; parsing resumes after
/// the next semicolon.
pub fn parse_declaration_list(
  tree: &ComponentTree,
  start: ComponentIndex,
  end: ComponentIndex,
) -> Vec<Declaration> {
  let mut declarations = Vec::new();
  let mut cursor = start;
  while cursor < end {
    match tree.tag(cursor) {
      ComponentTag::TokenWhitespace | ComponentTag::TokenComment | ComponentTag::TokenSemicolon => {
        cursor = tree.next_sibling(cursor);
        continue;
      }
      _ => {}
    }

    // Everything up to the next top-level semicolon is one declaration.
    let mut decl_end = cursor;
    while decl_end < end && tree.tag(decl_end) != ComponentTag::TokenSemicolon {
      decl_end = tree.next_sibling(decl_end);
    }
    if let Some(declaration) = parse_one_declaration(tree, cursor, decl_end) {
      declarations.push(declaration);
    }
    cursor = decl_end;
  }
  declarations
}

fn parse_one_declaration(
  tree: &ComponentTree,
  start: ComponentIndex,
  end: ComponentIndex,
) -> Option<Declaration> {
  let mut cursor = start;
  if tree.tag(cursor) != ComponentTag::TokenIdent {
    return None;
  }
  let property = lookup_property(tree, cursor)?;
  cursor = tree.next_sibling(cursor);

  while cursor < end
    && matches!(
      tree.tag(cursor),
      ComponentTag::TokenWhitespace | ComponentTag::TokenComment
    )
  {
    cursor = tree.next_sibling(cursor);
  }
  if cursor >= end || tree.tag(cursor) != ComponentTag::TokenColon {
    return None;
  }
  let value_start = tree.next_sibling(cursor);

  // `!important` is the trailing two non-whitespace components.
  let mut important = false;
  let mut value_end = end;
  let mut last_two: [Option<ComponentIndex>; 2] = [None, None];
  let mut walk = value_start;
  while walk < end {
    if !matches!(
      tree.tag(walk),
      ComponentTag::TokenWhitespace | ComponentTag::TokenComment
    ) {
      last_two = [last_two[1], Some(walk)];
    }
    walk = tree.next_sibling(walk);
  }
  if let [Some(bang), Some(keyword)] = last_two {
    let is_bang = tree.tag(bang) == ComponentTag::TokenDelim
      && matches!(tree.extra(bang), ComponentExtra::Codepoint('!'));
    if is_bang && tree.tag(keyword) == ComponentTag::TokenIdent && tree.ident_eq(keyword, "important")
    {
      important = true;
      value_end = bang;
    }
  }

  let mut source = ValueSource::new(tree, value_start, value_end);
  let value = if let Some(keyword) = values::parse_css_wide_keyword(&mut source) {
    DeclaredValue::CssWide(keyword)
  } else {
    let value = parse_value_for(property, &mut source)?;
    if !source.is_exhausted() {
      return None;
    }
    value
  };
  Some(Declaration {
    property,
    value,
    important,
  })
}

const PROPERTY_NAMES: &[(&str, PropertyId)] = &[
  ("display", PropertyId::Display),
  ("position", PropertyId::Position),
  ("z-index", PropertyId::ZIndex),
  ("width", PropertyId::Width),
  ("min-width", PropertyId::MinWidth),
  ("max-width", PropertyId::MaxWidth),
  ("height", PropertyId::Height),
  ("min-height", PropertyId::MinHeight),
  ("max-height", PropertyId::MaxHeight),
  ("margin-top", PropertyId::MarginTop),
  ("margin-right", PropertyId::MarginRight),
  ("margin-bottom", PropertyId::MarginBottom),
  ("margin-left", PropertyId::MarginLeft),
  ("padding-top", PropertyId::PaddingTop),
  ("padding-right", PropertyId::PaddingRight),
  ("padding-bottom", PropertyId::PaddingBottom),
  ("padding-left", PropertyId::PaddingLeft),
  ("border-top-width", PropertyId::BorderTopWidth),
  ("border-right-width", PropertyId::BorderRightWidth),
  ("border-bottom-width", PropertyId::BorderBottomWidth),
  ("border-left-width", PropertyId::BorderLeftWidth),
  ("border-top-style", PropertyId::BorderTopStyle),
  ("border-right-style", PropertyId::BorderRightStyle),
  ("border-bottom-style", PropertyId::BorderBottomStyle),
  ("border-left-style", PropertyId::BorderLeftStyle),
  ("top", PropertyId::Top),
  ("right", PropertyId::Right),
  ("bottom", PropertyId::Bottom),
  ("left", PropertyId::Left),
  ("color", PropertyId::Color),
  ("background-color", PropertyId::BackgroundColor),
  ("border-top-color", PropertyId::BorderTopColor),
  ("border-right-color", PropertyId::BorderRightColor),
  ("border-bottom-color", PropertyId::BorderBottomColor),
  ("border-left-color", PropertyId::BorderLeftColor),
  ("background-image", PropertyId::BackgroundImage),
  ("background-repeat", PropertyId::BackgroundRepeat),
  ("background-attachment", PropertyId::BackgroundAttachment),
  ("background-position", PropertyId::BackgroundPosition),
  ("background-size", PropertyId::BackgroundSize),
  ("background-clip", PropertyId::BackgroundClip),
  ("background-origin", PropertyId::BackgroundOrigin),
];

fn lookup_property(tree: &ComponentTree, index: ComponentIndex) -> Option<PropertyId> {
  PROPERTY_NAMES
    .iter()
    .find(|(name, _)| tree.ident_eq(index, name))
    .map(|(_, id)| *id)
}

fn parse_value_for(property: PropertyId, source: &mut ValueSource) -> Option<DeclaredValue> {
  use PropertyId::*;
  let value = match property {
    Display => DeclaredValue::Display(values::parse_display(source)?),
    Position => DeclaredValue::Position(values::parse_position(source)?),
    ZIndex => DeclaredValue::ZIndex(values::parse_z_index(source)?),
    Width | Height | MarginTop | MarginRight | MarginBottom | MarginLeft | Top | Right | Bottom
    | Left => DeclaredValue::LengthPercentageAuto(values::parse_length_percentage_auto(source)?),
    MinWidth | MinHeight | PaddingTop | PaddingRight | PaddingBottom | PaddingLeft => {
      DeclaredValue::LengthPercentage(values::parse_length_percentage(source)?)
    }
    MaxWidth | MaxHeight => DeclaredValue::MaxSize(values::parse_max_size(source)?),
    BorderTopWidth | BorderRightWidth | BorderBottomWidth | BorderLeftWidth => {
      DeclaredValue::BorderWidth(values::parse_border_width(source)?)
    }
    BorderTopStyle | BorderRightStyle | BorderBottomStyle | BorderLeftStyle => {
      DeclaredValue::BorderStyle(values::parse_border_style(source)?)
    }
    Color | BackgroundColor | BorderTopColor | BorderRightColor | BorderBottomColor
    | BorderLeftColor => DeclaredValue::Color(values::parse_color(source)?),
    BackgroundImage => DeclaredValue::BackgroundImage(values::parse_background_image(source)?),
    BackgroundRepeat => DeclaredValue::BackgroundRepeat(values::parse_background_repeat(source)?),
    BackgroundAttachment => {
      DeclaredValue::BackgroundAttachment(values::parse_background_attachment(source)?)
    }
    BackgroundPosition => {
      DeclaredValue::BackgroundPosition(values::parse_background_position(source)?)
    }
    BackgroundSize => DeclaredValue::BackgroundSize(values::parse_background_size(source)?),
    BackgroundClip | BackgroundOrigin => {
      DeclaredValue::BackgroundBox(values::parse_background_box(source)?)
    }
  };
  Some(value)
}

/// Parses a bare declaration list (an inline `style` value).
pub fn parse_inline_declarations(css: &str) -> Vec<Declaration> {
  let tree = parse_list_of_component_values(css);
  parse_declaration_list(&tree, 0, tree.len())
}

/// Matches every rule of `sheet` against every element of `elements`,
/// appending the matching declaration blocks to each element's cascaded
/// set in rule order.
pub fn apply_stylesheet(sheet: &Stylesheet, elements: &mut ElementTree, origin: CascadeOrigin) {
  for index in 0..elements.len() {
    let element = ElementRef(index);
    if elements.category(element) != ElementCategory::Normal {
      continue;
    }
    for rule in &sheet.rules {
      if let Some(specificity) = rule.selectors.match_element(elements, element) {
        elements.push_matched_block(
          element,
          CascadedBlock {
            declarations: Arc::clone(&rule.declarations),
            origin,
            specificity,
          },
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::parser::parse_stylesheet;
  use crate::style::values::Display;
  use crate::style::values::LengthPercentageAuto;
  use crate::style::values::ZIndex;

  fn build(css: &str) -> (Stylesheet, Environment) {
    let tree = parse_stylesheet(css);
    let mut env = Environment::new();
    let sheet = build_stylesheet(&tree, &mut env);
    (sheet, env)
  }

  #[test]
  fn test_basic_rule() {
    let (sheet, _) = build("div { display: block; width: 100px }");
    assert_eq!(sheet.rules.len(), 1);
    let declarations = &sheet.rules[0].declarations;
    assert_eq!(declarations.len(), 2);
    assert_eq!(
      declarations[0],
      Declaration {
        property: PropertyId::Display,
        value: DeclaredValue::Display(Display::Block),
        important: false,
      }
    );
    assert_eq!(
      declarations[1],
      Declaration {
        property: PropertyId::Width,
        value: DeclaredValue::LengthPercentageAuto(LengthPercentageAuto::Px(100.0)),
        important: false,
      }
    );
  }

  #[test]
  fn test_invalid_declaration_recovers_at_semicolon() {
    let (sheet, _) = build("div { width: nonsense; z-index: 3; 5px; height: auto }");
    let declarations = &sheet.rules[0].declarations;
    assert_eq!(declarations.len(), 2);
    assert_eq!(declarations[0].property, PropertyId::ZIndex);
    assert_eq!(declarations[0].value, DeclaredValue::ZIndex(ZIndex::Integer(3)));
    assert_eq!(declarations[1].property, PropertyId::Height);
  }

  #[test]
  fn test_unknown_property_skipped() {
    let (sheet, _) = build("div { flex-grow: 1; width: 10px }");
    assert_eq!(sheet.rules[0].declarations.len(), 1);
  }

  #[test]
  fn test_important_flag() {
    let (sheet, _) = build("div { width: 10px !important; height: 5px ! important }");
    let declarations = &sheet.rules[0].declarations;
    assert_eq!(declarations.len(), 2);
    assert!(declarations[0].important);
    assert!(declarations[1].important);
  }

  #[test]
  fn test_css_wide_keywords() {
    let (sheet, _) = build("div { width: inherit; color: unset }");
    let declarations = &sheet.rules[0].declarations;
    assert_eq!(
      declarations[0].value,
      DeclaredValue::CssWide(CssWideKeyword::Inherit)
    );
    assert_eq!(
      declarations[1].value,
      DeclaredValue::CssWide(CssWideKeyword::Unset)
    );
  }

  #[test]
  fn test_namespace_rules() {
    let (sheet, env) = build(
      "@namespace url(http://www.w3.org/1999/xhtml);\n\
       @namespace svg url(http://www.w3.org/2000/svg);\n\
       svg|a {}",
    );
    let default = sheet.default_namespace().expect("default namespace");
    assert_eq!(env.namespace_url(default), "http://www.w3.org/1999/xhtml");
    let svg = sheet.namespace_for_prefix("svg").expect("svg prefix");
    assert_eq!(env.namespace_url(svg), "http://www.w3.org/2000/svg");
    assert_eq!(sheet.rules.len(), 1);
  }

  #[test]
  fn test_namespace_with_trailing_tokens_ignored() {
    let (sheet, _) = build("@namespace svg url(http://www.w3.org/2000/svg) extra;");
    assert_eq!(sheet.namespace_for_prefix("svg"), None);
    assert_eq!(sheet.default_namespace(), None);
  }

  #[test]
  fn test_invalid_selector_drops_rule() {
    let (sheet, _) = build("div:hover { width: 10px } p { height: 5px }");
    assert_eq!(sheet.rules.len(), 1);
  }

  #[test]
  fn test_inline_declarations() {
    let declarations = parse_inline_declarations("width: 100px; height: 50px");
    assert_eq!(declarations.len(), 2);
    assert_eq!(declarations[0].property, PropertyId::Width);
    assert_eq!(declarations[1].property, PropertyId::Height);
  }
}
