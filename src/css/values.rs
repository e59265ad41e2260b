//! Value source and property value parsers
//!
//! A [`ValueSource`] is a cursor over a sibling range of the component
//! tree. It skips whitespace and comments, classifies nodes into coarse
//! item types, and supports backtracking, which the property parsers use
//! to implement "no match leaves the cursor where it was".
//!
//! Each property grammar is a standalone `parse_*` function. The contract
//! shared by all of them:
//!
//! - On a match, the cursor sits after the consumed components.
//! - On a mismatch, the function returns `None` and the cursor is restored
//!   to its entry position.
//! - A match does *not* imply the source is exhausted; declaration-level
//!   code rejects values with trailing components.
//!
//! Grammars follow CSS Backgrounds and Borders Level 3 and CSS 2.2.

use crate::css::component_tree::ComponentExtra;
use crate::css::component_tree::ComponentIndex;
use crate::css::component_tree::ComponentTag;
use crate::css::component_tree::ComponentTree;
use crate::css::tokenizer::DimensionUnit;
use crate::style::values::AxisSide;
use crate::style::values::BackgroundAttachment;
use crate::style::values::BackgroundBox;
use crate::style::values::BackgroundImage;
use crate::style::values::BackgroundPosition;
use crate::style::values::BackgroundRepeat;
use crate::style::values::BackgroundSize;
use crate::style::values::BorderStyle;
use crate::style::values::BorderWidth;
use crate::style::values::ColorValue;
use crate::style::values::CssWideKeyword;
use crate::style::values::Display;
use crate::style::values::LengthPercentage;
use crate::style::values::LengthPercentageAuto;
use crate::style::values::MaxSize;
use crate::style::values::Position;
use crate::style::values::PositionAxis;
use crate::style::values::RepeatStyle;
use crate::style::values::Rgba;
use crate::style::values::SizeDimension;
use crate::style::values::ZIndex;

/// Coarse classification of a component for grammar dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
  Keyword,
  Integer,
  Number,
  Percentage,
  Dimension,
  Url,
  String,
  Hash,
  Function,
  Unknown,
}

/// One classified component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
  pub index: ComponentIndex,
  pub kind: ItemType,
}

/// A backtrackable cursor over a sibling range of a component tree.
pub struct ValueSource<'a> {
  tree: &'a ComponentTree,
  cursor: ComponentIndex,
  end: ComponentIndex,
}

impl<'a> ValueSource<'a> {
  /// Creates a cursor over `[start, end)`.
  pub fn new(tree: &'a ComponentTree, start: ComponentIndex, end: ComponentIndex) -> Self {
    Self {
      tree,
      cursor: start,
      end,
    }
  }

  /// Creates a cursor over a whole tree produced by
  /// [`parse_list_of_component_values`](crate::css::parser::parse_list_of_component_values).
  pub fn whole(tree: &'a ComponentTree) -> Self {
    Self::new(tree, 0, tree.len())
  }

  /// The underlying tree.
  pub fn tree(&self) -> &'a ComponentTree {
    self.tree
  }

  /// Current cursor position, for later [`reset`](Self::reset).
  pub fn position(&self) -> ComponentIndex {
    self.cursor
  }

  /// Backtracks to a previously saved position.
  pub fn reset(&mut self, position: ComponentIndex) {
    self.cursor = position;
  }

  fn skip_space(&mut self) {
    while self.cursor < self.end {
      match self.tree.tag(self.cursor) {
        ComponentTag::TokenWhitespace | ComponentTag::TokenComment => {
          self.cursor = self.tree.next_sibling(self.cursor);
        }
        _ => break,
      }
    }
  }

  /// True if only whitespace and comments remain.
  pub fn is_exhausted(&mut self) -> bool {
    self.skip_space();
    self.cursor >= self.end
  }

  /// Advances past whitespace and returns the next classified item, or
  /// `None` at the end of the range.
  pub fn next(&mut self) -> Option<Item> {
    self.skip_space();
    if self.cursor >= self.end {
      return None;
    }
    let index = self.cursor;
    self.cursor = self.tree.next_sibling(index);
    let kind = match self.tree.tag(index) {
      ComponentTag::TokenIdent => ItemType::Keyword,
      ComponentTag::TokenInteger => ItemType::Integer,
      ComponentTag::TokenNumber => ItemType::Number,
      ComponentTag::TokenPercentage => ItemType::Percentage,
      ComponentTag::TokenDimension => ItemType::Dimension,
      ComponentTag::TokenUrl => ItemType::Url,
      ComponentTag::TokenString => ItemType::String,
      ComponentTag::TokenHashId | ComponentTag::TokenHashUnrestricted => ItemType::Hash,
      ComponentTag::Function => ItemType::Function,
      _ => ItemType::Unknown,
    };
    Some(Item { index, kind })
  }

  /// Like [`next`](Self::next), but resets the cursor and returns `None`
  /// if the item is not of the expected type.
  pub fn expect(&mut self, kind: ItemType) -> Option<Item> {
    let save = self.position();
    match self.next() {
      Some(item) if item.kind == kind => Some(item),
      _ => {
        self.reset(save);
        None
      }
    }
  }

  /// Integer payload of a `TokenInteger` node. Out-of-range source
  /// integers were already clamped to zero by the tokenizer.
  pub fn integer(&self, index: ComponentIndex) -> i32 {
    match self.tree.extra(index) {
      ComponentExtra::Integer(value) => value,
      _ => 0,
    }
  }

  /// Numeric payload of a number, integer, or percentage node.
  pub fn number(&self, index: ComponentIndex) -> f64 {
    match self.tree.extra(index) {
      ComponentExtra::Number(value) => value,
      ComponentExtra::Integer(value) => value as f64,
      ComponentExtra::Dimension { value, .. } => value,
      _ => 0.0,
    }
  }

  /// Percentage payload as written: `50%` yields `50.0`.
  pub fn percentage(&self, index: ComponentIndex) -> f32 {
    self.number(index) as f32
  }

  /// Pixel payload of a dimension node, or `None` for an unrecognized
  /// unit.
  pub fn px_dimension(&self, index: ComponentIndex) -> Option<f32> {
    match self.tree.extra(index) {
      ComponentExtra::Dimension {
        value,
        unit: DimensionUnit::Px,
      } => Some(value as f32),
      _ => None,
    }
  }

  /// Case-insensitive keyword lookup against a static table.
  pub fn map_keyword<T: Copy>(&self, index: ComponentIndex, entries: &[(&str, T)]) -> Option<T> {
    entries
      .iter()
      .find(|(name, _)| self.tree.ident_eq(index, name))
      .map(|(_, value)| *value)
  }
}

// ============================================================================
// Property parsers
// ============================================================================

/// Recognizes a CSS-wide keyword occupying the entire remaining source.
///
/// Per Cascading 4, `initial | inherit | unset` is only a match when it is
/// the whole declaration value.
pub fn parse_css_wide_keyword(source: &mut ValueSource) -> Option<CssWideKeyword> {
  let entry = source.position();
  let item = source.expect(ItemType::Keyword)?;
  let keyword = source.map_keyword(
    item.index,
    &[
      ("initial", CssWideKeyword::Initial),
      ("inherit", CssWideKeyword::Inherit),
      ("unset", CssWideKeyword::Unset),
    ],
  );
  match keyword {
    Some(keyword) if source.is_exhausted() => Some(keyword),
    _ => {
      source.reset(entry);
      None
    }
  }
}

/// `block | inline | inline-block | none`
pub fn parse_display(source: &mut ValueSource) -> Option<Display> {
  parse_single_keyword(
    source,
    &[
      ("block", Display::Block),
      ("inline", Display::Inline),
      ("inline-block", Display::InlineBlock),
      ("none", Display::None),
    ],
  )
}

/// `static | relative | absolute`
pub fn parse_position(source: &mut ValueSource) -> Option<Position> {
  parse_single_keyword(
    source,
    &[
      ("static", Position::Static),
      ("relative", Position::Relative),
      ("absolute", Position::Absolute),
    ],
  )
}

/// `auto | <integer>`
pub fn parse_z_index(source: &mut ValueSource) -> Option<ZIndex> {
  let entry = source.position();
  match source.next() {
    Some(item) if item.kind == ItemType::Keyword => {
      if source.map_keyword(item.index, &[("auto", ())]).is_some() {
        Some(ZIndex::Auto)
      } else {
        source.reset(entry);
        None
      }
    }
    Some(item) if item.kind == ItemType::Integer => Some(ZIndex::Integer(source.integer(item.index))),
    _ => {
      source.reset(entry);
      None
    }
  }
}

/// `<length> | <percentage>`; unitless zero is accepted as a length.
pub fn parse_length_percentage(source: &mut ValueSource) -> Option<LengthPercentage> {
  let entry = source.position();
  let item = source.next()?;
  let value = match item.kind {
    ItemType::Dimension => source.px_dimension(item.index).map(LengthPercentage::Px),
    ItemType::Percentage => Some(LengthPercentage::Percentage(source.percentage(item.index))),
    ItemType::Integer | ItemType::Number if source.number(item.index) == 0.0 => {
      Some(LengthPercentage::ZERO)
    }
    _ => None,
  };
  if value.is_none() {
    source.reset(entry);
  }
  value
}

/// `<length> | <percentage> | auto`
pub fn parse_length_percentage_auto(source: &mut ValueSource) -> Option<LengthPercentageAuto> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if source.map_keyword(item.index, &[("auto", ())]).is_some() {
      return Some(LengthPercentageAuto::Auto);
    }
    source.reset(entry);
    return None;
  }
  parse_length_percentage(source).map(|value| match value {
    LengthPercentage::Px(px) => LengthPercentageAuto::Px(px),
    LengthPercentage::Percentage(pct) => LengthPercentageAuto::Percentage(pct),
  })
}

/// `<length> | <percentage> | none` for max sizes.
pub fn parse_max_size(source: &mut ValueSource) -> Option<MaxSize> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if source.map_keyword(item.index, &[("none", ())]).is_some() {
      return Some(MaxSize::None);
    }
    source.reset(entry);
    return None;
  }
  parse_length_percentage(source).map(|value| match value {
    LengthPercentage::Px(px) => MaxSize::Px(px),
    LengthPercentage::Percentage(pct) => MaxSize::Percentage(pct),
  })
}

/// `<length> | thin | medium | thick`
pub fn parse_border_width(source: &mut ValueSource) -> Option<BorderWidth> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if let Some(width) = source.map_keyword(
      item.index,
      &[
        ("thin", BorderWidth::Thin),
        ("medium", BorderWidth::Medium),
        ("thick", BorderWidth::Thick),
      ],
    ) {
      return Some(width);
    }
    source.reset(entry);
    return None;
  }
  match parse_length_percentage(source) {
    Some(LengthPercentage::Px(px)) => Some(BorderWidth::Px(px)),
    Some(LengthPercentage::Percentage(_)) => {
      source.reset(entry);
      None
    }
    None => None,
  }
}

/// `none | hidden | solid`
pub fn parse_border_style(source: &mut ValueSource) -> Option<BorderStyle> {
  parse_single_keyword(
    source,
    &[
      ("none", BorderStyle::None),
      ("hidden", BorderStyle::Hidden),
      ("solid", BorderStyle::Solid),
    ],
  )
}

/// `<color>`: named colors, `transparent`, `currentcolor`, hex hashes,
/// and the `rgb()`/`rgba()`/`hsl()`/`hsla()` functions.
pub fn parse_color(source: &mut ValueSource) -> Option<ColorValue> {
  let entry = source.position();
  let item = source.next()?;
  let tree = source.tree();
  let parsed = match item.kind {
    ItemType::Keyword => {
      if tree.ident_eq(item.index, "currentcolor") {
        return Some(ColorValue::CurrentColor);
      }
      css_color(&tree.copy_name(item.index))
    }
    ItemType::Hash => css_color(tree.token_text(item.index)),
    ItemType::Function => {
      let name_ok = ["rgb", "rgba", "hsl", "hsla"]
        .iter()
        .any(|name| tree.ident_eq(item.index, name));
      if name_ok {
        css_color(&tree.subtree_css(item.index))
      } else {
        None
      }
    }
    _ => None,
  };
  match parsed {
    Some(rgba) => Some(ColorValue::Rgba(rgba)),
    None => {
      source.reset(entry);
      None
    }
  }
}

fn css_color(text: &str) -> Option<Rgba> {
  let color = csscolorparser::parse(text).ok()?;
  let [r, g, b, a] = color.to_rgba8();
  Some(Rgba::new(r, g, b, a))
}

/// `none | <url>` (gradients are recognized by no one yet and fail the
/// parse, which invalidates the declaration).
pub fn parse_background_image(source: &mut ValueSource) -> Option<BackgroundImage> {
  let entry = source.position();
  let item = source.next()?;
  let tree = source.tree();
  let value = match item.kind {
    ItemType::Keyword if tree.ident_eq(item.index, "none") => Some(BackgroundImage::None),
    ItemType::Url => Some(BackgroundImage::Url(tree.url_value(item.index))),
    ItemType::Function if tree.ident_eq(item.index, "url") => tree
      .children(item.index)
      .find(|&child| tree.tag(child) == ComponentTag::TokenString)
      .map(|child| BackgroundImage::Url(tree.string_value(child))),
    _ => None,
  };
  if value.is_none() {
    source.reset(entry);
  }
  value
}

const REPEAT_STYLES: &[(&str, RepeatStyle)] = &[
  ("repeat", RepeatStyle::Repeat),
  ("space", RepeatStyle::Space),
  ("round", RepeatStyle::Round),
  ("no-repeat", RepeatStyle::NoRepeat),
];

/// `repeat-x | repeat-y | [repeat | space | round | no-repeat]{1,2}`
///
/// With a single axis keyword the vertical axis copies the horizontal
/// one.
pub fn parse_background_repeat(source: &mut ValueSource) -> Option<BackgroundRepeat> {
  let entry = source.position();
  let Some(item) = source.expect(ItemType::Keyword) else {
    return None;
  };
  if source.map_keyword(item.index, &[("repeat-x", ())]).is_some() {
    return Some(BackgroundRepeat {
      x: RepeatStyle::Repeat,
      y: RepeatStyle::NoRepeat,
    });
  }
  if source.map_keyword(item.index, &[("repeat-y", ())]).is_some() {
    return Some(BackgroundRepeat {
      x: RepeatStyle::NoRepeat,
      y: RepeatStyle::Repeat,
    });
  }
  let Some(x) = source.map_keyword(item.index, REPEAT_STYLES) else {
    source.reset(entry);
    return None;
  };
  let save = source.position();
  let y = match source.expect(ItemType::Keyword) {
    Some(second) => match source.map_keyword(second.index, REPEAT_STYLES) {
      Some(y) => y,
      None => {
        source.reset(save);
        x
      }
    },
    None => x,
  };
  Some(BackgroundRepeat { x, y })
}

/// `scroll | fixed | local`
pub fn parse_background_attachment(source: &mut ValueSource) -> Option<BackgroundAttachment> {
  parse_single_keyword(
    source,
    &[
      ("scroll", BackgroundAttachment::Scroll),
      ("fixed", BackgroundAttachment::Fixed),
      ("local", BackgroundAttachment::Local),
    ],
  )
}

/// `border-box | padding-box | content-box`
pub fn parse_background_box(source: &mut ValueSource) -> Option<BackgroundBox> {
  parse_single_keyword(
    source,
    &[
      ("border-box", BackgroundBox::BorderBox),
      ("padding-box", BackgroundBox::PaddingBox),
      ("content-box", BackgroundBox::ContentBox),
    ],
  )
}

/// `cover | contain | [<length-percentage> | auto]{1,2}`
pub fn parse_background_size(source: &mut ValueSource) -> Option<BackgroundSize> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if source.map_keyword(item.index, &[("cover", ())]).is_some() {
      return Some(BackgroundSize::Cover);
    }
    if source.map_keyword(item.index, &[("contain", ())]).is_some() {
      return Some(BackgroundSize::Contain);
    }
    source.reset(entry);
  }
  let width = parse_size_dimension(source)?;
  let save = source.position();
  let height = match parse_size_dimension(source) {
    Some(height) => height,
    None => {
      source.reset(save);
      SizeDimension::Auto
    }
  };
  Some(BackgroundSize::Explicit { width, height })
}

fn parse_size_dimension(source: &mut ValueSource) -> Option<SizeDimension> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if source.map_keyword(item.index, &[("auto", ())]).is_some() {
      return Some(SizeDimension::Auto);
    }
    source.reset(entry);
    return None;
  }
  parse_length_percentage(source).map(SizeDimension::LengthPercentage)
}

/// `background-position`
///
/// The 3-or-4-value form (two side keywords, each with an optional
/// offset) is tried first; on failure the cursor rewinds and the
/// 1-or-2-value form is tried. Naming the same axis twice fails the whole
/// parse.
pub fn parse_background_position(source: &mut ValueSource) -> Option<BackgroundPosition> {
  let entry = source.position();
  if let Some(position) = parse_position_pairs(source) {
    return Some(position);
  }
  source.reset(entry);
  let position = parse_position_simple(source);
  if position.is_none() {
    source.reset(entry);
  }
  position
}

/// A side keyword in a position value, before axis assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionSide {
  X(AxisSide),
  Y(AxisSide),
  Center,
}

const POSITION_SIDES: &[(&str, PositionSide)] = &[
  ("left", PositionSide::X(AxisSide::Start)),
  ("right", PositionSide::X(AxisSide::End)),
  ("top", PositionSide::Y(AxisSide::Start)),
  ("bottom", PositionSide::Y(AxisSide::End)),
  ("center", PositionSide::Center),
];

fn parse_position_pairs(source: &mut ValueSource) -> Option<BackgroundPosition> {
  let first = parse_side_offset_pair(source)?;
  let second = parse_side_offset_pair(source)?;

  let mut x: Option<PositionAxis> = None;
  let mut y: Option<PositionAxis> = None;
  let mut pending: Vec<PositionAxis> = Vec::new();
  for (side, axis) in [first, second] {
    match side {
      PositionSide::X(_) if x.is_some() => return None,
      PositionSide::Y(_) if y.is_some() => return None,
      PositionSide::X(edge) => x = Some(PositionAxis::new(edge, axis.offset)),
      PositionSide::Y(edge) => y = Some(PositionAxis::new(edge, axis.offset)),
      PositionSide::Center => pending.push(axis),
    }
  }
  for axis in pending {
    if x.is_none() {
      x = Some(axis);
    } else if y.is_none() {
      y = Some(axis);
    }
  }
  Some(BackgroundPosition {
    x: x.unwrap_or(PositionAxis::CENTER),
    y: y.unwrap_or(PositionAxis::CENTER),
  })
}

/// One `side [offset]?` pair of the 3-or-4-value form. An offset after
/// `center` is consumed but contributes nothing; `center` has no edge to
/// measure from.
fn parse_side_offset_pair(source: &mut ValueSource) -> Option<(PositionSide, PositionAxis)> {
  let item = source.expect(ItemType::Keyword)?;
  let side = source.map_keyword(item.index, POSITION_SIDES)?;
  let save = source.position();
  let offset = match parse_length_percentage(source) {
    Some(offset) => offset,
    None => {
      source.reset(save);
      LengthPercentage::Percentage(0.0)
    }
  };
  let axis = match side {
    PositionSide::Center => PositionAxis::CENTER,
    PositionSide::X(edge) | PositionSide::Y(edge) => PositionAxis::new(edge, offset),
  };
  Some((side, axis))
}

/// A single value of the 1-or-2-value form.
#[derive(Debug, Clone, Copy)]
enum PositionValue {
  Side(PositionSide),
  Offset(LengthPercentage),
}

fn parse_position_value(source: &mut ValueSource) -> Option<PositionValue> {
  let entry = source.position();
  if let Some(item) = source.expect(ItemType::Keyword) {
    if let Some(side) = source.map_keyword(item.index, POSITION_SIDES) {
      return Some(PositionValue::Side(side));
    }
    source.reset(entry);
    return None;
  }
  parse_length_percentage(source).map(PositionValue::Offset)
}

fn parse_position_simple(source: &mut ValueSource) -> Option<BackgroundPosition> {
  let first = parse_position_value(source)?;
  let second = parse_position_value(source);

  let mut x: Option<PositionAxis> = None;
  let mut y: Option<PositionAxis> = None;
  let mut values = vec![(first, false)];
  if let Some(second) = second {
    values.push((second, true));
  }
  let mut pending_center = 0usize;
  for (value, is_second) in values {
    match value {
      PositionValue::Side(PositionSide::X(edge)) => {
        if x.is_some() {
          return None;
        }
        x = Some(PositionAxis::new(edge, LengthPercentage::Percentage(0.0)));
      }
      PositionValue::Side(PositionSide::Y(edge)) => {
        if y.is_some() {
          return None;
        }
        y = Some(PositionAxis::new(edge, LengthPercentage::Percentage(0.0)));
      }
      PositionValue::Side(PositionSide::Center) => pending_center += 1,
      PositionValue::Offset(offset) => {
        // A bare offset is positional: first value horizontal, second
        // vertical.
        let slot = if is_second { &mut y } else { &mut x };
        if slot.is_some() {
          return None;
        }
        *slot = Some(PositionAxis::new(AxisSide::Start, offset));
      }
    }
  }
  for _ in 0..pending_center {
    if x.is_none() {
      x = Some(PositionAxis::CENTER);
    } else if y.is_none() {
      y = Some(PositionAxis::CENTER);
    }
  }
  Some(BackgroundPosition {
    x: x.unwrap_or(PositionAxis::CENTER),
    y: y.unwrap_or(PositionAxis::CENTER),
  })
}

fn parse_single_keyword<T: Copy>(source: &mut ValueSource, entries: &[(&str, T)]) -> Option<T> {
  let entry = source.position();
  let item = source.expect(ItemType::Keyword)?;
  let value = source.map_keyword(item.index, entries);
  if value.is_none() {
    source.reset(entry);
  }
  value
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::parser::parse_list_of_component_values;

  fn with_source<T>(css: &str, f: impl FnOnce(&mut ValueSource) -> T) -> T {
    let tree = parse_list_of_component_values(css);
    let mut source = ValueSource::whole(&tree);
    f(&mut source)
  }

  #[test]
  fn test_z_index_grammar() {
    assert_eq!(with_source("auto", |s| parse_z_index(s)), Some(ZIndex::Auto));
    assert_eq!(
      with_source("-5", |s| parse_z_index(s)),
      Some(ZIndex::Integer(-5))
    );
    assert_eq!(with_source("1.5", |s| parse_z_index(s)), None);
    assert_eq!(with_source("5%", |s| parse_z_index(s)), None);
  }

  #[test]
  fn test_z_index_overflow_clamps_to_zero() {
    assert_eq!(
      with_source("9999999999999999", |s| parse_z_index(s)),
      Some(ZIndex::Integer(0))
    );
  }

  #[test]
  fn test_length_percentage_auto() {
    assert_eq!(
      with_source("10px", |s| parse_length_percentage_auto(s)),
      Some(LengthPercentageAuto::Px(10.0))
    );
    assert_eq!(
      with_source("50%", |s| parse_length_percentage_auto(s)),
      Some(LengthPercentageAuto::Percentage(50.0))
    );
    assert_eq!(
      with_source("auto", |s| parse_length_percentage_auto(s)),
      Some(LengthPercentageAuto::Auto)
    );
    assert_eq!(
      with_source("0", |s| parse_length_percentage_auto(s)),
      Some(LengthPercentageAuto::Px(0.0))
    );
    // Unrecognized units do not match.
    assert_eq!(with_source("10vw", |s| parse_length_percentage_auto(s)), None);
  }

  #[test]
  fn test_mismatch_restores_cursor() {
    with_source("bogus 10px", |source| {
      let before = source.position();
      assert_eq!(parse_length_percentage(source), None);
      assert_eq!(source.position(), before);
      // The keyword is still there for the next grammar.
      assert!(source.expect(ItemType::Keyword).is_some());
    });
  }

  #[test]
  fn test_border_width() {
    assert_eq!(
      with_source("thin", |s| parse_border_width(s)),
      Some(BorderWidth::Thin)
    );
    assert_eq!(
      with_source("2px", |s| parse_border_width(s)),
      Some(BorderWidth::Px(2.0))
    );
    // Percentages are not border widths.
    assert_eq!(with_source("5%", |s| parse_border_width(s)), None);
  }

  #[test]
  fn test_colors() {
    assert_eq!(
      with_source("#102030", |s| parse_color(s)),
      Some(ColorValue::Rgba(Rgba::new(0x10, 0x20, 0x30, 255)))
    );
    assert_eq!(
      with_source("rgb(1, 2, 3)", |s| parse_color(s)),
      Some(ColorValue::Rgba(Rgba::new(1, 2, 3, 255)))
    );
    assert_eq!(
      with_source("rgba(1, 2, 3, 0)", |s| parse_color(s)),
      Some(ColorValue::Rgba(Rgba::new(1, 2, 3, 0)))
    );
    assert_eq!(
      with_source("currentColor", |s| parse_color(s)),
      Some(ColorValue::CurrentColor)
    );
    assert_eq!(
      with_source("rebeccapurple", |s| parse_color(s)),
      Some(ColorValue::Rgba(Rgba::new(102, 51, 153, 255)))
    );
    assert_eq!(with_source("notacolor", |s| parse_color(s)), None);
  }

  #[test]
  fn test_background_image() {
    assert_eq!(
      with_source("none", |s| parse_background_image(s)),
      Some(BackgroundImage::None)
    );
    assert_eq!(
      with_source("url(cat.png)", |s| parse_background_image(s)),
      Some(BackgroundImage::Url("cat.png".to_string()))
    );
    assert_eq!(
      with_source("url(\"cat.png\")", |s| parse_background_image(s)),
      Some(BackgroundImage::Url("cat.png".to_string()))
    );
    // Gradients are not parsed yet; the declaration becomes invalid.
    assert_eq!(
      with_source("linear-gradient(red, blue)", |s| parse_background_image(s)),
      None
    );
  }

  #[test]
  fn test_background_repeat_single_keyword_copies_axis() {
    with_source("space invalid", |source| {
      let repeat = parse_background_repeat(source).unwrap();
      assert_eq!(repeat.x, RepeatStyle::Space);
      assert_eq!(repeat.y, RepeatStyle::Space);
      // Exactly one keyword consumed; the cursor sits at `invalid`.
      let next = source.expect(ItemType::Keyword).unwrap();
      assert!(source.tree().ident_eq(next.index, "invalid"));
    });
  }

  #[test]
  fn test_background_repeat_forms() {
    assert_eq!(
      with_source("repeat-x", |s| parse_background_repeat(s)),
      Some(BackgroundRepeat {
        x: RepeatStyle::Repeat,
        y: RepeatStyle::NoRepeat,
      })
    );
    assert_eq!(
      with_source("round no-repeat", |s| parse_background_repeat(s)),
      Some(BackgroundRepeat {
        x: RepeatStyle::Round,
        y: RepeatStyle::NoRepeat,
      })
    );
  }

  #[test]
  fn test_background_position_four_value_form() {
    let position = with_source("bottom 50% left 20px", |s| parse_background_position(s)).unwrap();
    assert_eq!(
      position.x,
      PositionAxis::new(AxisSide::Start, LengthPercentage::Px(20.0))
    );
    assert_eq!(
      position.y,
      PositionAxis::new(AxisSide::End, LengthPercentage::Percentage(50.0))
    );
  }

  #[test]
  fn test_background_position_center_swallows_offset() {
    with_source("center center 50%", |source| {
      let position = parse_background_position(source).unwrap();
      assert_eq!(position.x, PositionAxis::CENTER);
      assert_eq!(position.y, PositionAxis::CENTER);
      // All three components consumed.
      assert!(source.is_exhausted());
    });
  }

  #[test]
  fn test_background_position_single_keyword() {
    let position = with_source("top", |s| parse_background_position(s)).unwrap();
    assert_eq!(position.x, PositionAxis::CENTER);
    assert_eq!(
      position.y,
      PositionAxis::new(AxisSide::Start, LengthPercentage::Percentage(0.0))
    );
  }

  #[test]
  fn test_background_position_axis_collision_fails() {
    assert_eq!(with_source("left right", |s| parse_background_position(s)), None);
    assert_eq!(with_source("top bottom", |s| parse_background_position(s)), None);
    with_source("left right", |source| {
      let before = source.position();
      assert_eq!(parse_background_position(source), None);
      assert_eq!(source.position(), before);
    });
  }

  #[test]
  fn test_background_position_two_values() {
    let position = with_source("50% 20px", |s| parse_background_position(s)).unwrap();
    assert_eq!(
      position.x,
      PositionAxis::new(AxisSide::Start, LengthPercentage::Percentage(50.0))
    );
    assert_eq!(
      position.y,
      PositionAxis::new(AxisSide::Start, LengthPercentage::Px(20.0))
    );
  }

  #[test]
  fn test_background_size() {
    assert_eq!(
      with_source("cover", |s| parse_background_size(s)),
      Some(BackgroundSize::Cover)
    );
    assert_eq!(
      with_source("100px", |s| parse_background_size(s)),
      Some(BackgroundSize::Explicit {
        width: SizeDimension::LengthPercentage(LengthPercentage::Px(100.0)),
        height: SizeDimension::Auto,
      })
    );
    assert_eq!(
      with_source("50% auto", |s| parse_background_size(s)),
      Some(BackgroundSize::Explicit {
        width: SizeDimension::LengthPercentage(LengthPercentage::Percentage(50.0)),
        height: SizeDimension::Auto,
      })
    );
  }

  #[test]
  fn test_css_wide_keyword_requires_lone_identifier() {
    assert_eq!(
      with_source("inherit", |s| parse_css_wide_keyword(s)),
      Some(CssWideKeyword::Inherit)
    );
    assert_eq!(with_source("inherit 10px", |s| parse_css_wide_keyword(s)), None);
    assert_eq!(with_source("10px", |s| parse_css_wide_keyword(s)), None);
  }
}
