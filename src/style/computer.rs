//! Style computer
//!
//! Resolves specified values to computed values per element, maintaining
//! the ancestry stack layout is currently traversing. Both layout passes
//! drive the same computer: the box-generation pass computes
//! [`BoxStyle`]s, the cosmetic pass computes [`CosmeticStyle`]s. Each
//! pushed element caches its computed style for the stage, and children
//! inherit from the entry below them on the stack.
//!
//! The cascade itself is Cascading 4 §6: declarations are ranked by
//! importance and origin, then selector specificity, then document order.
//! CSS-wide keywords resolve here (`inherit` against the parent entry,
//! `initial` against the property's initial value, `unset` as one or the
//! other depending on whether the property inherits).

use crate::css::stylesheet::CascadeOrigin;
use crate::css::stylesheet::DeclaredValue;
use crate::css::stylesheet::PropertyId;
use crate::dom::ElementCategory;
use crate::dom::ElementRef;
use crate::dom::ElementTree;
use crate::geometry::px_float;
use crate::geometry::EdgeOffsets;
use crate::style::computed::BackgroundStyle;
use crate::style::computed::BoxStyle;
use crate::style::computed::CosmeticStyle;
use crate::style::computed::Edges;
use crate::style::computed::Length;
use crate::style::computed::LengthAuto;
use crate::style::computed::LengthMax;
use crate::style::values::BorderStyle;
use crate::style::values::BorderWidth;
use crate::style::values::ColorValue;
use crate::style::values::CssWideKeyword;
use crate::style::values::LengthPercentage;
use crate::style::values::LengthPercentageAuto;
use crate::style::values::MaxSize;
use crate::style::values::Rgba;
use rustc_hash::FxHashMap;

/// The two pipeline stages that consult the computer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  /// Box generation: geometry-affecting properties
  BoxGen,
  /// Cosmetics: colors and backgrounds
  Cosmetic,
}

struct Entry {
  element: ElementRef,
  box_style: Option<BoxStyle>,
  cosmetic: Option<CosmeticStyle>,
}

/// Per-element cascade and computed-value cache, stack-shaped to follow
/// the layout traversal.
pub struct StyleComputer<'a> {
  tree: &'a ElementTree,
  stack: Vec<Entry>,
}

impl<'a> StyleComputer<'a> {
  pub fn new(tree: &'a ElementTree) -> Self {
    Self {
      tree,
      stack: Vec::new(),
    }
  }

  /// Category of an element; a convenience passthrough so layout holds a
  /// single handle.
  pub fn element_category(&self, element: ElementRef) -> ElementCategory {
    self.tree.category(element)
  }

  /// Pushes the traversal root. Equivalent to `push_element` on an empty
  /// stack.
  pub fn set_root_element(&mut self, stage: Stage, element: ElementRef) {
    debug_assert!(self.stack.is_empty());
    self.push_element(stage, element);
  }

  /// Computes `element`'s style for `stage` (inheriting from the current
  /// stack top) and pushes it.
  pub fn push_element(&mut self, stage: Stage, element: ElementRef) {
    let winners = self.cascade_winners(element);
    let entry = match stage {
      Stage::BoxGen => {
        let parent = self.stack.last().and_then(|entry| entry.box_style.as_ref());
        Entry {
          element,
          box_style: Some(compute_box_style(&winners, parent)),
          cosmetic: None,
        }
      }
      Stage::Cosmetic => {
        let parent = self.stack.last().and_then(|entry| entry.cosmetic.as_ref());
        Entry {
          element,
          box_style: None,
          cosmetic: Some(compute_cosmetic_style(&winners, parent)),
        }
      }
    };
    self.stack.push(entry);
  }

  /// Pops the innermost element.
  pub fn pop_element(&mut self) {
    self.stack.pop();
  }

  /// Skips past the element at the stack top without having descended
  /// into it; the counterpart of [`pop_element`](Self::pop_element) for
  /// elements that generate no boxes.
  pub fn advance_element(&mut self) {
    self.stack.pop();
  }

  /// Replaces the computed box style of the stack top. Layout uses this
  /// when a used-value rule overrides the cascade output, such as the
  /// root box being forced block-level.
  pub fn set_computed_box_style(&mut self, style: BoxStyle) {
    let entry = self.stack.last_mut().expect("an element on the stack");
    entry.box_style = Some(style);
  }

  /// Current stack depth.
  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  /// Element at the top of the stack.
  pub fn current_element(&self) -> ElementRef {
    self.stack.last().expect("an element on the stack").element
  }

  /// Computed box style of the stack top. Only valid in the box-gen
  /// stage.
  pub fn current_box_style(&self) -> &BoxStyle {
    self
      .stack
      .last()
      .and_then(|entry| entry.box_style.as_ref())
      .expect("box style computed for the current element")
  }

  /// Computed cosmetic style of the stack top. Only valid in the
  /// cosmetic stage.
  pub fn current_cosmetic_style(&self) -> &CosmeticStyle {
    self
      .stack
      .last()
      .and_then(|entry| entry.cosmetic.as_ref())
      .expect("cosmetic style computed for the current element")
  }

  /// The specified value an element's cascade produces for one property,
  /// before defaulting. Mostly useful to tests and debugging tools.
  pub fn specified_value(
    &self,
    element: ElementRef,
    property: PropertyId,
  ) -> Option<DeclaredValue> {
    self.cascade_winners(element).remove(&property)
  }

  /// Runs the cascade for one element: the winning declaration per
  /// property.
  ///
  /// Rank order per Cascading 4 §6.1, low to high: user-agent normal,
  /// author normal, author important, user-agent important. Within a
  /// rank: specificity, then document order (later wins).
  fn cascade_winners(&self, element: ElementRef) -> FxHashMap<PropertyId, DeclaredValue> {
    type Key = (u8, u32, u32, u32);
    let mut winners: FxHashMap<PropertyId, (Key, &DeclaredValue)> = FxHashMap::default();
    for (block_index, block) in self.tree.cascaded_blocks(element).iter().enumerate() {
      for (decl_index, declaration) in block.declarations.iter().enumerate() {
        let key: Key = (
          origin_rank(block.origin, declaration.important),
          block.specificity,
          block_index as u32,
          decl_index as u32,
        );
        match winners.entry(declaration.property) {
          std::collections::hash_map::Entry::Occupied(mut slot) => {
            if key > slot.get().0 {
              slot.insert((key, &declaration.value));
            }
          }
          std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert((key, &declaration.value));
          }
        }
      }
    }
    winners
      .into_iter()
      .map(|(property, (_, value))| (property, value.clone()))
      .collect()
  }
}

fn origin_rank(origin: CascadeOrigin, important: bool) -> u8 {
  match (origin, important) {
    (CascadeOrigin::UserAgent, false) => 0,
    (CascadeOrigin::Author, false) => 1,
    (CascadeOrigin::Author, true) => 2,
    (CascadeOrigin::UserAgent, true) => 3,
  }
}

type Winners = FxHashMap<PropertyId, DeclaredValue>;

/// Resolves one property: winner value, CSS-wide keyword, or default.
fn resolve<T: Clone>(
  winners: &Winners,
  property: PropertyId,
  extract: impl Fn(&DeclaredValue) -> Option<T>,
  initial: T,
  parent: T,
) -> T {
  let inherited_default = if property.is_inherited() {
    parent.clone()
  } else {
    initial.clone()
  };
  match winners.get(&property) {
    None => inherited_default,
    Some(DeclaredValue::CssWide(keyword)) => match keyword {
      CssWideKeyword::Initial => initial,
      CssWideKeyword::Inherit => parent,
      CssWideKeyword::Unset => inherited_default,
    },
    Some(value) => extract(value).unwrap_or(initial),
  }
}

fn length_auto(value: &LengthPercentageAuto) -> LengthAuto {
  match value {
    LengthPercentageAuto::Px(px) => LengthAuto::Units(px_float(*px)),
    LengthPercentageAuto::Percentage(pct) => LengthAuto::Percent(*pct),
    LengthPercentageAuto::Auto => LengthAuto::Auto,
  }
}

fn length(value: &LengthPercentage) -> Length {
  match value {
    LengthPercentage::Px(px) => Length::Units(px_float(*px)),
    LengthPercentage::Percentage(pct) => Length::Percent(*pct),
  }
}

fn length_max(value: &MaxSize) -> LengthMax {
  match value {
    MaxSize::Px(px) => LengthMax::Units(px_float(*px)),
    MaxSize::Percentage(pct) => LengthMax::Percent(*pct),
    MaxSize::None => LengthMax::None,
  }
}

fn compute_box_style(winners: &Winners, parent: Option<&BoxStyle>) -> BoxStyle {
  let initial = BoxStyle::default();
  let parent = parent.unwrap_or(&initial);

  let lpa = |property: PropertyId, initial_value: LengthAuto, parent_value: LengthAuto| {
    resolve(
      winners,
      property,
      |value| match value {
        DeclaredValue::LengthPercentageAuto(v) => Some(length_auto(v)),
        _ => None,
      },
      initial_value,
      parent_value,
    )
  };
  let lp = |property: PropertyId, initial_value: Length, parent_value: Length| {
    resolve(
      winners,
      property,
      |value| match value {
        DeclaredValue::LengthPercentage(v) => Some(length(v)),
        _ => None,
      },
      initial_value,
      parent_value,
    )
  };

  let border_side = |width: PropertyId, style: PropertyId| {
    let style = resolve(
      winners,
      style,
      |value| match value {
        DeclaredValue::BorderStyle(v) => Some(*v),
        _ => None,
      },
      BorderStyle::None,
      BorderStyle::None,
    );
    let width = resolve(
      winners,
      width,
      |value| match value {
        DeclaredValue::BorderWidth(v) => Some(*v),
        _ => None,
      },
      BorderWidth::Medium,
      BorderWidth::Medium,
    );
    if style.suppresses_width() {
      0
    } else {
      px_float(width.to_px())
    }
  };

  BoxStyle {
    display: resolve(
      winners,
      PropertyId::Display,
      |value| match value {
        DeclaredValue::Display(v) => Some(*v),
        _ => None,
      },
      initial.display,
      parent.display,
    ),
    position: resolve(
      winners,
      PropertyId::Position,
      |value| match value {
        DeclaredValue::Position(v) => Some(*v),
        _ => None,
      },
      initial.position,
      parent.position,
    ),
    z_index: resolve(
      winners,
      PropertyId::ZIndex,
      |value| match value {
        DeclaredValue::ZIndex(v) => Some(*v),
        _ => None,
      },
      initial.z_index,
      parent.z_index,
    ),
    width: lpa(PropertyId::Width, initial.width, parent.width),
    min_width: lp(PropertyId::MinWidth, initial.min_width, parent.min_width),
    max_width: resolve(
      winners,
      PropertyId::MaxWidth,
      |value| match value {
        DeclaredValue::MaxSize(v) => Some(length_max(v)),
        _ => None,
      },
      initial.max_width,
      parent.max_width,
    ),
    height: lpa(PropertyId::Height, initial.height, parent.height),
    min_height: lp(PropertyId::MinHeight, initial.min_height, parent.min_height),
    max_height: resolve(
      winners,
      PropertyId::MaxHeight,
      |value| match value {
        DeclaredValue::MaxSize(v) => Some(length_max(v)),
        _ => None,
      },
      initial.max_height,
      parent.max_height,
    ),
    margin: Edges {
      top: lpa(PropertyId::MarginTop, initial.margin.top, parent.margin.top),
      right: lpa(PropertyId::MarginRight, initial.margin.right, parent.margin.right),
      bottom: lpa(PropertyId::MarginBottom, initial.margin.bottom, parent.margin.bottom),
      left: lpa(PropertyId::MarginLeft, initial.margin.left, parent.margin.left),
    },
    padding: Edges {
      top: lp(PropertyId::PaddingTop, initial.padding.top, parent.padding.top),
      right: lp(PropertyId::PaddingRight, initial.padding.right, parent.padding.right),
      bottom: lp(PropertyId::PaddingBottom, initial.padding.bottom, parent.padding.bottom),
      left: lp(PropertyId::PaddingLeft, initial.padding.left, parent.padding.left),
    },
    border: EdgeOffsets {
      top: border_side(PropertyId::BorderTopWidth, PropertyId::BorderTopStyle),
      right: border_side(PropertyId::BorderRightWidth, PropertyId::BorderRightStyle),
      bottom: border_side(PropertyId::BorderBottomWidth, PropertyId::BorderBottomStyle),
      left: border_side(PropertyId::BorderLeftWidth, PropertyId::BorderLeftStyle),
    },
    inset: Edges {
      top: lpa(PropertyId::Top, initial.inset.top, parent.inset.top),
      right: lpa(PropertyId::Right, initial.inset.right, parent.inset.right),
      bottom: lpa(PropertyId::Bottom, initial.inset.bottom, parent.inset.bottom),
      left: lpa(PropertyId::Left, initial.inset.left, parent.inset.left),
    },
  }
}

fn compute_cosmetic_style(winners: &Winners, parent: Option<&CosmeticStyle>) -> CosmeticStyle {
  let initial = CosmeticStyle::default();
  let parent = parent.unwrap_or(&initial);

  // `color` resolves first; every other color property may reference it
  // through `currentColor`. On `color` itself, `currentColor` means
  // inherit.
  let color = resolve(
    winners,
    PropertyId::Color,
    |value| match value {
      DeclaredValue::Color(ColorValue::Rgba(rgba)) => Some(*rgba),
      DeclaredValue::Color(ColorValue::CurrentColor) => Some(parent.color),
      _ => None,
    },
    initial.color,
    parent.color,
  );

  let color_property = |property: PropertyId, initial_value: Rgba, parent_value: Rgba| {
    resolve(
      winners,
      property,
      |value| match value {
        DeclaredValue::Color(ColorValue::Rgba(rgba)) => Some(*rgba),
        DeclaredValue::Color(ColorValue::CurrentColor) => Some(color),
        _ => None,
      },
      initial_value,
      parent_value,
    )
  };

  CosmeticStyle {
    color,
    background: BackgroundStyle {
      color: color_property(
        PropertyId::BackgroundColor,
        Rgba::TRANSPARENT,
        parent.background.color,
      ),
      image: resolve(
        winners,
        PropertyId::BackgroundImage,
        |value| match value {
          DeclaredValue::BackgroundImage(v) => Some(v.clone()),
          _ => None,
        },
        BackgroundStyle::default().image,
        parent.background.image.clone(),
      ),
      repeat: resolve(
        winners,
        PropertyId::BackgroundRepeat,
        |value| match value {
          DeclaredValue::BackgroundRepeat(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().repeat,
        parent.background.repeat,
      ),
      attachment: resolve(
        winners,
        PropertyId::BackgroundAttachment,
        |value| match value {
          DeclaredValue::BackgroundAttachment(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().attachment,
        parent.background.attachment,
      ),
      position: resolve(
        winners,
        PropertyId::BackgroundPosition,
        |value| match value {
          DeclaredValue::BackgroundPosition(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().position,
        parent.background.position,
      ),
      size: resolve(
        winners,
        PropertyId::BackgroundSize,
        |value| match value {
          DeclaredValue::BackgroundSize(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().size,
        parent.background.size,
      ),
      clip: resolve(
        winners,
        PropertyId::BackgroundClip,
        |value| match value {
          DeclaredValue::BackgroundBox(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().clip,
        parent.background.clip,
      ),
      origin: resolve(
        winners,
        PropertyId::BackgroundOrigin,
        |value| match value {
          DeclaredValue::BackgroundBox(v) => Some(*v),
          _ => None,
        },
        BackgroundStyle::default().origin,
        parent.background.origin,
      ),
    },
    border_colors: Edges {
      top: color_property(PropertyId::BorderTopColor, color, parent.border_colors.top),
      right: color_property(PropertyId::BorderRightColor, color, parent.border_colors.right),
      bottom: color_property(
        PropertyId::BorderBottomColor,
        color,
        parent.border_colors.bottom,
      ),
      left: color_property(PropertyId::BorderLeftColor, color, parent.border_colors.left),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::css::stylesheet::parse_inline_declarations;
  use crate::dom::ElementTree;
  use crate::dom::ElementTreeBuilder;
  use crate::geometry::px;
  use crate::style::values::Display;

  fn tree_with(parent_css: &str, child_css: &str) -> (ElementTree, ElementRef, ElementRef) {
    let mut builder = ElementTreeBuilder::new();
    let parent = builder.open_element("div");
    let child = builder.open_element("p");
    builder.close_element();
    builder.close_element();
    let mut tree = builder.finish();
    tree.add_declarations(
      parent,
      CascadeOrigin::Author,
      parse_inline_declarations(parent_css),
    );
    tree.add_declarations(
      child,
      CascadeOrigin::Author,
      parse_inline_declarations(child_css),
    );
    (tree, parent, child)
  }

  fn styles(tree: &ElementTree, parent: ElementRef, child: ElementRef) -> (BoxStyle, BoxStyle) {
    let mut computer = StyleComputer::new(tree);
    computer.set_root_element(Stage::BoxGen, parent);
    let parent_style = computer.current_box_style().clone();
    computer.push_element(Stage::BoxGen, child);
    let child_style = computer.current_box_style().clone();
    (parent_style, child_style)
  }

  fn cosmetics(
    tree: &ElementTree,
    parent: ElementRef,
    child: ElementRef,
  ) -> (CosmeticStyle, CosmeticStyle) {
    let mut computer = StyleComputer::new(tree);
    computer.set_root_element(Stage::Cosmetic, parent);
    let parent_style = computer.current_cosmetic_style().clone();
    computer.push_element(Stage::Cosmetic, child);
    let child_style = computer.current_cosmetic_style().clone();
    (parent_style, child_style)
  }

  #[test]
  fn test_box_properties_do_not_inherit() {
    let (tree, parent, child) = tree_with("display: block; width: 100px", "");
    let (parent_style, child_style) = styles(&tree, parent, child);
    assert_eq!(parent_style.display, Display::Block);
    assert_eq!(parent_style.width, LengthAuto::Units(px(100)));
    assert_eq!(child_style.display, Display::Inline);
    assert!(child_style.width.is_auto());
  }

  #[test]
  fn test_color_inherits() {
    let (tree, parent, child) = tree_with("color: rgb(10, 20, 30)", "");
    let (parent_style, child_style) = cosmetics(&tree, parent, child);
    assert_eq!(parent_style.color, Rgba::new(10, 20, 30, 255));
    assert_eq!(child_style.color, Rgba::new(10, 20, 30, 255));
  }

  #[test]
  fn test_inherit_keyword_on_non_inherited_property() {
    let (tree, parent, child) = tree_with("width: 100px", "width: inherit");
    let (_, child_style) = styles(&tree, parent, child);
    assert_eq!(child_style.width, LengthAuto::Units(px(100)));
  }

  #[test]
  fn test_unset_resolves_by_inheritance_class() {
    let (tree, parent, child) = tree_with(
      "color: rgb(1, 2, 3); width: 50px",
      "color: unset; width: unset",
    );
    let (_, child_box) = styles(&tree, parent, child);
    let (_, child_cosmetic) = cosmetics(&tree, parent, child);
    assert!(child_box.width.is_auto(), "unset width falls to initial");
    assert_eq!(
      child_cosmetic.color,
      Rgba::new(1, 2, 3, 255),
      "unset color falls to inherited"
    );
  }

  #[test]
  fn test_important_beats_later_normal() {
    let mut builder = ElementTreeBuilder::new();
    let element = builder.open_element("div");
    let mut tree = builder.finish();
    tree.add_declarations(
      element,
      CascadeOrigin::Author,
      parse_inline_declarations("width: 10px !important"),
    );
    tree.add_declarations(
      element,
      CascadeOrigin::Author,
      parse_inline_declarations("width: 20px"),
    );
    let mut computer = StyleComputer::new(&tree);
    computer.set_root_element(Stage::BoxGen, element);
    assert_eq!(computer.current_box_style().width, LengthAuto::Units(px(10)));
  }

  #[test]
  fn test_border_width_requires_style() {
    let (tree, parent, child) = tree_with(
      "border-top-width: 10px",
      "border-top-width: 10px; border-top-style: solid",
    );
    let (parent_style, child_style) = styles(&tree, parent, child);
    assert_eq!(parent_style.border.top, 0, "no border-style, no width");
    assert_eq!(child_style.border.top, px(10));
  }

  #[test]
  fn test_current_color_border() {
    let (tree, parent, child) = tree_with(
      "color: rgb(5, 6, 7)",
      "border-top-color: currentColor; background-color: currentColor",
    );
    let (_, child_style) = cosmetics(&tree, parent, child);
    assert_eq!(child_style.border_colors.top, Rgba::new(5, 6, 7, 255));
    assert_eq!(child_style.background.color, Rgba::new(5, 6, 7, 255));
    // Unspecified sides default to currentColor too.
    assert_eq!(child_style.border_colors.left, Rgba::new(5, 6, 7, 255));
  }

  #[test]
  fn test_later_declaration_wins_at_equal_rank() {
    let mut builder = ElementTreeBuilder::new();
    let element = builder.open_element("div");
    let mut tree = builder.finish();
    tree.add_declarations(
      element,
      CascadeOrigin::Author,
      parse_inline_declarations("z-index: 1; z-index: 2"),
    );
    let mut computer = StyleComputer::new(&tree);
    computer.set_root_element(Stage::BoxGen, element);
    assert_eq!(
      computer.current_box_style().z_index,
      crate::style::values::ZIndex::Integer(2)
    );
  }
}
