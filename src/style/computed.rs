//! Computed style forms
//!
//! Computed values per CSS Cascading 4: absolute lengths are resolved to
//! layout units, percentages survive (they resolve against the containing
//! block during layout), and keywords are normalized. One struct per
//! layout stage: [`BoxStyle`] feeds box generation and sizing,
//! [`CosmeticStyle`] feeds the cosmetic pass.

use crate::geometry::EdgeOffsets;
use crate::geometry::Unit;
use crate::style::values::BackgroundAttachment;
use crate::style::values::BackgroundBox;
use crate::style::values::BackgroundImage;
use crate::style::values::BackgroundPosition;
use crate::style::values::BackgroundRepeat;
use crate::style::values::BackgroundSize;
use crate::style::values::Display;
use crate::style::values::Position;
use crate::style::values::Rgba;
use crate::style::values::ZIndex;

/// A computed length or percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
  Units(Unit),
  Percent(f32),
}

impl Length {
  pub const ZERO: Self = Self::Units(0);

  /// Resolves against a base length (the percentage basis).
  pub fn resolve(self, basis: Unit) -> Unit {
    match self {
      Length::Units(units) => units,
      Length::Percent(percent) => ((basis as f32) * percent / 100.0).round() as Unit,
    }
  }
}

/// A computed length, percentage, or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LengthAuto {
  Units(Unit),
  Percent(f32),
  #[default]
  Auto,
}

impl LengthAuto {
  pub fn is_auto(self) -> bool {
    matches!(self, LengthAuto::Auto)
  }

  /// Resolves against a basis; `auto` resolves to `None`.
  pub fn resolve(self, basis: Unit) -> Option<Unit> {
    match self {
      LengthAuto::Units(units) => Some(units),
      LengthAuto::Percent(percent) => Some(((basis as f32) * percent / 100.0).round() as Unit),
      LengthAuto::Auto => None,
    }
  }
}

/// A computed max-size constraint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LengthMax {
  Units(Unit),
  Percent(f32),
  #[default]
  None,
}

impl LengthMax {
  /// Resolves against a basis; `none` is an infinite bound.
  pub fn resolve(self, basis: Unit) -> Option<Unit> {
    match self {
      LengthMax::Units(units) => Some(units),
      LengthMax::Percent(percent) => Some(((basis as f32) * percent / 100.0).round() as Unit),
      LengthMax::None => None,
    }
  }
}

/// Per-side values in CSS order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges<T> {
  pub top: T,
  pub right: T,
  pub bottom: T,
  pub left: T,
}

impl<T: Copy> Edges<T> {
  pub fn uniform(value: T) -> Self {
    Self {
      top: value,
      right: value,
      bottom: value,
      left: value,
    }
  }
}

/// Computed style consumed by box generation and sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
  pub display: Display,
  pub position: Position,
  pub z_index: ZIndex,
  pub width: LengthAuto,
  pub min_width: Length,
  pub max_width: LengthMax,
  pub height: LengthAuto,
  pub min_height: Length,
  pub max_height: LengthMax,
  pub margin: Edges<LengthAuto>,
  pub padding: Edges<Length>,
  /// Used border widths in units, already zeroed where the side's style
  /// is `none` or `hidden`
  pub border: EdgeOffsets,
  pub inset: Edges<LengthAuto>,
}

impl Default for BoxStyle {
  fn default() -> Self {
    Self {
      display: Display::Inline,
      position: Position::Static,
      z_index: ZIndex::Auto,
      width: LengthAuto::Auto,
      min_width: Length::ZERO,
      max_width: LengthMax::None,
      height: LengthAuto::Auto,
      min_height: Length::ZERO,
      max_height: LengthMax::None,
      margin: Edges::uniform(LengthAuto::Units(0)),
      padding: Edges::uniform(Length::ZERO),
      border: EdgeOffsets::ZERO,
      inset: Edges::uniform(LengthAuto::Auto),
    }
  }
}

/// Computed background, one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundStyle {
  pub color: Rgba,
  pub image: BackgroundImage,
  pub repeat: BackgroundRepeat,
  pub attachment: BackgroundAttachment,
  pub position: BackgroundPosition,
  pub size: BackgroundSize,
  pub clip: BackgroundBox,
  pub origin: BackgroundBox,
}

impl Default for BackgroundStyle {
  fn default() -> Self {
    Self {
      color: Rgba::TRANSPARENT,
      image: BackgroundImage::None,
      repeat: BackgroundRepeat::default(),
      attachment: BackgroundAttachment::Scroll,
      position: BackgroundPosition::default(),
      size: BackgroundSize::default(),
      clip: BackgroundBox::BorderBox,
      origin: BackgroundBox::PaddingBox,
    }
  }
}

/// Computed style consumed by the cosmetic pass. All `currentColor`
/// references are already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmeticStyle {
  /// Text color; inherited
  pub color: Rgba,
  pub background: BackgroundStyle,
  pub border_colors: Edges<Rgba>,
}

impl Default for CosmeticStyle {
  fn default() -> Self {
    Self {
      color: Rgba::BLACK,
      background: BackgroundStyle::default(),
      border_colors: Edges::uniform(Rgba::BLACK),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_length_resolution() {
    assert_eq!(Length::Units(40).resolve(1000), 40);
    assert_eq!(Length::Percent(25.0).resolve(1000), 250);
    assert_eq!(LengthAuto::Auto.resolve(1000), None);
    assert_eq!(LengthAuto::Percent(50.0).resolve(300), Some(150));
    assert_eq!(LengthMax::None.resolve(1000), None);
  }

  #[test]
  fn test_initial_box_style() {
    let style = BoxStyle::default();
    assert_eq!(style.display, Display::Inline);
    assert!(style.width.is_auto());
    assert_eq!(style.margin.top, LengthAuto::Units(0));
    assert!(style.inset.left.is_auto());
  }
}
