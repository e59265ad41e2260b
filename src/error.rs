//! Error types for boxflow
//!
//! Grammar-level problems (unparseable rules, invalid declaration values)
//! are never errors: the CSS parsers recover silently and the cascade treats
//! bad declarations as absent. What *is* an error is running out of room in
//! one of the fixed-width index spaces of the box tree, or an invalid value
//! reaching layout after the cascade should have filtered it.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and proper
//! error trait implementations.

use thiserror::Error;

/// Result type alias for layout operations
///
/// # Examples
///
/// ```
/// use boxflow::Result;
///
/// fn run_layout() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors surfaced by the layout entry points
///
/// Every variant is terminal for the layout run that produced it: the box
/// tree under construction is dropped in full and nothing is partially
/// committed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
  /// A computed value reaching layout was outside its legal range.
  ///
  /// The cascade is expected to reject these earlier; seeing this error
  /// indicates an inconsistency between the style computer and layout.
  #[error("invalid value reached layout")]
  InvalidValue,

  /// An allocation failed or an arena refused to grow.
  #[error("out of memory")]
  OutOfMemory,

  /// The stacking-context id space (u16) is exhausted.
  #[error("too many stacking contexts")]
  OutOfRefs,

  /// The block subtree id space (u8) is exhausted.
  #[error("too many block subtrees")]
  TooManyBlockSubtrees,

  /// A single subtree holds more blocks than a `BlockIndex` can address.
  #[error("too many blocks in one subtree")]
  TooManyBlocks,

  /// The inline-formatting-context id space is exhausted.
  #[error("too many inline formatting contexts")]
  TooManyIfcs,

  /// An inline formatting context holds more inline boxes than its index
  /// space can address.
  #[error("too many inline boxes")]
  TooManyInlineBoxes,
}
