//! boxflow: a CSS flow layout engine core
//!
//! Turns CSS source text plus an element tree into a box tree: a
//! positioned, sized, painted description of boxes ready for rendering.
//! The pipeline covers a useful subset of CSS 2.2 plus parts of CSS
//! Syntax 3, Selectors 3, Cascading 4, and Backgrounds & Borders 3.
//!
//! # Pipeline
//!
//! ```text
//! bytes --tokenize+parse--> ComponentTree --assemble--> Stylesheet
//!                                                          |
//!               ElementTree  <--apply_stylesheet-----------+
//!                    |
//!                do_layout --> BoxTree (blocks, IFCs, stacking contexts)
//! ```
//!
//! # Example
//!
//! ```
//! use boxflow::css::parser::parse_stylesheet;
//! use boxflow::css::stylesheet::{apply_stylesheet, build_stylesheet, CascadeOrigin, Environment};
//! use boxflow::dom::ElementTreeBuilder;
//! use boxflow::geometry::{px, Size};
//! use boxflow::images::Images;
//! use boxflow::layout::do_layout;
//! use boxflow::text::MonospaceFont;
//!
//! let components = parse_stylesheet("div { display: block; width: 100px; height: 50px }");
//! let mut env = Environment::new();
//! let sheet = build_stylesheet(&components, &mut env);
//!
//! let mut builder = ElementTreeBuilder::new();
//! let root = builder.open_element("div");
//! builder.close_element();
//! let mut elements = builder.finish();
//! apply_stylesheet(&sheet, &mut elements, CascadeOrigin::Author);
//!
//! let font = MonospaceFont::new(px(8), px(12), px(4));
//! let boxes = do_layout(&elements, root, &font, &Images::new(), Size::new(px(400), px(400)))
//!   .expect("layout");
//! let subtree = boxes.subtree(boxes.initial_containing_block().subtree);
//! assert_eq!(subtree.len(), 2);
//! ```

pub mod css;
pub mod dom;
pub mod error;
pub mod geometry;
pub mod images;
pub mod layout;
pub mod style;
pub mod text;
pub mod tree;

pub use error::LayoutError;
pub use error::Result;
pub use geometry::Point;
pub use geometry::Rect;
pub use geometry::Size;
pub use geometry::Unit;
pub use layout::do_layout;
pub use tree::BoxTree;
