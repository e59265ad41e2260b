//! Style system
//!
//! Declared value types ([`values`]), their computed forms
//! ([`computed`]), and the style computer ([`computer`]) that runs the
//! cascade per element during layout.

pub mod computed;
pub mod computer;
pub mod values;

pub use computed::BoxStyle;
pub use computed::CosmeticStyle;
pub use computer::Stage;
pub use computer::StyleComputer;
