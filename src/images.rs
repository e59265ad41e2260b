//! Image collaborator interface
//!
//! The engine does not decode images. The caller supplies a read-only
//! [`Images`] table of already-decoded image descriptions, and the cosmetic
//! pass resolves `background-image: url(...)` values against it by URL.

use crate::geometry::Size;

/// Stable identifier of an image within an [`Images`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// Description of one decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
  /// URL this image was fetched from, matched against `url(...)` values
  pub url: String,
  /// Intrinsic size in layout units
  pub size: Size,
}

/// A read-only, index-stable collection of images.
///
/// Ids are positions in insertion order and remain valid for the lifetime
/// of the table.
#[derive(Debug, Default, Clone)]
pub struct Images {
  entries: Vec<ImageDescription>,
}

impl Images {
  /// Creates an empty image table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds an image and returns its id.
  pub fn add(&mut self, description: ImageDescription) -> ImageId {
    let id = ImageId(self.entries.len() as u32);
    self.entries.push(description);
    id
  }

  /// Looks up an image by id.
  pub fn get(&self, id: ImageId) -> Option<&ImageDescription> {
    self.entries.get(id.0 as usize)
  }

  /// Finds the id of the image fetched from `url`, if any.
  pub fn find_url(&self, url: &str) -> Option<ImageId> {
    self
      .entries
      .iter()
      .position(|entry| entry.url == url)
      .map(|index| ImageId(index as u32))
  }

  /// Number of images in the table.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns true if the table holds no images.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Size;

  #[test]
  fn test_find_url() {
    let mut images = Images::new();
    let id = images.add(ImageDescription {
      url: "https://example.test/bg.png".to_string(),
      size: Size::new(64, 64),
    });
    assert_eq!(images.find_url("https://example.test/bg.png"), Some(id));
    assert_eq!(images.find_url("missing.png"), None);
  }
}
