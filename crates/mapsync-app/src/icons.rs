//! Icon resolution.
//!
//! Markers carry an [`IconRef`]; the image behind it is looked up only when
//! markers are drawn. A failed lookup is not an error.

use std::collections::HashMap;

use mapsync_core::IconRef;

use crate::engine::IconImage;

/// Resolves icon references to images.
pub trait IconResolver {
    /// Image for `icon`, or `None` if the resource does not exist.
    fn resolve(&self, icon: &IconRef) -> Option<IconImage>;
}

/// In-memory icon registry.
#[derive(Debug, Clone, Default)]
pub struct IconRegistry {
    icons: HashMap<IconRef, IconImage>,
}

impl IconRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under `icon`, replacing any previous image.
    pub fn insert(&mut self, icon: impl Into<IconRef>, image: IconImage) {
        self.icons.insert(icon.into(), image);
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, icon: impl Into<IconRef>, image: IconImage) -> Self {
        self.insert(icon, image);
        self
    }

    /// Number of registered icons.
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Whether no icons are registered.
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

impl IconResolver for IconRegistry {
    fn resolve(&self, icon: &IconRef) -> Option<IconImage> {
        self.icons.get(icon).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_by_name() {
        let mut registry = IconRegistry::new();
        assert!(registry.is_empty());

        registry.insert("pin", IconImage::rgba(1, 1, vec![1, 1, 1, 1]));
        registry.insert("pin", IconImage::rgba(1, 1, vec![2, 2, 2, 2]));
        assert_eq!(registry.len(), 1);

        let image = registry.resolve(&IconRef::from("pin")).unwrap();
        assert_eq!(image, IconImage::rgba(1, 1, vec![2, 2, 2, 2]));
        assert_eq!(registry.resolve(&IconRef::from("flag")), None);
    }
}
