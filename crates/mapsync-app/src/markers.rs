//! Marker synchronization.
//!
//! Markers are always redrawn as a whole: clear every annotation, then
//! create one per marker in list order. Cost is one engine call per marker
//! (two with an icon) on every change, however small the change.
//!
//! A marker whose icon cannot be resolved still gets an annotation, without
//! a custom image, so the engine draws its default glyph there.

use mapsync_core::Marker;
use tracing::debug;

use crate::{
    engine::{AnnotationOptions, IconAnchor, MapEngine},
    icons::IconResolver,
};

/// Outcome of a marker sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerSyncReport {
    /// Annotations created
    pub created: usize,
    /// Annotations created without a custom icon
    pub without_icon: usize,
}

/// Marker sync that stopped at an engine error.
///
/// Annotations created before the error stay on the overlay; `drawn`
/// describes them.
#[derive(Debug)]
pub struct PartialMarkerSync<Err> {
    /// What is on the overlay now
    pub drawn: MarkerSyncReport,
    /// Engine error that stopped the sync
    pub error: Err,
}

/// Replace every annotation on `overlay` with `markers`.
///
/// # Errors
///
/// Stops at the first engine error and reports what was drawn up to it.
pub fn sync_markers<E, R>(
    engine: &mut E,
    icons: &R,
    style: &mut E::Style,
    overlay: &mut E::Overlay,
    markers: &[Marker],
) -> Result<MarkerSyncReport, PartialMarkerSync<E::Error>>
where
    E: MapEngine,
    R: IconResolver + ?Sized,
{
    engine.delete_all_annotations(overlay);

    let mut report = MarkerSyncReport::default();
    for marker in markers {
        let icon = match icons.resolve(&marker.icon) {
            Some(image) => {
                let name = marker.icon.as_str();
                engine.add_image(style, name, &image);
                Some(name.to_string())
            },
            None => {
                debug!(icon = %marker.icon, "icon not found, using default glyph");
                None
            },
        };

        let without_icon = icon.is_none();
        let anchor = if marker.anchor_bottom { IconAnchor::Bottom } else { IconAnchor::Center };
        let options = AnnotationOptions {
            latitude: marker.latitude,
            longitude: marker.longitude,
            icon,
            anchor,
        };
        if let Err(error) = engine.create_annotation(overlay, options) {
            return Err(PartialMarkerSync { drawn: report, error });
        }

        report.created += 1;
        if without_icon {
            report.without_icon += 1;
        }
    }

    Ok(report)
}
