//! Geometric areas derived from resources and envelopes.

use std::sync::Arc;

use geo::{Intersects, LineString, MultiPolygon, Polygon};
use kestrel_core::{Couple, Envelope, ObjectService, ResourceKind, ResourceSet};

/// An immutable 2D shape used for collision detection.
///
/// Areas are unions of polygons. The empty area intersects nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    shape: MultiPolygon<f64>,
}

impl Area {
    /// The area covering nothing.
    pub fn empty() -> Self {
        Self {
            shape: MultiPolygon::new(Vec::new()),
        }
    }

    /// Area of a single polygon. Fewer than three vertices give an empty area.
    pub fn polygon(vertices: &[Couple]) -> Self {
        if vertices.len() < 3 {
            return Self::empty();
        }
        let ring: LineString<f64> = vertices.iter().map(|c| (c.x, c.y)).collect::<Vec<_>>().into();
        Self {
            shape: MultiPolygon::new(vec![Polygon::new(ring, Vec::new())]),
        }
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::from(&Envelope::rectangle(min_x, min_y, max_x, max_y))
    }

    /// Union of this area and another one.
    pub fn union(mut self, other: Area) -> Self {
        self.shape.0.extend(other.shape.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }

    /// Whether the two areas share at least one point.
    pub fn intersects(&self, other: &Area) -> bool {
        self.shape
            .0
            .iter()
            .any(|a| other.shape.0.iter().any(|b| a.intersects(b)))
    }
}

impl Default for Area {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&Envelope> for Area {
    fn from(envelope: &Envelope) -> Self {
        Area::polygon(&envelope.vertices)
    }
}

/// Maps a set of resources to the area a vehicle with the given envelope occupies on them.
pub trait AreaProvider: Send + Sync {
    fn area_for(&self, envelope_key: &str, resources: &ResourceSet) -> Area;
}

/// Area provider reading the envelopes stored on points and paths of the plant model.
///
/// Resources without an envelope for the requested key contribute nothing.
pub struct EnvelopeAreaProvider {
    objects: Arc<dyn ObjectService>,
}

impl EnvelopeAreaProvider {
    pub fn new(objects: Arc<dyn ObjectService>) -> Self {
        Self { objects }
    }

    fn envelope_of(&self, kind: ResourceKind, name: &str, envelope_key: &str) -> Option<Envelope> {
        match kind {
            ResourceKind::Point => self
                .objects
                .point(name)
                .and_then(|point| point.vehicle_envelopes.get(envelope_key).cloned()),
            ResourceKind::Path => self
                .objects
                .path(name)
                .and_then(|path| path.vehicle_envelopes.get(envelope_key).cloned()),
            ResourceKind::Location => None,
        }
    }
}

impl AreaProvider for EnvelopeAreaProvider {
    fn area_for(&self, envelope_key: &str, resources: &ResourceSet) -> Area {
        resources
            .iter()
            .filter_map(|resource| self.envelope_of(resource.kind, &resource.name, envelope_key))
            .map(|envelope| Area::from(&envelope))
            .fold(Area::empty(), Area::union)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{Path, Point, ResourceRef};
    use kestrel_state::InMemoryPlant;

    #[test]
    fn test_area_intersection() {
        let a = Area::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Area::rectangle(5.0, 5.0, 15.0, 15.0);
        let c = Area::rectangle(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.clone().union(c.clone()).intersects(&c));
    }

    #[test]
    fn test_empty_area_intersects_nothing() {
        let a = Area::rectangle(0.0, 0.0, 10.0, 10.0);
        assert!(!Area::empty().intersects(&a));
        assert!(!a.intersects(&Area::empty()));
        assert!(Area::polygon(&[Couple::new(0.0, 0.0), Couple::new(1.0, 1.0)]).is_empty());
    }

    #[test]
    fn test_envelope_area_provider() {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_point(Point::new("P1").with_envelope("small", Envelope::rectangle(0.0, 0.0, 1.0, 1.0)))
            .add_point(Point::new("P2"))
            .add_path(
                Path::new("P1--P2", "P1", "P2", 1000)
                    .with_envelope("small", Envelope::rectangle(1.0, 0.0, 9.0, 1.0)),
            );
        let provider = EnvelopeAreaProvider::new(plant);

        let resources: ResourceSet = [
            ResourceRef::point("P1"),
            ResourceRef::point("P2"),
            ResourceRef::path("P1--P2"),
        ]
        .into();

        let area = provider.area_for("small", &resources);
        assert!(area.intersects(&Area::rectangle(8.0, 0.5, 8.5, 0.8)));
        assert!(provider.area_for("large", &resources).is_empty());
    }
}
