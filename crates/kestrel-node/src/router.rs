//! Shortest-path router over the points and paths of the plant model.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_core::{
    Destination, DriveOrder, ObjectService, ResourceRef, ResourceSet, Route, Step, TransportOrder,
    Vehicle,
};
use kestrel_dispatch::{Router, UNREACHABLE_COSTS};
use pathfinding::prelude::dijkstra;
use tracing::debug;

#[derive(Debug, Clone)]
struct Edge {
    path: String,
    destination: String,
    length: u64,
}

/// Directed graph of the plant, keyed by source point.
struct Graph {
    edges: HashMap<String, Vec<Edge>>,
}

impl Graph {
    /// Build the graph, leaving out avoided paths and paths leading to avoided points.
    fn build(objects: &dyn ObjectService, avoid: &ResourceSet) -> Self {
        let mut edges: HashMap<String, Vec<Edge>> = HashMap::new();
        for path in objects.paths(&|_| true) {
            if avoid.contains(&ResourceRef::path(path.name.clone()))
                || avoid.contains(&ResourceRef::point(path.destination_point.clone()))
            {
                continue;
            }
            edges.entry(path.source_point).or_default().push(Edge {
                path: path.name,
                destination: path.destination_point,
                length: path.length,
            });
        }
        Self { edges }
    }

    fn successors(&self, point: &str) -> Vec<(String, u64)> {
        self.edges
            .get(point)
            .map(|edges| {
                edges
                    .iter()
                    .map(|edge| (edge.destination.clone(), edge.length))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The shortest path edge between two adjacent points.
    fn step_between(&self, source: &str, destination: &str) -> Option<Step> {
        self.edges
            .get(source)?
            .iter()
            .filter(|edge| edge.destination == destination)
            .min_by(|a, b| a.length.cmp(&b.length).then_with(|| a.path.cmp(&b.path)))
            .map(|edge| Step::along(edge.path.clone(), source, destination))
    }

    /// Steps and costs of the shortest route between two points.
    fn shortest(&self, source: &str, destination: &str) -> Option<(Vec<Step>, u64)> {
        if source == destination {
            return Some((vec![Step::stay(destination)], 0));
        }

        let (points, costs) = dijkstra(
            &source.to_string(),
            |point: &String| self.successors(point),
            |point: &String| point == destination,
        )?;
        let steps = points
            .windows(2)
            .map(|pair| self.step_between(&pair[0], &pair[1]))
            .collect::<Option<Vec<Step>>>()?;
        Some((steps, costs))
    }
}

/// Router computing shortest routes by path length.
///
/// A destination naming a location is reached through any of its links that
/// permit the destination's operation; a destination naming a point is that
/// point. The graph is rebuilt from the object service on every request.
pub struct GraphRouter {
    objects: Arc<dyn ObjectService>,
}

impl GraphRouter {
    pub fn new(objects: Arc<dyn ObjectService>) -> Self {
        Self { objects }
    }

    /// Points a vehicle may stop at to reach the destination.
    fn destination_points(&self, destination: &Destination) -> Vec<String> {
        if let Some(location) = self.objects.location(&destination.location) {
            return location
                .links
                .iter()
                .filter(|link| link.permits(&destination.operation))
                .map(|link| link.point.clone())
                .collect();
        }
        if self.objects.point(&destination.location).is_some() {
            return vec![destination.location.clone()];
        }
        Vec::new()
    }
}

impl Router for GraphRouter {
    fn check_routability(&self, order: &TransportOrder) -> bool {
        let graph = Graph::build(self.objects.as_ref(), &ResourceSet::new());
        let mut previous: Option<Vec<String>> = None;

        for drive_order in &order.drive_orders {
            let points = self.destination_points(&drive_order.destination);
            if points.is_empty() {
                debug!("{}: no point to reach {}", order.name, drive_order.destination.location);
                return false;
            }
            if let Some(previous) = &previous {
                let connected = previous.iter().any(|source| {
                    points
                        .iter()
                        .any(|destination| graph.shortest(source, destination).is_some())
                });
                if !connected {
                    debug!("{}: {} cannot be reached", order.name, drive_order.destination.location);
                    return false;
                }
            }
            previous = Some(points);
        }
        true
    }

    fn route(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Option<Vec<DriveOrder>> {
        let graph = Graph::build(self.objects.as_ref(), &ResourceSet::new());
        let mut source = source_point.to_string();
        let mut drive_orders = Vec::with_capacity(order.drive_orders.len());

        for drive_order in &order.drive_orders {
            let (costs, point, steps) = self
                .destination_points(&drive_order.destination)
                .into_iter()
                .filter_map(|point| {
                    graph
                        .shortest(&source, &point)
                        .map(|(steps, costs)| (costs, point, steps))
                })
                .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))?;
            drive_orders.push(drive_order.clone().with_route(Route::new(steps, costs)));
            source = point;
        }
        Some(drive_orders)
    }

    fn costs(
        &self,
        _vehicle: &Vehicle,
        source_point: &str,
        destination_point: &str,
        resources_to_avoid: &ResourceSet,
    ) -> u64 {
        Graph::build(self.objects.as_ref(), resources_to_avoid)
            .shortest(source_point, destination_point)
            .map_or(UNREACHABLE_COSTS, |(_, costs)| costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{Link, Location, Point};
    use kestrel_state::InMemoryPlant;

    /// A -> B -> C with a long detour A -> D -> C and a station linked to B and C.
    fn create_plant() -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_point(Point::new("A"))
            .add_point(Point::new("B"))
            .add_point(Point::new("C"))
            .add_point(Point::new("D"))
            .add_path(kestrel_core::Path::new("A--B", "A", "B", 1000))
            .add_path(kestrel_core::Path::new("B--C", "B", "C", 1000))
            .add_path(kestrel_core::Path::new("A--D", "A", "D", 3000))
            .add_path(kestrel_core::Path::new("D--C", "D", "C", 3000))
            .add_location(
                Location::new("Station", "Station")
                    .with_link(Link::new("C"))
                    .with_link(Link::new("B").with_operation("LOAD")),
            );
        plant
    }

    fn vehicle() -> Vehicle {
        Vehicle::idle_at("Vehicle-01", "A")
    }

    #[test]
    fn test_costs_follow_shortest_path() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);

        assert_eq!(router.costs(&vehicle(), "A", "C", &ResourceSet::new()), 2000);
        assert_eq!(router.costs(&vehicle(), "A", "A", &ResourceSet::new()), 0);
        assert_eq!(router.costs(&vehicle(), "C", "A", &ResourceSet::new()), UNREACHABLE_COSTS);
    }

    #[test]
    fn test_costs_avoid_resources() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);

        let avoid: ResourceSet = [ResourceRef::point("B")].into();
        assert_eq!(router.costs(&vehicle(), "A", "C", &avoid), 6000);

        let avoid: ResourceSet = [ResourceRef::point("B"), ResourceRef::path("D--C")].into();
        assert_eq!(router.costs(&vehicle(), "A", "C", &avoid), UNREACHABLE_COSTS);
    }

    #[test]
    fn test_route_uses_link_permitting_the_operation() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);
        let order = TransportOrder::new(
            "Order-01",
            vec![Destination::new("Station", "UNLOAD"), Destination::new("C", "NOP")],
        );

        let drive_orders = router.route(&vehicle(), "A", &order).unwrap();

        let first = drive_orders[0].route.as_ref().unwrap();
        assert_eq!(
            first.steps,
            vec![Step::along("A--B", "A", "B"), Step::along("B--C", "B", "C")]
        );
        assert_eq!(first.costs, 2000);

        let second = drive_orders[1].route.as_ref().unwrap();
        assert_eq!(second.steps, vec![Step::stay("C")]);
        assert_eq!(second.costs, 0);
    }

    #[test]
    fn test_route_picks_cheapest_access_point() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);
        let order = TransportOrder::new("Order-01", vec![Destination::new("Station", "LOAD")]);

        let drive_orders = router.route(&vehicle(), "A", &order).unwrap();

        let route = drive_orders[0].route.as_ref().unwrap();
        assert_eq!(route.final_destination_point(), Some("B"));
        assert_eq!(route.costs, 1000);
    }

    #[test]
    fn test_unreachable_destination() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);
        let order = TransportOrder::new("Order-01", vec![Destination::new("A", "NOP")]);

        assert!(router.route(&vehicle(), "C", &order).is_none());
        // Reachable from some vehicle position.
        assert!(router.check_routability(&order));
    }

    #[test]
    fn test_routability() {
        let plant = create_plant();
        let router = GraphRouter::new(plant);

        let order = TransportOrder::new(
            "Order-01",
            vec![Destination::new("B", "NOP"), Destination::new("Station", "UNLOAD")],
        );
        assert!(router.check_routability(&order));

        let order = TransportOrder::new(
            "Order-02",
            vec![Destination::new("C", "NOP"), Destination::new("A", "NOP")],
        );
        assert!(!router.check_routability(&order));

        let order = TransportOrder::new("Order-03", vec![Destination::new("Nowhere", "NOP")]);
        assert!(!router.check_routability(&order));
    }
}
