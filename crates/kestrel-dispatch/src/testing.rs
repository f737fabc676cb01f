//! Test doubles shared by the dispatcher's unit tests.

use std::collections::{BTreeSet, HashMap};

use kestrel_core::{DriveOrder, ResourceSet, Route, Step, TransportOrder, Vehicle};

use crate::routing::{Router, UNREACHABLE_COSTS};

/// Router treating every destination location as a point one step away.
#[derive(Debug, Default)]
pub struct StaticRouter {
    costs: HashMap<String, u64>,
    unreachable: BTreeSet<String>,
}

impl StaticRouter {
    /// Costs of reaching the given point from anywhere. Defaults to 1.
    pub fn with_costs(mut self, point: &str, costs: u64) -> Self {
        self.costs.insert(point.to_string(), costs);
        self
    }

    pub fn with_unreachable(mut self, point: &str) -> Self {
        self.unreachable.insert(point.to_string());
        self
    }

    fn costs_to(&self, point: &str) -> Option<u64> {
        if self.unreachable.contains(point) {
            return None;
        }
        Some(self.costs.get(point).copied().unwrap_or(1))
    }
}

impl Router for StaticRouter {
    fn check_routability(&self, order: &TransportOrder) -> bool {
        order
            .drive_orders
            .iter()
            .all(|drive_order| self.costs_to(&drive_order.destination.location).is_some())
    }

    fn route(&self, _vehicle: &Vehicle, source_point: &str, order: &TransportOrder) -> Option<Vec<DriveOrder>> {
        let mut source = source_point.to_string();
        let mut drive_orders = Vec::new();
        for drive_order in &order.drive_orders {
            let destination = drive_order.destination.location.clone();
            let costs = self.costs_to(&destination)?;
            let step = if source == destination {
                Step::stay(destination.clone())
            } else {
                Step::along(format!("{}--{}", source, destination), source.clone(), destination.clone())
            };
            drive_orders.push(drive_order.clone().with_route(Route::new(vec![step], costs)));
            source = destination;
        }
        Some(drive_orders)
    }

    fn costs(&self, _vehicle: &Vehicle, _source_point: &str, destination_point: &str, _avoid: &ResourceSet) -> u64 {
        self.costs_to(destination_point).unwrap_or(UNREACHABLE_COSTS)
    }
}

/// The order's drive orders, each routed to stay at its destination.
pub fn routed(order: &TransportOrder) -> Vec<DriveOrder> {
    order
        .drive_orders
        .iter()
        .map(|drive_order| {
            let point = drive_order.destination.location.clone();
            drive_order.clone().with_route(Route::new(vec![Step::stay(point)], 1))
        })
        .collect()
}
