//! Demo plant the node runs against.
//!
//! Six points on a one-way loop with a shortcut from B to E:
//!
//! ```text
//!  F <--- E <--- D
//!  |      ^      ^
//!  v      |      |
//!  A ---> B ---> C
//! ```
//!
//! Storage stations hang off B and D, a charger off F and a lift device
//! off E. A is a parking position. The two paths merging into E form a
//! block.
//!
//! Path envelopes end [`PATH_CLEARANCE`] short of the envelopes of the
//! points they connect, so a vehicle entering the merge block does not
//! collide with one standing next to it on the loop.

use std::sync::Arc;

use kestrel_core::{
    Block, BlockType, Destination, Envelope, Link, Location, LocationType, Path, PeripheralJob,
    PeripheralOperation, PeripheralState, Point, PointType, ResourceRef, Result,
    TransportOrderCreation, Vehicle,
};
use kestrel_state::InMemoryPlant;

pub const ENVELOPE_KEY: &str = "Default";

/// Half the width of a vehicle's footprint in millimeters.
const HALF_WIDTH: f64 = 1000.0;

/// Gap between a path's envelope and the envelopes of its end points.
const PATH_CLEARANCE: f64 = 500.0;

const LAYOUT: [(&str, f64, f64); 6] = [
    ("A", 0.0, 0.0),
    ("B", 10_000.0, 0.0),
    ("C", 20_000.0, 0.0),
    ("D", 20_000.0, 10_000.0),
    ("E", 10_000.0, 10_000.0),
    ("F", 0.0, 10_000.0),
];

const PATHS: [(&str, &str); 7] = [
    ("A", "B"),
    ("B", "C"),
    ("C", "D"),
    ("D", "E"),
    ("E", "F"),
    ("F", "A"),
    ("B", "E"),
];

fn coordinates(point: &str) -> (f64, f64) {
    LAYOUT
        .iter()
        .find(|(name, _, _)| *name == point)
        .map_or((0.0, 0.0), |(_, x, y)| (*x, *y))
}

fn point_envelope(point: &str) -> Envelope {
    let (x, y) = coordinates(point);
    Envelope::rectangle(x - HALF_WIDTH, y - HALF_WIDTH, x + HALF_WIDTH, y + HALF_WIDTH)
}

fn path_envelope(source: &str, destination: &str) -> Envelope {
    let (x1, y1) = coordinates(source);
    let (x2, y2) = coordinates(destination);
    let (min_x, max_x) = extent(x1, x2);
    let (min_y, max_y) = extent(y1, y2);
    Envelope::rectangle(min_x, min_y, max_x, max_y)
}

/// Extent of a path's envelope along one axis. All demo paths run parallel
/// to an axis: across it the envelope is a vehicle wide, along it the
/// envelope stops short of both end points.
fn extent(from: f64, to: f64) -> (f64, f64) {
    if (from - to).abs() < f64::EPSILON {
        (from - HALF_WIDTH, from + HALF_WIDTH)
    } else {
        let inset = HALF_WIDTH + PATH_CLEARANCE;
        (from.min(to) + inset, from.max(to) - inset)
    }
}

fn path_name(source: &str, destination: &str) -> String {
    format!("{}--{}", source, destination)
}

/// Build the demo plant with two vehicles and a pending lift job.
pub fn build() -> Arc<InMemoryPlant> {
    let plant = Arc::new(InMemoryPlant::new());

    for (name, _, _) in LAYOUT {
        let mut point = Point::new(name).with_envelope(ENVELOPE_KEY, point_envelope(name));
        if name == "A" {
            point = point.with_type(PointType::ParkPosition);
        }
        plant.add_point(point);
    }

    for (source, destination) in PATHS {
        plant.add_path(
            Path::new(path_name(source, destination), source, destination, 10_000)
                .with_envelope(ENVELOPE_KEY, path_envelope(source, destination)),
        );
    }

    plant
        .add_location_type(
            LocationType::new("Storage")
                .with_operation("LOAD")
                .with_operation("UNLOAD"),
        )
        .add_location_type(LocationType::new("Charger").with_operation("CHARGE"))
        .add_location_type(LocationType::new("Lift").with_peripheral_operation("LIFT_UP"))
        .add_location(Location::new("Storage-01", "Storage").with_link(Link::new("B")))
        .add_location(Location::new("Storage-02", "Storage").with_link(Link::new("D")))
        .add_location(Location::new("Charger-01", "Charger").with_link(Link::new("F")))
        .add_location(
            Location::new("Lift-01", "Lift")
                .with_link(Link::new("E"))
                .with_peripheral_state(PeripheralState::Idle),
        )
        .add_block(
            Block::new("Merge-E", BlockType::SingleVehicleOnly)
                .with_member(ResourceRef::path(path_name("B", "E")))
                .with_member(ResourceRef::path(path_name("D", "E"))),
        )
        .add_vehicle(Vehicle::idle_at("Vehicle-01", "A").with_envelope_key(ENVELOPE_KEY))
        .add_vehicle(
            Vehicle::idle_at("Vehicle-02", "C")
                .with_envelope_key(ENVELOPE_KEY)
                .with_energy_level(85),
        )
        .add_peripheral_job(PeripheralJob::new(
            "Lift-Job-01",
            "Vehicle-01",
            PeripheralOperation::new("Lift-01", "LIFT_UP"),
        ));

    plant
}

/// Transport orders submitted when the node starts.
pub fn orders() -> Result<Vec<TransportOrderCreation>> {
    Ok(vec![
        TransportOrderCreation::builder("Order-")
            .incomplete_name(true)
            .destination(Destination::new("Storage-01", "LOAD"))
            .destination(Destination::new("Storage-02", "UNLOAD"))
            .build()?,
        TransportOrderCreation::builder("Order-")
            .incomplete_name(true)
            .destination(Destination::new("Storage-02", "LOAD"))
            .destination(Destination::new("Storage-01", "UNLOAD"))
            .build()?,
    ])
}
