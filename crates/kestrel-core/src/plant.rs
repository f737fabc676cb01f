//! Plant model: the driving course, locations and blocks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{ResourceRef, ResourceSet};

/// A 2D coordinate in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Couple {
    pub x: f64,
    pub y: f64,
}

impl Couple {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Footprint polygon a vehicle occupies on a resource, for one envelope key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Envelope {
    /// Polygon vertices, in order. The ring is closed implicitly.
    pub vertices: Vec<Couple>,
}

impl Envelope {
    pub fn new(vertices: Vec<Couple>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle envelope.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Couple::new(min_x, min_y),
            Couple::new(max_x, min_y),
            Couple::new(max_x, max_y),
            Couple::new(min_x, max_y),
        ])
    }
}

/// Role of a point in the driving course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    /// A point vehicles may stop at.
    #[default]
    HaltPosition,
    /// A point vehicles may be parked at.
    ParkPosition,
}

/// A node of the driving course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,

    pub point_type: PointType,

    /// Envelopes by envelope key.
    #[serde(default)]
    pub vehicle_envelopes: BTreeMap<String, Envelope>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Point {
    /// Create a halt position with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            point_type: PointType::HaltPosition,
            vehicle_envelopes: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    pub fn with_envelope(mut self, key: impl Into<String>, envelope: Envelope) -> Self {
        self.vehicle_envelopes.insert(key.into(), envelope);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_park_position(&self) -> bool {
        self.point_type == PointType::ParkPosition
    }
}

/// A directed edge between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub name: String,
    pub source_point: String,
    pub destination_point: String,
    /// Length in millimeters.
    pub length: u64,
    #[serde(default)]
    pub vehicle_envelopes: BTreeMap<String, Envelope>,
}

impl Path {
    pub fn new(
        name: impl Into<String>,
        source_point: impl Into<String>,
        destination_point: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            name: name.into(),
            source_point: source_point.into(),
            destination_point: destination_point.into(),
            length,
            vehicle_envelopes: BTreeMap::new(),
        }
    }

    pub fn with_envelope(mut self, key: impl Into<String>, envelope: Envelope) -> Self {
        self.vehicle_envelopes.insert(key.into(), envelope);
        self
    }
}

/// Type of a location, declaring which operations may be performed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationType {
    pub name: String,

    /// Operations vehicles may perform at locations of this type.
    #[serde(default)]
    pub allowed_operations: BTreeSet<String>,

    /// Operations peripheral devices of this type can execute.
    #[serde(default)]
    pub allowed_peripheral_operations: BTreeSet<String>,
}

impl LocationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_operations: BTreeSet::new(),
            allowed_peripheral_operations: BTreeSet::new(),
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.allowed_operations.insert(operation.into());
        self
    }

    pub fn with_peripheral_operation(mut self, operation: impl Into<String>) -> Self {
        self.allowed_peripheral_operations.insert(operation.into());
        self
    }

    pub fn is_allowed_operation(&self, operation: &str) -> bool {
        self.allowed_operations.contains(operation)
    }
}

/// Connection between a location and one of its access points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub point: String,

    /// Operation override. An empty set means the location type decides.
    #[serde(default)]
    pub allowed_operations: BTreeSet<String>,
}

impl Link {
    pub fn new(point: impl Into<String>) -> Self {
        Self {
            point: point.into(),
            allowed_operations: BTreeSet::new(),
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.allowed_operations.insert(operation.into());
        self
    }

    /// Whether this link permits the given operation on its own terms.
    pub fn permits(&self, operation: &str) -> bool {
        self.allowed_operations.is_empty() || self.allowed_operations.contains(operation)
    }
}

/// State of a peripheral device as reported by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralState {
    /// The location has no peripheral device attached.
    #[default]
    NoPeripheral,
    Unknown,
    Unavailable,
    Error,
    Idle,
    Executing,
}

/// Processing state of a peripheral device from the dispatcher's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralProcState {
    #[default]
    Idle,
    ProcessingJob,
}

/// Peripheral device data attached to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PeripheralInformation {
    pub state: PeripheralState,
    pub proc_state: PeripheralProcState,
    /// Token of the party the device is currently reserved for.
    pub reservation_token: Option<String>,
    /// Job the device is currently processing.
    pub peripheral_job: Option<String>,
}

/// A station in the plant, optionally backed by a peripheral device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub location_type: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub peripheral: PeripheralInformation,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Location {
    pub fn new(name: impl Into<String>, location_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location_type: location_type.into(),
            links: Vec::new(),
            peripheral: PeripheralInformation::default(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_peripheral_state(mut self, state: PeripheralState) -> Self {
        self.peripheral.state = state;
        self
    }

    pub fn with_reservation_token(mut self, token: impl Into<String>) -> Self {
        self.peripheral.reservation_token = Some(token.into());
        self
    }

    /// Whether the attached device is idle, not processing and not reserved.
    pub fn is_peripheral_available(&self) -> bool {
        self.is_peripheral_idle() && self.peripheral.reservation_token.is_none()
    }

    /// Whether the attached device is idle and not processing a job.
    pub fn is_peripheral_idle(&self) -> bool {
        self.peripheral.state == PeripheralState::Idle
            && self.peripheral.proc_state == PeripheralProcState::Idle
    }
}

/// Exclusivity rule of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Only one vehicle may hold any member at a time.
    #[default]
    SingleVehicleOnly,
    /// Several vehicles may share the block while travelling the same direction.
    SameDirectionOnly,
}

/// A named group of resources that is owned as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub block_type: BlockType,
    pub members: ResourceSet,
}

impl Block {
    pub fn new(name: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            name: name.into(),
            block_type,
            members: ResourceSet::new(),
        }
    }

    pub fn with_member(mut self, member: ResourceRef) -> Self {
        self.members.insert(member);
        self
    }

    /// Whether any of the given resources is a member of this block.
    pub fn touches(&self, resources: &ResourceSet) -> bool {
        resources.iter().any(|r| self.members.contains(r))
    }
}

/// Names of all blocks touched by the given resources.
pub fn blocks_touching(blocks: &[Block], resources: &ResourceSet) -> BTreeSet<String> {
    blocks
        .iter()
        .filter(|block| block.touches(resources))
        .map(|block| block.name.clone())
        .collect()
}

/// The given resources plus every member of every block they touch.
pub fn expand_resources(blocks: &[Block], resources: &ResourceSet) -> ResourceSet {
    let mut expanded = resources.clone();
    for block in blocks.iter().filter(|block| block.touches(resources)) {
        expanded.extend(block.members.iter().cloned());
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blocks() -> Vec<Block> {
        vec![
            Block::new("B1", BlockType::SingleVehicleOnly)
                .with_member(ResourceRef::point("P1"))
                .with_member(ResourceRef::point("P2")),
            Block::new("B2", BlockType::SameDirectionOnly).with_member(ResourceRef::point("P3")),
        ]
    }

    #[test]
    fn test_expand_resources() {
        let blocks = sample_blocks();
        let requested: ResourceSet = [ResourceRef::point("P1"), ResourceRef::point("P9")].into();

        let expanded = expand_resources(&blocks, &requested);

        assert_eq!(expanded.len(), 3);
        assert!(expanded.contains(&ResourceRef::point("P2")));
        assert!(!expanded.contains(&ResourceRef::point("P3")));
    }

    #[test]
    fn test_blocks_touching() {
        let blocks = sample_blocks();
        let requested: ResourceSet = [ResourceRef::point("P2"), ResourceRef::point("P3")].into();

        let touched = blocks_touching(&blocks, &requested);
        assert_eq!(touched.len(), 2);

        assert!(blocks_touching(&blocks, &ResourceSet::new()).is_empty());
    }

    #[test]
    fn test_link_permits() {
        assert!(Link::new("P1").permits("CHARGE"));
        assert!(Link::new("P1").with_operation("CHARGE").permits("CHARGE"));
        assert!(!Link::new("P1").with_operation("LOAD").permits("CHARGE"));
    }

    #[test]
    fn test_peripheral_availability() {
        let location = Location::new("Conveyor-01", "Conveyor").with_peripheral_state(PeripheralState::Idle);
        assert!(location.is_peripheral_available());

        let reserved = location.clone().with_reservation_token("token-1");
        assert!(!reserved.is_peripheral_available());
        assert!(reserved.is_peripheral_idle());
    }
}
