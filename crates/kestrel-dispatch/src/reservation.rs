//! Transient reservations of transport orders for vehicles.

use parking_lot::Mutex;
use tracing::debug;

/// An order reserved for a vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reservation {
    order: String,
    vehicle: String,
}

/// Keeps track of orders reserved for vehicles that are still busy with a
/// dispensable order.
///
/// Reservations live for at most one successful pickup: the reserved-orders
/// phase drops all of a vehicle's reservations once it has processed it.
#[derive(Debug, Default)]
pub struct OrderReservationPool {
    reservations: Mutex<Vec<Reservation>>,
}

impl OrderReservationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the order for the vehicle, replacing any earlier reservation of the order.
    pub fn add_reservation(&self, order: &str, vehicle: &str) {
        let mut reservations = self.reservations.lock();
        reservations.retain(|reservation| reservation.order != order);
        reservations.push(Reservation {
            order: order.to_string(),
            vehicle: vehicle.to_string(),
        });
        debug!("Reserved {} for {}", order, vehicle);
    }

    pub fn is_reserved(&self, order: &str) -> bool {
        self.reservations
            .lock()
            .iter()
            .any(|reservation| reservation.order == order)
    }

    /// Orders reserved for the vehicle, oldest reservation first.
    pub fn find_reservations(&self, vehicle: &str) -> Vec<String> {
        self.reservations
            .lock()
            .iter()
            .filter(|reservation| reservation.vehicle == vehicle)
            .map(|reservation| reservation.order.clone())
            .collect()
    }

    pub fn remove_reservation(&self, order: &str) {
        self.reservations
            .lock()
            .retain(|reservation| reservation.order != order);
    }

    pub fn remove_reservations(&self, vehicle: &str) {
        self.reservations
            .lock()
            .retain(|reservation| reservation.vehicle != vehicle);
    }

    pub fn clear(&self) {
        self.reservations.lock().clear();
    }
}
