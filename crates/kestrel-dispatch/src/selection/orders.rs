//! Transport order selection filters.

use std::sync::Arc;

use kestrel_core::{ObjectService, TransportOrder, TransportOrderState};

use super::{reasons, SelectionFilter, IN_SEQUENCE, ORDER_STATE, RESERVED};
use crate::reservation::OrderReservationPool;

/// Orders any suitable vehicle may be given in the free-orders phase.
///
/// An order in a sequence only qualifies as the sequence's first unfinished
/// order while no vehicle processes the sequence yet.
pub struct IsFreelyDispatchableToAnyVehicle {
    objects: Arc<dyn ObjectService>,
    reservations: Arc<OrderReservationPool>,
}

impl IsFreelyDispatchableToAnyVehicle {
    pub fn new(objects: Arc<dyn ObjectService>, reservations: Arc<OrderReservationPool>) -> Self {
        Self {
            objects,
            reservations,
        }
    }

    fn waits_in_sequence(&self, order: &TransportOrder) -> bool {
        let Some(sequence) = order
            .wrapping_sequence
            .as_deref()
            .and_then(|name| self.objects.order_sequence(name))
        else {
            return false;
        };
        sequence.processing_vehicle.is_some()
            || sequence.unfinished_orders().first() != Some(&order.name)
    }
}

impl SelectionFilter<TransportOrder> for IsFreelyDispatchableToAnyVehicle {
    fn apply(&self, order: &TransportOrder) -> Vec<String> {
        reasons([
            (!order.has_state(TransportOrderState::Dispatchable), ORDER_STATE),
            (self.reservations.is_reserved(&order.name), RESERVED),
            (self.waits_in_sequence(order), IN_SEQUENCE),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{Destination, OrderSequence};
    use kestrel_state::InMemoryPlant;

    fn order(name: &str) -> TransportOrder {
        TransportOrder::new(name, vec![Destination::new("L1", "LOAD")])
            .with_state(TransportOrderState::Dispatchable)
    }

    #[test]
    fn test_dispatchable_order_is_accepted() {
        let reservations = Arc::new(OrderReservationPool::new());
        let filter = IsFreelyDispatchableToAnyVehicle::new(
            Arc::new(InMemoryPlant::new()),
            reservations.clone(),
        );

        assert!(filter.accepts(&order("Order-01")));
        assert_eq!(
            filter.apply(&order("Order-01").with_state(TransportOrderState::Active)),
            vec![ORDER_STATE]
        );

        reservations.add_reservation("Order-01", "Vehicle-01");
        assert_eq!(filter.apply(&order("Order-01")), vec![RESERVED]);
    }

    #[test]
    fn test_only_first_order_of_unprocessed_sequence_is_accepted() {
        let plant = Arc::new(InMemoryPlant::new());
        plant.add_order_sequence(
            OrderSequence::new("Seq-01")
                .with_order("Order-01")
                .with_order("Order-02"),
        );
        let filter = IsFreelyDispatchableToAnyVehicle::new(
            plant.clone(),
            Arc::new(OrderReservationPool::new()),
        );

        assert!(filter.accepts(&order("Order-01").with_wrapping_sequence("Seq-01")));
        assert_eq!(
            filter.apply(&order("Order-02").with_wrapping_sequence("Seq-01")),
            vec![IN_SEQUENCE]
        );

        plant.add_order_sequence(
            OrderSequence::new("Seq-01")
                .with_order("Order-01")
                .with_processing_vehicle("Vehicle-01"),
        );
        assert_eq!(
            filter.apply(&order("Order-01").with_wrapping_sequence("Seq-01")),
            vec![IN_SEQUENCE]
        );
    }
}
