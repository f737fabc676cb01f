//! The transport order dispatcher.

use std::sync::Arc;

use kestrel_core::{Lifecycle, ObjectService, Result};
use tracing::{debug, info, warn};

use crate::config::DispatcherConfiguration;
use crate::phase::{
    AssignFreeOrdersPhase, AssignNextDriveOrdersPhase, AssignReservedOrdersPhase,
    AssignSequenceSuccessorsPhase, FinishWithdrawalsPhase, ParkIdleVehiclesPhase, Phase,
    RechargeIdleVehiclesPhase,
};
use crate::reservation::OrderReservationPool;
use crate::routing::Router;
use crate::selection::AssignmentCandidateSelectionFilter;
use crate::supplier::{
    DefaultParkingPositionSupplier, DefaultRechargePositionSupplier, ParkingPositionSupplier,
    RechargePositionSupplier,
};
use crate::util::TransportOrderUtil;

/// Runs the dispatch phases in a fixed order, one cycle per [`Dispatcher::dispatch`] call.
///
/// Cycles must not overlap; the caller serializes them.
pub struct Dispatcher {
    util: Arc<TransportOrderUtil>,
    reservations: Arc<OrderReservationPool>,
    phases: Vec<Box<dyn Phase>>,
    configuration: DispatcherConfiguration,
    initialized: bool,
}

impl Dispatcher {
    /// Create a dispatcher using the default recharge and parking position suppliers.
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        configuration: DispatcherConfiguration,
    ) -> Self {
        let recharge = Arc::new(DefaultRechargePositionSupplier::new(objects.clone(), router.clone()));
        let parking = Arc::new(DefaultParkingPositionSupplier::new(objects.clone(), router.clone()));
        Self::with_suppliers(objects, router, configuration, recharge, parking)
    }

    pub fn with_suppliers(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        configuration: DispatcherConfiguration,
        recharge: Arc<dyn RechargePositionSupplier>,
        parking: Arc<dyn ParkingPositionSupplier>,
    ) -> Self {
        let util = Arc::new(TransportOrderUtil::new(objects.clone(), router.clone()));
        let reservations = Arc::new(OrderReservationPool::new());
        let filter = Arc::new(AssignmentCandidateSelectionFilter::standard());

        let phases: Vec<Box<dyn Phase>> = vec![
            Box::new(FinishWithdrawalsPhase::new(objects.clone(), util.clone())),
            Box::new(AssignNextDriveOrdersPhase::new(objects.clone(), util.clone())),
            Box::new(AssignReservedOrdersPhase::new(
                objects.clone(),
                router.clone(),
                reservations.clone(),
                util.clone(),
                filter.clone(),
            )),
            Box::new(AssignSequenceSuccessorsPhase::new(
                objects.clone(),
                router.clone(),
                util.clone(),
                filter.clone(),
            )),
            Box::new(AssignFreeOrdersPhase::new(
                objects.clone(),
                router.clone(),
                reservations.clone(),
                util.clone(),
                filter.clone(),
            )),
            Box::new(RechargeIdleVehiclesPhase::new(
                objects.clone(),
                router.clone(),
                util.clone(),
                filter.clone(),
                recharge,
                configuration.clone(),
            )),
            Box::new(ParkIdleVehiclesPhase::new(
                objects,
                router,
                util.clone(),
                filter,
                parking,
                configuration.clone(),
            )),
        ];

        Self {
            util,
            reservations,
            phases,
            configuration,
            initialized: false,
        }
    }

    pub fn reservations(&self) -> &OrderReservationPool {
        &self.reservations
    }

    /// Run one dispatch cycle.
    pub fn dispatch(&mut self) {
        if !self.initialized {
            warn!("Dispatcher not initialized, skipping dispatch cycle");
            return;
        }

        debug!("Starting dispatch cycle");
        self.util.mark_new_dispatchable_orders();
        for phase in &mut self.phases {
            phase.run();
        }
        debug!("Finished dispatch cycle");
    }

    /// Withdraw the order and drop any reservation of it.
    pub fn withdraw_order(&self, order: &str) -> Result<()> {
        self.reservations.remove_reservation(order);
        self.util.withdraw_order(order)
    }
}

impl Lifecycle for Dispatcher {
    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        for phase in &mut self.phases {
            phase.initialize();
        }
        self.initialized = true;
        info!(
            "Dispatcher initialized with {} phases (recharge idle vehicles: {}, park idle vehicles: {})",
            self.phases.len(),
            self.configuration.recharge_idle_vehicles,
            self.configuration.park_idle_vehicles
        );
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn terminate(&mut self) {
        if !self.initialized {
            return;
        }
        for phase in &mut self.phases {
            phase.terminate();
        }
        self.reservations.clear();
        self.initialized = false;
        info!("Dispatcher terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticRouter;
    use kestrel_core::{
        Destination, Point, PointType, ProcState, TransportOrder, TransportOrderState, Vehicle,
        VehicleState,
    };
    use kestrel_state::InMemoryPlant;

    fn create_plant() -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_point(Point::new("P1"))
            .add_point(Point::new("P2"))
            .add_point(Point::new("Park-A").with_type(PointType::ParkPosition))
            .add_vehicle(Vehicle::idle_at("Vehicle-01", "P1"));
        plant
    }

    fn create_dispatcher(plant: &Arc<InMemoryPlant>, configuration: DispatcherConfiguration) -> Dispatcher {
        let mut dispatcher = Dispatcher::new(plant.clone(), Arc::new(StaticRouter::default()), configuration);
        dispatcher.initialize();
        dispatcher
    }

    fn order_state(plant: &InMemoryPlant, order: &str) -> TransportOrderState {
        plant.transport_order(order).unwrap().state
    }

    /// Let the vehicle report that it is done with its current drive order.
    fn finish_movement(plant: &InMemoryPlant) {
        plant
            .update_vehicle("Vehicle-01", &mut |vehicle| {
                vehicle.proc_state = ProcState::AwaitingOrder;
                vehicle.state = VehicleState::Idle;
            })
            .unwrap();
    }

    #[test]
    fn test_uninitialized_dispatcher_does_nothing() {
        let plant = create_plant();
        plant.add_transport_order(TransportOrder::new("Order-01", vec![Destination::new("P2", "NOP")]));
        let mut dispatcher = Dispatcher::new(
            plant.clone(),
            Arc::new(StaticRouter::default()),
            DispatcherConfiguration::default(),
        );

        dispatcher.dispatch();

        assert_eq!(order_state(&plant, "Order-01"), TransportOrderState::Raw);
    }

    #[test]
    fn test_raw_order_is_processed_to_completion() {
        let plant = create_plant();
        plant.add_transport_order(TransportOrder::new("Order-01", vec![Destination::new("P2", "NOP")]));
        let mut dispatcher = create_dispatcher(&plant, DispatcherConfiguration::default());

        dispatcher.dispatch();
        assert_eq!(order_state(&plant, "Order-01"), TransportOrderState::BeingProcessed);

        finish_movement(&plant);
        dispatcher.dispatch();
        assert_eq!(order_state(&plant, "Order-01"), TransportOrderState::Finished);
        assert_eq!(plant.vehicle("Vehicle-01").unwrap().proc_state, ProcState::Idle);
    }

    #[test]
    fn test_parked_vehicle_is_redispatched_through_reservation() {
        let plant = create_plant();
        let configuration = DispatcherConfiguration {
            park_idle_vehicles: true,
            ..Default::default()
        };
        let mut dispatcher = create_dispatcher(&plant, configuration);

        dispatcher.dispatch();
        let parking = plant.vehicle("Vehicle-01").unwrap().transport_order.unwrap();
        assert!(parking.starts_with("Park-"));

        plant.add_transport_order(TransportOrder::new("Order-01", vec![Destination::new("P2", "NOP")]));
        dispatcher.dispatch();
        assert_eq!(order_state(&plant, &parking), TransportOrderState::Withdrawn);
        assert_eq!(dispatcher.reservations().find_reservations("Vehicle-01"), vec!["Order-01"]);

        finish_movement(&plant);
        dispatcher.dispatch();
        assert_eq!(order_state(&plant, &parking), TransportOrderState::Failed);
        assert_eq!(order_state(&plant, "Order-01"), TransportOrderState::BeingProcessed);
        assert!(dispatcher.reservations().find_reservations("Vehicle-01").is_empty());
    }

    #[test]
    fn test_withdraw_drops_reservation() {
        let plant = create_plant();
        plant.add_transport_order(
            TransportOrder::new("Order-01", vec![Destination::new("P2", "NOP")])
                .with_state(TransportOrderState::Dispatchable),
        );
        let mut dispatcher = create_dispatcher(&plant, DispatcherConfiguration::default());
        dispatcher.reservations().add_reservation("Order-01", "Vehicle-02");

        dispatcher.withdraw_order("Order-01").unwrap();

        assert!(!dispatcher.reservations().is_reserved("Order-01"));
        assert_eq!(order_state(&plant, "Order-01"), TransportOrderState::Failed);
        assert!(dispatcher.withdraw_order("Unknown").is_err());

        dispatcher.terminate();
        assert!(!dispatcher.is_initialized());
    }
}
