//! Sends idle vehicles with a degraded energy level to recharge.

use std::sync::Arc;

use kestrel_core::order::ORDER_TYPE_CHARGE;
use kestrel_core::{ObjectService, TransportOrderCreation, Vehicle};
use tracing::{debug, info, warn};

use super::{impl_lifecycle, Phase, TentativeOrder};
use crate::config::DispatcherConfiguration;
use crate::routing::Router;
use crate::selection::{AssignmentCandidateSelectionFilter, IsIdleAndDegraded, SelectionFilter};
use crate::supplier::RechargePositionSupplier;
use crate::util::TransportOrderUtil;

pub struct RechargeIdleVehiclesPhase {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    util: Arc<TransportOrderUtil>,
    candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    supplier: Arc<dyn RechargePositionSupplier>,
    vehicle_filter: IsIdleAndDegraded,
    configuration: DispatcherConfiguration,
    initialized: bool,
}

impl RechargeIdleVehiclesPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        util: Arc<TransportOrderUtil>,
        candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
        supplier: Arc<dyn RechargePositionSupplier>,
        configuration: DispatcherConfiguration,
    ) -> Self {
        Self {
            objects,
            router,
            util,
            candidate_filter,
            supplier,
            vehicle_filter: IsIdleAndDegraded,
            configuration,
            initialized: false,
        }
    }

    fn create_recharge_order(&self, vehicle: &Vehicle) {
        let destinations = self.supplier.find_recharge_sequence(vehicle);
        if destinations.is_empty() {
            debug!("No recharge location for {}", vehicle.name);
            return;
        }

        // A vehicle at a critical level must not be diverted from recharging.
        let creation = TransportOrderCreation::builder("Recharge-")
            .incomplete_name(true)
            .destinations(destinations)
            .order_type(ORDER_TYPE_CHARGE)
            .intended_vehicle(vehicle.name.clone())
            .dispensable(!vehicle.is_energy_level_critical())
            .build();
        let tentative = match creation.and_then(|creation| TentativeOrder::create(self.objects.as_ref(), creation)) {
            Ok(tentative) => tentative,
            Err(e) => {
                warn!("Failed to create recharge order for {}: {}", vehicle.name, e);
                return;
            }
        };
        info!("Created recharge order {} for {}", tentative.order().name, vehicle.name);

        let resolved = tentative.resolve(
            vehicle,
            self.router.as_ref(),
            &self.candidate_filter,
            &self.util,
        );
        if !resolved.is_assigned() {
            warn!("Recharge order {} for {} failed", resolved.order().name, vehicle.name);
        }
    }
}

impl_lifecycle!(RechargeIdleVehiclesPhase);

impl Phase for RechargeIdleVehiclesPhase {
    fn run(&mut self) {
        if !self.configuration.recharge_idle_vehicles {
            return;
        }

        for vehicle in self
            .objects
            .vehicles(&|_| true)
            .into_iter()
            .filter(|vehicle| self.vehicle_filter.accepts(vehicle))
        {
            self.create_recharge_order(&vehicle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticRouter;
    use kestrel_core::{Destination, Lifecycle, ProcState, TransportOrderState};
    use kestrel_state::InMemoryPlant;

    /// Supplier sending every vehicle to the same charger.
    struct FixedCharger(Option<&'static str>);

    impl RechargePositionSupplier for FixedCharger {
        fn find_recharge_sequence(&self, vehicle: &Vehicle) -> Vec<Destination> {
            self.0
                .map(|location| Destination::new(location, vehicle.recharge_operation.clone()))
                .into_iter()
                .collect()
        }
    }

    fn create_plant(energy_level: u8) -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_point(kestrel_core::Point::new("P1"))
            .add_point(kestrel_core::Point::new("Charger"))
            .add_vehicle(Vehicle::idle_at("Vehicle-01", "P1").with_energy_level(energy_level));
        plant
    }

    fn create_phase(
        plant: &Arc<InMemoryPlant>,
        router: StaticRouter,
        charger: Option<&'static str>,
        configuration: DispatcherConfiguration,
    ) -> RechargeIdleVehiclesPhase {
        let router = Arc::new(router);
        let util = Arc::new(TransportOrderUtil::new(plant.clone(), router.clone()));
        let mut phase = RechargeIdleVehiclesPhase::new(
            plant.clone(),
            router,
            util,
            Arc::new(AssignmentCandidateSelectionFilter::standard()),
            Arc::new(FixedCharger(charger)),
            configuration,
        );
        phase.initialize();
        phase
    }

    #[test]
    fn test_degraded_vehicle_is_sent_to_recharge() {
        let plant = create_plant(60);
        let mut phase = create_phase(
            &plant,
            StaticRouter::default(),
            Some("Charger"),
            DispatcherConfiguration::default(),
        );

        phase.run();

        let orders = plant.transport_orders(&|_| true);
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert!(order.name.starts_with("Recharge-"));
        assert_eq!(order.order_type, ORDER_TYPE_CHARGE);
        assert_eq!(order.state, TransportOrderState::BeingProcessed);
        assert!(order.dispensable);

        let vehicle = plant.vehicle("Vehicle-01").unwrap();
        assert_eq!(vehicle.proc_state, ProcState::ProcessingOrder);
        assert_eq!(vehicle.transport_order.as_deref(), Some(order.name.as_str()));
    }

    #[test]
    fn test_critical_vehicle_gets_indispensable_order() {
        let plant = create_plant(20);
        let mut phase = create_phase(
            &plant,
            StaticRouter::default(),
            Some("Charger"),
            DispatcherConfiguration::default(),
        );

        phase.run();

        let orders = plant.transport_orders(&|_| true);
        assert_eq!(orders.len(), 1);
        assert!(!orders[0].dispensable);
    }

    #[test]
    fn test_disabled_recharging_creates_no_order() {
        let plant = create_plant(20);
        let configuration = DispatcherConfiguration {
            recharge_idle_vehicles: false,
            ..Default::default()
        };
        let mut phase = create_phase(&plant, StaticRouter::default(), Some("Charger"), configuration);

        phase.run();

        assert!(plant.transport_orders(&|_| true).is_empty());
    }

    #[test]
    fn test_no_recharge_location_creates_no_order() {
        let plant = create_plant(60);
        let mut phase = create_phase(&plant, StaticRouter::default(), None, DispatcherConfiguration::default());

        phase.run();

        assert!(plant.transport_orders(&|_| true).is_empty());
    }

    #[test]
    fn test_unroutable_recharge_order_fails() {
        let plant = create_plant(60);
        let mut phase = create_phase(
            &plant,
            StaticRouter::default().with_unreachable("Charger"),
            Some("Charger"),
            DispatcherConfiguration::default(),
        );

        phase.run();

        let orders = plant.transport_orders(&|_| true);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].state, TransportOrderState::Failed);
        assert_eq!(plant.vehicle("Vehicle-01").unwrap().proc_state, ProcState::Idle);
    }
}
