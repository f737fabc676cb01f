//! Vehicle selection filters.

use std::sync::Arc;

use kestrel_core::{ObjectService, ProcState, TransportOrderState, Vehicle, VehicleState};

use super::{
    reasons, SelectionFilter, ENERGY_LEVEL_NOT_DEGRADED, NEEDS_MORE_CHARGING, NOT_UTILIZED,
    NO_POSITION, ORDER_PENDING, ORDER_SEQUENCE, PARKING_POSITION, PROC_STATE, RESERVED,
    VEHICLE_STATE,
};
use crate::reservation::OrderReservationPool;

/// Vehicles that may be given any new order, either right away or by
/// withdrawing a dispensable order they are processing.
pub struct IsAvailableForAnyOrder {
    objects: Arc<dyn ObjectService>,
    reservations: Arc<OrderReservationPool>,
}

impl IsAvailableForAnyOrder {
    pub fn new(objects: Arc<dyn ObjectService>, reservations: Arc<OrderReservationPool>) -> Self {
        Self {
            objects,
            reservations,
        }
    }

    fn processes_dispensable_order(&self, vehicle: &Vehicle) -> bool {
        vehicle.has_proc_state(ProcState::ProcessingOrder)
            && vehicle
                .transport_order
                .as_deref()
                .and_then(|name| self.objects.transport_order(name))
                .map_or(false, |order| {
                    order.dispensable && order.has_state(TransportOrderState::BeingProcessed)
                })
    }
}

impl SelectionFilter<Vehicle> for IsAvailableForAnyOrder {
    fn apply(&self, vehicle: &Vehicle) -> Vec<String> {
        reasons([
            (!vehicle.is_utilized(), NOT_UTILIZED),
            (vehicle.current_position.is_none(), NO_POSITION),
            (vehicle.order_sequence.is_some(), ORDER_SEQUENCE),
            (
                !vehicle.is_idle_or_charging() && !self.processes_dispensable_order(vehicle),
                PROC_STATE,
            ),
            (
                vehicle.has_state(VehicleState::Charging)
                    && !vehicle.is_energy_level_sufficiently_recharged(),
                NEEDS_MORE_CHARGING,
            ),
            (
                !self.reservations.find_reservations(&vehicle.name).is_empty(),
                RESERVED,
            ),
        ])
    }
}

/// Idle vehicles that should be sent to recharge.
#[derive(Debug, Default)]
pub struct IsIdleAndDegraded;

impl SelectionFilter<Vehicle> for IsIdleAndDegraded {
    fn apply(&self, vehicle: &Vehicle) -> Vec<String> {
        reasons([
            (!vehicle.is_utilized(), NOT_UTILIZED),
            (vehicle.current_position.is_none(), NO_POSITION),
            (vehicle.order_sequence.is_some(), ORDER_SEQUENCE),
            (!vehicle.has_proc_state(ProcState::Idle), PROC_STATE),
            (!vehicle.has_state(VehicleState::Idle), VEHICLE_STATE),
            (!vehicle.is_energy_level_degraded(), ENERGY_LEVEL_NOT_DEGRADED),
        ])
    }
}

/// Idle vehicles that may be sent to a parking position.
pub struct IsParkable {
    objects: Arc<dyn ObjectService>,
}

impl IsParkable {
    pub fn new(objects: Arc<dyn ObjectService>) -> Self {
        Self { objects }
    }

    fn is_at_parking_position(&self, vehicle: &Vehicle) -> bool {
        vehicle
            .current_position
            .as_deref()
            .and_then(|position| self.objects.point(position))
            .map_or(false, |point| point.is_park_position())
    }

    fn has_order_pending(&self, vehicle: &Vehicle) -> bool {
        !self
            .objects
            .transport_orders(&|order| {
                !order.state.is_final()
                    && !order.has_state(TransportOrderState::Withdrawn)
                    && order.intended_vehicle.as_deref() == Some(vehicle.name.as_str())
            })
            .is_empty()
    }
}

impl SelectionFilter<Vehicle> for IsParkable {
    fn apply(&self, vehicle: &Vehicle) -> Vec<String> {
        reasons([
            (!vehicle.is_utilized(), NOT_UTILIZED),
            (vehicle.current_position.is_none(), NO_POSITION),
            (vehicle.order_sequence.is_some(), ORDER_SEQUENCE),
            (!vehicle.has_proc_state(ProcState::Idle), PROC_STATE),
            (!vehicle.has_state(VehicleState::Idle), VEHICLE_STATE),
            (self.is_at_parking_position(vehicle), PARKING_POSITION),
            (self.has_order_pending(vehicle), ORDER_PENDING),
        ])
    }
}

/// Vehicles that may keep orders reserved for them.
#[derive(Debug, Default)]
pub struct IsUsableForReservations;

impl SelectionFilter<Vehicle> for IsUsableForReservations {
    fn apply(&self, vehicle: &Vehicle) -> Vec<String> {
        reasons([
            (!vehicle.is_utilized(), NOT_UTILIZED),
            (vehicle.current_position.is_none(), NO_POSITION),
        ])
    }
}
