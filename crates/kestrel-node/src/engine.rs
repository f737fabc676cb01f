//! Core execution engine.

use std::sync::Arc;

use kestrel_core::{Lifecycle, ObjectService, Result, TransportOrder, TransportOrderCreation};
use kestrel_dispatch::{Dispatcher, Router};
use kestrel_peripherals::{PeripheralControllerRegistry, PeripheralDispatcher};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::loopback::LoopbackPeripherals;
use crate::simulation::VehicleSimulation;

/// Everything a cycle touches. Only ever used under the engine's lock.
struct Pipelines {
    dispatcher: Dispatcher,
    peripherals: PeripheralDispatcher,
    vehicles: VehicleSimulation,
    devices: LoopbackPeripherals,
}

impl Pipelines {
    fn dispatch(&mut self) {
        self.dispatcher.dispatch();
        self.peripherals.dispatch();
    }
}

/// Runs dispatch cycles and simulation steps, never two at a time.
pub struct Engine {
    objects: Arc<dyn ObjectService>,
    pipelines: Mutex<Pipelines>,
    trigger: mpsc::Sender<()>,
    config: NodeConfig,
}

impl Engine {
    /// Create an engine for the plant, returning the receiving end of its trigger channel.
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        config: &NodeConfig,
    ) -> Result<(Self, mpsc::Receiver<()>)> {
        config.validate()?;
        let registry = Arc::new(PeripheralControllerRegistry::new());
        let devices = LoopbackPeripherals::attach_all(objects.clone(), registry.clone());
        let pipelines = Pipelines {
            dispatcher: Dispatcher::new(objects.clone(), router, config.dispatcher.clone()),
            peripherals: PeripheralDispatcher::new(
                objects.clone(),
                registry,
                config.peripherals.clone(),
            ),
            vehicles: VehicleSimulation::new(objects.clone()),
            devices,
        };
        // One pending trigger is enough: the cycle it starts sees all changes.
        let (trigger, triggers) = mpsc::channel(1);

        let engine = Self {
            objects,
            pipelines: Mutex::new(pipelines),
            trigger,
            config: config.clone(),
        };
        Ok((engine, triggers))
    }

    pub async fn initialize(&self) {
        let mut pipelines = self.pipelines.lock().await;
        pipelines.dispatcher.initialize();
        pipelines.peripherals.initialize();
    }

    pub async fn terminate(&self) {
        let mut pipelines = self.pipelines.lock().await;
        pipelines.peripherals.terminate();
        pipelines.devices.detach_all();
        pipelines.dispatcher.terminate();
        info!("Engine terminated");
    }

    /// Request a dispatch cycle from the running engine.
    pub fn trigger(&self) {
        if self.trigger.try_send(()).is_err() {
            debug!("Dispatch cycle already pending");
        }
    }

    /// Run one dispatch cycle of both dispatchers.
    pub async fn dispatch(&self) {
        self.pipelines.lock().await.dispatch();
    }

    /// Advance vehicles and peripheral devices by one step, dispatching if anything changed.
    pub async fn step(&self) {
        let mut pipelines = self.pipelines.lock().await;
        let moved = pipelines.vehicles.advance();
        let finished = pipelines.devices.advance();
        if moved || finished > 0 {
            pipelines.dispatch();
        }
    }

    /// Create a transport order and request a dispatch cycle for it.
    pub fn submit_order(&self, creation: TransportOrderCreation) -> Result<TransportOrder> {
        let order = self.objects.create_transport_order(creation)?;
        info!("Submitted transport order {}", order.name);
        self.trigger();
        Ok(order)
    }

    pub async fn withdraw_order(&self, order: &str) -> Result<()> {
        self.pipelines.lock().await.dispatcher.withdraw_order(order)?;
        self.trigger();
        Ok(())
    }

    pub async fn withdraw_job(&self, job: &str) -> Result<()> {
        self.pipelines.lock().await.peripherals.withdraw_job(job)?;
        self.trigger();
        Ok(())
    }

    /// Run the engine's main loop.
    pub async fn run(self: Arc<Self>, mut triggers: mpsc::Receiver<()>) {
        info!("Engine started");

        let mut vehicle_redispatch =
            ticker(self.config.dispatcher.idle_vehicle_redispatching_interval_ms);
        let mut peripheral_redispatch =
            ticker(self.config.peripherals.idle_peripheral_redispatching_interval_ms);
        let mut simulation = ticker(self.config.simulation_step_ms);

        loop {
            tokio::select! {
                _ = vehicle_redispatch.tick() => self.dispatch().await,
                _ = peripheral_redispatch.tick() => self.dispatch().await,
                _ = simulation.tick() => self.step().await,
                trigger = triggers.recv() => match trigger {
                    Some(()) => self.dispatch().await,
                    None => break,
                },
            }
        }
        info!("Engine stopped");
    }
}

/// `period_ms` must not be zero, which `NodeConfig::validate` ensures.
fn ticker(period_ms: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_millis(period_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::router::GraphRouter;
    use kestrel_core::{Destination, PeripheralJobState, TransportOrderState};
    use kestrel_state::InMemoryPlant;

    fn create_engine(
        plant: &Arc<InMemoryPlant>,
        config: &NodeConfig,
    ) -> (Arc<Engine>, mpsc::Receiver<()>) {
        let router = Arc::new(GraphRouter::new(plant.clone()));
        let (engine, triggers) = Engine::new(plant.clone(), router, config).unwrap();
        (Arc::new(engine), triggers)
    }

    fn order_to(destination: &str, operation: &str) -> TransportOrderCreation {
        TransportOrderCreation::builder("Order-")
            .incomplete_name(true)
            .destination(Destination::new(destination, operation))
            .build()
            .unwrap()
    }

    fn order_state(plant: &InMemoryPlant, order: &str) -> TransportOrderState {
        plant.transport_order(order).unwrap().state
    }

    #[tokio::test]
    async fn test_cycles_are_skipped_until_initialized() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        let order = engine.submit_order(order_to("Storage-02", "LOAD")).unwrap();

        engine.dispatch().await;
        assert_eq!(order_state(&plant, &order.name), TransportOrderState::Raw);

        engine.initialize().await;
        engine.dispatch().await;
        assert_eq!(order_state(&plant, &order.name), TransportOrderState::BeingProcessed);
    }

    #[tokio::test]
    async fn test_steps_drive_order_to_completion() {
        let plant = demo::build();
        let mut config = NodeConfig::default();
        config.dispatcher.recharge_idle_vehicles = false;
        let (engine, _triggers) = create_engine(&plant, &config);
        engine.initialize().await;
        let order = engine.submit_order(order_to("Storage-02", "LOAD")).unwrap();

        engine.dispatch().await;
        for _ in 0..10 {
            engine.step().await;
        }

        assert_eq!(order_state(&plant, &order.name), TransportOrderState::Finished);
        assert_eq!(plant.vehicle("Vehicle-02").unwrap().current_position.as_deref(), Some("D"));
    }

    #[tokio::test]
    async fn test_steps_finish_peripheral_jobs() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        engine.initialize().await;

        engine.dispatch().await;
        assert_eq!(
            plant.peripheral_job("Lift-Job-01").unwrap().state,
            PeripheralJobState::BeingProcessed
        );

        engine.step().await;
        assert_eq!(
            plant.peripheral_job("Lift-Job-01").unwrap().state,
            PeripheralJobState::Finished
        );
        // The step's dispatch cycle released the lift again.
        assert!(plant.location("Lift-01").unwrap().peripheral.reservation_token.is_none());
    }

    #[tokio::test]
    async fn test_withdrawn_order_fails_once_vehicle_stopped() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        engine.initialize().await;
        let order = engine.submit_order(order_to("E", "NOP")).unwrap();

        engine.dispatch().await;
        engine.withdraw_order(&order.name).await.unwrap();
        assert_eq!(order_state(&plant, &order.name), TransportOrderState::Withdrawn);

        engine.step().await;
        assert_eq!(order_state(&plant, &order.name), TransportOrderState::Failed);
        assert!(engine.withdraw_order("Unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_demo_orders_finish_step_by_step() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        engine.initialize().await;
        let names: Vec<String> = demo::orders()
            .unwrap()
            .into_iter()
            .map(|creation| engine.submit_order(creation).unwrap().name)
            .collect();

        engine.dispatch().await;
        for _ in 0..20 {
            engine.step().await;
        }

        for name in &names {
            assert_eq!(order_state(&plant, name), TransportOrderState::Finished, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_withdrawn_job_fails_and_frees_the_lift() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        engine.initialize().await;
        engine.dispatch().await;

        engine.withdraw_job("Lift-Job-01").await.unwrap();

        assert_eq!(
            plant.peripheral_job("Lift-Job-01").unwrap().state,
            PeripheralJobState::Failed
        );
        assert!(plant.location("Lift-01").unwrap().peripheral.peripheral_job.is_none());
        assert!(engine.withdraw_job("Unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_terminate_aborts_peripheral_jobs() {
        let plant = demo::build();
        let (engine, _triggers) = create_engine(&plant, &NodeConfig::default());
        engine.initialize().await;
        engine.dispatch().await;

        engine.terminate().await;

        assert_eq!(
            plant.peripheral_job("Lift-Job-01").unwrap().state,
            PeripheralJobState::Failed
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let plant = demo::build();
        let router = Arc::new(GraphRouter::new(plant.clone()));
        let config = NodeConfig {
            simulation_step_ms: 0,
            ..Default::default()
        };

        assert!(Engine::new(plant, router, &config).is_err());
    }

    #[tokio::test]
    async fn test_running_engine_processes_submitted_orders() {
        let plant = demo::build();
        let config = NodeConfig {
            simulation_step_ms: 5,
            ..Default::default()
        };
        let (engine, triggers) = create_engine(&plant, &config);
        engine.initialize().await;
        let runner = tokio::spawn(engine.clone().run(triggers));

        let names: Vec<String> = demo::orders()
            .unwrap()
            .into_iter()
            .map(|creation| engine.submit_order(creation).unwrap().name)
            .collect();

        let mut finished = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            finished = names
                .iter()
                .all(|name| order_state(&plant, name) == TransportOrderState::Finished);
            if finished {
                break;
            }
        }
        runner.abort();
        engine.terminate().await;

        assert!(finished, "demo orders were not finished in time");
    }
}
