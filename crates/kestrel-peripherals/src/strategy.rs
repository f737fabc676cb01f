//! Pluggable decisions of the peripheral dispatcher.

use std::sync::Arc;

use kestrel_core::{Location, ObjectService, PeripheralJob};

/// Picks the job a free device processes next.
pub trait JobSelectionStrategy: Send + Sync {
    /// At most one of `jobs` for the device at `location`.
    fn select(&self, location: &Location, jobs: &[PeripheralJob]) -> Option<PeripheralJob>;
}

/// Picks devices whose reservation may be released.
pub trait PeripheralReleaseStrategy: Send + Sync {
    fn select_peripherals_to_release(&self, locations: &[Location]) -> Vec<Location>;
}

/// The oldest job, by creation time and then name.
pub(crate) fn oldest<'a>(jobs: impl IntoIterator<Item = &'a PeripheralJob>) -> Option<&'a PeripheralJob> {
    jobs.into_iter().min_by(|a, b| {
        a.creation_time
            .cmp(&b.creation_time)
            .then_with(|| a.name.cmp(&b.name))
    })
}

/// Selects the oldest job targeting the device.
#[derive(Debug, Default)]
pub struct DefaultJobSelectionStrategy;

impl JobSelectionStrategy for DefaultJobSelectionStrategy {
    fn select(&self, location: &Location, jobs: &[PeripheralJob]) -> Option<PeripheralJob> {
        oldest(jobs.iter().filter(|job| job.location() == location.name)).cloned()
    }
}

/// Releases idle devices whose reservation token no unfinished job for the device carries.
pub struct DefaultPeripheralReleaseStrategy {
    objects: Arc<dyn ObjectService>,
}

impl DefaultPeripheralReleaseStrategy {
    pub fn new(objects: Arc<dyn ObjectService>) -> Self {
        Self { objects }
    }
}

impl PeripheralReleaseStrategy for DefaultPeripheralReleaseStrategy {
    fn select_peripherals_to_release(&self, locations: &[Location]) -> Vec<Location> {
        let unfinished = self.objects.peripheral_jobs(&|job| !job.state.is_final());
        locations
            .iter()
            .filter(|location| location.is_peripheral_idle())
            .filter(|location| {
                let Some(token) = location.peripheral.reservation_token.as_deref() else {
                    return false;
                };
                !unfinished
                    .iter()
                    .any(|job| job.location() == location.name && job.reservation_token == token)
            })
            .cloned()
            .collect()
    }
}
