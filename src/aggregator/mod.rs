//! Background collection: the rotation that keeps feeds fresh and the
//! supervisor that keeps the rotation alive.

mod scheduler;
mod supervisor;
#[cfg(test)]
pub(crate) mod testing;

pub use scheduler::{RotationScheduler, SchedulerSettings};
pub use supervisor::{Supervisor, SupervisorState};
