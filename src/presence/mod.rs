pub mod janitor;
pub mod registry;

pub use janitor::{DEFAULT_STALE_AFTER, DEFAULT_SWEEP_INTERVAL, Janitor, SweepReport};
pub use registry::PresenceRegistry;
