use std::sync::Arc;

pub use mockable::{Clock, DefaultClock};

/// Clock handle shared between request handlers and job workers.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}
