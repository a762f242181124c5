mod durable;
mod memory;

pub use durable::DurableReservationStore;
pub use memory::InMemoryReservationStore;
