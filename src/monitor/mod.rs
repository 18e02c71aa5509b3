//! Background polling of enabled services.

mod poller;

pub use poller::{poll_all, record_usage, Poller, PollerHandle};
