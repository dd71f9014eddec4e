// ── Reactive data store ──
//
// Watch-channel state with push-based change notification, plus the
// single reconciling task that is the only writer of tank telemetry.

mod data_store;
pub(crate) mod reconcile;

pub use data_store::DataStore;
pub use reconcile::{Reading, parse_reading};
