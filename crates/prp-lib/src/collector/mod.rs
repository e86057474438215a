//! Collection orchestration
//!
//! [`RunCoordinator`] owns one pass over every host of an adapter instance;
//! [`HostCollector`] drives a single host through its collection states and
//! merges each step into the shared [`TopologyCorrelator`](crate::correlator::TopologyCorrelator).

mod host;
mod registry;
mod run;


pub use host::{HostCollector, HostOutcome};
pub use registry::{HostRegistry, HostState, HostStatus};
pub use run::{CollectionSettings, ConnectivityReport, RunCoordinator, RunCoordinatorBuilder};
