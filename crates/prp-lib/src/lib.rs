//! PRP/ENS telemetry collection library
//!
//! This crate provides the core functionality for:
//! - Running the ENS/PRP diagnostic commands on ESXi hosts over SSH
//! - Parsing their output into typed records
//! - Resolving switch IDs and client names per host
//! - Building Switch, Port, Vdan, Lan and Node entities
//! - Correlating them across hosts and with the vCenter inventory
//! - Metrics and structured lifecycle logging

pub mod builder;
pub mod channel;
pub mod collector;
pub mod correlator;
pub mod definition;
pub mod error;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod parser;
pub mod resolver;

pub use collector::{
    CollectionSettings, ConnectivityReport, HostState, RunCoordinator, RunCoordinatorBuilder,
};
pub use definition::{adapter_definition, AdapterDefinition};
pub use error::{ChannelError, CollectError, HostError, InventoryError, ParseError};
pub use models::*;
pub use observability::{CollectorMetrics, StructuredLogger};
