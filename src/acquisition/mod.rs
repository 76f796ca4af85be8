//! State acquisition: interface addressing, default route, external
//! reachability.

pub mod interface;
pub mod probe;
pub mod route;

pub use interface::{classify_addresses, InterfaceStateReader};
pub use probe::{ConnectivityProbe, HttpsProbe, ProbeReport, TargetOutcome, TargetResult};
pub use route::RouteStateReader;
