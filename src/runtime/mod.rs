//! # Runtime Module
//!
//! Runtime components for the Workspace operator: initialization, the
//! controller watch loop, the reconcile adapter and its error policy.

pub mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::*;
pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
