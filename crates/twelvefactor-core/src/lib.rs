//! twelvefactor-core — twelve-factor application model and scheduler contract.
//!
//! An [`App`] is a named set of [`Process`]es sharing an image and an
//! environment. Backends implement the [`Scheduler`] contract to turn an
//! App into live, scalable resources and to report running [`Task`]s.
//!
//! # Components
//!
//! - **`types`** — App / Process / Task value types and the env merge rule
//! - **`naming`** — `NameCodec`, the (app, process) ↔ resource-name mapping
//! - **`scheduler`** — the `Scheduler` contract and optional capabilities
//! - **`manifest`** — `app.toml` parsing into an `App`
//! - **`locking`** — opt-in per-app serialization around any scheduler

pub mod error;
pub mod locking;
pub mod manifest;
pub mod naming;
pub mod scheduler;
pub mod types;

pub use error::{SchedulerError, SchedulerResult};
pub use locking::Serialized;
pub use manifest::AppManifest;
pub use naming::{DEFAULT_DELIMITER, NameCodec};
pub use scheduler::{
    ProcessRestarter, ProcessRunner, Remover, Restarter, Runner, Scaler, Scheduler,
};
pub use types::*;
