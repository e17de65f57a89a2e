//! twelvefactor-ecs — a [`Scheduler`](twelvefactor_core::Scheduler) backed by ECS.
//!
//! Every process of an app becomes one ECS service named
//! `{app_id}{delimiter}{process}` (see [`NameCodec`](twelvefactor_core::NameCodec)).
//! The scheduler never stores anything locally: an app's services are found
//! by listing the whole cluster and decoding the service names.
//!
//! # Architecture
//!
//! ```text
//! EcsScheduler
//!   ├── StackBuilder (build / remove / services)
//!   │     └── RawStackBuilder: task definitions + services via EcsClient
//!   └── EcsClient (update_service, list_tasks, describe_tasks, stop_task)
//! ```
//!
//! [`MemoryCluster`] is an in-process `EcsClient` used for tests and dry runs.

pub mod arn;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod raw;
pub mod scheduler;
pub mod stack;

pub use client::EcsClient;
pub use config::EcsConfig;
pub use error::{EcsError, EcsResult};
pub use memory::MemoryCluster;
pub use raw::RawStackBuilder;
pub use scheduler::EcsScheduler;
pub use stack::StackBuilder;
