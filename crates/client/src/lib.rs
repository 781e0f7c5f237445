//! Client side of the snipshelf offline layer.
//!
//! This crate provides the request/response model and HTTP network, the
//! build-time precache manifest builder, the service worker runtime, the
//! sync bridge into the offline store, and the registration policy.

pub mod fetch;
pub mod manifest;
pub mod registration;
pub mod sync;
pub mod worker;

pub use fetch::{FetchConfig, HttpNetwork, Network, Request, Response};
pub use manifest::{BuildWarning, OutputDescriptor, OutputKind, PrecacheManifest, inject};
pub use registration::{Registration, RegistrationPolicy, WORKER_URL};
pub use sync::{EditedSnippet, MirrorOp, MirrorOutcome, MirrorTask, SyncBridge};
pub use worker::{ActivateReport, InstallReport, ServiceWorker, WorkerState};
