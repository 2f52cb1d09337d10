//! The OTA update engine: manifest checking, a cancellable streaming
//! install worker, and dual-partition rollback/validation.

pub mod engine;
pub mod error;
pub mod slots;
pub mod transport;
pub mod types;
pub mod version;

pub use engine::OtaEngine;
pub use error::OtaError;
pub use slots::{SimulatedSlots, SlotValidity, UpdateSlots};
pub use transport::{OtaTransport, SimulatedTransport};
pub use types::{OtaConfig, OtaStats, OtaState, ReleaseAsset, UpdateManifest, UpdateManifestSummary};
pub use version::is_newer;
