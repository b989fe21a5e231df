// Path: crates/api/src/lib.rs

//! # Observer API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # Observer API
//!
//! The interfaces between the observer core and its external collaborators:
//! the chain, the gateway/name/observer lists, the ledger, the upload service
//! and the signer. The core only ever sees these traits; the node binary wires
//! concrete implementations in.

/// Chain height and block lookups.
pub mod chain;
/// The `EntropySource` trait.
pub mod entropy;
/// Epoch resolution.
pub mod epoch;
/// Gateway, name and observer list providers.
pub mod lists;
/// The seam between the gateway assessor and the HTTP prober.
pub mod probe;
/// Report sinks, stores and the ledger/upload/signing collaborators.
pub mod publish;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::chain::{BlockSource, HeightSource};
    pub use crate::entropy::{EntropyContext, EntropySource};
    pub use crate::epoch::{EpochSource, LedgerEpochReader};
    pub use crate::lists::{GatewayListSource, NameListSource, NamesSource, ObserverListSource};
    pub use crate::probe::{ProbeTarget, ResolutionProber};
    pub use crate::publish::{
        EpochObservations, LedgerClient, ObservationInteraction, ReportSigner, ReportSink,
        ReportStore, Tag, UploadClient, UploadItem,
    };
}
