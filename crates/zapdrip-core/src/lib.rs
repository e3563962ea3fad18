//! # ZapDrip Core
//!
//! Shared foundation for the ZapDrip dispatcher: configuration, the error
//! taxonomy, the boundary traits (row source, transport), and the named-field
//! recipient record.
//!
//! Everything here is I/O-free except config file loading; the actual
//! boundaries live in `zapdrip-sheets` and `zapdrip-channels`, and the
//! dispatch state machine in `zapdrip-dispatch`.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ZapDripConfig;
pub use error::{Result, ZapDripError};
pub use traits::{RowSource, Transport};
pub use types::Recipient;
