//! SMS UPS serial protocol.

pub mod commands;
pub mod frame;
pub mod status;

// Re-export common types
pub use commands::{CommandClass, CommandSpec, SettleDelays};
pub use frame::{CommandFrame, build_frame, checksum};
pub use status::{StatusResponse, UpsFlag, decode_status, decode_status_at, flags_summary};
