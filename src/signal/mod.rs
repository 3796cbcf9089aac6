//! Signaling-channel plumbing around the analysis pipeline.
//!
//! The agent talks to its server with newline-delimited JSON envelopes:
//! - Outbound: a `register` envelope, then one `log` envelope per spectrum record
//! - Inbound: call-control envelopes (`startCall`, `endCall`, `sdpAnswer`,
//!   `receiveIceCandidate`) routed to a [`CallHandler`]
//!
//! Connection management and the media transport live outside this crate;
//! the binary speaks the protocol over stdout/stdin.

mod forwarder;
mod protocol;
mod router;


pub use forwarder::{forward_records, Forwarder, ForwarderOptions};
pub use protocol::{Action, IceCandidateInit, Message};
pub use router::{spawn_control_reader, CallHandler, ControlRouter, LoggingCallHandler};
