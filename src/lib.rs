//! TCP broadcast relay speaking the legacy XMLSocket framing convention:
//! frames are arbitrary bytes terminated by a single NUL byte (0x00). Any
//! frame received from one client is rebroadcast verbatim to every connected
//! client; the reserved frame `<policy-file-request/>` is answered with a
//! generated cross-domain policy document instead.
//!
//! Each module focuses on a concrete responsibility:
//!
//! - [`cli`] parses the command-line interface for serve and client modes.
//! - [`server`] accepts TCP connections, keeps the shared client registry,
//!   and fans frames out to every registered client.
//! - [`client`] connects to a relay, multiplexing stdin and incoming frames
//!   for a terminal user.
//! - [`frame`] provides the NUL-delimited wire framing plus helpers for
//!   async reads and writes.
//! - [`policy`] renders the cross-domain policy document.
//!
//! Integration and unit tests use this crate directly to exercise the
//! registry, fan-out, and wire protocol.

pub mod cli;
pub mod client;
pub mod frame;
pub mod policy;
pub mod server;
