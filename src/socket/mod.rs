//! Sockets.
//!
//! - [`stream`]: the [`BoxedSocket`] connection type
//! - [`udp`]: connected UDP associations behind the same interface
//! - [`system`]: the default [`Connector`](crate::ops::Connector)

pub mod stream;
pub mod system;
pub mod udp;

pub use stream::{BoxedSocket, StreamSocket};
pub use system::SystemConnector;
pub use udp::UdpConn;
