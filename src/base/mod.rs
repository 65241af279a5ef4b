//! Base types and error handling.
//!
//! - [`NetError`]: the crate-wide error type
//! - [`Failure`] and [`Operation`]: the stable failure taxonomy that
//!   error-wrapping decorators attach to errors

pub mod failure;
pub mod neterror;

pub use failure::{classify, failure, operation, scrub, Failure, Operation};
pub use neterror::{ConnectError, DnsError, NetError, WrappedError};
