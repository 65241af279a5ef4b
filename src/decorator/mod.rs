//! Decorators over the capability set.
//!
//! Each decorator is a generic wrapper implementing all four operation
//! traits when its inner value does, plus a `wrap` function that decorates
//! every slot of a [`Config`](crate::ops::Config). Slots can also be
//! decorated one at a time with `Config::map_*`.
//!
//! Recommended order, outermost first: logging, error wrapping, byte
//! counting, then the default implementations.
//!
//! ```rust,ignore
//! use probenet::decorator::{bytecounter, errwrapper, logger};
//! use probenet::ops::{Config, Context};
//!
//! let session = bytecounter::Counter::new();
//! let config = bytecounter::wrap(Config::new(), session.clone(), None);
//! let config = logger::wrap(errwrapper::wrap(config), "[web] ");
//! let ctx = Context::background().with_config(Arc::new(config));
//! ```

pub mod bytecounter;
pub mod errwrapper;
pub mod logger;
pub mod saver;

pub use bytecounter::{ByteCounter, Counter, CountingSocket};
pub use errwrapper::{wrap_error, ErrWrapper};
pub use logger::Logger;
pub use saver::{Event, EventLog, Saver};
