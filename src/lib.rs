//! Kanshi - property observation and change tracking
//!
//! Observe named properties of shared dynamic records and get a synchronous
//! callback on every reassignment, sub-key write, or mutating method call,
//! plus asynchronous detection of property removal. The code writing the
//! target never knows it is being watched.
//!
//! See `demos/watch_config.rs` and `demos/deletion_watch.rs`.

mod change;
mod error;
mod handle;
mod options;
mod path;
mod session;
mod snapshot;
mod target;
mod value;

mod internal;

pub use change::{Change, ChangeObserver, ChangeOrigin};
pub use error::Error;
pub use handle::{ObjectHandle, TrackedValue};
pub use options::ObserveOptions;
pub use session::{PropList, Session};
pub use target::{Target, TargetId};
pub use value::{Value, ValueKind};

pub type Result<T = ()> = std::result::Result<T, Error>;
