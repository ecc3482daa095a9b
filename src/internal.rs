mod monitor;
mod poller;
mod registry;

pub(crate) use monitor::{Monitor, install, invoke, reap_missing, remove_monitor, write};
pub(crate) use poller::DeletionPoller;
pub(crate) use registry::{PollerHandle, Registry};
