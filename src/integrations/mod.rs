//! External collaborators: the container runtime and the host network

pub mod docker;
pub mod ports;
pub mod runtime;
