//! Host port allocation for recreated containers

use crate::integrations::ports::PortProbe;
use crate::integrations::runtime::PortBinding;

/// Decides which host port each binding of a container rebinds to.
///
/// Best effort only: nothing is reserved between the decision and the
/// runtime binding the port, so a chosen port can still collide.
pub struct PortAllocator<'a> {
    probe: &'a dyn PortProbe,
}

impl<'a> PortAllocator<'a> {
    pub fn new(probe: &'a dyn PortProbe) -> Self {
        Self { probe }
    }

    /// Resolve every binding independently, in input order
    pub fn resolve(&self, bindings: &[PortBinding]) -> Vec<PortBinding> {
        bindings.iter().map(|b| self.resolve_one(b)).collect()
    }

    fn resolve_one(&self, binding: &PortBinding) -> PortBinding {
        let mut resolved = binding.clone();

        if binding.is_wildcard() {
            // reuse the container's own port number on the host when free
            if self
                .probe
                .is_available(binding.container_port, binding.protocol)
            {
                resolved.host_port = binding.container_port;
            }
        } else if !self.probe.is_available(binding.host_port, binding.protocol) {
            tracing::info!(
                binding = %binding,
                "host port taken, leaving assignment to the runtime"
            );
            resolved.host_port = 0;
        }

        resolved
    }
}
