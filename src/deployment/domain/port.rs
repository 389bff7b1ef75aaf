//! Network port values assigned to instances.

use super::DeploymentDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host port an instance is reachable on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePort(u16);

impl ServicePort {
    /// Creates a service port.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::ZeroPort`] for port zero.
    pub const fn new(value: u16) -> Result<Self, DeploymentDomainError> {
        if value == 0 {
            return Err(DeploymentDomainError::ZeroPort);
        }
        Ok(Self(value))
    }

    /// Returns the numeric port.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ServicePort {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Contiguous block of ports, `base..base + capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    base: u16,
    capacity: u16,
}

impl PortRange {
    /// Creates a validated port range.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError`] when the range is empty, starts at
    /// port zero, or runs past port 65535.
    pub fn new(base: u16, capacity: u16) -> Result<Self, DeploymentDomainError> {
        if capacity == 0 {
            return Err(DeploymentDomainError::EmptyPortRange);
        }
        if base == 0 {
            return Err(DeploymentDomainError::ZeroPort);
        }
        if base.checked_add(capacity - 1).is_none() {
            return Err(DeploymentDomainError::PortRangeOverflow { base, capacity });
        }
        Ok(Self { base, capacity })
    }

    /// Returns the first port in the range.
    #[must_use]
    pub const fn base(self) -> u16 {
        self.base
    }

    /// Returns the number of ports in the range.
    #[must_use]
    pub const fn capacity(self) -> u16 {
        self.capacity
    }

    /// Returns whether `port` lies inside the range.
    #[must_use]
    pub const fn contains(self, port: ServicePort) -> bool {
        port.get() >= self.base && port.get() - self.base < self.capacity
    }

    /// Iterates over every port in the range in ascending order.
    pub fn ports(self) -> impl Iterator<Item = ServicePort> {
        (0..self.capacity)
            .filter_map(move |offset| self.base.checked_add(offset))
            .filter_map(|port| ServicePort::new(port).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn range_enumerates_base_plus_offset() {
        let range = PortRange::new(8100, 3).expect("valid range");
        let ports: Vec<u16> = range.ports().map(ServicePort::get).collect();
        assert_eq!(ports, vec![8100, 8101, 8102]);
    }

    #[rstest]
    #[case(8100, 0, DeploymentDomainError::EmptyPortRange)]
    #[case(0, 10, DeploymentDomainError::ZeroPort)]
    #[case(65530, 10, DeploymentDomainError::PortRangeOverflow { base: 65530, capacity: 10 })]
    fn invalid_ranges_are_rejected(
        #[case] base: u16,
        #[case] capacity: u16,
        #[case] expected: DeploymentDomainError,
    ) {
        assert_eq!(PortRange::new(base, capacity), Err(expected));
    }

    #[test]
    fn range_ending_at_last_port_is_valid() {
        let range = PortRange::new(65535, 1).expect("valid range");
        let last = ServicePort::new(65535).expect("valid port");
        assert!(range.contains(last));
    }
}
