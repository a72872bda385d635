//! Affinity (MPIDR) decoding.
//!
//! Callers name cores by their MPIDR affinity fields. Only the two lowest levels are meaningful on
//! the platforms we target: AFF0 selects a core within a cluster, AFF1 the cluster.

use crate::error::PsciError;

pub const MPIDR_AFF0: u64 = 0xff;
pub const MPIDR_AFF1: u64 = 0xff00;
const AFF1_SHIFT: u64 = 8;

/// Returns true if no bit outside of AFF0 and AFF1 is set.
pub const fn is_well_formed(mpidr: u64) -> bool {
    mpidr & !(MPIDR_AFF0 | MPIDR_AFF1) == 0
}

/// How cores are grouped in clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    /// Number of cores per cluster, 0 when the system has a single cluster.
    pub cores_per_cluster: usize,
}

impl Topology {
    pub const FLAT: Topology = Topology::new(0);

    pub const fn new(cores_per_cluster: usize) -> Self {
        Self { cores_per_cluster }
    }

    /// Linear core index of an affinity value.
    ///
    /// The index is not checked against the number of cores, the state table does that.
    pub fn core_index(&self, mpidr: u64) -> Result<usize, PsciError> {
        if !is_well_formed(mpidr) {
            return Err(PsciError::InvalidParameters);
        }

        let aff0 = (mpidr & MPIDR_AFF0) as usize;
        let aff1 = ((mpidr & MPIDR_AFF1) >> AFF1_SHIFT) as usize;

        if self.cores_per_cluster == 0 {
            if aff1 != 0 {
                log::warn!("Cluster {} requested on a single cluster system", aff1);
                return Err(PsciError::InvalidParameters);
            }
            return Ok(aff0);
        }

        if aff0 >= self.cores_per_cluster {
            log::warn!(
                "Core {} requested, but clusters have only {} cores",
                aff0,
                self.cores_per_cluster
            );
            return Err(PsciError::InvalidParameters);
        }

        Ok(aff1 * self.cores_per_cluster + aff0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_bits() {
        assert!(is_well_formed(0x0103));
        assert!(!is_well_formed(0x1_0000));
        assert!(!is_well_formed(1 << 31));

        let topology = Topology::new(4);
        assert_eq!(topology.core_index(0x1_0000), Err(PsciError::InvalidParameters));
        assert_eq!(topology.core_index(1 << 40), Err(PsciError::InvalidParameters));
    }

    #[test]
    fn flat_topology() {
        let topology = Topology::FLAT;
        assert_eq!(topology.core_index(0), Ok(0));
        assert_eq!(topology.core_index(3), Ok(3));
        assert_eq!(topology.core_index(0xff), Ok(0xff));
        assert_eq!(topology.core_index(0x100), Err(PsciError::InvalidParameters));
    }

    #[test]
    fn clustered_topology() {
        let topology = Topology::new(2);
        assert_eq!(topology.core_index(0x000), Ok(0));
        assert_eq!(topology.core_index(0x001), Ok(1));
        assert_eq!(topology.core_index(0x100), Ok(2));
        assert_eq!(topology.core_index(0x101), Ok(3));
        assert_eq!(topology.core_index(0x002), Err(PsciError::InvalidParameters));
        assert_eq!(topology.core_index(0x301), Ok(7));
    }
}
