//! Weight-replicated bucket ring.

use crate::server::ServerEndpoint;

/// Maps hashes to server indices: each server appears `weight` times, and a
/// hash picks a bucket by plain modulo. Rebuilt whenever the roster changes
/// and swapped in as a whole.
#[derive(Debug)]
pub(crate) struct BucketRing {
    buckets: Vec<usize>,
}

impl BucketRing {
    pub fn build(servers: &[ServerEndpoint]) -> Self {
        let total: usize = servers.iter().map(|s| s.weight() as usize).sum();
        let mut buckets = Vec::with_capacity(total);
        for (idx, server) in servers.iter().enumerate() {
            for _ in 0..server.weight() {
                buckets.push(idx);
            }
        }
        Self { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Map a hash to a server index. The ring must be non-empty.
    pub fn bucket(&self, hash: u32) -> usize {
        self.buckets[hash as usize % self.buckets.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSpec;
    use std::time::Duration;

    fn endpoints(weights: &[u32]) -> Vec<ServerEndpoint> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let spec = ServerSpec::new(format!("cache{i}.internal"), 11211, w).unwrap();
                ServerEndpoint::new(spec, Duration::from_secs(1))
            })
            .collect()
    }

    #[test]
    fn length_is_weight_sum() {
        let ring = BucketRing::build(&endpoints(&[1, 2, 3]));
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn multiplicity_matches_weight() {
        let servers = endpoints(&[2, 1, 4]);
        let ring = BucketRing::build(&servers);
        let mut counts = [0usize; 3];
        for hash in 0..ring.len() as u32 {
            counts[ring.bucket(hash)] += 1;
        }
        assert_eq!(counts, [2, 1, 4]);
    }

    #[test]
    fn wraps_by_modulo() {
        let ring = BucketRing::build(&endpoints(&[1, 1]));
        assert_eq!(ring.bucket(0), ring.bucket(2));
        assert_eq!(ring.bucket(1), ring.bucket(0x7fff));
    }
}
