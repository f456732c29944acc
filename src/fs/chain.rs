use std::collections::HashSet;

use log::{debug, warn};

use super::{error::FsError, volume::Volume, BAD_CLUSTER, EOC_MIN, FIRST_DATA_CLUSTER};

impl Volume {
    /// The cluster after `cluster` in its chain, or None at end-of-chain.
    /// Bad-cluster marks and pointers outside the data region are corrupt.
    fn next_in_chain(&mut self, cluster: u32) -> Result<Option<u32>, FsError> {
        let entry = self.fat_entry(cluster)?;
        if entry >= EOC_MIN {
            return Ok(None);
        }
        if entry == BAD_CLUSTER
            || entry < FIRST_DATA_CLUSTER
            || entry > self.boot.max_cluster()
        {
            warn!("cluster {} points at invalid cluster {:#x}", cluster, entry);
            return Err(FsError::CorruptChain(cluster));
        }
        Ok(Some(entry))
    }

    /// Collect the whole chain starting at `start`, in order. Refuses to
    /// revisit a cluster: a repeat within one walk is a corrupt image, not
    /// an infinite loop.
    pub fn walk_chain(&mut self, start: u32) -> Result<Vec<u32>, FsError> {
        if start < FIRST_DATA_CLUSTER || start > self.boot.max_cluster() {
            return Err(FsError::CorruptChain(start));
        }
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut cluster = start;
        loop {
            if !visited.insert(cluster) {
                warn!("cluster chain loops back to cluster {}", cluster);
                return Err(FsError::CorruptChain(cluster));
            }
            chain.push(cluster);
            match self.next_in_chain(cluster)? {
                Some(next) => cluster = next,
                None => return Ok(chain),
            }
        }
    }

    /// The cluster `count` steps into the chain from `start`.
    pub fn skip_clusters(&mut self, start: u32, count: u32) -> Result<u32, FsError> {
        if start < FIRST_DATA_CLUSTER || start > self.boot.max_cluster() {
            return Err(FsError::CorruptChain(start));
        }
        let mut cluster = start;
        for step in 0..count {
            // A chain longer than the data region has looped.
            if step > self.boot.max_cluster() {
                return Err(FsError::CorruptChain(cluster));
            }
            cluster = self
                .next_in_chain(cluster)?
                .ok_or(FsError::OffsetBeyondEof)?;
        }
        Ok(cluster)
    }

    /// Allocate a free cluster, mark it end-of-chain, and link it after
    /// `tail`. Returns the new tail.
    pub fn extend_chain(&mut self, tail: u32) -> Result<u32, FsError> {
        let new_tail = self.find_free_cluster()?;
        self.mark_end_of_chain(new_tail)?;
        self.set_fat_entry(tail, new_tail)?;
        debug!("extended chain: cluster {} -> {}", tail, new_tail);
        Ok(new_tail)
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::test_support::format_volume;
    use crate::fs::{FsError, Volume, EOC};

    fn volume_with_chain(clusters: &[u32]) -> (tempfile::NamedTempFile, Volume) {
        let tmp = format_volume(64);
        let mut volume = Volume::open(tmp.path()).unwrap();
        for pair in clusters.windows(2) {
            volume.set_fat_entry(pair[0], pair[1]).unwrap();
        }
        volume
            .set_fat_entry(*clusters.last().unwrap(), EOC)
            .unwrap();
        (tmp, volume)
    }

    #[test]
    fn test_walk_follows_links_to_eoc() {
        let (_tmp, mut volume) = volume_with_chain(&[3, 7, 5]);
        assert_eq!(volume.walk_chain(3).unwrap(), vec![3, 7, 5]);
    }

    #[test]
    fn test_walk_detects_cycle() {
        let tmp = format_volume(64);
        let mut volume = Volume::open(tmp.path()).unwrap();
        volume.set_fat_entry(3, 4).unwrap();
        volume.set_fat_entry(4, 3).unwrap();

        assert!(matches!(
            volume.walk_chain(3),
            Err(FsError::CorruptChain(_))
        ));
    }

    #[test]
    fn test_walk_rejects_invalid_pointer() {
        let tmp = format_volume(64);
        let mut volume = Volume::open(tmp.path()).unwrap();
        volume.set_fat_entry(3, 1).unwrap(); // points into reserved slots

        assert!(matches!(
            volume.walk_chain(3),
            Err(FsError::CorruptChain(3))
        ));
    }

    #[test]
    fn test_skip_steps_into_chain() {
        let (_tmp, mut volume) = volume_with_chain(&[3, 7, 5]);

        assert_eq!(volume.skip_clusters(3, 0).unwrap(), 3);
        assert_eq!(volume.skip_clusters(3, 2).unwrap(), 5);
        assert!(matches!(
            volume.skip_clusters(3, 3),
            Err(FsError::OffsetBeyondEof)
        ));
    }

    #[test]
    fn test_extend_links_new_tail() {
        let (_tmp, mut volume) = volume_with_chain(&[3]);

        let new_tail = volume.extend_chain(3).unwrap();
        assert_eq!(new_tail, 4); // lowest free cluster
        assert_eq!(volume.fat_entry(3).unwrap(), 4);
        assert_eq!(volume.fat_entry(4).unwrap(), EOC);
        assert_eq!(volume.walk_chain(3).unwrap(), vec![3, 4]);
    }
}
