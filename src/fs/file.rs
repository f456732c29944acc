use log::debug;

use super::{error::FsError, volume::Volume};

/// Result of a write: how many bytes actually reached the image, and the
/// error that stopped the write early, if any. Partial success happens when
/// the chain cannot be extended (volume full) after some bytes committed.
pub struct WriteOutcome {
    pub written: usize,
    pub error: Option<FsError>,
}

impl Volume {
    /// Read up to `count` bytes of `name` starting at `offset`. The
    /// directory entry is located fresh on every call. The result is
    /// clamped to the file size and stops early if the chain ends.
    pub fn read_file(
        &mut self,
        dir_cluster: u32,
        name: &str,
        offset: u32,
        count: u32,
    ) -> Result<Vec<u8>, FsError> {
        let slot = self.lookup(dir_cluster, name)?;
        if slot.entry.is_directory() {
            return Err(FsError::NotARegularFile(name.to_string()));
        }

        let size = slot.entry.size;
        if count == 0 || offset >= size || slot.entry.first_cluster == 0 {
            return Ok(Vec::new());
        }
        let to_read = count.min(size - offset) as u64;

        let chain = self.walk_chain(slot.entry.first_cluster)?;
        let bytes_per_cluster = self.boot.bytes_per_cluster() as u64;

        let mut out = Vec::with_capacity(to_read as usize);
        let mut pos = offset as u64;
        let end = offset as u64 + to_read;
        while pos < end {
            let index = (pos / bytes_per_cluster) as usize;
            if index >= chain.len() {
                break; // chain ended before the recorded size
            }
            let within = pos % bytes_per_cluster;
            let n = (bytes_per_cluster - within).min(end - pos) as usize;

            let mut buf = vec![0u8; n];
            let base = self.boot.cluster_offset(chain[index]);
            self.image.read_at(base + within, &mut buf)?;
            out.extend_from_slice(&buf);
            pos += n as u64;
        }
        Ok(out)
    }

    /// Write `data` into `name` starting at `offset`, extending the cluster
    /// chain one cluster at a time as needed. Runs of bytes already
    /// committed survive a failed extension; the directory entry's size
    /// (and first cluster, for a previously empty file) is rewritten last.
    pub fn write_file(
        &mut self,
        dir_cluster: u32,
        name: &str,
        offset: u32,
        data: &[u8],
    ) -> Result<WriteOutcome, FsError> {
        let slot = self.lookup(dir_cluster, name)?;
        if slot.entry.is_directory() {
            return Err(FsError::NotARegularFile(name.to_string()));
        }
        if data.is_empty() {
            return Ok(WriteOutcome {
                written: 0,
                error: None,
            });
        }

        // An empty file gets its first cluster here; the slot is patched
        // after the data lands.
        let mut first_cluster = slot.entry.first_cluster;
        let first_allocated = first_cluster == 0;
        if first_allocated {
            first_cluster = self.find_free_cluster()?;
            self.mark_end_of_chain(first_cluster)?;
            debug!("allocated first cluster {} for '{}'", first_cluster, name);
        }

        let mut chain = self.walk_chain(first_cluster)?;
        let bytes_per_cluster = self.boot.bytes_per_cluster() as u64;

        let mut written = 0usize;
        let mut error = None;
        let mut pos = offset as u64;
        'copy: while written < data.len() {
            let index = (pos / bytes_per_cluster) as usize;
            while index >= chain.len() {
                match self.extend_chain(*chain.last().expect("chain is never empty")) {
                    Ok(cluster) => chain.push(cluster),
                    Err(err) => {
                        error = Some(err);
                        break 'copy;
                    }
                }
            }
            let within = pos % bytes_per_cluster;
            let n = (bytes_per_cluster - within).min((data.len() - written) as u64) as usize;

            let base = self.boot.cluster_offset(chain[index]);
            if let Err(err) = self.image.write_at(base + within, &data[written..written + n]) {
                error = Some(err.into());
                break;
            }
            written += n;
            pos += n as u64;
        }

        // Publish the new size (and first cluster) only after the data is
        // on disk.
        let end = offset + written as u32;
        if first_allocated {
            self.patch_first_cluster(slot.offset, first_cluster)?;
        }
        if end > slot.entry.size {
            self.patch_size(slot.offset, end)?;
        }

        Ok(WriteOutcome { written, error })
    }

    fn patch_first_cluster(&mut self, slot_offset: u64, cluster: u32) -> Result<(), FsError> {
        self.image
            .write_at(slot_offset + 20, &((cluster >> 16) as u16).to_le_bytes())?;
        self.image
            .write_at(slot_offset + 26, &(cluster as u16).to_le_bytes())?;
        Ok(())
    }

    fn patch_size(&mut self, slot_offset: u64, size: u32) -> Result<(), FsError> {
        self.image.write_at(slot_offset + 28, &size.to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::test_support::format_volume;
    use crate::fs::{FsError, Volume};

    fn volume_with_file(clusters: u32) -> (tempfile::NamedTempFile, Volume, u32) {
        let tmp = format_volume(clusters);
        let mut volume = Volume::open(tmp.path()).unwrap();
        let root = volume.root_cluster();
        volume.create_file(root, "HELLO").unwrap();
        (tmp, volume, root)
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (_tmp, mut volume, root) = volume_with_file(64);

        let outcome = volume.write_file(root, "HELLO", 0, b"abcdef").unwrap();
        assert_eq!(outcome.written, 6);
        assert!(outcome.error.is_none());

        let slot = volume.lookup(root, "HELLO").unwrap();
        assert_eq!(slot.entry.size, 6);
        assert_ne!(slot.entry.first_cluster, 0);

        assert_eq!(volume.read_file(root, "HELLO", 0, 6).unwrap(), b"abcdef");
    }

    #[test]
    fn test_write_spanning_clusters() {
        let (_tmp, mut volume, root) = volume_with_file(64);

        let payload = vec![b'x'; 600];
        let outcome = volume.write_file(root, "HELLO", 0, &payload).unwrap();
        assert_eq!(outcome.written, 600);

        let slot = volume.lookup(root, "HELLO").unwrap();
        assert_eq!(slot.entry.size, 600);
        assert_eq!(
            volume.walk_chain(slot.entry.first_cluster).unwrap().len(),
            2
        );
        assert_eq!(volume.read_file(root, "HELLO", 0, 600).unwrap(), payload);
    }

    #[test]
    fn test_read_is_clamped_to_file_size() {
        let (_tmp, mut volume, root) = volume_with_file(64);

        volume.write_file(root, "HELLO", 0, b"abcdef").unwrap();
        assert_eq!(volume.read_file(root, "HELLO", 0, 100).unwrap(), b"abcdef");
        assert_eq!(volume.read_file(root, "HELLO", 4, 100).unwrap(), b"ef");
        assert!(volume.read_file(root, "HELLO", 6, 100).unwrap().is_empty());
    }

    #[test]
    fn test_read_empty_file() {
        let (_tmp, mut volume, root) = volume_with_file(64);
        assert!(volume.read_file(root, "HELLO", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let (_tmp, mut volume, root) = volume_with_file(64);

        volume.write_file(root, "HELLO", 0, b"abcdef").unwrap();
        volume.write_file(root, "HELLO", 2, b"XY").unwrap();

        let slot = volume.lookup(root, "HELLO").unwrap();
        assert_eq!(slot.entry.size, 6);
        assert_eq!(volume.read_file(root, "HELLO", 0, 6).unwrap(), b"abXYef");
    }

    #[test]
    fn test_append_at_cluster_boundary() {
        let (_tmp, mut volume, root) = volume_with_file(64);

        volume.write_file(root, "HELLO", 0, &vec![b'a'; 512]).unwrap();
        let outcome = volume.write_file(root, "HELLO", 512, b"tail").unwrap();
        assert_eq!(outcome.written, 4);

        let slot = volume.lookup(root, "HELLO").unwrap();
        assert_eq!(slot.entry.size, 516);
        assert_eq!(volume.read_file(root, "HELLO", 512, 4).unwrap(), b"tail");
    }

    #[test]
    fn test_full_volume_partial_write() {
        // 4 data clusters; the root takes one, leaving 3 for the file.
        let (_tmp, mut volume, root) = volume_with_file(4);

        let payload = vec![b'z'; 4 * 512];
        let outcome = volume.write_file(root, "HELLO", 0, &payload).unwrap();

        assert_eq!(outcome.written, 3 * 512);
        assert!(matches!(outcome.error, Some(FsError::NoSpace)));

        // Committed bytes are indexed by the directory entry.
        let slot = volume.lookup(root, "HELLO").unwrap();
        assert_eq!(slot.entry.size, 3 * 512);
        assert_eq!(
            volume.read_file(root, "HELLO", 0, 4 * 512).unwrap(),
            &payload[..3 * 512]
        );
    }

    #[test]
    fn test_write_rejects_directory() {
        let tmp = format_volume(64);
        let mut volume = Volume::open(tmp.path()).unwrap();
        let root = volume.root_cluster();
        volume.create_dir(root, "SUB").unwrap();

        assert!(matches!(
            volume.write_file(root, "SUB", 0, b"x"),
            Err(FsError::NotARegularFile(_))
        ));
        assert!(matches!(
            volume.read_file(root, "SUB", 0, 1),
            Err(FsError::NotARegularFile(_))
        ));
    }
}
