use log::debug;

use super::{
    dir_entry::{pack_short_name, DirEntry},
    error::FsError,
    volume::Volume,
    DIR_ENTRY_SIZE, ENTRY_DELETED, ENTRY_END,
};

/// A live directory entry plus the absolute image offset of its 32-byte
/// slot, so mutations can rewrite the record in place.
#[derive(Debug, Clone)]
pub struct DirSlot {
    pub offset: u64,
    pub entry: DirEntry,
}

impl Volume {
    /// Enumerate the live entries of a directory in slot order. Stops at the
    /// first end-of-directory sentinel; deleted slots and long-name
    /// continuation records are skipped. Accepts the root sentinel 0.
    pub fn read_dir(&mut self, dir_cluster: u32) -> Result<Vec<DirSlot>, FsError> {
        let start = self.resolve_dir_cluster(dir_cluster);
        let bytes_per_cluster = self.boot.bytes_per_cluster() as usize;

        let mut slots = Vec::new();
        for cluster in self.walk_chain(start)? {
            let base = self.boot.cluster_offset(cluster);
            let mut data = vec![0u8; bytes_per_cluster];
            self.image.read_at(base, &mut data)?;

            for (index, record) in data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                match record[0] {
                    ENTRY_END => return Ok(slots),
                    ENTRY_DELETED => continue,
                    _ => {}
                }
                let entry = DirEntry::from_bytes(record);
                if entry.is_long_name() {
                    continue;
                }
                slots.push(DirSlot {
                    offset: base + (index * DIR_ENTRY_SIZE) as u64,
                    entry,
                });
            }
        }
        Ok(slots)
    }

    /// Find `name` in the directory. The comparison is against the decoded
    /// 8.3 field, case-sensitive.
    pub fn lookup(&mut self, dir_cluster: u32, name: &str) -> Result<DirSlot, FsError> {
        self.read_dir(dir_cluster)?
            .into_iter()
            .find(|slot| slot.entry.matches(name))
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// First reusable slot in the directory: a deleted entry or the
    /// end-of-directory sentinel. Extends the chain by one zero-filled
    /// cluster when every slot before end-of-chain is taken.
    fn allocate_slot(&mut self, dir_cluster: u32) -> Result<u64, FsError> {
        let start = self.resolve_dir_cluster(dir_cluster);
        let bytes_per_cluster = self.boot.bytes_per_cluster() as usize;

        let chain = self.walk_chain(start)?;
        for &cluster in &chain {
            let base = self.boot.cluster_offset(cluster);
            let mut data = vec![0u8; bytes_per_cluster];
            self.image.read_at(base, &mut data)?;

            for (index, record) in data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                if record[0] == ENTRY_DELETED || record[0] == ENTRY_END {
                    return Ok(base + (index * DIR_ENTRY_SIZE) as u64);
                }
            }
        }

        let tail = *chain.last().expect("chain is never empty");
        let new_cluster = self.extend_chain(tail)?;
        self.zero_cluster(new_cluster)?;
        Ok(self.boot.cluster_offset(new_cluster))
    }

    /// Create an empty regular file. No data cluster is allocated; the
    /// first write takes care of that.
    pub fn create_file(&mut self, dir_cluster: u32, name: &str) -> Result<(), FsError> {
        let packed = pack_short_name(name)?;
        self.ensure_absent(dir_cluster, name)?;

        let offset = self.allocate_slot(dir_cluster)?;
        let entry = DirEntry::new_file(packed);
        self.image.write_at(offset, &entry.to_bytes())?;
        debug!("created file '{}' in cluster {}", name, dir_cluster);
        Ok(())
    }

    /// Create a subdirectory: allocate and zero one cluster, seed it with
    /// the `.` and `..` entries, then publish the entry in the parent.
    pub fn create_dir(&mut self, dir_cluster: u32, name: &str) -> Result<(), FsError> {
        let packed = pack_short_name(name)?;
        self.ensure_absent(dir_cluster, name)?;

        let cluster = self.find_free_cluster()?;
        self.mark_end_of_chain(cluster)?;
        self.zero_cluster(cluster)?;

        // `..` records 0 when the parent is the root directory.
        let parent = self.resolve_dir_cluster(dir_cluster);
        let parent_for_dotdot = if parent == self.boot.root_cluster {
            0
        } else {
            parent
        };

        let dot = DirEntry::new_directory(pack_short_name(".")?, cluster);
        let dotdot = DirEntry::new_directory(pack_short_name("..")?, parent_for_dotdot);
        let base = self.boot.cluster_offset(cluster);
        self.image.write_at(base, &dot.to_bytes())?;
        self.image
            .write_at(base + DIR_ENTRY_SIZE as u64, &dotdot.to_bytes())?;

        let offset = self.allocate_slot(dir_cluster)?;
        let entry = DirEntry::new_directory(packed, cluster);
        self.image.write_at(offset, &entry.to_bytes())?;
        debug!("created directory '{}' at cluster {}", name, cluster);
        Ok(())
    }

    /// Rename in place: only the 11-byte name field of the slot changes.
    pub fn rename_entry(&mut self, dir_cluster: u32, old: &str, new: &str) -> Result<(), FsError> {
        let packed = pack_short_name(new)?;
        let slot = self.lookup(dir_cluster, old)?;
        self.ensure_absent(dir_cluster, new)?;

        self.image.write_at(slot.offset, &packed)?;
        debug!("renamed '{}' to '{}'", old, new);
        Ok(())
    }

    /// Delete a regular file: mark the slot deleted, then free its chain.
    pub fn delete_file(&mut self, dir_cluster: u32, name: &str) -> Result<(), FsError> {
        let slot = self.lookup(dir_cluster, name)?;
        if slot.entry.is_directory() {
            return Err(FsError::NotARegularFile(name.to_string()));
        }
        self.remove_slot(&slot)?;
        debug!("deleted file '{}'", name);
        Ok(())
    }

    /// Delete a subdirectory. Only empty directories can go: nothing may
    /// remain besides `.`, `..`, and dead slots.
    pub fn remove_dir(&mut self, dir_cluster: u32, name: &str) -> Result<(), FsError> {
        let slot = self.lookup(dir_cluster, name)?;
        if !slot.entry.is_directory() {
            return Err(FsError::NotADirectory(name.to_string()));
        }

        // A first cluster of 0 would resolve to the root sentinel; such an
        // entry has no contents to scan.
        if slot.entry.first_cluster != 0 {
            let occupied = self
                .read_dir(slot.entry.first_cluster)?
                .into_iter()
                .any(|s| {
                    let n = s.entry.display_name();
                    n != "." && n != ".."
                });
            if occupied {
                return Err(FsError::DirectoryNotEmpty(name.to_string()));
            }
        }

        self.remove_slot(&slot)?;
        debug!("removed directory '{}'", name);
        Ok(())
    }

    /// Common tail of delete_file/remove_dir: kill the slot, release the
    /// clusters. A first cluster of 0 means there is no chain to free.
    fn remove_slot(&mut self, slot: &DirSlot) -> Result<(), FsError> {
        self.image.write_at(slot.offset, &[ENTRY_DELETED])?;
        if slot.entry.first_cluster != 0 {
            let chain = self.walk_chain(slot.entry.first_cluster)?;
            for cluster in chain {
                self.mark_free(cluster)?;
            }
        }
        Ok(())
    }

    fn ensure_absent(&mut self, dir_cluster: u32, name: &str) -> Result<(), FsError> {
        match self.lookup(dir_cluster, name) {
            Ok(_) => Err(FsError::AlreadyExists(name.to_string())),
            Err(FsError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn zero_cluster(&mut self, cluster: u32) -> Result<(), FsError> {
        let zeros = vec![0u8; self.boot.bytes_per_cluster() as usize];
        let offset = self.boot.cluster_offset(cluster);
        self.image.write_at(offset, &zeros)?;
        Ok(())
    }
}
