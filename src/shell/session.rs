use std::path::Path;

use crate::fs::{FsError, Volume, VolumeInfo, WriteOutcome};

use super::open_files::{OpenFile, OpenFileTable, OpenMode};

/// All state of one interactive run: the opened volume, the current
/// directory (cluster + textual path, kept in lockstep), and the open-file
/// table. Owned by the dispatcher; nothing here is global.
pub struct Session {
    volume: Volume,
    cwd_cluster: u32,
    cwd_path: String,
    image_name: String,
    open_files: OpenFileTable,
}

impl Session {
    pub fn new(image_path: &Path) -> Result<Self, FsError> {
        let volume = Volume::open(image_path)?;
        let image_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.display().to_string());
        let root = volume.root_cluster();
        Ok(Session {
            volume,
            cwd_cluster: root,
            cwd_path: String::from("/"),
            image_name,
            open_files: OpenFileTable::new(),
        })
    }

    pub fn prompt(&self) -> String {
        format!("./{}{}> ", self.image_name, self.cwd_path)
    }

    pub fn cwd_path(&self) -> &str {
        &self.cwd_path
    }

    pub fn volume_info(&self) -> VolumeInfo {
        self.volume.info()
    }

    /// Names `ls` prints: live entries carrying the directory or archive
    /// attribute, in slot order.
    pub fn list(&mut self) -> Result<Vec<String>, FsError> {
        Ok(self
            .volume
            .read_dir(self.cwd_cluster)?
            .into_iter()
            .filter(|slot| slot.entry.is_listable())
            .map(|slot| slot.entry.display_name())
            .collect())
    }

    /// The CWD state machine: `.` is a no-op, `..` follows the on-disk
    /// parent entry (cluster 0 meaning root), anything else must name a
    /// subdirectory of the current directory.
    pub fn change_dir(&mut self, name: &str) -> Result<(), FsError> {
        match name {
            "." => Ok(()),
            ".." => self.change_to_parent(),
            _ => {
                let slot = self.volume.lookup(self.cwd_cluster, name)?;
                if !slot.entry.is_directory() {
                    return Err(FsError::NotADirectory(name.to_string()));
                }
                self.cwd_cluster = self.volume.resolve_dir_cluster(slot.entry.first_cluster);
                if self.cwd_path != "/" {
                    self.cwd_path.push('/');
                }
                self.cwd_path.push_str(name);
                Ok(())
            }
        }
    }

    fn change_to_parent(&mut self) -> Result<(), FsError> {
        if self.cwd_cluster == self.volume.root_cluster() {
            return Err(FsError::AlreadyAtRoot);
        }

        let slot = self.volume.lookup(self.cwd_cluster, "..")?;
        self.cwd_cluster = self.volume.resolve_dir_cluster(slot.entry.first_cluster);

        match self.cwd_path.rfind('/') {
            Some(0) | None => self.cwd_path = String::from("/"),
            Some(pos) => self.cwd_path.truncate(pos),
        }
        Ok(())
    }

    pub fn make_dir(&mut self, name: &str) -> Result<(), FsError> {
        self.volume.create_dir(self.cwd_cluster, name)
    }

    pub fn create_file(&mut self, name: &str) -> Result<(), FsError> {
        self.volume.create_file(self.cwd_cluster, name)
    }

    /// Open a handle on a regular file in the current directory. Checks
    /// run mode, duplicate, capacity, then the directory lookup, in that
    /// order.
    pub fn open_file(&mut self, name: &str, flag: &str) -> Result<OpenMode, FsError> {
        let mode = OpenMode::parse(flag)?;
        if self.open_files.contains(name) {
            return Err(FsError::AlreadyOpen(name.to_string()));
        }
        if self.open_files.is_full() {
            return Err(FsError::TooManyOpen);
        }

        let slot = self.volume.lookup(self.cwd_cluster, name)?;
        if slot.entry.is_directory() {
            return Err(FsError::NotARegularFile(name.to_string()));
        }

        let path = format!("/{}", self.image_name);
        self.open_files.insert(name, mode, path)?;
        Ok(mode)
    }

    pub fn close_file(&mut self, name: &str) -> Result<(), FsError> {
        self.open_files.remove(name)
    }

    pub fn open_handles(&self) -> impl Iterator<Item = &OpenFile> {
        self.open_files.iter()
    }

    pub fn has_open_files(&self) -> bool {
        !self.open_files.is_empty()
    }

    /// Set a handle's byte offset. Bounded by the size recorded in the
    /// directory entry, looked up fresh.
    pub fn seek(&mut self, name: &str, offset: u32) -> Result<(), FsError> {
        if !self.open_files.contains(name) {
            return Err(FsError::NotOpen(name.to_string()));
        }
        let slot = self.volume.lookup(self.cwd_cluster, name)?;
        if offset > slot.entry.size {
            return Err(FsError::OffsetTooLarge(name.to_string()));
        }
        self.open_files
            .get_mut(name)
            .expect("handle checked above")
            .offset = offset;
        Ok(())
    }

    /// Read `count` bytes at the handle's offset; the offset advances by
    /// the bytes actually delivered.
    pub fn read(&mut self, name: &str, count: u32) -> Result<Vec<u8>, FsError> {
        let handle = self
            .open_files
            .get(name)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        if !handle.mode.readable() {
            return Err(FsError::WrongMode(name.to_string(), "reading"));
        }
        let offset = handle.offset;

        let data = self
            .volume
            .read_file(self.cwd_cluster, name, offset, count)?;
        self.open_files
            .get_mut(name)
            .expect("handle checked above")
            .offset = offset + data.len() as u32;
        Ok(data)
    }

    /// Write at the handle's offset; the offset advances by the bytes
    /// committed, which on a full volume may be fewer than requested.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<WriteOutcome, FsError> {
        let handle = self
            .open_files
            .get(name)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        if !handle.mode.writable() {
            return Err(FsError::WrongMode(name.to_string(), "writing"));
        }
        let offset = handle.offset;

        let outcome = self
            .volume
            .write_file(self.cwd_cluster, name, offset, data)?;
        self.open_files
            .get_mut(name)
            .expect("handle checked above")
            .offset = offset + outcome.written as u32;
        Ok(outcome)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        self.volume.rename_entry(self.cwd_cluster, old, new)
    }

    pub fn remove_file(&mut self, name: &str) -> Result<(), FsError> {
        self.volume.delete_file(self.cwd_cluster, name)
    }

    pub fn remove_dir(&mut self, name: &str) -> Result<(), FsError> {
        self.volume.remove_dir(self.cwd_cluster, name)
    }

    /// Flush pending image writes; called by `exit`.
    pub fn shutdown(&mut self) -> Result<(), FsError> {
        self.volume.flush()
    }
}
