use std::path::Path;

use super::{boot_sector::BootSector, error::FsError, image::ImageFile, BOOT_SECTOR_SIZE};

/// An opened FAT32 volume: the image handle plus the boot-sector geometry.
/// The boot sector is read once at open and is read-only afterwards; all
/// engine operations (FAT accessor, chain walker, directory engine, file
/// read/write) live in `impl Volume` blocks in their own modules.
pub struct Volume {
    pub(crate) image: ImageFile,
    pub(crate) boot: BootSector,
}

/// BPB-derived summary for the `info` command.
pub struct VolumeInfo {
    pub root_cluster: u32,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub data_clusters: u32,
    pub fat_entries: u32,
    pub image_size: u64,
}

impl Volume {
    pub fn open(path: &Path) -> Result<Self, FsError> {
        let mut image = ImageFile::open(path)?;
        let mut sector = [0u8; BOOT_SECTOR_SIZE];
        image.read_at(0, &mut sector)?;
        let boot = BootSector::from_boot_sector(&sector)?;
        Ok(Volume { image, boot })
    }

    pub fn boot(&self) -> &BootSector {
        &self.boot
    }

    pub fn root_cluster(&self) -> u32 {
        self.boot.root_cluster
    }

    /// The shell encodes "at root" either as the root cluster itself or as
    /// the sentinel 0; both resolve to the root cluster for I/O.
    pub fn resolve_dir_cluster(&self, cluster: u32) -> u32 {
        if cluster == 0 {
            self.boot.root_cluster
        } else {
            cluster
        }
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            root_cluster: self.boot.root_cluster,
            bytes_per_sector: self.boot.bytes_per_sector,
            sectors_per_cluster: self.boot.sectors_per_cluster,
            data_clusters: self.boot.data_cluster_count(),
            fat_entries: self.boot.fat_entry_count(),
            image_size: self.boot.total_size_bytes(),
        }
    }

    pub fn flush(&mut self) -> Result<(), FsError> {
        self.image.flush()?;
        Ok(())
    }
}
