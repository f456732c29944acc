use super::{error::FsError, BOOT_SECTOR_SIZE, BOOT_SIGNATURE, FAT_ENTRY_SIZE};

/// BPB fields the engine needs, decoded from the first 512 bytes of the
/// image. Immutable after load; all region math derives from these.
#[derive(Debug, Clone)]
pub struct BootSector {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub media_descriptor: u8,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
}

impl BootSector {
    /// Decode and validate the boot sector. Fields are read at their
    /// documented byte offsets with explicit little-endian decoding; the
    /// struct layout above carries no on-disk meaning.
    pub fn from_boot_sector(data: &[u8]) -> Result<Self, FsError> {
        if data.len() < BOOT_SECTOR_SIZE {
            return Err(FsError::InvalidImage(format!(
                "boot sector is {} bytes, expected {}",
                data.len(),
                BOOT_SECTOR_SIZE
            )));
        }

        if data[510..512] != BOOT_SIGNATURE {
            return Err(FsError::InvalidImage(
                "missing 0xAA55 boot signature".into(),
            ));
        }

        let bytes_per_sector = u16::from_le_bytes([data[11], data[12]]);
        let sectors_per_cluster = data[13];
        let reserved_sectors = u16::from_le_bytes([data[14], data[15]]);
        let number_of_fats = data[16];
        let root_entries = u16::from_le_bytes([data[17], data[18]]);
        let total_sectors_16 = u16::from_le_bytes([data[19], data[20]]);
        let media_descriptor = data[21];
        let sectors_per_fat_16 = u16::from_le_bytes([data[22], data[23]]);
        let total_sectors = u32::from_le_bytes([data[32], data[33], data[34], data[35]]);
        let sectors_per_fat = u32::from_le_bytes([data[36], data[37], data[38], data[39]]);
        let root_cluster = u32::from_le_bytes([data[44], data[45], data[46], data[47]]);

        if ![512, 1024, 2048, 4096].contains(&bytes_per_sector) {
            return Err(FsError::InvalidImage(format!(
                "bytes per sector is {}",
                bytes_per_sector
            )));
        }
        if !sectors_per_cluster.is_power_of_two() || sectors_per_cluster > 128 {
            return Err(FsError::InvalidImage(format!(
                "sectors per cluster is {}",
                sectors_per_cluster
            )));
        }
        if total_sectors == 0 {
            return Err(FsError::InvalidImage("total sector count is zero".into()));
        }
        // FAT12/16 volumes populate these instead; on FAT32 all three are 0.
        if root_entries != 0 || total_sectors_16 != 0 || sectors_per_fat_16 != 0 {
            return Err(FsError::InvalidImage("volume is not FAT32".into()));
        }
        if sectors_per_fat == 0 {
            return Err(FsError::InvalidImage("FAT size is zero".into()));
        }
        if number_of_fats == 0 {
            return Err(FsError::InvalidImage("no FAT copies".into()));
        }
        if root_cluster < 2 {
            return Err(FsError::InvalidImage(format!(
                "root cluster is {}",
                root_cluster
            )));
        }

        Ok(BootSector {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            number_of_fats,
            media_descriptor,
            total_sectors,
            sectors_per_fat,
            root_cluster,
        })
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    /// Byte offset of FAT #0.
    pub fn fat_offset(&self) -> u64 {
        self.reserved_sectors as u64 * self.bytes_per_sector as u64
    }

    /// Byte size of a single FAT copy.
    pub fn fat_size_bytes(&self) -> u64 {
        self.sectors_per_fat as u64 * self.bytes_per_sector as u64
    }

    /// Byte offset of the data region (cluster 2).
    pub fn data_offset(&self) -> u64 {
        (self.reserved_sectors as u64
            + self.number_of_fats as u64 * self.sectors_per_fat as u64)
            * self.bytes_per_sector as u64
    }

    /// Byte offset of the first sector of cluster k. Clusters are numbered
    /// from 2.
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        debug_assert!(cluster >= 2);
        self.data_offset() + (cluster as u64 - 2) * self.bytes_per_cluster() as u64
    }

    pub fn data_sector_count(&self) -> u32 {
        self.total_sectors
            - (self.reserved_sectors as u32 + self.number_of_fats as u32 * self.sectors_per_fat)
    }

    /// Count of clusters in the data region, rounded down.
    pub fn data_cluster_count(&self) -> u32 {
        self.data_sector_count() / self.sectors_per_cluster as u32
    }

    /// Highest valid cluster number on the volume.
    pub fn max_cluster(&self) -> u32 {
        self.data_cluster_count() + 1
    }

    /// Number of 32-bit entries in one FAT copy.
    pub fn fat_entry_count(&self) -> u32 {
        (self.fat_size_bytes() / FAT_ENTRY_SIZE as u64) as u32
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_sectors as u64 * self.bytes_per_sector as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::test_support::build_boot_sector;

    #[test]
    fn test_parse_valid_boot_sector() {
        let data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        let boot = BootSector::from_boot_sector(&data).unwrap();

        assert_eq!(boot.bytes_per_sector, 512);
        assert_eq!(boot.sectors_per_cluster, 1);
        assert_eq!(boot.reserved_sectors, 32);
        assert_eq!(boot.number_of_fats, 2);
        assert_eq!(boot.sectors_per_fat, 1);
        assert_eq!(boot.root_cluster, 2);
        assert_eq!(boot.total_sectors, 32 + 2 + 128);
    }

    #[test]
    fn test_derived_geometry() {
        let data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        let boot = BootSector::from_boot_sector(&data).unwrap();

        assert_eq!(boot.bytes_per_cluster(), 512);
        assert_eq!(boot.fat_offset(), 32 * 512);
        assert_eq!(boot.fat_size_bytes(), 512);
        assert_eq!(boot.data_offset(), (32 + 2) * 512);
        assert_eq!(boot.cluster_offset(2), boot.data_offset());
        assert_eq!(boot.cluster_offset(5), boot.data_offset() + 3 * 512);
        assert_eq!(boot.data_cluster_count(), 128);
        assert_eq!(boot.fat_entry_count(), 128);
        assert_eq!(boot.total_size_bytes(), (32 + 2 + 128) * 512);
    }

    #[test]
    fn test_rejects_bad_bytes_per_sector() {
        let mut data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        data[11..13].copy_from_slice(&513u16.to_le_bytes());
        assert!(BootSector::from_boot_sector(&data).is_err());
    }

    #[test]
    fn test_rejects_bad_sectors_per_cluster() {
        let mut data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        data[13] = 3; // not a power of two
        assert!(BootSector::from_boot_sector(&data).is_err());

        data[13] = 0;
        assert!(BootSector::from_boot_sector(&data).is_err());
    }

    #[test]
    fn test_rejects_missing_signature() {
        let mut data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        data[510] = 0;
        assert!(BootSector::from_boot_sector(&data).is_err());
    }

    #[test]
    fn test_rejects_zero_total_sectors() {
        let mut data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        data[32..36].copy_from_slice(&0u32.to_le_bytes());
        assert!(BootSector::from_boot_sector(&data).is_err());
    }

    #[test]
    fn test_rejects_fat16_layout() {
        let mut data = build_boot_sector(512, 1, 32, 2, 1, 128, 2);
        data[22..24].copy_from_slice(&9u16.to_le_bytes()); // FATSz16 set
        assert!(BootSector::from_boot_sector(&data).is_err());
    }
}
