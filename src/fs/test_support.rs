//! Scratch FAT32 volumes for the engine tests. The images are tiny but
//! carry the real layout: boot sector, mirrored FATs with the two reserved
//! entries and an end-of-chain root directory, zeroed data region.

use std::io::Write as _;

use tempfile::NamedTempFile;

use super::{BOOT_SECTOR_SIZE, BOOT_SIGNATURE, EOC, FAT_ENTRY_SIZE};

/// Encode a boot sector with the given geometry. Total sector count is
/// derived so the regions exactly cover the image.
pub(crate) fn build_boot_sector(
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    number_of_fats: u8,
    sectors_per_fat: u32,
    data_sectors: u32,
    root_cluster: u32,
) -> [u8; BOOT_SECTOR_SIZE] {
    let total_sectors =
        reserved_sectors as u32 + number_of_fats as u32 * sectors_per_fat + data_sectors;

    let mut data = [0u8; BOOT_SECTOR_SIZE];
    data[0] = 0xEB; // jump stub
    data[2] = 0x90;
    data[3..11].copy_from_slice(b"FATSHELL");
    data[11..13].copy_from_slice(&bytes_per_sector.to_le_bytes());
    data[13] = sectors_per_cluster;
    data[14..16].copy_from_slice(&reserved_sectors.to_le_bytes());
    data[16] = number_of_fats;
    // Root entry count, total sectors 16 and FAT size 16 stay zero on FAT32.
    data[21] = 0xF8; // fixed media
    data[32..36].copy_from_slice(&total_sectors.to_le_bytes());
    data[36..40].copy_from_slice(&sectors_per_fat.to_le_bytes());
    data[44..48].copy_from_slice(&root_cluster.to_le_bytes());
    data[510..512].copy_from_slice(&BOOT_SIGNATURE);
    data
}

/// Write a freshly formatted single-sector-per-cluster volume with the given
/// number of data clusters into a temp file and return it.
pub(crate) fn format_volume(data_clusters: u32) -> NamedTempFile {
    let bytes_per_sector: u16 = 512;
    let reserved_sectors: u16 = 32;
    let number_of_fats: u8 = 2;

    // One FAT entry per data cluster plus the two reserved slots.
    let fat_bytes = (data_clusters + 2) * FAT_ENTRY_SIZE as u32;
    let sectors_per_fat = fat_bytes.div_ceil(bytes_per_sector as u32);

    let boot = build_boot_sector(
        bytes_per_sector,
        1,
        reserved_sectors,
        number_of_fats,
        sectors_per_fat,
        data_clusters,
        2,
    );

    let mut fat = vec![0u8; (sectors_per_fat * bytes_per_sector as u32) as usize];
    fat[0..4].copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes()); // media in FAT[0]
    fat[4..8].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes()); // reserved FAT[1]
    fat[8..12].copy_from_slice(&EOC.to_le_bytes()); // root directory chain

    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(&boot).unwrap();
    tmp.write_all(&vec![
        0u8;
        (reserved_sectors as usize - 1) * bytes_per_sector as usize
    ])
    .unwrap();
    for _ in 0..number_of_fats {
        tmp.write_all(&fat).unwrap();
    }
    tmp.write_all(&vec![0u8; (data_clusters * bytes_per_sector as u32) as usize])
        .unwrap();
    tmp.flush().unwrap();
    tmp
}
