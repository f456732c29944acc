/*
 * fatshell Library
 * ================
 *
 * Core functionality for the FAT32 image shell: the volume engine that
 * reads and mutates the image at the byte level, and the shell layer that
 * owns the session state and dispatches commands.
 *
 * Components:
 * ----------
 * - fs: image I/O, boot-sector geometry, FAT accessor, cluster-chain
 *   walker, directory engine, file read/write
 * - shell: open-file table, session (CWD state machine), command dispatch
 */

pub mod fs;
pub mod shell;

// Re-export commonly used types
pub use fs::{BootSector, DirEntry, FsError, Volume};
pub use shell::{Command, Session};
