use crate::fs::FsError;

/// Fixed capacity of the open-file table.
pub const MAX_OPEN_FILES: usize = 10;

/// Access mode of an open handle, parsed from the `-r`/`-w`/`-rw`/`-wr`
/// flag. The leading dash is stripped on store; `rw` and `wr` are kept
/// apart so `lsof` shows what the user typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
    WriteRead,
}

impl OpenMode {
    pub fn parse(flag: &str) -> Result<Self, FsError> {
        match flag {
            "-r" => Ok(OpenMode::Read),
            "-w" => Ok(OpenMode::Write),
            "-rw" => Ok(OpenMode::ReadWrite),
            "-wr" => Ok(OpenMode::WriteRead),
            _ => Err(FsError::InvalidMode(flag.to_string())),
        }
    }

    pub fn readable(self) -> bool {
        !matches!(self, OpenMode::Write)
    }

    pub fn writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::ReadWrite => "rw",
            OpenMode::WriteRead => "wr",
        }
    }
}

/// One active handle. The path records where the image came from and is
/// informational only; reads and writes resolve the name fresh.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub name: String,
    pub mode: OpenMode,
    pub offset: u32,
    pub path: String,
}

/// The session's table of open handles: capacity 10, unique names,
/// insertion order preserved across closes.
pub struct OpenFileTable {
    files: Vec<OpenFile>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        OpenFileTable { files: Vec::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= MAX_OPEN_FILES
    }

    pub fn insert(&mut self, name: &str, mode: OpenMode, path: String) -> Result<(), FsError> {
        if self.contains(name) {
            return Err(FsError::AlreadyOpen(name.to_string()));
        }
        if self.is_full() {
            return Err(FsError::TooManyOpen);
        }
        self.files.push(OpenFile {
            name: name.to_string(),
            mode,
            offset: 0,
            path,
        });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), FsError> {
        let index = self
            .files
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        self.files.remove(index);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OpenFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut OpenFile> {
        self.files.iter_mut().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenFile> {
        self.files.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(OpenMode::parse("-r").unwrap(), OpenMode::Read);
        assert_eq!(OpenMode::parse("-w").unwrap(), OpenMode::Write);
        assert_eq!(OpenMode::parse("-rw").unwrap(), OpenMode::ReadWrite);
        assert_eq!(OpenMode::parse("-wr").unwrap(), OpenMode::WriteRead);

        assert!(OpenMode::parse("r").is_err());
        assert!(OpenMode::parse("-x").is_err());
        assert!(OpenMode::parse("-rwx").is_err());
        assert!(OpenMode::parse("").is_err());
    }

    #[test]
    fn test_mode_capabilities() {
        assert!(OpenMode::Read.readable());
        assert!(!OpenMode::Read.writable());
        assert!(!OpenMode::Write.readable());
        assert!(OpenMode::Write.writable());
        for mode in [OpenMode::ReadWrite, OpenMode::WriteRead] {
            assert!(mode.readable());
            assert!(mode.writable());
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut table = OpenFileTable::new();
        table.insert("A", OpenMode::Read, "/img".into()).unwrap();
        assert!(matches!(
            table.insert("A", OpenMode::Write, "/img".into()),
            Err(FsError::AlreadyOpen(_))
        ));
    }

    #[test]
    fn test_capacity_limit() {
        let mut table = OpenFileTable::new();
        for i in 0..MAX_OPEN_FILES {
            table
                .insert(&format!("F{}", i), OpenMode::Read, "/img".into())
                .unwrap();
        }
        assert!(matches!(
            table.insert("ONEMORE", OpenMode::Read, "/img".into()),
            Err(FsError::TooManyOpen)
        ));

        // Closing one frees a slot
        table.remove("F3").unwrap();
        table.insert("ONEMORE", OpenMode::Read, "/img".into()).unwrap();
    }

    #[test]
    fn test_close_preserves_order() {
        let mut table = OpenFileTable::new();
        for name in ["A", "B", "C"] {
            table.insert(name, OpenMode::Read, "/img".into()).unwrap();
        }
        table.remove("B").unwrap();

        let names: Vec<&str> = table.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_remove_unknown_name() {
        let mut table = OpenFileTable::new();
        assert!(matches!(table.remove("X"), Err(FsError::NotOpen(_))));
    }

    #[test]
    fn test_new_handle_starts_at_zero() {
        let mut table = OpenFileTable::new();
        table.insert("A", OpenMode::ReadWrite, "/img".into()).unwrap();
        assert_eq!(table.get("A").unwrap().offset, 0);

        table.get_mut("A").unwrap().offset = 42;
        assert_eq!(table.get("A").unwrap().offset, 42);
    }
}
