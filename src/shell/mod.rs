pub mod command;
pub mod open_files;
pub mod session;

pub use command::Command;
pub use open_files::{OpenFile, OpenFileTable, OpenMode, MAX_OPEN_FILES};
pub use session::Session;
