use std::io::{self, BufRead, Write as _};

use crate::fs::FsError;

use super::session::Session;

/// A validated command tuple, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Info,
    Ls,
    Cd(String),
    Mkdir(String),
    Creat(String),
    Open(String, String),
    Close(String),
    Lsof,
    Lseek(String, u32),
    Read(String, u32),
    Write(String, String),
    Rename(String, String),
    Rm(String),
    Rmdir(String),
    Exit,
}

impl Command {
    /// Parse one input line. `Ok(None)` is a blank line; `Err` carries the
    /// message to print (usage for wrong arity, unknown-command otherwise).
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&name) = tokens.first() else {
            return Ok(None);
        };
        let args = &tokens[1..];

        let command = match name {
            "info" => Self::no_args(args, "info", Command::Info)?,
            "ls" => Self::no_args(args, "ls", Command::Ls)?,
            "lsof" => Self::no_args(args, "lsof", Command::Lsof)?,
            "exit" => Self::no_args(args, "exit", Command::Exit)?,
            "cd" => Command::Cd(Self::one_arg(args, "cd [DIRNAME]")?),
            "mkdir" => Command::Mkdir(Self::one_arg(args, "mkdir [DIRNAME]")?),
            "creat" => Command::Creat(Self::one_arg(args, "creat [FILENAME]")?),
            "close" => Command::Close(Self::one_arg(args, "close [FILENAME]")?),
            "rm" => Command::Rm(Self::one_arg(args, "rm [FILENAME]")?),
            "rmdir" => Command::Rmdir(Self::one_arg(args, "rmdir [DIRNAME]")?),
            "open" => {
                let (file, flag) = Self::two_args(args, "open [FILENAME] [FLAGS]")?;
                Command::Open(file, flag)
            }
            "rename" => {
                let (old, new) = Self::two_args(args, "rename [OLDNAME] [NEWNAME]")?;
                Command::Rename(old, new)
            }
            "lseek" => {
                let (file, offset) = Self::two_args(args, "lseek [FILENAME] [OFFSET]")?;
                Command::Lseek(file, Self::decimal(&offset, "lseek [FILENAME] [OFFSET]")?)
            }
            "read" => {
                let (file, size) = Self::two_args(args, "read [FILENAME] [SIZE]")?;
                Command::Read(file, Self::decimal(&size, "read [FILENAME] [SIZE]")?)
            }
            "write" => {
                // Everything after the filename is the payload, so quoted
                // strings with spaces survive tokenization.
                if args.len() < 2 {
                    return Err(usage("write [FILENAME] [STRING]"));
                }
                let data = args[1..].join(" ");
                let data = data
                    .strip_prefix('"')
                    .and_then(|d| d.strip_suffix('"'))
                    .unwrap_or(&data);
                Command::Write(args[0].to_string(), data.to_string())
            }
            _ => return Err(format!("Unknown command: '{}'", name)),
        };
        Ok(Some(command))
    }

    fn no_args(args: &[&str], usage_text: &str, command: Command) -> Result<Command, String> {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(usage(usage_text))
        }
    }

    fn one_arg(args: &[&str], usage_text: &str) -> Result<String, String> {
        match args {
            [arg] => Ok(arg.to_string()),
            _ => Err(usage(usage_text)),
        }
    }

    fn two_args(args: &[&str], usage_text: &str) -> Result<(String, String), String> {
        match args {
            [a, b] => Ok((a.to_string(), b.to_string())),
            _ => Err(usage(usage_text)),
        }
    }

    fn decimal(token: &str, usage_text: &str) -> Result<u32, String> {
        token.parse::<u32>().map_err(|_| usage(usage_text))
    }
}

fn usage(text: &str) -> String {
    format!("Usage: {}", text)
}

/// Run one command against the session, printing its results. Returns
/// false when the session should end.
pub fn execute(session: &mut Session, command: Command) -> bool {
    let result = match command {
        Command::Info => {
            let info = session.volume_info();
            println!("Root cluster position (in cluster #): {}", info.root_cluster);
            println!("Bytes per sector: {}", info.bytes_per_sector);
            println!("Sectors per cluster: {}", info.sectors_per_cluster);
            println!("Total clusters in data region: {}", info.data_clusters);
            println!("Number of entries in one FAT: {}", info.fat_entries);
            println!("Size of image (in bytes): {}", info.image_size);
            Ok(())
        }
        Command::Ls => session.list().map(|names| {
            for name in names {
                println!("{}", name);
            }
        }),
        Command::Cd(name) => session.change_dir(&name),
        Command::Mkdir(name) => session.make_dir(&name),
        Command::Creat(name) => session.create_file(&name),
        Command::Open(name, flag) => session.open_file(&name, &flag).map(|_| {
            println!("File '{}' opened in mode '{}'.", name, flag);
        }),
        Command::Close(name) => session.close_file(&name).map(|_| {
            println!("File '{}' closed successfully.", name);
        }),
        Command::Lsof => {
            if !session.has_open_files() {
                println!("No files are currently opened.");
            } else {
                println!(
                    "{:<5} {:<12} {:<5} {:<10} {:<50}",
                    "Index", "Filename", "Mode", "Offset", "Path"
                );
                for (index, handle) in session.open_handles().enumerate() {
                    println!(
                        "{:<5} {:<12} {:<5} {:<10} {:<50}",
                        index,
                        handle.name,
                        handle.mode.as_str(),
                        handle.offset,
                        handle.path
                    );
                }
            }
            Ok(())
        }
        Command::Lseek(name, offset) => session.seek(&name, offset).map(|_| {
            println!("Offset of file '{}' set to {} bytes.", name, offset);
        }),
        Command::Read(name, size) => session.read(&name, size).map(|data| {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let _ = out.write_all(&data);
            let _ = out.write_all(b"\n");
        }),
        Command::Write(name, data) => match session.write(&name, data.as_bytes()) {
            Ok(outcome) => {
                println!("Wrote {} bytes to '{}'.", outcome.written, name);
                if let Some(err) = outcome.error {
                    Err(err)
                } else {
                    Ok(())
                }
            }
            Err(err) => Err(err),
        },
        Command::Rename(old, new) => session.rename(&old, &new),
        Command::Rm(name) => session.remove_file(&name),
        Command::Rmdir(name) => session.remove_dir(&name),
        Command::Exit => {
            if let Err(err) = session.shutdown() {
                println!("Error: {}", err);
            }
            return false;
        }
    };

    if let Err(err) = result {
        match err {
            // Informational, not an error line.
            FsError::AlreadyAtRoot => println!("Already at root directory."),
            _ => println!("Error: {}", err),
        }
    }
    true
}

/// The line-oriented REPL: prompt, read, parse, dispatch, until `exit` or
/// end of input.
pub fn repl(session: &mut Session) -> io::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}", session.prompt());
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF: flush and leave like `exit`
            let _ = session.shutdown();
            return Ok(());
        }

        match Command::parse(&line) {
            Ok(Some(command)) => {
                if !execute(session, command) {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(message) => println!("Error: {}", message),
        }
    }
}
