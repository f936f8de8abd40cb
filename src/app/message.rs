//! Application messages

use std::path::PathBuf;

/// Commands understood by the console front-end
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Add files directly, bypassing the scanner
    AddFiles(Vec<PathBuf>),
    /// Scan a directory; `None` opens the directory picker
    Scan(Option<PathBuf>),
    List,
    /// Play the entry at a 0-based index
    Play(usize),
    Toggle,
    Next,
    Prev,
    /// Seek to a fraction (0..=1) of the active item
    Seek(f64),
    /// Remove the entry at a 0-based index
    Remove(usize),
    Clear,
    /// Pause and hide the player view
    Close,
    Help,
    Quit,
}

/// Whether the event loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Non-blocking notification for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice::Info(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice::Error(text.into())
    }
}

/// Parse a 1-based position as typed by the user
fn parse_position(arg: Option<&str>, command: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("Usage: {} <number>", command))?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Not a playlist position: {}", arg)),
    }
}

impl Message {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Message>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let message = match command.to_lowercase().as_str() {
            "add" => {
                // Quoted paths may contain spaces
                let rest = line.trim_start()[command.len()..].trim();
                if rest.is_empty() {
                    return Err("Usage: add <file>...".to_string());
                }
                let paths = split_paths(rest);
                Message::AddFiles(paths)
            }
            "scan" => {
                let rest = line.trim_start()[command.len()..].trim();
                Message::Scan((!rest.is_empty()).then(|| PathBuf::from(unquote(rest))))
            }
            "list" | "ls" => Message::List,
            "play" | "p" => Message::Play(parse_position(arg, "play")?),
            "toggle" | "t" | "pause" => Message::Toggle,
            "next" | "n" => Message::Next,
            "prev" | "previous" => Message::Prev,
            "seek" => {
                let arg = arg.ok_or("Usage: seek <percent>")?;
                let percent: f64 = arg
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| format!("Not a percentage: {}", arg))?;
                Message::Seek(percent / 100.0)
            }
            "remove" | "rm" => Message::Remove(parse_position(arg, "remove")?),
            "clear" => Message::Clear,
            "close" => Message::Close,
            "help" | "?" => Message::Help,
            "quit" | "exit" | "q" => Message::Quit,
            other => return Err(format!("Unknown command: {} (try 'help')", other)),
        };

        Ok(Some(message))
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Split on whitespace, keeping double-quoted paths together
fn split_paths(s: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in s.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }
    paths
}
