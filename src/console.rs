//! Console input: one command per line from stdin
//!
//! ```text
//! click <lat> <lng>      place the pending selection
//! locate                 use the device position
//! submit [description]   report the pending selection
//! status                 show selection and latest sighting
//! help
//! quit
//! ```

use crate::geo::{Coordinate, CoordinateError};
use std::fmt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

pub const HELP: &str = "Commands: click <lat> <lng> | locate | submit [description] | status | help | quit";

/// A user action against the view
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click(Coordinate),
    Locate,
    Submit(Option<String>),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Unknown(String),
    Usage(&'static str),
    Coordinate(CoordinateError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(word) => write!(f, "Unknown command '{}'. {}", word, HELP),
            Self::Usage(usage) => write!(f, "Usage: {}", usage),
            Self::Coordinate(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl Command {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "" => return Ok(None),
            "click" | "c" => {
                const USAGE: &str = "click <lat> <lng>";
                let mut parts = rest.split(|c: char| c.is_whitespace() || c == ',');
                let mut next = || {
                    parts
                        .by_ref()
                        .find(|p| !p.is_empty())
                        .and_then(|p| p.parse::<f64>().ok())
                };
                let (Some(lat), Some(lng)) = (next(), next()) else {
                    return Err(CommandError::Usage(USAGE));
                };
                let position = Coordinate::new(lat, lng).map_err(CommandError::Coordinate)?;
                Self::Click(position)
            }
            "locate" | "l" => Self::Locate,
            "submit" | "s" => Self::Submit((!rest.is_empty()).then(|| rest.to_string())),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Forward parsed stdin lines to the view until EOF or the view goes away
///
/// Parse errors are printed and skipped. EOF closes the channel, which the
/// view treats like `quit`.
pub async fn read_stdin(tx: mpsc::Sender<Command>) {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        match Command::parse(&line) {
            Ok(Some(command)) => {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }
}
