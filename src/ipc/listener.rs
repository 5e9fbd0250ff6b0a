//! Newline-delimited JSON [`CommandSource`] implementations.
//!
//! Each line received is parsed as a JSON-encoded [`EditCommand`].  Blank
//! lines are skipped; malformed lines are logged and skipped so one bad
//! message never stops the stream.
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"AddWidget":{"widget_type":"clock"}}
//! {"MoveWidget":{"surface":"desktop","id":"a","rect":{"x":2,"y":0,"w":3,"h":2}}}
//! {"Undo":"desktop"}
//! {"SetMobileMode":"linked"}
//! ```

use crate::command::EditCommand;
use crate::traits::CommandSource;
use log::{debug, error, info};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Outcome of draining one line stream.
#[derive(Debug, PartialEq, Eq)]
enum Drained {
    /// The reader hit end of input.
    Eof,
    /// The receiving end of the sink is gone.
    SinkClosed,
}

/// Parse every line of `reader` and forward the commands into `sink`.
fn forward_lines<R: BufRead>(
    reader: R,
    sink: &mpsc::Sender<EditCommand>,
) -> Result<Drained, std::io::Error> {
    for line in reader.lines() {
        let text = line?;
        if text.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EditCommand>(&text) {
            Ok(cmd) => {
                debug!("received {:?}", cmd);
                if sink.send(cmd).is_err() {
                    return Ok(Drained::SinkClosed);
                }
            }
            Err(e) => {
                error!("bad command: {}: {}", text, e);
            }
        }
    }
    Ok(Drained::Eof)
}

//  Line reader

/// A [`CommandSource`] reading commands from any buffered reader, typically
/// stdin.
pub struct LineCommandSource<R> {
    reader: Option<R>,
}

/// Errors produced by [`LineCommandSource`].
#[derive(Debug, thiserror::Error)]
pub enum LineSourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl<R: BufRead + Send> LineCommandSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: BufRead + Send> CommandSource for LineCommandSource<R> {
    type Error = LineSourceError;

    /// Read until end of input.  A second call returns immediately.
    fn run(&mut self, sink: mpsc::Sender<EditCommand>) -> Result<(), Self::Error> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        match forward_lines(reader, &sink)? {
            Drained::Eof => info!("end of command input"),
            Drained::SinkClosed => info!("sink closed, shutting down"),
        }
        Ok(())
    }
}

//  Unix socket

/// A [`CommandSource`] that listens on a Unix stream socket.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// commands.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** until the sink is closed.  Run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<EditCommand>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    match forward_lines(BufReader::new(stream), &sink) {
                        Ok(Drained::SinkClosed) => {
                            info!("sink closed, shutting down");
                            break;
                        }
                        Ok(Drained::Eof) => debug!("client disconnected"),
                        Err(e) => error!("read error: {}", e),
                    }
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }
}

//  Tests
