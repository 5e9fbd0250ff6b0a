//! Entry point for the **widgrid** command.
//!
//! Loads the widget array from a JSON file, then applies newline-delimited
//! JSON [`EditCommand`]s read from stdin (or from a Unix socket with
//! `--socket <path>`).  After every applied change the full widget array is
//! printed to stdout as one JSON line.
//!
//! ```text
//! widgrid [--config <path>] [--socket <path>] [widgets.json]
//! ```

use widgrid::command::EditCommand;
use widgrid::config::Config;
use widgrid::editor::GridEditor;
use widgrid::ipc::listener::{LineCommandSource, UnixSocketListener};
use widgrid::store::JsonFileStore;
use widgrid::traits::{CommandSource, EditorEvent, PolicyRegistry, WidgetStore};
use log::{error, info};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

/// Command-line options.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    socket: Option<PathBuf>,
    widgets: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--socket" => args.socket = it.next().map(PathBuf::from),
            _ => args.widgets = Some(PathBuf::from(arg)),
        }
    }
    args
}

/// Resolve an XDG base directory, falling back to `$HOME/<fallback>`.
fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    let base = std::env::var(var).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/{}", home, fallback)
    });
    PathBuf::from(base).join("widgrid")
}

/// Load the config from `path` or `$XDG_CONFIG_HOME/widgrid/config.json`,
/// falling back to compiled-in defaults.
fn load_config(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(|| xdg_dir("XDG_CONFIG_HOME", ".config").join("config.json"));
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let args = parse_args();
    let config = load_config(args.config);
    let widgets_path = args
        .widgets
        .unwrap_or_else(|| xdg_dir("XDG_DATA_HOME", ".local/share").join("widgets.json"));

    let store = JsonFileStore::new(&widgets_path);
    let mut editor = match GridEditor::open(store, config.policies, config.grid, config.history) {
        Ok(editor) => editor,
        Err(e) => {
            error!("failed to open {}: {}", widgets_path.display(), e);
            std::process::exit(1);
        }
    };

    let (event_tx, event_rx) = mpsc::channel();
    editor.set_events(event_tx);
    let printer = spawn_event_printer(event_rx);

    let (cmd_tx, cmd_rx) = mpsc::channel::<EditCommand>();
    spawn_command_source(cmd_tx, args.socket);

    // Dropping the editor closes the event channel, which ends the printer.
    run(editor, cmd_rx);
    if printer.join().is_err() {
        error!("event printer panicked");
    }
}

/// Apply commands until every source has closed.
///
/// Commands that arrive together are handled as one batch; the editor ticks
/// once the batch is drained.
fn run<S: WidgetStore, P: PolicyRegistry>(
    mut editor: GridEditor<S, P>,
    cmd_rx: mpsc::Receiver<EditCommand>,
) {
    info!("widgrid running");
    while let Ok(cmd) = cmd_rx.recv() {
        apply(&mut editor, cmd);
        for cmd in cmd_rx.try_iter() {
            apply(&mut editor, cmd);
        }
        editor.tick();
    }
    info!("command source closed, exiting");
}

fn apply<S: WidgetStore, P: PolicyRegistry>(editor: &mut GridEditor<S, P>, cmd: EditCommand) {
    if let Err(e) = editor.handle(cmd) {
        error!("command error: {}", e);
    }
}

//  Helpers

fn spawn_command_source(tx: mpsc::Sender<EditCommand>, socket: Option<PathBuf>) {
    std::thread::spawn(move || match socket {
        Some(path) => {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        }
        None => {
            let mut source = LineCommandSource::new(BufReader::new(std::io::stdin()));
            if let Err(e) = source.run(tx) {
                error!("stdin reader error: {}", e);
            }
        }
    });
}

/// Print every layout change to stdout as one JSON line.
fn spawn_event_printer(rx: mpsc::Receiver<EditorEvent>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for event in rx {
            match event {
                EditorEvent::LayoutChanged { widgets, .. } => {
                    match serde_json::to_string(&widgets) {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!("failed to encode widgets: {}", e),
                    }
                }
                other => log::debug!("{:?}", other),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use widgrid::widget::Surface;

    #[test]
    fn printer_finishes_once_the_editor_side_hangs_up() {
        let (tx, rx) = mpsc::channel();
        let printer = spawn_event_printer(rx);
        tx.send(EditorEvent::LayoutChanged {
            surface: Surface::Desktop,
            widgets: Vec::new(),
        })
        .unwrap();
        drop(tx);
        assert!(printer.join().is_ok());
    }
}
