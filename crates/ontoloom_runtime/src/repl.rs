//! The interactive loop and batch runner.
//!
//! Lines starting with `:` are meta-commands handled here; everything else
//! goes to the [`Session`] as a model command.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use ontoloom_foundation::{Error, ErrorKind, Result};
use ontoloom_graph::MemoryGraph;

use crate::command::USAGE;
use crate::editor::{LineEditor, ReadResult, RustylineEditor};
use crate::session::{CommandResponse, Session};

/// Meta-command names, for completion and `:help`.
pub const META_COMMANDS: &[&str] = &[
    ":load", ":unload", ":wipe", ":init", ":status", ":save", ":help", ":quit",
];

const META_USAGE: &[&str] = &[
    ":load <schema>   compile a schema from the blob store and make it active",
    ":unload          drop the active schema and in-memory objects",
    ":wipe            delete every node and edge in the store",
    ":init            create store indexes for the active schema",
    ":status          same as status",
    ":save            write the store snapshot file",
    ":quit            exit",
];

/// What one input line produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Output of a successful line; empty for blank lines and comments.
    Text(String),
    /// Output of a failed line.
    Failure(String),
    /// The user asked to leave.
    Quit,
}

/// The interactive REPL.
pub struct Repl<E: LineEditor = RustylineEditor> {
    editor: E,
    session: Session,
    json: bool,
    show_banner: bool,
    prompt: String,
    snapshot: Option<(Arc<MemoryGraph>, PathBuf)>,
}

impl Repl<RustylineEditor> {
    /// Creates a REPL with the default rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize.
    pub fn new(session: Session) -> Result<Self> {
        Ok(Self::with_editor(RustylineEditor::new()?, session))
    }
}

impl<E: LineEditor> Repl<E> {
    /// Creates a REPL reading from `editor`.
    pub fn with_editor(editor: E, session: Session) -> Self {
        let mut repl = Self {
            editor,
            session,
            json: false,
            show_banner: true,
            prompt: "ontoloom> ".to_string(),
            snapshot: None,
        };
        repl.refresh_completions();
        repl
    }

    /// Prints responses as JSON lines.
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Disables the welcome banner.
    #[must_use]
    pub const fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Enables `:save`, writing `graph` to `path`.
    #[must_use]
    pub fn with_snapshot(mut self, graph: Arc<MemoryGraph>, path: PathBuf) -> Self {
        self.snapshot = Some((graph, path));
        self
    }

    /// Returns a reference to the session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the loop until EOF or `:quit`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the terminal fails.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            self.print_banner();
        }
        loop {
            let line = match self.editor.read_line(&self.prompt)? {
                ReadResult::Line(line) => line,
                ReadResult::Interrupted => continue,
                ReadResult::Eof => break,
            };
            if !line.trim().is_empty() {
                self.editor.add_history(&line);
            }
            match self.handle_line(&line) {
                Reply::Quit => break,
                Reply::Text(text) if text.is_empty() => {}
                Reply::Text(text) => println!("{text}"),
                Reply::Failure(text) => eprintln!("\x1b[31m{text}\x1b[0m"),
            }
        }
        Ok(())
    }

    /// Runs every line of `script` in order and prints each reply.
    ///
    /// A failing line does not stop the run. Returns the number of lines
    /// that failed.
    pub fn run_script(&mut self, script: &str) -> usize {
        let mut failures = 0;
        for line in script.lines() {
            match self.handle_line(line) {
                Reply::Quit => break,
                Reply::Text(text) if text.is_empty() => {}
                Reply::Text(text) => println!("{text}"),
                Reply::Failure(text) => {
                    failures += 1;
                    println!("{text}");
                }
            }
        }
        let _ = io::stdout().flush();
        failures
    }

    /// Handles one input line.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Reply::Text(String::new());
        }
        let response = match trimmed.strip_prefix(':') {
            Some(meta) => match self.meta(trimmed, meta) {
                Some(response) => response,
                None => return Reply::Quit,
            },
            None => self.session.execute(trimmed),
        };
        self.render(&response)
    }

    /// Runs a meta-command; `None` means quit.
    fn meta(&mut self, echo: &str, meta: &str) -> Option<CommandResponse> {
        let mut words = meta.split_whitespace();
        let context = Arc::clone(self.session.context());
        let outcome = match (words.next().unwrap_or_default(), words.next(), words.next()) {
            ("quit" | "q", None, _) => return None,
            ("load", Some(name), None) => context.load_schema(name).map(|model| {
                self.refresh_completions();
                format!(
                    "loaded {name}: {} classes, {} composites ({})",
                    model.class_count(),
                    model.composite_count(),
                    model.fingerprint()
                )
            }),
            ("unload", None, _) => {
                let message = if context.unload() {
                    "schema unloaded"
                } else {
                    "no schema loaded"
                };
                self.refresh_completions();
                Ok(message.to_string())
            }
            ("wipe", None, _) => context.wipe().map(|()| "store wiped".to_string()),
            ("init", None, _) => context
                .initialize_schema()
                .map(|()| "store initialized".to_string()),
            ("status", None, _) => return Some(self.session.execute("status")),
            ("save", None, _) => match &self.snapshot {
                Some((graph, path)) => graph
                    .save_to_file(path)
                    .map(|()| format!("saved {}", path.display())),
                None => Err(Error::new(ErrorKind::ConfigError("no store file configured".into()))),
            },
            ("help", None, _) => Ok(META_USAGE.join("\n")),
            (word, ..) => match META_USAGE
                .iter()
                .find(|u| u.split(' ').next().and_then(|name| name.strip_prefix(':')) == Some(word))
            {
                Some(usage) => Err(Error::syntax(format!("usage: {usage}"))),
                None => Err(Error::syntax(format!("unknown meta-command :{word}, try :help"))),
            },
        };
        Some(match outcome {
            Ok(message) => CommandResponse::done(echo, message),
            Err(err) => CommandResponse::failed(echo, &err),
        })
    }

    fn render(&self, response: &CommandResponse) -> Reply {
        let text = if self.json {
            match response.to_json() {
                Ok(json) => json,
                Err(err) => return Reply::Failure(err.to_string()),
            }
        } else {
            response.to_string()
        };
        if response.is_success() {
            Reply::Text(text)
        } else {
            Reply::Failure(text)
        }
    }

    fn refresh_completions(&mut self) {
        let names = self
            .session
            .context()
            .model()
            .map(|model| model.classes().map(|descriptor| descriptor.name.clone()).collect())
            .unwrap_or_default();
        self.editor.set_class_names(names);
    }

    fn print_banner(&self) {
        println!("\x1b[1;36mOntoloom\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
        match self.session.context().status().schema {
            Some(schema) => println!("schema {} loaded, {} classes", schema.name, schema.classes),
            None => println!("no schema loaded; use :load <schema>"),
        }
        println!("Type help for commands, :help for meta-commands, Ctrl+D to exit.\n");
        let _ = io::stdout().flush();
    }
}

/// Usage text for every command and meta-command.
#[must_use]
pub fn usage() -> String {
    USAGE.iter().chain(META_USAGE).copied().collect::<Vec<_>>().join("\n")
}
