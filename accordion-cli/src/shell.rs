use std::{
    fmt,
    io::Write,
    sync::{Mutex, OnceLock},
};

use anstyle::*;

const CLEAR_LINE: &str = "\x1b[2K";

const ERROR: Style = AnsiColor::Red.on_default().bold();
const WARN: Style = AnsiColor::Yellow.on_default().bold();
const STATUS: Style = AnsiColor::Green.on_default().bold();
const PROGRESS: Style = AnsiColor::Cyan.on_default().bold();

static SHELL: OnceLock<Shell> = OnceLock::new();

pub fn shell() -> &'static Shell {
    SHELL.get_or_init(Shell::new)
}

/// Status output on stderr, in the style of cargo.
pub struct Shell {
    // stderr, plus whether the last line is a progress line that must be cleared
    stderr: Mutex<(anstream::Stderr, bool)>,
}

impl Shell {
    fn new() -> Self {
        Self {
            stderr: Mutex::new((anstream::stderr(), false)),
        }
    }

    fn print(&self, line: String, replaceable: bool) {
        let mut buf = vec![];
        let mut guard = self.stderr.lock().unwrap_or_else(|err| err.into_inner());
        let (stderr, needs_clear) = &mut *guard;

        if *needs_clear {
            *needs_clear = false;
            let _ = write!(&mut buf, "{CLEAR_LINE}");
        }
        if replaceable {
            *needs_clear = true;
            let _ = write!(&mut buf, "{line}\r");
        } else {
            let _ = writeln!(&mut buf, "{line}");
        }
        let _ = stderr.write_all(&buf);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.print(labeled(ERROR, "error", None::<&str>, message), false);
    }

    /// Reports a failure inside a named task without stopping anything.
    pub fn notify(&self, title: impl fmt::Display, message: impl fmt::Display) {
        self.print(labeled(ERROR, "error", Some(title), message), false);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.print(labeled(WARN, "warning", None::<&str>, message), false);
    }

    pub fn status(&self, status: impl fmt::Display, message: impl fmt::Display) {
        self.print(justified(STATUS, status, message), false);
    }

    pub fn progress(&self, status: impl fmt::Display, message: impl fmt::Display) {
        self.print(justified(PROGRESS, status, message), true);
    }
}

fn justified(style: Style, status: impl fmt::Display, message: impl fmt::Display) -> String {
    format!("{style}{status:>12}{style:#} {message}")
}

fn labeled(
    style: Style,
    label: &str,
    title: Option<impl fmt::Display>,
    message: impl fmt::Display,
) -> String {
    let bold = Style::new().bold();
    match title {
        Some(title) => format!("{style}{label}[{title}]{style:#}{bold}:{bold:#} {message}"),
        None => format!("{style}{label}{style:#}{bold}:{bold:#} {message}"),
    }
}
