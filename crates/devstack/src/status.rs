//! Operator-facing status lines.
//!
//! Formatting is stateless: [`write_status`] renders one line into whatever
//! sink it is handed, and [`StatusOutput`] merely pairs a sink with the
//! colour decision made by the caller.

use std::fmt;
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";
const BRIGHT: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

/// Width of the separator printed before the log stream.
const RULE_WIDTH: usize = 60;

/// Visual category of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Emphasised heading.
    Banner,
    /// Section heading.
    Heading,
    /// Progress while something is pending.
    Progress,
    /// Neutral detail.
    Detail,
    /// A step completed.
    Success,
    /// Green text without a symbol.
    Highlight,
    /// Something went wrong but the sequence continues.
    Warning,
    /// Fatal failure.
    Error,
}

impl Tone {
    const fn colour(self) -> &'static str {
        match self {
            Self::Banner => BRIGHT,
            Self::Heading => CYAN,
            Self::Progress | Self::Warning => YELLOW,
            Self::Detail => BLUE,
            Self::Success | Self::Highlight => GREEN,
            Self::Error => RED,
        }
    }

    const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Success => Some("✓"),
            Self::Warning => Some("⚠"),
            Self::Error => Some("✗"),
            Self::Banner | Self::Heading | Self::Progress | Self::Detail | Self::Highlight => {
                None
            }
        }
    }
}

/// Writes one status line to `sink`.
///
/// Lines with a symbol colour only the symbol; the rest colour the whole
/// message. Colour codes are omitted when `colour` is false.
pub fn write_status<W: Write>(
    sink: &mut W,
    tone: Tone,
    colour: bool,
    message: fmt::Arguments<'_>,
) -> io::Result<()> {
    let (start, end) = if colour {
        (tone.colour(), RESET)
    } else {
        ("", "")
    };
    match tone.symbol() {
        Some(symbol) => writeln!(sink, "{start}{symbol}{end} {message}")?,
        None => writeln!(sink, "{start}{message}{end}")?,
    }
    sink.flush()
}

/// Sink for status lines.
pub struct StatusOutput<W: Write> {
    sink: W,
    colour: bool,
}

impl<W: Write> StatusOutput<W> {
    /// Wraps `sink`; `colour` is usually whether the sink is a terminal.
    pub const fn new(sink: W, colour: bool) -> Self {
        Self { sink, colour }
    }

    /// Writes a line in the given tone.
    pub fn line(&mut self, tone: Tone, message: fmt::Arguments<'_>) -> io::Result<()> {
        write_status(&mut self.sink, tone, self.colour, message)
    }

    /// Writes a numbered step heading preceded by a blank line.
    pub fn step(&mut self, number: usize, message: fmt::Arguments<'_>) -> io::Result<()> {
        if self.colour {
            writeln!(self.sink, "\n{CYAN}{BRIGHT}{number}{RESET} {message}")?;
        } else {
            writeln!(self.sink, "\n{number} {message}")?;
        }
        self.sink.flush()
    }

    /// Writes a separator rule.
    pub fn rule(&mut self) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        self.line(Tone::Detail, format_args!("{rule}"))
    }

    /// Progress line.
    pub fn progress(&mut self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.line(Tone::Progress, message)
    }

    /// Success line.
    pub fn success(&mut self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.line(Tone::Success, message)
    }

    /// Warning line.
    pub fn warning(&mut self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.line(Tone::Warning, message)
    }

    /// Error line.
    pub fn error(&mut self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.line(Tone::Error, message)
    }

    /// Consumes the output and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}
