use std::io::{self, IsTerminal, Stderr, Stdout, Write};

use ansi_term::{Colour, Style};

use crate::ledger::present::{Chunk, Semantic};

/// Destination of everything a command prints.
pub trait Presenter {
    fn line(&mut self, chunks: &[Chunk]) -> io::Result<()>;

    /// Text that must be printed untouched, like json.
    fn raw(&mut self, text: &str) -> io::Result<()>;

    fn error(&mut self, message: &str) -> io::Result<()>;
}

/// Prints to a terminal, coloring chunks by their meaning.
pub struct ConsolePresenter<W, E> {
    out: W,
    err: E,
    colored: bool,
}

impl ConsolePresenter<Stdout, Stderr> {
    /// Colors are only used when stdout is a terminal.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), io::stderr(), io::stdout().is_terminal())
    }
}

impl<W: Write, E: Write> ConsolePresenter<W, E> {
    pub fn new(out: W, err: E, colored: bool) -> Self {
        Self { out, err, colored }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

fn style(semantic: Semantic) -> Style {
    match semantic {
        Semantic::Plain | Semantic::Title => Style::new(),
        Semantic::Time => Colour::Green.normal(),
        Semantic::Duration => Colour::Purple.normal(),
        Semantic::Stop => Colour::Red.normal(),
        Semantic::Path => Colour::Cyan.normal(),
        Semantic::Tag => Colour::Blue.normal(),
        Semantic::Id => Colour::Yellow.normal(),
    }
}

impl<W: Write, E: Write> Presenter for ConsolePresenter<W, E> {
    fn line(&mut self, chunks: &[Chunk]) -> io::Result<()> {
        for chunk in chunks {
            if self.colored {
                write!(self.out, "{}", style(chunk.semantic).paint(chunk.text.as_str()))?;
            } else {
                self.out.write_all(chunk.text.as_bytes())?;
            }
        }
        writeln!(self.out)
    }

    fn raw(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    fn error(&mut self, message: &str) -> io::Result<()> {
        if self.colored {
            writeln!(self.err, "{}", Colour::Red.paint(message))
        } else {
            writeln!(self.err, "{message}")
        }
    }
}
