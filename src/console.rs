// src/console.rs
use std::fmt;
use std::io::{self, Stdout, Write};

/// Verbosity-gated output on standard output.
///
/// Level 0 prints only failure diagnostics and a progress dot per status
/// poll (suppressed by `quiet`); higher levels add detail.
pub struct Console<W: Write = Stdout> {
    out: W,
    verbosity: u8,
    quiet: bool,
}

impl Console<Stdout> {
    pub fn stdout(verbosity: u8, quiet: bool) -> Self {
        Self::new(io::stdout(), verbosity, quiet)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, verbosity: u8, quiet: bool) -> Self {
        Self {
            out,
            verbosity,
            quiet,
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn enabled(&self, level: u8) -> bool {
        self.verbosity >= level
    }

    /// Prints a line when verbosity is at least `level`.
    pub fn say(&mut self, level: u8, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            self.write_line(args);
        }
    }

    /// Prints a diagnostic line regardless of verbosity.
    pub fn always(&mut self, args: fmt::Arguments<'_>) {
        self.write_line(args);
    }

    /// One dot per poll when nothing else is printed.
    pub fn progress(&mut self) {
        if self.verbosity == 0 && !self.quiet {
            let _ = write!(self.out, ".");
            let _ = self.out.flush();
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, args: fmt::Arguments<'_>) {
        // A closed stdout must not change the exit code.
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }
}
