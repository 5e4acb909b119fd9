//! Indentation-aware text writer for generated source.

use std::cell::Cell;
use std::fmt::{self, Write};
use std::rc::Rc;

/// Writes lines into a `String`, prefixing each with the current indent.
///
/// Indentation is held by [`Indent`] guards, which share the level through
/// an `Rc<Cell<_>>` so a guard can live while the writer is borrowed
/// mutably.
pub struct CodeWriter {
    out: String,
    level: Rc<Cell<usize>>,
    unit: &'static str,
    at_line_start: bool,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            level: Rc::new(Cell::new(0)),
            unit: "    ",
            at_line_start: true,
        }
    }

    /// Appends `text` without ending the line.
    pub fn write(&mut self, text: &str) -> fmt::Result {
        if text.is_empty() {
            return Ok(());
        }
        if self.at_line_start {
            for _ in 0..self.level.get() {
                self.out.write_str(self.unit)?;
            }
            self.at_line_start = false;
        }
        self.out.write_str(text)
    }

    pub fn line(&mut self, text: &str) -> fmt::Result {
        self.write(text)?;
        self.out.write_char('\n')?;
        self.at_line_start = true;
        Ok(())
    }

    pub fn blank(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        self.at_line_start = true;
        Ok(())
    }

    /// Increases the indent until the guard is dropped.
    pub fn indent(&mut self) -> Indent {
        self.level.set(self.level.get() + 1);
        Indent {
            level: Rc::clone(&self.level),
        }
    }

    /// Writes `header {`, the indented body, then `}` + `close`.
    pub fn block_with<F>(&mut self, header: &str, close: &str, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        if header.is_empty() {
            self.line("{")?;
        } else {
            self.line(&format!("{} {{", header))?;
        }
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.line(&format!("}}{}", close))
    }

    pub fn block<F>(&mut self, header: &str, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.block_with(header, "", body)
    }

    pub fn doc(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            if line.is_empty() {
                self.line("///")?;
            } else {
                self.line(&format!("/// {}", line))?;
            }
        }
        Ok(())
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.write(&args.to_string())
    }

    pub fn line_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.line(&args.to_string())
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`CodeWriter::indent`].
pub struct Indent {
    level: Rc<Cell<usize>>,
}

impl Drop for Indent {
    fn drop(&mut self) {
        self.level.set(self.level.get().saturating_sub(1));
    }
}

/// `format!`-style [`CodeWriter::line`].
#[macro_export]
macro_rules! cw_line {
    ($w:expr, $($arg:tt)*) => {
        $w.line_fmt(format_args!($($arg)*))
    };
}
