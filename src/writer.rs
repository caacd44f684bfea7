//! The output contract the interpreter writes through.
//!
//! [`AutoIndentWriter`] tracks an indentation stack and an anchor stack and
//! can soft-wrap long lines; [`NoIndentWriter`] passes text through verbatim
//! and backs string conversion of nested templates. Both count the characters
//! they actually emit. [`IoWriter`] adapts any [`std::io::Write`] sink to the
//! [`std::fmt::Write`] interface the writers build on, retaining the
//! underlying I/O error for the caller.

use std::fmt;
use std::io;

#[cfg(windows)]
pub(crate) const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
pub(crate) const NEWLINE: &str = "\n";

/// The result of a write; the count is the number of characters emitted.
pub type WriteResult = Result<usize, fmt::Error>;

/// Character sink with indentation, anchoring and wrapping.
///
/// Every `push_indentation` pairs with a `pop_indentation`, and every
/// `push_anchor_point` pairs with a `pop_anchor_point` around one write.
pub trait TemplateWriter {
    /// Characters emitted so far; the offset the next character lands at.
    fn index(&self) -> usize;

    fn push_indentation(&mut self, indent: String);
    fn pop_indentation(&mut self) -> Option<String>;

    /// Record the current column as the target for wrapped continuations.
    fn push_anchor_point(&mut self);
    fn pop_anchor_point(&mut self);

    fn write(&mut self, text: &str) -> WriteResult;

    /// Write text, emitting the wrap string first if the line is past the
    /// wrap threshold.
    fn write_wrapped(&mut self, text: &str, wrap: &str) -> WriteResult;

    fn write_separator(&mut self, text: &str) -> WriteResult;

    /// Emit the wrap string if the line is past the wrap threshold.
    fn write_wrap(&mut self, wrap: &str) -> WriteResult;
}

/// The standard writer: applies the indentation stack at each line start,
/// pads out to the innermost anchor, and breaks lines at a configurable
/// width when an expression supplies a wrap string.
pub struct AutoIndentWriter<W> {
    out: W,
    /// One slot per INDENT in effect; the initial slot carries no text.
    indents: Vec<Option<String>>,
    anchors: Vec<usize>,
    char_position: usize,
    char_index: usize,
    line_width: Option<usize>,
    at_start_of_line: bool,
    newline: &'static str,
}

impl<W: fmt::Write> AutoIndentWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            indents: vec![None],
            anchors: Vec::new(),
            char_position: 0,
            char_index: 0,
            line_width: None,
            at_start_of_line: true,
            newline: NEWLINE,
        }
    }

    /// Enable soft wrapping once a line reaches `width` characters.
    pub fn set_line_width(&mut self, width: usize) {
        self.line_width = Some(width);
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&mut self) -> WriteResult {
        let mut n = 0;
        for indent in self.indents.iter().flatten() {
            n += indent.chars().count();
            self.out.write_str(indent)?;
        }
        // Pad out to the innermost anchor when it sits past the indentation.
        if let Some(&anchor) = self.anchors.last() {
            if anchor > n {
                for _ in n..anchor {
                    self.out.write_char(' ')?;
                }
                n = anchor;
            }
        }
        self.char_position += n;
        self.char_index += n;
        Ok(n)
    }
}

impl<W: fmt::Write> TemplateWriter for AutoIndentWriter<W> {
    fn index(&self) -> usize {
        self.char_index
    }

    fn push_indentation(&mut self, indent: String) {
        self.indents.push(Some(indent));
    }

    fn pop_indentation(&mut self) -> Option<String> {
        self.indents.pop().flatten()
    }

    fn push_anchor_point(&mut self) {
        self.anchors.push(self.char_position);
    }

    fn pop_anchor_point(&mut self) {
        self.anchors.pop();
    }

    fn write(&mut self, text: &str) -> WriteResult {
        let mut n = 0;
        for c in text.chars() {
            // \r is swallowed; \n becomes the platform newline.
            if c == '\r' {
                continue;
            }
            if c == '\n' {
                self.at_start_of_line = true;
                self.char_position = 0;
                self.out.write_str(self.newline)?;
                let nl = self.newline.chars().count();
                n += nl;
                self.char_index += nl;
                continue;
            }
            if self.at_start_of_line {
                n += self.indent()?;
                self.at_start_of_line = false;
            }
            n += 1;
            self.out.write_char(c)?;
            self.char_position += 1;
            self.char_index += 1;
        }
        Ok(n)
    }

    fn write_wrapped(&mut self, text: &str, wrap: &str) -> WriteResult {
        let mut n = self.write_wrap(wrap)?;
        n += self.write(text)?;
        Ok(n)
    }

    fn write_separator(&mut self, text: &str) -> WriteResult {
        self.write(text)
    }

    fn write_wrap(&mut self, wrap: &str) -> WriteResult {
        let Some(width) = self.line_width else {
            return Ok(0);
        };
        if self.at_start_of_line || self.char_position < width {
            return Ok(0);
        }
        // Emit the wrap text; each \n in it breaks the line and re-indents,
        // so "a\nb" writes the tail of the old line and the head of the new.
        let mut n = 0;
        for c in wrap.chars() {
            if c == '\n' {
                n += 1;
                self.out.write_str(self.newline)?;
                self.char_position = 0;
                self.char_index += self.newline.chars().count();
                n += self.indent()?;
            } else {
                n += 1;
                self.out.write_char(c)?;
                self.char_position += 1;
                self.char_index += 1;
            }
        }
        Ok(n)
    }
}

/// Writes text verbatim: no indentation, no wrapping. Used to render nested
/// templates to strings without double-indenting.
pub struct NoIndentWriter<W> {
    out: W,
    char_index: usize,
}

impl<W: fmt::Write> NoIndentWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, char_index: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: fmt::Write> TemplateWriter for NoIndentWriter<W> {
    fn index(&self) -> usize {
        self.char_index
    }

    fn push_indentation(&mut self, _indent: String) {}

    fn pop_indentation(&mut self) -> Option<String> {
        None
    }

    fn push_anchor_point(&mut self) {}

    fn pop_anchor_point(&mut self) {}

    fn write(&mut self, text: &str) -> WriteResult {
        self.out.write_str(text)?;
        let n = text.chars().count();
        self.char_index += n;
        Ok(n)
    }

    fn write_wrapped(&mut self, text: &str, _wrap: &str) -> WriteResult {
        self.write(text)
    }

    fn write_separator(&mut self, text: &str) -> WriteResult {
        self.write(text)
    }

    fn write_wrap(&mut self, _wrap: &str) -> WriteResult {
        Ok(0)
    }
}

/// Adapts an [`io::Write`] sink to [`fmt::Write`], stashing the real
/// [`io::Error`] so it can be recovered after a failed render.
pub struct IoWriter<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<W: io::Write> IoWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }
}

impl<W: io::Write> fmt::Write for IoWriter<W> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        self.writer
            .write_all(c.encode_utf8(&mut [0; 4]).as_bytes())
            .map_err(|e| {
                self.err = Some(e);
                fmt::Error
            })
    }
}
