//! Line-oriented input sources.
//!
//! The tokenizer only ever asks for "the next line or end-of-input", so the
//! seam is a small trait. [`TextSource`] is the standard implementation: it
//! reads a whole file (or takes a string) up front and splits it into lines
//! on any of `\r\n`, `\n` or `\r`.

use std::fs;
use std::io;
use std::path::Path;

/// Supplies one line of text at a time.
pub trait LineSource {
    /// Return the next line, or `None` once the input is exhausted.
    fn read_line(&mut self) -> Option<String>;

    /// True once every line has been handed out.
    fn eof(&self) -> bool;
}

/// A [`LineSource`] over an in-memory block of text.
#[derive(Debug, Clone)]
pub struct TextSource {
    lines: Vec<String>,
    index: usize,
}

impl TextSource {
    pub fn new(text: &str) -> Self {
        TextSource {
            lines: split_lines(text),
            index: 0,
        }
    }

    /// Read an entire file and split it into lines.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::new(&text))
    }
}

impl LineSource for TextSource {
    fn read_line(&mut self) -> Option<String> {
        if self.eof() {
            None
        } else {
            let line = self.lines[self.index].clone();
            self.index += 1;
            Some(line)
        }
    }

    fn eof(&self) -> bool {
        self.index == self.lines.len()
    }
}

/// Split on any of the three common line terminators.
fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_owned)
        .collect()
}
