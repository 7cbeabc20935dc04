//! Script and stylesheet compression for asset bundles.

use std::fmt;

/// The kind of asset being bundled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// JavaScript
    Script,
    /// CSS
    Style,
}

impl AssetKind {
    /// Bundle file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Script => "js",
            Self::Style => "css",
        }
    }

    /// Bundle subdirectory.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Script => "scripts",
            Self::Style => "styles",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turns asset text into its compressed form.
pub trait Compressor: Send + Sync {
    /// Compress one asset.
    fn compress(&self, text: &str, kind: AssetKind) -> String;
}

/// Conservative compressor: trims every line and drops blank ones.
///
/// Stylesheets additionally lose `/* ... */` comments. Script comments are kept.
/// Script lines that begin or end inside a template literal, or inside a string
/// continued with a trailing backslash, keep their whitespace on that side.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCompressor;

impl Compressor for LineCompressor {
    fn compress(&self, text: &str, kind: AssetKind) -> String {
        let text = match kind {
            AssetKind::Style => strip_block_comments(text),
            AssetKind::Script => text.to_string(),
        };

        let mut scanner = ScriptScanner::default();
        let mut out = String::with_capacity(text.len());
        for line in text.lines() {
            let (starts_inside, ends_inside) = match kind {
                AssetKind::Script => {
                    let starts_inside = scanner.in_literal();
                    scanner.scan_line(line);
                    (starts_inside, scanner.in_literal())
                }
                AssetKind::Style => (false, false),
            };
            let line = match (starts_inside, ends_inside) {
                (true, true) => line,
                (true, false) => line.trim_end(),
                (false, true) => line.trim_start(),
                (false, false) => line.trim(),
            };
            if line.is_empty() && !starts_inside {
                continue;
            }
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Template,
    /// `${ ... }` inside a template, with its open brace count.
    Interpolation(usize),
}

/// Tracks just enough script lexing to know whether a line break falls inside
/// a string or template literal.
#[derive(Debug, Default)]
struct ScriptScanner {
    frames: Vec<Frame>,
    quote: Option<char>,
    escaped: bool,
    block_comment: bool,
}

impl ScriptScanner {
    fn in_literal(&self) -> bool {
        self.quote.is_some() || self.frames.last() == Some(&Frame::Template)
    }

    fn scan_line(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if self.escaped {
                self.escaped = false;
                continue;
            }
            if self.block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.block_comment = false;
                }
                continue;
            }
            if let Some(quote) = self.quote {
                if c == '\\' {
                    self.escaped = true;
                } else if c == quote {
                    self.quote = None;
                }
                continue;
            }
            if self.frames.last() == Some(&Frame::Template) {
                match c {
                    '\\' => self.escaped = true,
                    '`' => {
                        self.frames.pop();
                    }
                    '$' if chars.peek() == Some(&'{') => {
                        chars.next();
                        self.frames.push(Frame::Interpolation(0));
                    }
                    _ => {}
                }
                continue;
            }

            match c {
                '"' | '\'' => self.quote = Some(c),
                '`' => self.frames.push(Frame::Template),
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.block_comment = true;
                }
                '{' => {
                    if let Some(Frame::Interpolation(depth)) = self.frames.last_mut() {
                        *depth += 1;
                    }
                }
                '}' => match self.frames.last_mut() {
                    Some(Frame::Interpolation(0)) => {
                        self.frames.pop();
                    }
                    Some(Frame::Interpolation(depth)) => *depth -= 1,
                    _ => {}
                },
                _ => {}
            }
        }

        // A quote only survives the line break through a trailing backslash.
        if !self.escaped {
            self.quote = None;
        }
        self.escaped = false;
    }
}

fn strip_block_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
