//! Static scan of JavaScript/TypeScript source for module references.
//!
//! Walks the raw bytes of a module and collects the specifier of every
//! static `import`/`export ... from` statement and every dynamic `import()`
//! call with a literal argument. Comments, string literals, and template
//! text are skipped; template interpolations are scanned as code. The scan
//! is deliberately conservative in one direction only: a reference that
//! would be loaded at run time must never be missed, while an occasional
//! extra capture is harmless because non-local specifiers are discarded
//! during resolution.

use std::path::Path;

use crate::warn::{Warning, WarningSink};

/// Scans module source text and returns every literal specifier referenced,
/// in order of appearance.
///
/// Dynamic imports whose argument is not a string literal cannot be
/// tracked; each one is reported to `sink` (attributed to `file`) and
/// skipped. The returned specifiers are raw, exactly as written.
pub fn scan_module(source: &str, file: &Path, sink: &WarningSink) -> Vec<String> {
    scan_module_at(source, file, 1, sink)
}

/// Like [`scan_module`], for source that starts at line `first_line` of
/// `file` rather than at the top. Used for script bodies embedded in a
/// larger document, so warnings point at the enclosing file's lines.
pub fn scan_module_at(
    source: &str,
    file: &Path,
    first_line: usize,
    sink: &WarningSink,
) -> Vec<String> {
    let mut scanner = Scanner {
        source: source.as_bytes(),
        pos: 0,
        file,
        first_line,
        sink,
        specifiers: Vec::new(),
    };
    scanner.scan_code(false);
    scanner.specifiers
}

struct Scanner<'a> {
    source: &'a [u8],
    pos: usize,
    file: &'a Path,
    first_line: usize,
    sink: &'a WarningSink,
    specifiers: Vec<String>,
}

impl Scanner<'_> {
    /// Scans code until end of input, or — inside a template interpolation —
    /// until the `}` that closes it (left unconsumed for the caller).
    fn scan_code(&mut self, in_interpolation: bool) {
        let mut braces = 0usize;
        while self.pos < self.source.len() {
            match self.peek() {
                b'/' if self.peek_at(1) == b'/' => self.skip_line_comment(),
                b'/' if self.peek_at(1) == b'*' => self.skip_block_comment(),
                b'\'' | b'"' => self.skip_string(),
                b'`' => {
                    self.pos += 1;
                    let _ = self.scan_template();
                }
                b'{' => {
                    braces += 1;
                    self.pos += 1;
                }
                b'}' => {
                    if braces == 0 && in_interpolation {
                        return;
                    }
                    braces = braces.saturating_sub(1);
                    self.pos += 1;
                }
                b if is_word_start(b) => self.scan_word(),
                _ => self.pos += 1,
            }
        }
    }

    /// Scans a template literal after its opening backtick.
    ///
    /// Interpolation code is handed back to [`scan_code`](Self::scan_code),
    /// so an `import()` buried in `${...}` is still found. Returns the raw
    /// text when the template has no interpolations (a literal specifier
    /// for dynamic-import purposes), `None` otherwise.
    fn scan_template(&mut self) -> Option<String> {
        let start = self.pos;
        let mut interpolated = false;
        while self.pos < self.source.len() {
            match self.peek() {
                b'\\' => self.pos += 2,
                b'`' => {
                    let text = if interpolated {
                        None
                    } else {
                        Some(self.text(start, self.pos))
                    };
                    self.pos += 1;
                    return text;
                }
                b'$' if self.peek_at(1) == b'{' => {
                    interpolated = true;
                    self.pos += 2;
                    self.scan_code(true);
                    if self.peek() == b'}' {
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
        None
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.pos < self.source.len() && is_word_char(self.source[self.pos]) {
            self.pos += 1;
        }
        if start > 0 {
            let prev = self.source[start - 1];
            // `obj.import(...)` is a method call, not a module reference.
            if is_word_char(prev) || prev == b'.' {
                return;
            }
        }
        match &self.source[start..self.pos] {
            b"import" => self.scan_import(),
            b"export" => self.scan_export(),
            _ => {}
        }
    }

    /// Dispatches on what follows an `import` keyword.
    fn scan_import(&mut self) {
        self.skip_trivia();
        match self.peek() {
            b'(' => {
                self.pos += 1;
                self.dynamic_import();
            }
            // import.meta — a property chain, not a module reference.
            b'.' => {}
            // import "side-effect.ts";
            b'\'' | b'"' => {
                if let Some(spec) = self.read_string() {
                    self.specifiers.push(spec);
                }
            }
            b'{' | b'*' => self.import_clause(),
            b if is_word_start(b) => self.import_clause(),
            _ => {}
        }
    }

    /// Dispatches on what follows an `export` keyword. Only re-exports
    /// (`export ... from "spec"`) reference another module; declaration
    /// exports fall through to the normal scan.
    fn scan_export(&mut self) {
        self.skip_trivia();
        match self.peek() {
            b'{' | b'*' => self.import_clause(),
            b't' => {
                // export type { T } from "spec"; (TypeScript)
                let start = self.pos;
                while self.pos < self.source.len() && is_word_char(self.source[self.pos]) {
                    self.pos += 1;
                }
                if &self.source[start..self.pos] == b"type" {
                    self.skip_trivia();
                    if matches!(self.peek(), b'{' | b'*') {
                        self.import_clause();
                    }
                }
            }
            _ => {}
        }
    }

    /// Scans an import/export clause for the `from "spec"` that ends it.
    ///
    /// Strings inside the clause are arbitrary module export names
    /// (`import { "a-b" as ab } from ...`), never the specifier, so only
    /// the string after a top-level `from` keyword is captured. Bails out
    /// at anything that cannot be part of a clause.
    fn import_clause(&mut self) {
        let mut braces = 0usize;
        while self.pos < self.source.len() {
            match self.peek() {
                b'/' if self.peek_at(1) == b'/' => self.skip_line_comment(),
                b'/' if self.peek_at(1) == b'*' => self.skip_block_comment(),
                b'\'' | b'"' => self.skip_string(),
                b'`' => {
                    self.pos += 1;
                    let _ = self.scan_template();
                }
                b'{' => {
                    braces += 1;
                    self.pos += 1;
                }
                b'}' => {
                    braces = braces.saturating_sub(1);
                    self.pos += 1;
                }
                b';' | b'=' | b'(' | b')' => return,
                b if is_word_start(b) => {
                    let start = self.pos;
                    while self.pos < self.source.len() && is_word_char(self.source[self.pos]) {
                        self.pos += 1;
                    }
                    if braces == 0 && &self.source[start..self.pos] == b"from" {
                        self.skip_trivia();
                        if matches!(self.peek(), b'\'' | b'"') {
                            if let Some(spec) = self.read_string() {
                                self.specifiers.push(spec);
                            }
                        }
                        return;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Scans the argument of a dynamic `import(...)` after the paren.
    ///
    /// Only a lone string literal (or interpolation-free template) counts;
    /// anything computed gets a warning and no capture, because a guessed
    /// path would surface later as a hard missing-file error.
    fn dynamic_import(&mut self) {
        self.skip_trivia();
        let at = self.pos;
        match self.peek() {
            b'\'' | b'"' => {
                if let Some(spec) = self.read_string() {
                    self.finish_dynamic(spec, at);
                }
            }
            b'`' => {
                self.pos += 1;
                match self.scan_template() {
                    Some(spec) => self.finish_dynamic(spec, at),
                    None => self.warn_dynamic(at),
                }
            }
            _ => self.warn_dynamic(at),
        }
    }

    /// Accepts a literally-specified dynamic import only when the literal is
    /// the whole argument (a following `,` starts an attributes object).
    fn finish_dynamic(&mut self, spec: String, at: usize) {
        self.skip_trivia();
        if matches!(self.peek(), b')' | b',') {
            self.specifiers.push(spec);
        } else {
            self.warn_dynamic(at);
        }
    }

    fn warn_dynamic(&mut self, at: usize) {
        let line = self.first_line + line_of(self.source, at) - 1;
        self.sink.emit(Warning::new(
            self.file,
            format!(
                "dynamic import with a non-literal specifier on line {line}; \
                 its dependencies are not tracked"
            ),
        ));
    }

    fn peek(&self) -> u8 {
        if self.pos < self.source.len() {
            self.source[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.source.len() {
            self.source[idx]
        } else {
            0
        }
    }

    fn text(&self, start: usize, end: usize) -> String {
        std::str::from_utf8(&self.source[start..end])
            .unwrap_or("")
            .to_string()
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                self.skip_line_comment();
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                self.skip_block_comment();
                continue;
            }
            break;
        }
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.source.len() {
            if self.source[self.pos] == b'*' && self.peek_at(1) == b'/' {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    /// Skips a quoted string. Terminates at the closing quote, end of input,
    /// or an unescaped newline, which bounds how far a stray quote inside
    /// un-lexable text (a regex literal, say) can desynchronize the scan.
    fn skip_string(&mut self) {
        let quote = self.advance();
        while self.pos < self.source.len() {
            let b = self.peek();
            if b == quote {
                self.pos += 1;
                return;
            }
            if b == b'\n' {
                return;
            }
            if b == b'\\' {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
        }
    }

    /// Reads a quoted string, returning its raw contents, or `None` if the
    /// string never closes on its line.
    fn read_string(&mut self) -> Option<String> {
        let quote = self.advance();
        let start = self.pos;
        while self.pos < self.source.len() {
            let b = self.peek();
            if b == quote {
                let text = self.text(start, self.pos);
                self.pos += 1;
                return Some(text);
            }
            if b == b'\n' {
                return None;
            }
            if b == b'\\' {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
        }
        None
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        b
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// 1-based line number of byte offset `at`.
pub(crate) fn line_of(source: &[u8], at: usize) -> usize {
    source[..at].iter().filter(|&&b| b == b'\n').count() + 1
}
