use std::collections::HashMap;

use crate::ast::{DiagSeverity, ParseDiagnostic, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Top-level keywords
    Config,
    MenuConfig,
    Choice,
    EndChoice,
    CommentKw, // `comment` keyword (distinct from `#` line comments)
    Menu,
    EndMenu,
    If,
    EndIf,
    Source,
    RSource,
    OSource,
    ORSource,
    MainMenu,

    // Type keywords
    Bool,
    Int,
    Hex,
    StringType,
    Float,

    // Attribute keywords
    Prompt,
    Default,
    Depends,
    On,
    Select,
    Imply,
    Set,
    Visible,
    Range,
    Help,
    Warning,
    OptionKw,

    // Operators
    Eq,         // =
    ColonEq,    // :=
    NotEq,      // !=
    Less,       // <
    Greater,    // >
    LessEq,     // <=
    GreaterEq,  // >=
    Not,        // !
    And,        // &&
    Or,         // ||
    OpenParen,  // (
    CloseParen, // )

    // Literals & identifiers
    StringLit(String), // "..."
    Ident(String),     // unquoted identifier / symbol / numeric literal

    // Macro reference $(NAME)
    Macro(String),

    // Line comment: # ...
    LineComment(String),

    // Whitespace / structure
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Indentation of the line this token starts on, in columns (tab
    /// advances to the next multiple of 8).
    pub indent: u32,
}

// ---------------------------------------------------------------------------

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    bol: bool,
    indent: u32,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            bol: true,
            indent: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<ParseDiagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pos).copied();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn skip_spaces(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Measure the leading whitespace of the current line.
    fn measure_indent(&mut self) {
        let mut width = 0u32;
        while let Some(b) = self.peek() {
            match b {
                b' ' => width += 1,
                b'\t' => width = (width / 8 + 1) * 8,
                _ => break,
            }
            self.pos += 1;
        }
        self.indent = width;
        self.bol = false;
    }

    /// Skip a `\` immediately followed by `\n` (line continuation).
    fn skip_line_continuation(&mut self) -> bool {
        if self.peek() == Some(b'\\') && self.peek2() == Some(b'\n') {
            self.pos += 2;
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Token {
        // Skip horizontal whitespace and line continuations.
        loop {
            if self.bol {
                self.measure_indent();
            } else {
                self.skip_spaces();
            }
            if !self.skip_line_continuation() {
                break;
            }
        }

        let start = self.pos;

        let Some(ch) = self.advance() else {
            return self.token(TokenKind::Eof, start);
        };

        match ch {
            b'\n' => {
                let tok = self.token(TokenKind::Newline, start);
                self.bol = true;
                tok
            }

            b'#' => {
                let text_start = self.pos;
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                let text = self.src[text_start..self.pos].to_string();
                self.token(TokenKind::LineComment(text), start)
            }

            b'"' => self.lex_string(start),

            b'$' if self.peek() == Some(b'(') => self.lex_macro(start),

            b'(' => self.token(TokenKind::OpenParen, start),
            b')' => self.token(TokenKind::CloseParen, start),

            b'!' if self.peek() == Some(b'=') => {
                self.pos += 1;
                self.token(TokenKind::NotEq, start)
            }
            b'!' => self.token(TokenKind::Not, start),

            b'=' => self.token(TokenKind::Eq, start),

            b':' if self.peek() == Some(b'=') => {
                self.pos += 1;
                self.token(TokenKind::ColonEq, start)
            }

            b'<' if self.peek() == Some(b'=') => {
                self.pos += 1;
                self.token(TokenKind::LessEq, start)
            }
            b'<' => self.token(TokenKind::Less, start),

            b'>' if self.peek() == Some(b'=') => {
                self.pos += 1;
                self.token(TokenKind::GreaterEq, start)
            }
            b'>' => self.token(TokenKind::Greater, start),

            b'&' if self.peek() == Some(b'&') => {
                self.pos += 1;
                self.token(TokenKind::And, start)
            }

            b'|' if self.peek() == Some(b'|') => {
                self.pos += 1;
                self.token(TokenKind::Or, start)
            }

            _ if is_ident_start(ch) => self.lex_ident(start),

            // Skip any unexpected byte gracefully (error recovery).
            _ => self.next_token(),
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
            indent: self.indent,
        }
    }

    fn lex_string(&mut self, start: usize) -> Token {
        let mut value = String::new();
        let mut terminated = false;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
            match b {
                b'"' => {
                    terminated = true;
                    break;
                }
                b'\\' => {
                    if let Some(esc) = self.advance() {
                        value.push(esc as char);
                    }
                }
                _ => value.push(b as char),
            }
        }
        if !terminated {
            self.diagnostics.push(ParseDiagnostic {
                message: "unterminated string".to_string(),
                span: Span::new(start, self.pos),
                severity: DiagSeverity::Error,
            });
        }
        self.token(TokenKind::StringLit(value), start)
    }

    fn lex_macro(&mut self, start: usize) -> Token {
        // skip '('
        self.pos += 1;
        let mut depth = 1u32;
        let body_start = self.pos;
        while depth > 0 {
            match self.advance() {
                Some(b'(') => depth += 1,
                Some(b')') => depth -= 1,
                None => break,
                _ => {}
            }
        }
        let body_end = if depth == 0 { self.pos - 1 } else { self.pos };
        let body = self.src[body_start..body_end].to_string();
        self.token(TokenKind::Macro(body), start)
    }

    fn lex_ident(&mut self, start: usize) -> Token {
        while let Some(b) = self.peek() {
            if is_ident_cont(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        let kind = keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        self.token(kind, start)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'
}

fn keyword(s: &str) -> Option<TokenKind> {
    Some(match s {
        "config" => TokenKind::Config,
        "menuconfig" => TokenKind::MenuConfig,
        "choice" => TokenKind::Choice,
        "endchoice" => TokenKind::EndChoice,
        "comment" => TokenKind::CommentKw,
        "menu" => TokenKind::Menu,
        "endmenu" => TokenKind::EndMenu,
        "if" => TokenKind::If,
        "endif" => TokenKind::EndIf,
        "source" => TokenKind::Source,
        "rsource" => TokenKind::RSource,
        "osource" => TokenKind::OSource,
        "orsource" => TokenKind::ORSource,
        "mainmenu" => TokenKind::MainMenu,
        "bool" => TokenKind::Bool,
        "int" => TokenKind::Int,
        "hex" => TokenKind::Hex,
        "string" => TokenKind::StringType,
        "float" => TokenKind::Float,
        "prompt" => TokenKind::Prompt,
        "default" => TokenKind::Default,
        "depends" => TokenKind::Depends,
        "on" => TokenKind::On,
        "select" => TokenKind::Select,
        "imply" => TokenKind::Imply,
        "set" => TokenKind::Set,
        "visible" => TokenKind::Visible,
        "range" => TokenKind::Range,
        "help" => TokenKind::Help,
        "warning" => TokenKind::Warning,
        "option" => TokenKind::OptionKw,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Macro substitution table.  `NAME = v` defers expansion to each use,
// `NAME := v` expands once at definition.  `$(NAME)` falls back to the
// environment captured when the table was created.
// ---------------------------------------------------------------------------

const MAX_EXPANSION_DEPTH: u32 = 16;

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl MacroTable {
    /// Create a table over an explicit environment map, captured once at
    /// parse time.
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            defs: HashMap::new(),
            env,
        }
    }

    pub fn define(&mut self, name: &str, raw: &str) {
        self.defs.insert(name.to_string(), raw.to_string());
    }

    pub fn define_immediate(&mut self, name: &str, raw: &str) {
        let expanded = self.expand(raw, 0).unwrap_or_default();
        self.defs.insert(name.to_string(), expanded);
    }

    /// Resolve one `$(NAME)` reference: macro first, then environment.
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(raw) = self.defs.get(name) {
            return Some(self.expand(raw, 0).unwrap_or_default());
        }
        self.env.get(name).cloned()
    }

    /// Expand `$(NAME)` references in quoted context: unset names expand
    /// to the empty string.
    pub fn expand_quoted(&self, text: &str) -> String {
        self.expand_with(text, 0, &mut |_| Some(String::new()))
    }

    /// Expand `$(NAME)` references in bare context: the first unset name
    /// is returned as an error.
    pub fn expand_bare(&self, text: &str) -> Result<String, String> {
        let mut missing = None;
        let out = self.expand_with(text, 0, &mut |name| {
            if missing.is_none() {
                missing = Some(name.to_string());
            }
            None
        });
        match missing {
            Some(name) => Err(name),
            None => Ok(out),
        }
    }

    fn expand(&self, text: &str, depth: u32) -> Option<String> {
        if depth > MAX_EXPANSION_DEPTH {
            return None;
        }
        Some(self.expand_with(text, depth, &mut |_| Some(String::new())))
    }

    fn expand_with(
        &self,
        text: &str,
        depth: u32,
        on_missing: &mut dyn FnMut(&str) -> Option<String>,
    ) -> String {
        if depth > MAX_EXPANSION_DEPTH {
            return String::new();
        }
        let mut out = String::with_capacity(text.len());
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'(') {
                if let Some(close) = find_close(bytes, i + 2) {
                    let name = &text[i + 2..close];
                    match self.lookup_at(name, depth) {
                        Some(value) => out.push_str(&value),
                        None => {
                            if let Some(repl) = on_missing(name) {
                                out.push_str(&repl);
                            }
                        }
                    }
                    i = close + 1;
                    continue;
                }
            }
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&text[i..i + ch_len]);
            i += ch_len;
        }
        out
    }

    fn lookup_at(&self, name: &str, depth: u32) -> Option<String> {
        if let Some(raw) = self.defs.get(name) {
            return self.expand(raw, depth + 1);
        }
        self.env.get(name).cloned()
    }
}

fn find_close(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1u32;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn utf8_len(b: u8) -> usize {
    match b {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
