use crate::ast::*;
use crate::lexer::{Token, TokenKind};

pub struct ParseResult {
    pub file: KconfigFile,
    pub diagnostics: Vec<ParseDiagnostic>,
}

pub fn parse(source: &str, tokens: Vec<Token>, lex_diagnostics: Vec<ParseDiagnostic>) -> ParseResult {
    let mut p = Parser {
        source,
        tokens,
        pos: 0,
        diagnostics: lex_diagnostics,
        pending_ignore_multidef: false,
    };
    let entries = p.parse_entries(&[], 0);
    ParseResult {
        file: KconfigFile { entries },
        diagnostics: p.diagnostics,
    }
}

/// Comment text that suppresses the multiple-definition notification.
const IGNORE_MULTIDEF: &str = "ignore: multiple-definition";

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<ParseDiagnostic>,
    pending_ignore_multidef: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::new(self.source.len(), self.source.len()))
    }

    fn current_indent(&self) -> u32 {
        self.tokens.get(self.pos).map(|t| t.indent).unwrap_or(0)
    }

    fn skip_newlines(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Newline => self.pos += 1,
                TokenKind::LineComment(text) => {
                    if text.trim() == IGNORE_MULTIDEF {
                        self.pending_ignore_multidef = true;
                    }
                    self.pos += 1;
                }
                _ => break,
            }
        }
    }

    fn skip_to_eol(&mut self) {
        while !matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
            self.pos += 1;
        }
        if *self.peek() == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn expect_newline(&mut self) {
        match self.peek() {
            TokenKind::Newline => {
                self.pos += 1;
            }
            TokenKind::LineComment(_) => {
                if let TokenKind::LineComment(text) = self.peek() {
                    if text.trim() == IGNORE_MULTIDEF {
                        self.pending_ignore_multidef = true;
                    }
                }
                self.pos += 1;
                if *self.peek() == TokenKind::Newline {
                    self.pos += 1;
                }
            }
            TokenKind::Eof => {}
            _ => {
                self.diag(
                    self.current_span(),
                    "expected end of line",
                    DiagSeverity::Warning,
                );
                self.skip_to_eol();
            }
        }
    }

    fn diag(&mut self, span: Span, msg: &str, severity: DiagSeverity) {
        self.diagnostics.push(ParseDiagnostic {
            message: msg.to_string(),
            span,
            severity,
        });
    }

    // -----------------------------------------------------------------------
    // Entry parsing - handles the block structure of Kconfig
    // -----------------------------------------------------------------------

    fn parse_entries(&mut self, terminators: &[TokenKind], _level: u32) -> Vec<Entry> {
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if *self.peek() == TokenKind::Eof {
                break;
            }
            if terminators.iter().any(|t| t == self.peek()) {
                break;
            }
            if let Some(entry) = self.parse_entry() {
                entries.push(entry);
            }
        }
        entries
    }

    fn parse_entry(&mut self) -> Option<Entry> {
        match self.peek().clone() {
            TokenKind::Config => Some(self.parse_config(false)),
            TokenKind::MenuConfig => Some(self.parse_config(true)),
            TokenKind::Choice => Some(self.parse_choice()),
            TokenKind::CommentKw => Some(self.parse_comment()),
            TokenKind::Menu => Some(self.parse_menu()),
            TokenKind::If => Some(self.parse_if()),
            TokenKind::Source | TokenKind::RSource | TokenKind::OSource | TokenKind::ORSource => {
                Some(self.parse_source())
            }
            TokenKind::MainMenu => Some(self.parse_mainmenu()),
            TokenKind::Ident(_)
                if matches!(self.peek_at(1), TokenKind::Eq | TokenKind::ColonEq) =>
            {
                Some(self.parse_macro_assign())
            }
            TokenKind::Prompt
            | TokenKind::Default
            | TokenKind::Depends
            | TokenKind::Select
            | TokenKind::Imply
            | TokenKind::Set
            | TokenKind::Range
            | TokenKind::Help
            | TokenKind::Warning
            | TokenKind::Visible
            | TokenKind::OptionKw
            | TokenKind::Bool
            | TokenKind::Int
            | TokenKind::Hex
            | TokenKind::StringType
            | TokenKind::Float => {
                let span = self.current_span();
                self.diag(
                    span,
                    "option is not attached to any entry (bad indentation)",
                    DiagSeverity::Error,
                );
                self.skip_to_eol();
                None
            }
            _ => {
                let span = self.current_span();
                self.diag(span, "unknown keyword", DiagSeverity::Error);
                self.skip_to_eol();
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // config / menuconfig
    // -----------------------------------------------------------------------

    fn parse_config(&mut self, is_menuconfig: bool) -> Entry {
        let start_span = self.current_span();
        let base_indent = self.current_indent();
        self.pos += 1; // skip `config` / `menuconfig`

        let (name, name_span) = self.expect_ident();
        self.expect_newline();

        let attributes = self.parse_config_attributes(base_indent);
        self.check_singleton_options(&attributes);
        let span = start_span.merge(attributes.last().map(attr_span).unwrap_or(name_span));

        let ignore_multiple_definition = std::mem::take(&mut self.pending_ignore_multidef);
        let entry = ConfigEntry {
            name,
            name_span,
            attributes,
            ignore_multiple_definition,
            span,
        };
        if is_menuconfig {
            Entry::MenuConfig(entry)
        } else {
            Entry::Config(entry)
        }
    }

    fn parse_config_attributes(&mut self, base_indent: u32) -> Vec<Attribute> {
        let mut attrs = Vec::new();
        let mut body_indent: Option<u32> = None;
        loop {
            self.skip_newlines();
            if *self.peek() == TokenKind::Eof {
                break;
            }
            let indent = self.current_indent();
            if indent <= base_indent {
                break;
            }
            match body_indent {
                None => body_indent = Some(indent),
                Some(bi) if indent != bi => {
                    let span = self.current_span();
                    self.diag(span, "bad indentation", DiagSeverity::Error);
                }
                _ => {}
            }
            match self.peek() {
                TokenKind::Bool
                | TokenKind::Int
                | TokenKind::Hex
                | TokenKind::StringType
                | TokenKind::Float => attrs.push(self.parse_type_attr()),

                TokenKind::Prompt => attrs.push(self.parse_prompt_attr()),
                TokenKind::Default => attrs.push(self.parse_default_attr()),
                TokenKind::Depends => attrs.push(self.parse_depends_on()),
                TokenKind::Select => attrs.push(self.parse_select_imply(true)),
                TokenKind::Imply => attrs.push(self.parse_select_imply(false)),
                TokenKind::Set => attrs.push(self.parse_set()),
                TokenKind::Range => attrs.push(self.parse_range()),
                TokenKind::Help => attrs.push(self.parse_help()),
                TokenKind::Warning => attrs.push(self.parse_warning()),
                TokenKind::OptionKw => {
                    if let Some(attr) = self.parse_option_env() {
                        attrs.push(attr);
                    }
                }
                _ => {
                    let span = self.current_span();
                    self.diag(span, "unknown keyword", DiagSeverity::Error);
                    self.skip_to_eol();
                }
            }
        }
        attrs
    }

    /// Report duplicated options that are only allowed once per entry.
    fn check_singleton_options(&mut self, attrs: &[Attribute]) {
        let mut type_count = 0;
        let mut prompt_count = 0;
        let mut help_count = 0;
        let mut warning_count = 0;
        let mut env_count = 0;
        for a in attrs {
            match a {
                Attribute::Type(t) => {
                    type_count += 1;
                    if t.prompt.is_some() {
                        prompt_count += 1;
                    }
                    if type_count == 2 {
                        self.diag(t.span, "duplicate type option", DiagSeverity::Error);
                    }
                }
                Attribute::Prompt(p) => {
                    prompt_count += 1;
                    if prompt_count == 2 {
                        self.diag(p.span, "duplicate prompt option", DiagSeverity::Error);
                    }
                }
                Attribute::Help(h) => {
                    help_count += 1;
                    if help_count == 2 {
                        self.diag(h.span, "duplicate help option", DiagSeverity::Error);
                    }
                }
                Attribute::Warning(w) => {
                    warning_count += 1;
                    if warning_count == 2 {
                        self.diag(w.span, "duplicate warning option", DiagSeverity::Error);
                    }
                }
                Attribute::OptionEnv(o) => {
                    env_count += 1;
                    if env_count == 2 {
                        self.diag(o.span, "duplicate option env", DiagSeverity::Error);
                    }
                }
                _ => {}
            }
        }
        // A literal default of the wrong shape for the declared type is a
        // parse error; symbol references are settled by the evaluator.
        let kind = attrs.iter().find_map(|a| match a {
            Attribute::Type(t) => Some(t.kind),
            _ => None,
        });
        if let Some(kind) = kind {
            for a in attrs {
                if let Attribute::Default(d) = a {
                    if let Expr::StringLit(_, span) = &d.value {
                        if kind != TypeKind::String {
                            self.diag(
                                *span,
                                &format!("string literal used as {} default", kind.as_str()),
                                DiagSeverity::Error,
                            );
                        }
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Attribute parsers
    // -----------------------------------------------------------------------

    fn parse_type_attr(&mut self) -> Attribute {
        let start = self.current_span();
        let kind = self.consume_type_kind();
        let prompt = self.try_parse_inline_prompt();
        let span = start.merge(prompt.as_ref().map(|p| p.span).unwrap_or(start));
        self.expect_newline();
        Attribute::Type(TypeAttr { kind, prompt, span })
    }

    fn parse_prompt_attr(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `prompt`
        let prompt = self.parse_prompt_value(start);
        self.expect_newline();
        Attribute::Prompt(prompt)
    }

    fn parse_default_attr(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `default`
        let value = self.parse_expr();
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(value.span()));
        self.expect_newline();
        Attribute::Default(DefaultAttr {
            value,
            condition,
            span,
        })
    }

    fn parse_depends_on(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `depends`
        if *self.peek() == TokenKind::On {
            self.pos += 1;
        }
        let expr = self.parse_expr();
        let span = start.merge(expr.span());
        self.expect_newline();
        Attribute::DependsOn(DependsOnAttr { expr, span })
    }

    fn parse_select_imply(&mut self, is_select: bool) -> Attribute {
        let start = self.current_span();
        self.pos += 1;
        let (symbol, symbol_span) = self.expect_ident();
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(symbol_span));
        self.expect_newline();
        let attr = ReverseDepAttr {
            symbol,
            symbol_span,
            condition,
            span,
        };
        if is_select {
            Attribute::Select(attr)
        } else {
            Attribute::Imply(attr)
        }
    }

    /// `set TARGET=RHS [if expr]` and `set default TARGET=RHS [if expr]`.
    fn parse_set(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `set`
        let is_default = if *self.peek() == TokenKind::Default {
            self.pos += 1;
            true
        } else {
            false
        };
        let (symbol, symbol_span) = self.expect_ident();
        if *self.peek() == TokenKind::Eq {
            self.pos += 1;
        } else {
            let span = self.current_span();
            self.diag(span, "expected `=` after set target", DiagSeverity::Error);
        }
        let value = self.parse_primary_expr();
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(value.span()));
        self.expect_newline();
        let attr = SetAttr {
            symbol,
            symbol_span,
            value,
            condition,
            span,
        };
        if is_default {
            Attribute::SetDefault(attr)
        } else {
            Attribute::Set(attr)
        }
    }

    fn parse_visible_if(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `visible`
        if *self.peek() == TokenKind::If {
            self.pos += 1;
        }
        let expr = self.parse_expr();
        let span = start.merge(expr.span());
        self.expect_newline();
        Attribute::VisibleIf(VisibleIfAttr { expr, span })
    }

    fn parse_range(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `range`
        let low = self.parse_primary_expr();
        let high = self.parse_primary_expr();
        for bound in [&low, &high] {
            if let Expr::StringLit(_, span) = bound {
                self.diag(*span, "range bound must be numeric", DiagSeverity::Error);
            }
        }
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(high.span()));
        self.expect_newline();
        Attribute::Range(RangeAttr {
            low,
            high,
            condition,
            span,
        })
    }

    fn parse_warning(&mut self) -> Attribute {
        let start = self.current_span();
        self.pos += 1; // skip `warning`
        let (text, text_span) = self.expect_string();
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(text_span));
        self.expect_newline();
        Attribute::Warning(WarningAttr {
            text,
            condition,
            span,
        })
    }

    /// `option env="NAME"` - deprecated but still accepted.
    fn parse_option_env(&mut self) -> Option<Attribute> {
        let start = self.current_span();
        self.pos += 1; // skip `option`
        match self.peek().clone() {
            TokenKind::Ident(word) if word == "env" => {
                self.pos += 1;
            }
            _ => {
                let span = self.current_span();
                self.diag(span, "unknown keyword", DiagSeverity::Error);
                self.skip_to_eol();
                return None;
            }
        }
        if *self.peek() == TokenKind::Eq {
            self.pos += 1;
        }
        let (name, name_span) = self.expect_string();
        self.expect_newline();
        Some(Attribute::OptionEnv(OptionEnvAttr {
            name,
            span: start.merge(name_span),
        }))
    }

    fn parse_help(&mut self) -> Attribute {
        let start = self.current_span();
        let line_start = self.source[..start.start]
            .rfind('\n')
            .map_or(0, |p| p + 1);
        let keyword_indent = start.start - line_start;
        self.pos += 1; // skip `help`
        self.skip_to_eol();

        let help_text = self.consume_help_text(keyword_indent);
        let end_offset = start.end + help_text.len();
        Attribute::Help(HelpAttr {
            text: help_text,
            span: start.merge(Span::new(start.start, end_offset)),
        })
    }

    /// Help text is every following line indented deeper than the `help`
    /// keyword; the first such line fixes the base indent.
    fn consume_help_text(&mut self, keyword_indent: usize) -> String {
        let mut lines: Vec<&str> = Vec::new();
        let mut base_indent: Option<usize> = None;

        let src = self.source;

        let token_offset = self.current_span().start;
        let raw_start = src[..token_offset]
            .rfind('\n')
            .map_or(token_offset, |p| p + 1);
        let remaining = &src[raw_start..];

        let mut consumed = 0usize;
        for raw_line in remaining.lines() {
            let trimmed = raw_line.trim_start();
            if trimmed.is_empty() {
                lines.push("");
                consumed += raw_line.len() + 1;
                continue;
            }
            let indent = raw_line.len() - trimmed.len();
            if indent <= keyword_indent {
                break;
            }
            match base_indent {
                None => {
                    base_indent = Some(indent);
                }
                Some(bi) => {
                    if indent < bi {
                        break;
                    }
                }
            }
            lines.push(raw_line);
            consumed += raw_line.len() + 1;
        }

        // Advance the token stream past the consumed help text.
        let end_offset = raw_start + consumed;
        while self.pos < self.tokens.len() {
            if self.tokens[self.pos].span.start >= end_offset {
                break;
            }
            self.pos += 1;
        }

        // Strip the base indent from each line.
        let bi = base_indent.unwrap_or(0);
        lines
            .iter()
            .map(|l| {
                if l.len() > bi {
                    &l[bi..]
                } else {
                    l.trim_start()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string()
    }

    // -----------------------------------------------------------------------
    // Compound entries
    // -----------------------------------------------------------------------

    fn parse_choice(&mut self) -> Entry {
        let start = self.current_span();
        let base_indent = self.current_indent();
        self.pos += 1; // skip `choice`
        let name = match self.peek().clone() {
            TokenKind::Ident(n) => {
                self.pos += 1;
                Some(n)
            }
            _ => None,
        };
        self.expect_newline();

        let mut attributes = Vec::new();
        loop {
            self.skip_newlines();
            if self.current_indent() <= base_indent {
                break;
            }
            match self.peek() {
                TokenKind::Prompt => attributes.push(self.parse_prompt_attr()),
                TokenKind::Default => attributes.push(self.parse_default_attr()),
                TokenKind::Depends => attributes.push(self.parse_depends_on()),
                TokenKind::Help => attributes.push(self.parse_help()),
                TokenKind::Bool => attributes.push(self.parse_type_attr()),
                _ => break,
            }
        }

        let entries = self.parse_entries(&[TokenKind::EndChoice], base_indent);
        self.skip_newlines();
        let end_span = self.current_span();
        if *self.peek() == TokenKind::EndChoice {
            self.pos += 1;
            self.expect_newline();
        } else {
            self.diag(end_span, "expected `endchoice`", DiagSeverity::Error);
        }

        Entry::Choice(ChoiceEntry {
            name,
            attributes,
            entries,
            span: start.merge(end_span),
        })
    }

    fn parse_comment(&mut self) -> Entry {
        let start = self.current_span();
        let base_indent = self.current_indent();
        self.pos += 1; // skip `comment`
        let (prompt, prompt_span) = self.expect_string();
        self.expect_newline();

        let attributes = self.parse_comment_menu_attrs(base_indent);
        let span = start.merge(attributes.last().map(attr_span).unwrap_or(prompt_span));
        Entry::Comment(CommentEntry {
            prompt,
            prompt_span,
            attributes,
            span,
        })
    }

    fn parse_menu(&mut self) -> Entry {
        let start = self.current_span();
        let base_indent = self.current_indent();
        self.pos += 1; // skip `menu`
        let (prompt, prompt_span) = self.expect_string();
        self.expect_newline();

        let attributes = self.parse_comment_menu_attrs(base_indent);
        let entries = self.parse_entries(&[TokenKind::EndMenu], base_indent);
        self.skip_newlines();
        let end_span = self.current_span();
        if *self.peek() == TokenKind::EndMenu {
            self.pos += 1;
            self.expect_newline();
        } else {
            self.diag(end_span, "expected `endmenu`", DiagSeverity::Error);
        }

        Entry::Menu(MenuEntry {
            prompt,
            prompt_span,
            attributes,
            entries,
            span: start.merge(end_span),
        })
    }

    fn parse_comment_menu_attrs(&mut self, base_indent: u32) -> Vec<Attribute> {
        let mut attrs = Vec::new();
        loop {
            self.skip_newlines();
            if self.current_indent() <= base_indent {
                break;
            }
            match self.peek() {
                TokenKind::Depends => attrs.push(self.parse_depends_on()),
                TokenKind::Visible => attrs.push(self.parse_visible_if()),
                _ => break,
            }
        }
        attrs
    }

    fn parse_if(&mut self) -> Entry {
        let start = self.current_span();
        let base_indent = self.current_indent();
        self.pos += 1; // skip `if`
        let condition = self.parse_expr();
        self.expect_newline();

        let entries = self.parse_entries(&[TokenKind::EndIf], base_indent);
        self.skip_newlines();
        let end_span = self.current_span();
        if *self.peek() == TokenKind::EndIf {
            self.pos += 1;
            self.expect_newline();
        } else {
            self.diag(end_span, "expected `endif`", DiagSeverity::Error);
        }

        Entry::If(IfEntry {
            condition,
            entries,
            span: start.merge(end_span),
        })
    }

    fn parse_source(&mut self) -> Entry {
        let start = self.current_span();
        let kind = match self.peek() {
            TokenKind::RSource => SourceKind::RSource,
            TokenKind::OSource => SourceKind::OSource,
            TokenKind::ORSource => SourceKind::ORSource,
            _ => SourceKind::Source,
        };
        self.pos += 1;
        let (path, path_span) = self.expect_string();
        // Macro references may select the directory but never the file
        // itself.
        let last_component = path.rsplit('/').next().unwrap_or(&path);
        if last_component.contains("$(") {
            self.diag(
                path_span,
                "the final component of a sourced path must be literal",
                DiagSeverity::Error,
            );
        }
        self.expect_newline();
        Entry::Source(SourceEntry {
            kind,
            path,
            path_span,
            span: start.merge(path_span),
        })
    }

    fn parse_mainmenu(&mut self) -> Entry {
        let start = self.current_span();
        self.pos += 1; // skip `mainmenu`
        let (prompt, prompt_span) = self.expect_string();
        self.expect_newline();
        Entry::MainMenu(MainMenuEntry {
            prompt,
            prompt_span,
            span: start.merge(prompt_span),
        })
    }

    /// `NAME = value` / `NAME := value`: lexical substitution entry.  The
    /// right-hand side is the raw rest of the line.
    fn parse_macro_assign(&mut self) -> Entry {
        let start = self.current_span();
        let (name, _) = self.expect_ident();
        let immediate = *self.peek() == TokenKind::ColonEq;
        let op_span = self.current_span();
        self.pos += 1; // skip `=` / `:=`

        let value_start = op_span.end;
        let value_end = self.source[value_start..]
            .find('\n')
            .map(|p| value_start + p)
            .unwrap_or(self.source.len());
        let value = self.source[value_start..value_end].trim().to_string();
        self.skip_to_eol();

        Entry::MacroAssign(MacroAssignEntry {
            name,
            value,
            immediate,
            span: start.merge(Span::new(value_start, value_end)),
        })
    }

    // -----------------------------------------------------------------------
    // Expression parser - precedence climbing
    //
    // Precedence (highest to lowest):
    //   1. primary: symbol, string, '(' expr ')', '!' expr
    //   2. comparison: =, !=, <, >, <=, >= (non-associative)
    //   3. AND: &&
    //   4. OR:  ||
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Expr {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Expr {
        let mut left = self.parse_and_expr();
        while *self.peek() == TokenKind::Or {
            self.pos += 1;
            let right = self.parse_and_expr();
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        left
    }

    fn parse_and_expr(&mut self) -> Expr {
        let mut left = self.parse_comparison_expr();
        while *self.peek() == TokenKind::And {
            self.pos += 1;
            let right = self.parse_comparison_expr();
            left = Expr::And(Box::new(left), Box::new(right));
        }
        left
    }

    fn parse_comparison_expr(&mut self) -> Expr {
        let left = self.parse_primary_expr();
        match self.peek().clone() {
            TokenKind::Eq => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::Eq(Box::new(left), Box::new(right))
            }
            TokenKind::NotEq => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::NotEq(Box::new(left), Box::new(right))
            }
            TokenKind::Less => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::Less(Box::new(left), Box::new(right))
            }
            TokenKind::LessEq => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::LessEq(Box::new(left), Box::new(right))
            }
            TokenKind::Greater => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::Greater(Box::new(left), Box::new(right))
            }
            TokenKind::GreaterEq => {
                self.pos += 1;
                let right = self.parse_primary_expr();
                Expr::GreaterEq(Box::new(left), Box::new(right))
            }
            _ => left,
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        match self.peek().clone() {
            TokenKind::Not => {
                self.pos += 1;
                let inner = self.parse_primary_expr();
                Expr::Not(Box::new(inner))
            }
            TokenKind::OpenParen => {
                self.pos += 1;
                let inner = self.parse_expr();
                if *self.peek() == TokenKind::CloseParen {
                    self.pos += 1;
                } else {
                    let span = self.current_span();
                    self.diag(span, "expected `)`", DiagSeverity::Error);
                }
                Expr::Paren(Box::new(inner))
            }
            TokenKind::StringLit(s) => {
                let span = self.current_span();
                self.pos += 1;
                Expr::StringLit(s, span)
            }
            TokenKind::Ident(s) => {
                let span = self.current_span();
                self.pos += 1;
                Expr::Symbol(s, span)
            }
            TokenKind::Macro(m) => {
                let span = self.current_span();
                self.pos += 1;
                Expr::Macro(m, span)
            }
            // Bare keywords that can appear in expression position.
            ref tk if is_symbol_like_keyword(tk) => {
                let name = keyword_to_str(tk).to_string();
                let span = self.current_span();
                self.pos += 1;
                Expr::Symbol(name, span)
            }
            _ => {
                let span = self.current_span();
                self.diag(span, "expected expression", DiagSeverity::Error);
                Expr::Symbol(String::new(), span)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn expect_ident(&mut self) -> (String, Span) {
        match self.peek().clone() {
            TokenKind::Ident(s) => {
                let span = self.current_span();
                self.pos += 1;
                (s, span)
            }
            ref tk if is_symbol_like_keyword(tk) => {
                let name = keyword_to_str(tk).to_string();
                let span = self.current_span();
                self.pos += 1;
                (name, span)
            }
            _ => {
                let span = self.current_span();
                self.diag(span, "expected identifier", DiagSeverity::Error);
                (String::new(), span)
            }
        }
    }

    fn expect_string(&mut self) -> (String, Span) {
        match self.peek().clone() {
            TokenKind::StringLit(s) => {
                let span = self.current_span();
                self.pos += 1;
                (s, span)
            }
            TokenKind::Ident(s) => {
                let span = self.current_span();
                self.pos += 1;
                (s, span)
            }
            TokenKind::Macro(m) => {
                let span = self.current_span();
                self.pos += 1;
                (format!("$({})", m), span)
            }
            _ => {
                let span = self.current_span();
                self.diag(span, "expected string", DiagSeverity::Error);
                (String::new(), span)
            }
        }
    }

    fn consume_type_kind(&mut self) -> TypeKind {
        let kind = match self.peek() {
            TokenKind::Bool => TypeKind::Bool,
            TokenKind::Int => TypeKind::Int,
            TokenKind::Hex => TypeKind::Hex,
            TokenKind::StringType => TypeKind::String,
            TokenKind::Float => TypeKind::Float,
            _ => TypeKind::Bool,
        };
        self.pos += 1;
        kind
    }

    fn try_parse_inline_prompt(&mut self) -> Option<PromptAttr> {
        match self.peek() {
            TokenKind::StringLit(_) => {
                let start = self.current_span();
                Some(self.parse_prompt_value(start))
            }
            _ => None,
        }
    }

    fn parse_prompt_value(&mut self, start: Span) -> PromptAttr {
        let (text, text_span) = self.expect_string();
        let condition = self.try_parse_if_condition();
        let span = start.merge(condition.as_ref().map(|e| e.span()).unwrap_or(text_span));
        PromptAttr {
            text,
            text_span,
            condition,
            span,
        }
    }

    fn try_parse_if_condition(&mut self) -> Option<Expr> {
        if *self.peek() == TokenKind::If {
            self.pos += 1;
            Some(self.parse_expr())
        } else {
            None
        }
    }
}

fn is_symbol_like_keyword(tk: &TokenKind) -> bool {
    matches!(
        tk,
        TokenKind::On
            | TokenKind::Bool
            | TokenKind::Int
            | TokenKind::Hex
            | TokenKind::Float
            | TokenKind::Set
            | TokenKind::OptionKw
    )
}

fn keyword_to_str(tk: &TokenKind) -> &'static str {
    match tk {
        TokenKind::On => "on",
        TokenKind::Bool => "bool",
        TokenKind::Int => "int",
        TokenKind::Hex => "hex",
        TokenKind::Float => "float",
        TokenKind::Set => "set",
        TokenKind::OptionKw => "option",
        _ => "",
    }
}

fn attr_span(a: &Attribute) -> Span {
    match a {
        Attribute::Type(t) => t.span,
        Attribute::Prompt(p) => p.span,
        Attribute::Default(d) => d.span,
        Attribute::DependsOn(d) => d.span,
        Attribute::Select(s) => s.span,
        Attribute::Imply(i) => i.span,
        Attribute::Set(s) => s.span,
        Attribute::SetDefault(s) => s.span,
        Attribute::VisibleIf(v) => v.span,
        Attribute::Range(r) => r.span,
        Attribute::Help(h) => h.span,
        Attribute::Warning(w) => w.span,
        Attribute::OptionEnv(o) => o.span,
    }
}
