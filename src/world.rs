use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::ast::{self, DiagSeverity, Entry, LineIndex, TypeKind};
use crate::error::{KconfigError, Result};
use crate::eval::EvalCache;
use crate::expr::{CmpOp, ConstValue, ExprArena, ExprId, ExprNode};
use crate::lexer::{Lexer, MacroTable};
use crate::menu::{MenuItem, MenuNode, NodeId};
use crate::parser;
use crate::report::{Category, Report, Severity};
use crate::symbol::{
    Choice, ChoiceId, DefaultClause, ForwardRef, Location, Prompt, RangeClause, ReverseDep,
    SetClause, Symbol, SymbolId, SymbolKind, WarningClause,
};

/// The symbol table, choice table and menu tree of one Kconfig source tree,
/// plus the cached evaluation state maintained by the constraint evaluator.
#[derive(Debug)]
pub struct World {
    pub(crate) syms: Vec<Symbol>,
    pub(crate) sym_index: HashMap<String, SymbolId>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) nodes: Vec<MenuNode>,
    pub(crate) exprs: ExprArena,
    pub(crate) cache: Vec<EvalCache>,
    /// One-shot guard for evaluation-time diagnostics.
    pub(crate) emitted: HashSet<(SymbolId, Category)>,
    pub root: NodeId,
    pub mainmenu: Option<String>,
    pub report: Report,
    macros: MacroTable,
}

impl World {
    fn new(macros: MacroTable) -> Self {
        let mut nodes = Vec::new();
        nodes.push(MenuNode::new(
            MenuItem::Menu {
                title: String::new(),
                visible_if: ExprId::CONST_Y,
            },
            None,
        ));
        Self {
            syms: Vec::new(),
            sym_index: HashMap::new(),
            choices: Vec::new(),
            nodes,
            exprs: ExprArena::new(),
            cache: Vec::new(),
            emitted: HashSet::new(),
            root: NodeId(0),
            mainmenu: None,
            report: Report::new(),
            macros,
        }
    }

    /// Load a Kconfig tree rooted at `path`, capturing the process
    /// environment for `$(NAME)` expansion.
    pub fn load(path: &Path) -> Result<World> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    pub fn load_with_env(path: &Path, env: HashMap<String, String>) -> Result<World> {
        let mut world = World::new(MacroTable::with_env(env));
        let root = world.root;
        world.load_file(path, root, ExprId::CONST_Y, None)?;
        world.finalize()?;
        Ok(world)
    }

    /// Build a world from a single in-memory source, without touching the
    /// file system (`source` directives are rejected).
    pub fn from_source(source: &str) -> Result<World> {
        Self::from_source_with_env(source, HashMap::new())
    }

    pub fn from_source_with_env(source: &str, env: HashMap<String, String>) -> Result<World> {
        let mut world = World::new(MacroTable::with_env(env));
        let root = world.root;
        world.process_source_text(source, Path::new("<input>"), root, ExprId::CONST_Y, None)?;
        world.finalize()?;
        Ok(world)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn sym_id(&self, name: &str) -> Option<SymbolId> {
        self.sym_index.get(name).copied()
    }

    /// Like [`sym_id`](Self::sym_id), but only for defined symbols.
    pub fn defined_sym_id(&self, name: &str) -> Option<SymbolId> {
        self.sym_id(name)
            .filter(|id| self.syms[id.0 as usize].is_defined)
    }

    pub fn sym(&self, id: SymbolId) -> &Symbol {
        &self.syms[id.0 as usize]
    }

    pub(crate) fn sym_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.syms[id.0 as usize]
    }

    pub fn choice(&self, id: ChoiceId) -> &Choice {
        &self.choices[id.0 as usize]
    }

    pub fn node(&self, id: NodeId) -> &MenuNode {
        &self.nodes[id.0 as usize]
    }

    pub fn symbol_count(&self) -> usize {
        self.syms.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    /// All defined symbols in menu declaration order.  Merged definitions
    /// appear once, at their first declaration site.
    pub fn symbols_in_menu_order(&self) -> Vec<SymbolId> {
        let mut out = Vec::new();
        self.collect_menu_symbols(self.root, &mut out);
        out
    }

    fn collect_menu_symbols(&self, node: NodeId, out: &mut Vec<SymbolId>) {
        if let MenuItem::Symbol(id) = self.node(node).item {
            if self.sym(id).node == Some(node) {
                out.push(id);
            }
        }
        for &child in &self.node(node).children {
            self.collect_menu_symbols(child, out);
        }
    }

    // -----------------------------------------------------------------------
    // Tree loading
    // -----------------------------------------------------------------------

    fn load_file(
        &mut self,
        path: &Path,
        parent: NodeId,
        dep: ExprId,
        choice: Option<ChoiceId>,
    ) -> Result<()> {
        log::debug!("loading {}", path.display());
        let source = std::fs::read_to_string(path)?;
        self.process_source_text(&source, path, parent, dep, choice)
    }

    fn process_source_text(
        &mut self,
        source: &str,
        path: &Path,
        parent: NodeId,
        dep: ExprId,
        choice: Option<ChoiceId>,
    ) -> Result<()> {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        let result = parser::parse(source, tokens, lex_diags);
        let line_index = LineIndex::new(source);

        let mut fatal = None;
        for d in &result.diagnostics {
            let (line, _) = line_index.line_col(d.span.start);
            let location = Location {
                file: path.to_path_buf(),
                line,
            };
            match d.severity {
                DiagSeverity::Error => {
                    if fatal.is_none() {
                        fatal = Some(KconfigError::Syntax {
                            file: path.to_path_buf(),
                            line,
                            message: d.message.clone(),
                        });
                    }
                    self.report.add(
                        Severity::Error,
                        Category::Syntax,
                        Some(location),
                        d.message.clone(),
                    );
                }
                DiagSeverity::Warning => {
                    self.report.add(
                        Severity::Warning,
                        Category::Syntax,
                        Some(location),
                        d.message.clone(),
                    );
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }

        let ctx = FileCtx {
            path: path.to_path_buf(),
            line_index,
        };
        self.process_entries(&result.file.entries, &ctx, parent, dep, choice)
    }

    fn process_entries(
        &mut self,
        entries: &[Entry],
        ctx: &FileCtx,
        parent: NodeId,
        dep: ExprId,
        choice: Option<ChoiceId>,
    ) -> Result<()> {
        for entry in entries {
            match entry {
                Entry::Config(c) => {
                    self.define_symbol(c, ctx, parent, dep, choice)?;
                }
                Entry::MenuConfig(c) => {
                    self.define_symbol(c, ctx, parent, dep, choice)?;
                }
                Entry::Choice(ch) => {
                    self.define_choice(ch, ctx, parent, dep)?;
                }
                Entry::Menu(m) => {
                    let mut menu_dep = dep;
                    let mut visible_if = ExprId::CONST_Y;
                    for attr in &m.attributes {
                        match attr {
                            ast::Attribute::DependsOn(d) => {
                                let linked = self.link_expr(&d.expr, ctx)?;
                                menu_dep = self.exprs.and(menu_dep, linked);
                            }
                            ast::Attribute::VisibleIf(v) => {
                                let linked = self.link_expr(&v.expr, ctx)?;
                                visible_if = self.exprs.and(visible_if, linked);
                            }
                            _ => {}
                        }
                    }
                    let title = self.macros.expand_quoted(&m.prompt);
                    let node = self.add_node(
                        MenuItem::Menu { title, visible_if },
                        parent,
                    );
                    self.process_entries(&m.entries, ctx, node, menu_dep, choice)?;
                }
                Entry::If(i) => {
                    let cond = self.link_expr(&i.condition, ctx)?;
                    let node = self.add_node(MenuItem::If(cond), parent);
                    let inner_dep = self.exprs.and(dep, cond);
                    self.process_entries(&i.entries, ctx, node, inner_dep, choice)?;
                }
                Entry::Comment(cm) => {
                    let mut comment_dep = dep;
                    for attr in &cm.attributes {
                        if let ast::Attribute::DependsOn(d) = attr {
                            let linked = self.link_expr(&d.expr, ctx)?;
                            comment_dep = self.exprs.and(comment_dep, linked);
                        }
                    }
                    let text = self.macros.expand_quoted(&cm.prompt);
                    self.add_node(
                        MenuItem::Comment {
                            text,
                            dep: comment_dep,
                        },
                        parent,
                    );
                }
                Entry::Source(s) => {
                    self.process_source_entry(s, ctx, parent, dep, choice)?;
                }
                Entry::MainMenu(m) => {
                    self.mainmenu = Some(self.macros.expand_quoted(&m.prompt));
                }
                Entry::MacroAssign(a) => {
                    if a.immediate {
                        self.macros.define_immediate(&a.name, &a.value);
                    } else {
                        self.macros.define(&a.name, &a.value);
                    }
                }
            }
        }
        Ok(())
    }

    fn process_source_entry(
        &mut self,
        s: &ast::SourceEntry,
        ctx: &FileCtx,
        parent: NodeId,
        dep: ExprId,
        choice: Option<ChoiceId>,
    ) -> Result<()> {
        let expanded = self.macros.expand_quoted(&s.path);
        let target = if s.kind.is_relative() {
            ctx.path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&expanded)
        } else {
            PathBuf::from(&expanded)
        };
        if !target.is_file() {
            if s.kind.is_optional() {
                self.report.add(
                    Severity::Info,
                    Category::Syntax,
                    Some(ctx.location(s.path_span)),
                    format!("optional source `{}` not found", target.display()),
                );
                return Ok(());
            }
            return Err(KconfigError::MissingSource(target));
        }
        self.load_file(&target, parent, dep, choice)
    }

    fn add_node(&mut self, item: MenuItem, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MenuNode::new(item, Some(parent)));
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    // -----------------------------------------------------------------------
    // Symbol and choice definition
    // -----------------------------------------------------------------------

    pub(crate) fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.sym_index.get(name) {
            return id;
        }
        let id = SymbolId(self.syms.len() as u32);
        self.syms.push(Symbol::new(name.to_string()));
        self.sym_index.insert(name.to_string(), id);
        id
    }

    fn define_symbol(
        &mut self,
        entry: &ast::ConfigEntry,
        ctx: &FileCtx,
        parent: NodeId,
        dep: ExprId,
        choice: Option<ChoiceId>,
    ) -> Result<()> {
        let id = self.intern(&entry.name);
        let location = ctx.location(entry.name_span);

        if self.sym(id).is_defined && !entry.ignore_multiple_definition {
            let first = self.sym(id).locations.first().cloned();
            let earlier = first
                .map(|l| format!(" (first defined at {l})"))
                .unwrap_or_default();
            self.report.add(
                Severity::Notification,
                Category::MultipleDefinition,
                Some(location.clone()),
                format!("symbol {} is defined multiple times{earlier}", entry.name),
            );
        }
        self.sym_mut(id).is_defined = true;
        self.sym_mut(id).locations.push(location.clone());

        // Wrap in a menu node; the first definition owns the write position.
        let node = self.add_node(MenuItem::Symbol(id), parent);
        if self.sym(id).node.is_none() {
            self.sym_mut(id).node = Some(node);
        }

        // The enclosing if/menu dependencies join the direct deps.
        let dd = self.sym(id).direct_dep;
        let combined = self.exprs.and(dd, dep);
        self.sym_mut(id).direct_dep = combined;

        if let Some(choice_id) = choice {
            if self.sym(id).choice.is_none() {
                self.sym_mut(id).choice = Some(choice_id);
                self.choices[choice_id.0 as usize].members.push(id);
            }
        }

        for attr in &entry.attributes {
            self.apply_attribute(id, attr, ctx, dep, &location)?;
        }
        Ok(())
    }

    fn apply_attribute(
        &mut self,
        id: SymbolId,
        attr: &ast::Attribute,
        ctx: &FileCtx,
        dep: ExprId,
        location: &Location,
    ) -> Result<()> {
        match attr {
            ast::Attribute::Type(t) => {
                self.set_kind(id, SymbolKind::from(t.kind), location);
                if let Some(p) = &t.prompt {
                    self.set_prompt(id, p, ctx, location)?;
                }
            }
            ast::Attribute::Prompt(p) => {
                self.set_prompt(id, p, ctx, location)?;
            }
            ast::Attribute::Default(d) => {
                let value = self.link_expr(&d.value, ctx)?;
                let condition = self.link_condition(d.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).defaults.push(DefaultClause { value, condition });
            }
            ast::Attribute::DependsOn(d) => {
                let linked = self.link_expr(&d.expr, ctx)?;
                let dd = self.sym(id).direct_dep;
                let combined = self.exprs.and(dd, linked);
                self.sym_mut(id).direct_dep = combined;
            }
            ast::Attribute::Select(s) => {
                let target = self.intern(&s.symbol);
                let condition = self.link_condition(s.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).selects.push(ForwardRef {
                    target: s.symbol.clone(),
                    target_id: Some(target),
                    location: location.clone(),
                });
                self.sym_mut(target).selected_by.push(ReverseDep {
                    source: id,
                    condition,
                });
            }
            ast::Attribute::Imply(s) => {
                let target = self.intern(&s.symbol);
                let condition = self.link_condition(s.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).implies.push(ForwardRef {
                    target: s.symbol.clone(),
                    target_id: Some(target),
                    location: location.clone(),
                });
                self.sym_mut(target).implied_by.push(ReverseDep {
                    source: id,
                    condition,
                });
            }
            ast::Attribute::Set(s) => {
                let target = self.intern(&s.symbol);
                let value = self.link_expr(&s.value, ctx)?;
                let condition = self.link_condition(s.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).sets.push(ForwardRef {
                    target: s.symbol.clone(),
                    target_id: Some(target),
                    location: location.clone(),
                });
                self.sym_mut(target).set_by.push(SetClause {
                    source: id,
                    value,
                    condition,
                });
            }
            ast::Attribute::SetDefault(s) => {
                let target = self.intern(&s.symbol);
                let value = self.link_expr(&s.value, ctx)?;
                let condition = self.link_condition(s.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).set_defaults.push(ForwardRef {
                    target: s.symbol.clone(),
                    target_id: Some(target),
                    location: location.clone(),
                });
                self.sym_mut(target).set_default_by.push(SetClause {
                    source: id,
                    value,
                    condition,
                });
            }
            ast::Attribute::Range(r) => {
                let low = self.link_expr(&r.low, ctx)?;
                let high = self.link_expr(&r.high, ctx)?;
                let condition = self.link_condition(r.condition.as_ref(), ctx, dep)?;
                self.sym_mut(id).ranges.push(RangeClause {
                    low,
                    high,
                    condition,
                });
            }
            ast::Attribute::Help(h) => {
                if self.sym(id).help.is_none() {
                    self.sym_mut(id).help = Some(h.text.clone());
                }
            }
            ast::Attribute::Warning(w) => {
                let condition = self.link_condition(w.condition.as_ref(), ctx, ExprId::CONST_Y)?;
                let text = self.macros.expand_quoted(&w.text);
                self.sym_mut(id).warning = Some(WarningClause { text, condition });
            }
            ast::Attribute::OptionEnv(o) => {
                let message =
                    format!("`option env` is deprecated (symbol {})", self.sym(id).name);
                self.report.add(
                    Severity::Info,
                    Category::DeprecatedSyntax,
                    Some(location.clone()),
                    message,
                );
                let value = self.macros.lookup(&o.name);
                self.sym_mut(id).env_value = value;
            }
            ast::Attribute::VisibleIf(v) => {
                self.report.add(
                    Severity::Error,
                    Category::Syntax,
                    Some(ctx.location(v.span)),
                    "`visible if` is only valid on menus",
                );
            }
        }
        Ok(())
    }

    fn set_kind(&mut self, id: SymbolId, kind: SymbolKind, location: &Location) {
        let sym = self.sym(id);
        if sym.kind_declared && sym.kind != kind {
            let message = format!(
                "symbol {} redefined with conflicting type {} (was {})",
                sym.name,
                kind.as_str(),
                sym.kind.as_str()
            );
            self.report
                .add(Severity::Error, Category::Syntax, Some(location.clone()), message);
            return;
        }
        let sym = self.sym_mut(id);
        sym.kind = kind;
        sym.kind_declared = true;
    }

    fn set_prompt(
        &mut self,
        id: SymbolId,
        p: &ast::PromptAttr,
        ctx: &FileCtx,
        location: &Location,
    ) -> Result<()> {
        let condition = self.link_condition(p.condition.as_ref(), ctx, ExprId::CONST_Y)?;
        let text = self.macros.expand_quoted(&p.text);
        if self.sym(id).prompt.is_some() {
            let message = format!("symbol {} already has a prompt", self.sym(id).name);
            self.report.add(
                Severity::Warning,
                Category::Syntax,
                Some(location.clone()),
                message,
            );
            return Ok(());
        }
        self.sym_mut(id).prompt = Some(Prompt { text, condition });
        Ok(())
    }

    fn define_choice(
        &mut self,
        entry: &ast::ChoiceEntry,
        ctx: &FileCtx,
        parent: NodeId,
        dep: ExprId,
    ) -> Result<()> {
        let choice_id = ChoiceId(self.choices.len() as u32);
        self.choices.push(Choice::new(entry.name.clone()));
        let node = self.add_node(MenuItem::Choice(choice_id), parent);
        self.choices[choice_id.0 as usize].node = Some(node);
        let (line, _) = ctx.line_index.line_col(entry.span.start);
        self.choices[choice_id.0 as usize].location = Some(Location {
            file: ctx.path.clone(),
            line,
        });

        let mut choice_dep = dep;
        for attr in &entry.attributes {
            match attr {
                ast::Attribute::Prompt(p) => {
                    let condition = self.link_condition(p.condition.as_ref(), ctx, ExprId::CONST_Y)?;
                    let text = self.macros.expand_quoted(&p.text);
                    self.choices[choice_id.0 as usize].prompt = Some(Prompt { text, condition });
                }
                ast::Attribute::Type(t) => {
                    if t.kind != TypeKind::Bool {
                        self.report.add(
                            Severity::Error,
                            Category::Syntax,
                            Some(ctx.location(t.span)),
                            "choices must be bool",
                        );
                    }
                    if let Some(p) = &t.prompt {
                        let condition =
                            self.link_condition(p.condition.as_ref(), ctx, ExprId::CONST_Y)?;
                        let text = self.macros.expand_quoted(&p.text);
                        self.choices[choice_id.0 as usize].prompt = Some(Prompt { text, condition });
                    }
                }
                ast::Attribute::Default(d) => {
                    let value = self.link_expr(&d.value, ctx)?;
                    let condition = self.link_condition(d.condition.as_ref(), ctx, dep)?;
                    self.choices[choice_id.0 as usize]
                        .defaults
                        .push(DefaultClause { value, condition });
                }
                ast::Attribute::DependsOn(d) => {
                    let linked = self.link_expr(&d.expr, ctx)?;
                    choice_dep = self.exprs.and(choice_dep, linked);
                }
                ast::Attribute::Help(h) => {
                    self.choices[choice_id.0 as usize].help = Some(h.text.clone());
                }
                _ => {}
            }
        }
        self.choices[choice_id.0 as usize].direct_dep = choice_dep;

        self.process_entries(&entry.entries, ctx, node, choice_dep, Some(choice_id))
    }

    // -----------------------------------------------------------------------
    // Expression linking
    // -----------------------------------------------------------------------

    /// Link an optional `if` condition and fold in the enclosing
    /// dependencies of the declaration site.
    fn link_condition(
        &mut self,
        cond: Option<&ast::Expr>,
        ctx: &FileCtx,
        dep: ExprId,
    ) -> Result<ExprId> {
        let linked = match cond {
            Some(e) => self.link_expr(e, ctx)?,
            None => ExprId::CONST_Y,
        };
        Ok(self.exprs.and(linked, dep))
    }

    fn link_expr(&mut self, expr: &ast::Expr, ctx: &FileCtx) -> Result<ExprId> {
        Ok(match expr {
            ast::Expr::Symbol(name, _) => self.link_leaf(name),
            ast::Expr::StringLit(text, _) => {
                let expanded = self.macros.expand_quoted(text);
                self.exprs.push(ExprNode::Const(ConstValue::Str(expanded)))
            }
            ast::Expr::Macro(name, span) => {
                match self.macros.expand_bare(&format!("$({name})")) {
                    Ok(text) => self.link_leaf(&text),
                    Err(missing) => {
                        return Err(KconfigError::Syntax {
                            file: ctx.path.clone(),
                            line: ctx.line_index.line_col(span.start).0,
                            message: format!("undefined macro or variable `{missing}`"),
                        });
                    }
                }
            }
            ast::Expr::Not(e) => {
                let inner = self.link_expr(e, ctx)?;
                self.exprs.push(ExprNode::Not(inner))
            }
            ast::Expr::Paren(e) => self.link_expr(e, ctx)?,
            ast::Expr::And(a, b) => {
                let a = self.link_expr(a, ctx)?;
                let b = self.link_expr(b, ctx)?;
                self.exprs.push(ExprNode::And(a, b))
            }
            ast::Expr::Or(a, b) => {
                let a = self.link_expr(a, ctx)?;
                let b = self.link_expr(b, ctx)?;
                self.exprs.push(ExprNode::Or(a, b))
            }
            ast::Expr::Eq(a, b) => self.link_cmp(CmpOp::Eq, a, b, ctx)?,
            ast::Expr::NotEq(a, b) => self.link_cmp(CmpOp::NotEq, a, b, ctx)?,
            ast::Expr::Less(a, b) => self.link_cmp(CmpOp::Less, a, b, ctx)?,
            ast::Expr::LessEq(a, b) => self.link_cmp(CmpOp::LessEq, a, b, ctx)?,
            ast::Expr::Greater(a, b) => self.link_cmp(CmpOp::Greater, a, b, ctx)?,
            ast::Expr::GreaterEq(a, b) => self.link_cmp(CmpOp::GreaterEq, a, b, ctx)?,
        })
    }

    fn link_cmp(
        &mut self,
        op: CmpOp,
        a: &ast::Expr,
        b: &ast::Expr,
        ctx: &FileCtx,
    ) -> Result<ExprId> {
        let a = self.link_expr(a, ctx)?;
        let b = self.link_expr(b, ctx)?;
        Ok(self.exprs.push(ExprNode::Cmp(op, a, b)))
    }

    /// Classify a bare word: tristate literal, numeric literal, or symbol
    /// reference.  Symbols win only when no literal shape matches, so a
    /// symbol literally named `42` cannot be referenced - same trade-off
    /// as the original language.
    fn link_leaf(&mut self, word: &str) -> ExprId {
        match word {
            "y" => return ExprId::CONST_Y,
            "n" => return ExprId::CONST_N,
            _ => {}
        }
        if let Some(rest) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
            if let Ok(v) = i64::from_str_radix(rest, 16) {
                return self.exprs.push(ExprNode::Const(ConstValue::Hex(v)));
            }
        }
        if let Ok(v) = word.parse::<i64>() {
            return self.exprs.push(ExprNode::Const(ConstValue::Int(v)));
        }
        if word.contains('.') {
            if let Ok(v) = word.parse::<f64>() {
                return self.exprs.push(ExprNode::Const(ConstValue::Float(v)));
            }
        }
        let id = self.intern(word);
        self.exprs.push(ExprNode::Symbol(id))
    }

    // -----------------------------------------------------------------------
    // Post-parse validation and dependency graph
    // -----------------------------------------------------------------------

    fn finalize(&mut self) -> Result<()> {
        self.validate_reverse_deps();
        self.validate_choices();
        self.install_env_defaults();
        self.build_dependents();
        self.cache = vec![EvalCache::default(); self.syms.len()];
        if self.report.has_errors() {
            let first = self
                .report
                .diagnostics()
                .iter()
                .find(|d| d.severity == Severity::Error)
                .map(|d| d.message.clone())
                .unwrap_or_default();
            return Err(KconfigError::Config(first));
        }
        Ok(())
    }

    /// `select`/`imply`/`set`/`set default` require a bool source; the
    /// first two additionally require a bool target.
    fn validate_reverse_deps(&mut self) {
        let mut errors = Vec::new();
        let mut notes = Vec::new();
        for sym in &self.syms {
            if !sym.is_defined {
                continue;
            }
            let has_reverse = !sym.selects.is_empty()
                || !sym.implies.is_empty()
                || !sym.sets.is_empty()
                || !sym.set_defaults.is_empty();
            if has_reverse && sym.kind != SymbolKind::Bool {
                errors.push((
                    sym.locations.first().cloned(),
                    format!(
                        "symbol {} is {} but declares reverse dependencies (bool required)",
                        sym.name,
                        sym.kind.as_str()
                    ),
                ));
            }
            for fr in sym.selects.iter().chain(sym.implies.iter()) {
                if let Some(target) = fr.target_id {
                    let t = &self.syms[target.0 as usize];
                    if !t.is_defined {
                        notes.push((
                            Some(fr.location.clone()),
                            format!(
                                "{} targets undefined symbol {}",
                                sym.name, fr.target
                            ),
                        ));
                    } else if t.kind != SymbolKind::Bool {
                        errors.push((
                            Some(fr.location.clone()),
                            format!(
                                "{} selects/implies {} which is {} (bool required)",
                                sym.name,
                                fr.target,
                                t.kind.as_str()
                            ),
                        ));
                    }
                }
            }
            for fr in sym.sets.iter().chain(sym.set_defaults.iter()) {
                if let Some(target) = fr.target_id {
                    let t = &self.syms[target.0 as usize];
                    if !t.is_defined {
                        notes.push((
                            Some(fr.location.clone()),
                            format!("{} sets undefined symbol {}", sym.name, fr.target),
                        ));
                    }
                }
            }
        }
        for (loc, msg) in errors {
            self.report.add(Severity::Error, Category::Syntax, loc, msg);
        }
        for (loc, msg) in notes {
            self.report
                .add(Severity::Notification, Category::UnusedReverseDep, loc, msg);
        }
    }

    fn validate_choices(&mut self) {
        let mut errors = Vec::new();
        for choice in &self.choices {
            for &m in &choice.members {
                let sym = &self.syms[m.0 as usize];
                if sym.kind != SymbolKind::Bool {
                    errors.push((
                        sym.locations.first().cloned(),
                        format!("choice member {} must be bool", sym.name),
                    ));
                }
            }
        }
        for (loc, msg) in errors {
            self.report.add(Severity::Error, Category::Syntax, loc, msg);
        }
    }

    /// `option env=` becomes the highest-priority default clause.
    fn install_env_defaults(&mut self) {
        for i in 0..self.syms.len() {
            let Some(value) = self.syms[i].env_value.clone() else {
                continue;
            };
            let kind = self.syms[i].kind;
            let node = match crate::symbol::Value::parse(kind, &value) {
                Ok(v) => match v {
                    crate::symbol::Value::Tristate(t) => ConstValue::Tristate(t),
                    crate::symbol::Value::Int(v) => ConstValue::Int(v),
                    crate::symbol::Value::Hex(v) => ConstValue::Hex(v),
                    crate::symbol::Value::Str(s) => ConstValue::Str(s),
                    crate::symbol::Value::Float(v) => ConstValue::Float(v),
                },
                Err(_) => ConstValue::Str(value),
            };
            let expr = self.exprs.push(ExprNode::Const(node));
            self.syms[i].defaults.insert(
                0,
                DefaultClause {
                    value: expr,
                    condition: ExprId::CONST_Y,
                },
            );
        }
    }

    /// Build the reverse adjacency lists used for incremental invalidation.
    fn build_dependents(&mut self) {
        let mut edges: Vec<(SymbolId, SymbolId)> = Vec::new();
        let mut refs = Vec::new();

        for (i, sym) in self.syms.iter().enumerate() {
            let me = SymbolId(i as u32);
            let mut exprs = vec![sym.direct_dep];
            if let Some(p) = &sym.prompt {
                exprs.push(p.condition);
            }
            if let Some(w) = &sym.warning {
                exprs.push(w.condition);
            }
            for d in &sym.defaults {
                exprs.push(d.value);
                exprs.push(d.condition);
            }
            for r in &sym.ranges {
                exprs.push(r.low);
                exprs.push(r.high);
                exprs.push(r.condition);
            }
            for rd in sym.selected_by.iter().chain(sym.implied_by.iter()) {
                edges.push((rd.source, me));
                exprs.push(rd.condition);
            }
            for sc in sym.set_by.iter().chain(sym.set_default_by.iter()) {
                edges.push((sc.source, me));
                exprs.push(sc.value);
                exprs.push(sc.condition);
            }
            for e in exprs {
                refs.clear();
                self.exprs.collect_symbols(e, &mut refs);
                for r in &refs {
                    edges.push((*r, me));
                }
            }
        }

        // Choice members influence each other and depend on the choice's
        // own condition symbols.
        for choice in &self.choices {
            let mut cond_syms = Vec::new();
            self.exprs.collect_symbols(choice.direct_dep, &mut cond_syms);
            for d in &choice.defaults {
                self.exprs.collect_symbols(d.value, &mut cond_syms);
                self.exprs.collect_symbols(d.condition, &mut cond_syms);
            }
            for &a in &choice.members {
                for &b in &choice.members {
                    if a != b {
                        edges.push((a, b));
                    }
                }
                for &c in &cond_syms {
                    edges.push((c, a));
                }
            }
        }

        // `visible if` on a menu affects every descendant's visibility.
        for node_idx in 0..self.nodes.len() {
            let MenuItem::Menu { visible_if, .. } = &self.nodes[node_idx].item else {
                continue;
            };
            let visible_if = *visible_if;
            if visible_if == ExprId::CONST_Y {
                continue;
            }
            refs.clear();
            self.exprs.collect_symbols(visible_if, &mut refs);
            if refs.is_empty() {
                continue;
            }
            let mut descendants = Vec::new();
            self.collect_menu_symbols(NodeId(node_idx as u32), &mut descendants);
            for &d in &descendants {
                for r in &refs {
                    edges.push((*r, d));
                }
            }
        }

        for (from, to) in edges {
            self.syms[from.0 as usize].dependents.push(to);
        }
        for sym in &mut self.syms {
            sym.dependents.sort_unstable();
            sym.dependents.dedup();
        }
    }

    // -----------------------------------------------------------------------
    // Rendering helpers
    // -----------------------------------------------------------------------

    /// Render a linked expression back to Kconfig syntax, for diagnostics
    /// and documentation.
    pub fn expr_to_string(&self, id: ExprId) -> String {
        match self.exprs.get(id) {
            ExprNode::Const(c) => match c {
                ConstValue::Tristate(t) => t.as_str().to_string(),
                ConstValue::Int(v) => v.to_string(),
                ConstValue::Hex(v) => format!("0x{v:X}"),
                ConstValue::Str(s) => format!("\"{s}\""),
                ConstValue::Float(v) => v.to_string(),
            },
            ExprNode::Symbol(s) => self.sym(*s).name.clone(),
            ExprNode::Not(e) => format!("!{}", self.expr_to_string(*e)),
            ExprNode::And(a, b) => {
                format!("({} && {})", self.expr_to_string(*a), self.expr_to_string(*b))
            }
            ExprNode::Or(a, b) => {
                format!("({} || {})", self.expr_to_string(*a), self.expr_to_string(*b))
            }
            ExprNode::Cmp(op, a, b) => format!(
                "{} {} {}",
                self.expr_to_string(*a),
                op.as_str(),
                self.expr_to_string(*b)
            ),
        }
    }
}

struct FileCtx {
    path: PathBuf,
    line_index: LineIndex,
}

impl FileCtx {
    fn location(&self, span: crate::ast::Span) -> Location {
        let (line, _) = self.line_index.line_col(span.start);
        Location {
            file: self.path.clone(),
            line,
        }
    }
}
