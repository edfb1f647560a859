use std::path::PathBuf;

use crate::ast::TypeKind;
use crate::expr::ExprId;
use crate::menu::NodeId;

/// Stable index of a symbol in the [`crate::world::World`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Stable index of a choice group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChoiceId(pub u32);

/// Two-valued truth.  The integer form keeps the legacy n=0 / y=2 mapping
/// used when a bool participates in a numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tristate {
    N,
    Y,
}

impl Tristate {
    pub fn from_bool(b: bool) -> Self {
        if b { Tristate::Y } else { Tristate::N }
    }

    pub fn to_bool(self) -> bool {
        self == Tristate::Y
    }

    pub fn to_int(self) -> i64 {
        match self {
            Tristate::N => 0,
            Tristate::Y => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tristate::N => "n",
            Tristate::Y => "y",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Bool,
    Int,
    Hex,
    String,
    Float,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Bool => "bool",
            SymbolKind::Int => "int",
            SymbolKind::Hex => "hex",
            SymbolKind::String => "string",
            SymbolKind::Float => "float",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SymbolKind::Int | SymbolKind::Hex | SymbolKind::Float)
    }
}

impl From<TypeKind> for SymbolKind {
    fn from(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Bool => SymbolKind::Bool,
            TypeKind::Int => SymbolKind::Int,
            TypeKind::Hex => SymbolKind::Hex,
            TypeKind::String => SymbolKind::String,
            TypeKind::Float => SymbolKind::Float,
        }
    }
}

/// A typed symbol value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tristate(Tristate),
    Int(i64),
    Hex(i64),
    Str(String),
    Float(f64),
}

impl Value {
    pub fn zero(kind: SymbolKind) -> Value {
        match kind {
            SymbolKind::Bool => Value::Tristate(Tristate::N),
            SymbolKind::Int => Value::Int(0),
            SymbolKind::Hex => Value::Hex(0),
            SymbolKind::String => Value::Str(String::new()),
            SymbolKind::Float => Value::Float(0.0),
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Value::Tristate(_) => SymbolKind::Bool,
            Value::Int(_) => SymbolKind::Int,
            Value::Hex(_) => SymbolKind::Hex,
            Value::Str(_) => SymbolKind::String,
            Value::Float(_) => SymbolKind::Float,
        }
    }

    /// Parse a raw textual value as the given kind.
    pub fn parse(kind: SymbolKind, raw: &str) -> Result<Value, String> {
        match kind {
            SymbolKind::Bool => match raw {
                "y" => Ok(Value::Tristate(Tristate::Y)),
                "n" => Ok(Value::Tristate(Tristate::N)),
                _ => Err(format!("`{raw}` is not a bool value (expected y or n)")),
            },
            SymbolKind::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("`{raw}` is not an integer")),
            SymbolKind::Hex => {
                let digits = raw
                    .strip_prefix("0x")
                    .or_else(|| raw.strip_prefix("0X"))
                    .unwrap_or(raw);
                i64::from_str_radix(digits, 16)
                    .map(Value::Hex)
                    .map_err(|_| format!("`{raw}` is not a hex value"))
            }
            SymbolKind::String => Ok(Value::Str(raw.to_string())),
            SymbolKind::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("`{raw}` is not a float")),
        }
    }

    /// Canonical textual form: `y`/`n`, signed decimal, `0x` + uppercase
    /// hex, the raw string, or the shortest float representation.
    pub fn to_raw_string(&self) -> String {
        match self {
            Value::Tristate(t) => t.as_str().to_string(),
            Value::Int(v) => v.to_string(),
            Value::Hex(v) => format!("0x{v:X}"),
            Value::Str(s) => s.clone(),
            Value::Float(v) => v.to_string(),
        }
    }

    pub fn as_tristate(&self) -> Tristate {
        match self {
            Value::Tristate(t) => *t,
            Value::Int(v) | Value::Hex(v) => Tristate::from_bool(*v != 0),
            Value::Str(s) => Tristate::from_bool(!s.is_empty() && s != "n"),
            Value::Float(v) => Tristate::from_bool(*v != 0.0),
        }
    }
}

/// Where a stored assignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    CommandLine,
    PrimaryConfig,
    DefaultsFile,
}

/// One user/loader assignment.  `is_default` mirrors the `# default:`
/// pragma: the value was inferred by the system, not chosen by the user.
#[derive(Debug, Clone)]
pub struct UserValue {
    pub raw: String,
    pub origin: Origin,
    pub is_default: bool,
}

impl UserValue {
    /// True when the assignment counts as an explicit user decision
    /// (priority 1 of the value ladder).
    pub fn is_user_decision(&self) -> bool {
        !self.is_default && matches!(self.origin, Origin::CommandLine | Origin::PrimaryConfig)
    }
}

// ---------------------------------------------------------------------------
// Per-symbol option records, kept in declaration order.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct DefaultClause {
    pub value: ExprId,
    pub condition: ExprId,
}

/// `select` / `imply` seen from the target: who forces me, and when.
#[derive(Debug, Clone, Copy)]
pub struct ReverseDep {
    pub source: SymbolId,
    pub condition: ExprId,
}

/// `set` / `set default` seen from the target.
#[derive(Debug, Clone, Copy)]
pub struct SetClause {
    pub source: SymbolId,
    pub value: ExprId,
    pub condition: ExprId,
}

/// `select` / `imply` / `set` seen from the source, for validation and
/// reporting.
#[derive(Debug, Clone)]
pub struct ForwardRef {
    pub target: String,
    pub target_id: Option<SymbolId>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy)]
pub struct RangeClause {
    pub low: ExprId,
    pub high: ExprId,
    pub condition: ExprId,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub condition: ExprId,
}

#[derive(Debug, Clone)]
pub struct WarningClause {
    pub text: String,
    pub condition: ExprId,
}

/// Source position of a declaration, for diagnostics.
#[derive(Debug, Clone)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line + 1)
    }
}

// ---------------------------------------------------------------------------

/// A named configuration option.  Created on first definition or first
/// reference; `is_defined` distinguishes the two.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub kind_declared: bool,
    pub is_defined: bool,
    pub prompt: Option<Prompt>,
    pub help: Option<String>,
    pub warning: Option<WarningClause>,
    /// Conjunction of all `depends on` and enclosing `if`/menu deps.
    pub direct_dep: ExprId,
    pub defaults: Vec<DefaultClause>,
    pub ranges: Vec<RangeClause>,
    /// `option env=` capture: the environment value at parse time.
    pub env_value: Option<String>,

    // Forward records (declared on this symbol).
    pub selects: Vec<ForwardRef>,
    pub implies: Vec<ForwardRef>,
    pub sets: Vec<ForwardRef>,
    pub set_defaults: Vec<ForwardRef>,

    // Reverse records (declared elsewhere, targeting this symbol).
    pub selected_by: Vec<ReverseDep>,
    pub implied_by: Vec<ReverseDep>,
    pub set_by: Vec<SetClause>,
    pub set_default_by: Vec<SetClause>,

    /// Choice this symbol is a member of, if any.
    pub choice: Option<ChoiceId>,
    /// Menu node wrapping this symbol (first definition wins).
    pub node: Option<NodeId>,
    pub locations: Vec<Location>,

    /// Symbols whose computed fields depend on this one.
    pub dependents: Vec<SymbolId>,

    /// Current stored assignment, if any.
    pub user: Option<UserValue>,
}

impl Symbol {
    pub fn new(name: String) -> Self {
        Self {
            name,
            kind: SymbolKind::Bool,
            kind_declared: false,
            is_defined: false,
            prompt: None,
            help: None,
            warning: None,
            direct_dep: ExprId::CONST_Y,
            defaults: Vec::new(),
            ranges: Vec::new(),
            env_value: None,
            selects: Vec::new(),
            implies: Vec::new(),
            sets: Vec::new(),
            set_defaults: Vec::new(),
            selected_by: Vec::new(),
            implied_by: Vec::new(),
            set_by: Vec::new(),
            set_default_by: Vec::new(),
            choice: None,
            node: None,
            locations: Vec::new(),
            dependents: Vec::new(),
            user: None,
        }
    }

    pub fn has_prompt(&self) -> bool {
        self.prompt.is_some()
    }
}

/// A mutually exclusive group of bool symbols.
#[derive(Debug, Clone)]
pub struct Choice {
    pub name: Option<String>,
    pub prompt: Option<Prompt>,
    pub help: Option<String>,
    pub direct_dep: ExprId,
    /// Choice-level `default MEMBER [if expr]` clauses.
    pub defaults: Vec<DefaultClause>,
    /// Member symbols in declaration order.
    pub members: Vec<SymbolId>,
    /// Member picked by the user, if any.
    pub user_selection: Option<SymbolId>,
    pub node: Option<NodeId>,
    pub location: Option<Location>,
}

impl Choice {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            prompt: None,
            help: None,
            direct_dep: ExprId::CONST_Y,
            defaults: Vec::new(),
            members: Vec::new(),
            user_selection: None,
            node: None,
            location: None,
        }
    }
}
