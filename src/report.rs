use crate::symbol::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Notification,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Notification => "notification",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Category tag for grouping and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Syntax,
    MultipleDefinition,
    /// Stored value disagrees with the Kconfig default (prompt-bearing).
    DefaultMismatch,
    /// Stored value disagrees with the Kconfig default (promptless).
    PromptlessMismatch,
    /// Reverse dependency whose target is never defined.
    UnusedReverseDep,
    /// `select`/`set` forced a value against the target's dependencies.
    ReverseDepOverride,
    DefaultTypeMismatch,
    RangeViolation,
    UndefinedSymbol,
    DeprecatedSyntax,
    Style,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Syntax => "syntax",
            Category::MultipleDefinition => "multiple-definition",
            Category::DefaultMismatch => "default-mismatch",
            Category::PromptlessMismatch => "promptless-mismatch",
            Category::UnusedReverseDep => "unused-reverse-dependency",
            Category::ReverseDepOverride => "reverse-dependency-override",
            Category::DefaultTypeMismatch => "default-type-mismatch",
            Category::RangeViolation => "range-violation",
            Category::UndefinedSymbol => "undefined-symbol",
            Category::DeprecatedSyntax => "deprecated-syntax",
            Category::Style => "style",
        }
    }

    /// Categories that only surface at verbose level.
    fn verbose_only(self) -> bool {
        matches!(self, Category::PromptlessMismatch)
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub location: Option<Location>,
    pub message: String,
}

/// Overall outcome of a run, derived from the worst collected severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    OkWithNotifications,
    OkWithWarnings,
    Failed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::OkWithNotifications => "ok_with_notifications",
            Status::OkWithWarnings => "ok_with_warnings",
            Status::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Default,
    Verbose,
}

impl Verbosity {
    /// Read `KCONFIG_REPORT_VERBOSITY`; unknown values fall back to the
    /// default level.
    pub fn from_env() -> Self {
        match std::env::var("KCONFIG_REPORT_VERBOSITY").as_deref() {
            Ok("quiet") => Verbosity::Quiet,
            Ok("verbose") => Verbosity::Verbose,
            _ => Verbosity::Default,
        }
    }
}

/// Collects diagnostics from all phases and aggregates them into a status.
#[derive(Debug, Clone, Default)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        severity: Severity,
        category: Category,
        location: Option<Location>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            location,
            message: message.into(),
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn extend(&mut self, other: Report) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn status(&self) -> Status {
        let worst = self
            .diagnostics
            .iter()
            .map(|d| d.severity)
            .max()
            .unwrap_or(Severity::Info);
        match worst {
            Severity::Info => Status::Ok,
            Severity::Notification => Status::OkWithNotifications,
            Severity::Warning => Status::OkWithWarnings,
            Severity::Error => Status::Failed,
        }
    }

    /// Echo every diagnostic that the verbosity level admits through the
    /// `log` facade (stderr), leaving stdout to the protocol.
    pub fn emit(&self, verbosity: Verbosity) {
        self.emit_from(0, verbosity);
    }

    /// Emit diagnostics starting at `start`; returns the new high-water
    /// mark so callers can emit incrementally.
    pub fn emit_from(&self, start: usize, verbosity: Verbosity) -> usize {
        for d in &self.diagnostics[start.min(self.diagnostics.len())..] {
            if !Self::admitted(d, verbosity) {
                continue;
            }
            let loc = d
                .location
                .as_ref()
                .map(|l| format!("{l}: "))
                .unwrap_or_default();
            match d.severity {
                Severity::Error => log::error!("{}{} [{}]", loc, d.message, d.category.as_str()),
                Severity::Warning => log::warn!("{}{} [{}]", loc, d.message, d.category.as_str()),
                Severity::Notification | Severity::Info => {
                    log::info!("{}{} [{}]", loc, d.message, d.category.as_str())
                }
            }
        }
        self.diagnostics.len()
    }

    fn admitted(d: &Diagnostic, verbosity: Verbosity) -> bool {
        match verbosity {
            Verbosity::Quiet => d.severity == Severity::Error,
            Verbosity::Default => {
                d.severity >= Severity::Notification && !d.category.verbose_only()
            }
            Verbosity::Verbose => true,
        }
    }
}
