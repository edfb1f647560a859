use std::path::Path;

use crate::error::Result;
use crate::menu::{MenuItem, NodeId};
use crate::renames::RenameMap;
use crate::report::{Category, Severity};
use crate::symbol::{Origin, SymbolId, Tristate, Value};
use crate::world::World;

pub const CONFIG_PREFIX: &str = "CONFIG_";
const DEFAULT_PRAGMA: &str = "# default:";
const DEPRECATED_BANNER: &str = "# Deprecated options for backward compatibility";
const DEPRECATED_END: &str = "# End of deprecated options";

/// What wins when a stored default-marked value disagrees with the
/// Kconfig default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultsPolicy {
    /// Keep the stored value (the default).
    Sdkconfig,
    /// Adopt the Kconfig default.
    Kconfig,
    /// Leave the conflict to the surrounding UI.
    Interactive,
}

impl DefaultsPolicy {
    /// Read `KCONFIG_DEFAULTS_POLICY`; unknown values keep the default.
    pub fn from_env() -> Self {
        match std::env::var("KCONFIG_DEFAULTS_POLICY").as_deref() {
            Ok("kconfig") => DefaultsPolicy::Kconfig,
            Ok("interactive") => DefaultsPolicy::Interactive,
            _ => DefaultsPolicy::Sdkconfig,
        }
    }
}

/// One unresolved stored-vs-Kconfig conflict, handed to the caller under
/// the interactive policy.
#[derive(Debug, Clone)]
pub struct DefaultConflict {
    pub name: String,
    pub stored: String,
    pub kconfig: String,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Conflicts the interactive policy left open.  Calling
    /// [`World::reset_symbol`] on a name adopts the Kconfig side.
    pub conflicts: Vec<DefaultConflict>,
}

struct Record {
    name: String,
    raw: String,
    is_default: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn load_config(
    world: &mut World,
    path: &Path,
    origin: Origin,
    renames: Option<&RenameMap>,
    policy: DefaultsPolicy,
) -> Result<LoadOutcome> {
    let text = std::fs::read_to_string(path)?;
    Ok(load_config_str(world, &text, origin, renames, policy))
}

pub fn load_config_str(
    world: &mut World,
    text: &str,
    origin: Origin,
    renames: Option<&RenameMap>,
    policy: DefaultsPolicy,
) -> LoadOutcome {
    let records = parse_records(world, text);
    let mut outcome = LoadOutcome::default();
    let mut loaded: Vec<(SymbolId, Record)> = Vec::new();
    let mut promptless: Vec<(SymbolId, Record)> = Vec::new();
    let mut assigned = std::collections::HashSet::new();

    for rec in records {
        let id = resolve_record_name(world, &rec.name, renames);
        let Some(id) = id else {
            world.report.add(
                Severity::Warning,
                Category::UndefinedSymbol,
                None,
                format!("configuration sets unknown symbol {}{}", CONFIG_PREFIX, rec.name),
            );
            continue;
        };

        // Stored values for promptless symbols are ignored; they only
        // rate a (verbose) warning when they disagree with the default,
        // checked after every record is in place.
        if !world.sym(id).has_prompt() {
            promptless.push((id, rec));
            continue;
        }

        // The first record for a symbol wins; later ones come from the
        // deprecated compatibility section and carry the same value.
        if !assigned.insert(id) {
            log::debug!("duplicate record for {} ignored", rec.name);
            continue;
        }

        let name = world.sym(id).name.clone();
        let is_default = rec.is_default || origin == Origin::DefaultsFile;
        match world.install_loaded_value(&name, &rec.raw, origin, is_default) {
            Ok(()) => loaded.push((id, rec)),
            Err(message) => {
                world
                    .report
                    .add(Severity::Warning, Category::Syntax, None, message);
            }
        }
    }

    for (id, rec) in &promptless {
        let kind = world.sym(*id).kind;
        let computed = world.value(*id);
        let differs = match Value::parse(kind, &rec.raw) {
            Ok(stored) => stored != computed,
            Err(_) => true,
        };
        if differs {
            let name = world.sym(*id).name.clone();
            let message = format!(
                "ignoring stored value {} for promptless symbol {name} \
                 (the Kconfig default is {})",
                rec.raw,
                computed.to_raw_string()
            );
            world
                .report
                .add(Severity::Warning, Category::PromptlessMismatch, None, message);
        }
    }

    // Mismatch pass: effective values may disagree with what was read
    // (failed dependencies, reverse overrides, changed Kconfig defaults).
    for (id, rec) in &loaded {
        let kind = world.sym(*id).kind;
        let Ok(stored) = Value::parse(kind, &rec.raw) else {
            continue;
        };
        let effective = world.value(*id);
        let name = world.sym(*id).name.clone();
        if effective != stored {
            let message = format!(
                "stored value {} for {name} differs from the effective value {}",
                stored.to_raw_string(),
                effective.to_raw_string()
            );
            world
                .report
                .add(Severity::Notification, Category::DefaultMismatch, None, message);
        }

        if rec.is_default || origin == Origin::DefaultsFile {
            apply_defaults_policy(world, *id, &stored, policy, &mut outcome);
        }
    }
    outcome
}

/// Compare a default-marked record against the value the Kconfig tree
/// would produce without it, and let the policy pick a side.
fn apply_defaults_policy(
    world: &mut World,
    id: SymbolId,
    stored: &Value,
    policy: DefaultsPolicy,
    outcome: &mut LoadOutcome,
) {
    let saved = world.sym(id).user.clone();
    world.sym_mut(id).user = None;
    world.invalidate(id);
    let kconfig_default = world.value(id);
    world.sym_mut(id).user = saved;
    world.invalidate(id);

    if kconfig_default == *stored {
        return;
    }
    let name = world.sym(id).name.clone();
    let message = format!(
        "stored default {} for {name} disagrees with the Kconfig default {}",
        stored.to_raw_string(),
        kconfig_default.to_raw_string()
    );
    world
        .report
        .add(Severity::Notification, Category::DefaultMismatch, None, message);
    match policy {
        DefaultsPolicy::Sdkconfig => {}
        DefaultsPolicy::Kconfig => world.reset_symbol(id),
        DefaultsPolicy::Interactive => outcome.conflicts.push(DefaultConflict {
            name: world.sym(id).name.clone(),
            stored: stored.to_raw_string(),
            kconfig: kconfig_default.to_raw_string(),
        }),
    }
}

fn resolve_record_name(
    world: &World,
    name: &str,
    renames: Option<&RenameMap>,
) -> Option<SymbolId> {
    match renames {
        Some(map) => map
            .candidates(name)
            .iter()
            .find_map(|n| world.defined_sym_id(n)),
        None => world.defined_sym_id(name),
    }
}

fn parse_records(world: &mut World, text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut pending_default = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == DEFAULT_PRAGMA {
            pending_default = true;
            continue;
        }
        if let Some(name) = not_set_record(trimmed) {
            records.push(Record {
                name: name.to_string(),
                raw: "n".to_string(),
                is_default: std::mem::take(&mut pending_default),
            });
            continue;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = trimmed.find('=') else {
            world.report.add(
                Severity::Warning,
                Category::Syntax,
                None,
                format!("unrecognized configuration line: {trimmed}"),
            );
            continue;
        };
        let name = trimmed[..eq].trim();
        let value = trimmed[eq + 1..].trim();
        let Some(name) = name.strip_prefix(CONFIG_PREFIX) else {
            world.report.add(
                Severity::Warning,
                Category::Syntax,
                None,
                format!("unrecognized configuration line: {trimmed}"),
            );
            continue;
        };
        let raw = if value.starts_with('"') {
            match unescape(value) {
                Some(s) => s,
                None => {
                    world.report.add(
                        Severity::Warning,
                        Category::Syntax,
                        None,
                        format!("unterminated string for {CONFIG_PREFIX}{name}"),
                    );
                    pending_default = false;
                    continue;
                }
            }
        } else {
            value.to_string()
        };
        records.push(Record {
            name: name.to_string(),
            raw,
            is_default: std::mem::take(&mut pending_default),
        });
    }
    records
}

fn not_set_record(line: &str) -> Option<&str> {
    line.strip_prefix("# ")
        .and_then(|r| r.strip_suffix(" is not set"))
        .and_then(|r| r.strip_prefix(CONFIG_PREFIX))
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => out.push(chars.next()?),
            _ => out.push(c),
        }
    }
    None
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render the configuration in menu traversal order.  Prompt-bearing
/// symbols carry the `# default:` pragma only while system-inferred;
/// promptless symbols always carry it, so downstream tools can read them.
pub fn render_config(world: &mut World, renames: Option<&RenameMap>) -> String {
    let mut out = String::new();
    out.push_str("#\n# Automatically generated file. DO NOT EDIT.\n#\n");
    let root = world.root;
    render_children(world, root, &mut out);

    if let Some(map) = renames {
        let mut section = String::new();
        for (old, canonical) in map.deprecated_pairs() {
            let Some(id) = world.defined_sym_id(&canonical) else {
                continue;
            };
            let value = world.value(id);
            render_record(&old, &value, false, &mut section);
        }
        if !section.is_empty() {
            out.push('\n');
            out.push_str(DEPRECATED_BANNER);
            out.push('\n');
            out.push_str(&section);
            out.push_str(DEPRECATED_END);
            out.push('\n');
        }
    }
    out
}

fn render_children(world: &mut World, node: NodeId, out: &mut String) {
    let children = world.node(node).children.clone();
    for child in children {
        match world.node(child).item.clone() {
            MenuItem::Symbol(id) => {
                if world.sym(id).node == Some(child) && world.sym(id).is_defined {
                    render_symbol(world, id, out);
                }
            }
            MenuItem::Menu { title, .. } => {
                let mut section = String::new();
                render_children(world, child, &mut section);
                if !section.is_empty() {
                    out.push_str(&format!("\n#\n# {title}\n#\n"));
                    out.push_str(&section);
                }
            }
            MenuItem::Choice(_) | MenuItem::If(_) => {
                render_children(world, child, out);
            }
            MenuItem::Comment { .. } => {}
        }
    }
}

fn render_symbol(world: &mut World, id: SymbolId, out: &mut String) {
    let value = world.value(id);
    let name = world.sym(id).name.clone();
    let pragma = world.is_at_default(id);
    render_record(&name, &value, pragma, out);
}

fn render_record(name: &str, value: &Value, pragma: bool, out: &mut String) {
    if pragma {
        out.push_str(DEFAULT_PRAGMA);
        out.push('\n');
    }
    match value {
        Value::Tristate(Tristate::N) => {
            out.push_str(&format!("# {CONFIG_PREFIX}{name} is not set\n"));
        }
        Value::Tristate(Tristate::Y) => {
            out.push_str(&format!("{CONFIG_PREFIX}{name}=y\n"));
        }
        Value::Int(v) => out.push_str(&format!("{CONFIG_PREFIX}{name}={v}\n")),
        Value::Hex(v) => out.push_str(&format!("{CONFIG_PREFIX}{name}=0x{v:X}\n")),
        Value::Str(s) => out.push_str(&format!("{CONFIG_PREFIX}{name}=\"{}\"\n", escape(s))),
        Value::Float(v) => out.push_str(&format!("{CONFIG_PREFIX}{name}={v}\n")),
    }
}

/// Render and write in one step; the file is only touched after the full
/// rendering succeeded, so a failure cannot leave a partial config.
pub fn save_config(world: &mut World, path: &Path, renames: Option<&RenameMap>) -> Result<()> {
    let rendered = render_config(world, renames);
    std::fs::write(path, rendered)?;
    log::info!("wrote configuration to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// C header output
// ---------------------------------------------------------------------------

pub fn render_header(world: &mut World) -> String {
    let mut out = String::new();
    out.push_str("/* Automatically generated file. DO NOT EDIT. */\n#pragma once\n\n");
    for id in world.symbols_in_menu_order() {
        let value = world.value(id);
        let name = &world.sym(id).name;
        match value {
            Value::Tristate(Tristate::N) => {}
            Value::Tristate(Tristate::Y) => {
                out.push_str(&format!("#define {CONFIG_PREFIX}{name} 1\n"));
            }
            Value::Int(v) => out.push_str(&format!("#define {CONFIG_PREFIX}{name} {v}\n")),
            Value::Hex(v) => out.push_str(&format!("#define {CONFIG_PREFIX}{name} 0x{v:X}\n")),
            Value::Str(s) => {
                out.push_str(&format!("#define {CONFIG_PREFIX}{name} \"{}\"\n", escape(&s)));
            }
            Value::Float(v) => out.push_str(&format!("#define {CONFIG_PREFIX}{name} {v}\n")),
        }
    }
    out
}

pub fn save_header(world: &mut World, path: &Path) -> Result<()> {
    let rendered = render_header(world);
    std::fs::write(path, rendered)?;
    log::info!("wrote header to {}", path.display());
    Ok(())
}
