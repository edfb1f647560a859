use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};

use crate::config::{self, DefaultsPolicy};
use crate::menu::MenuItem;
use crate::renames::RenameMap;
use crate::report::Verbosity;
use crate::symbol::{Origin, SymbolKind, Value};
use crate::world::World;

pub const SUPPORTED_VERSIONS: [u64; 3] = [1, 2, 3];
const LATEST_VERSION: u64 = 3;

/// One request object, read from a single input line.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub version: u64,
    #[serde(default)]
    pub set: Option<BTreeMap<String, Json>>,
    /// Path to load, or `null` for the session's configuration file.
    #[serde(default)]
    pub load: Option<Json>,
    /// Path to save, or `null` for the session's configuration file.
    #[serde(default)]
    pub save: Option<Json>,
    /// Symbol names, menu titles, or `["all"]`.
    #[serde(default)]
    pub reset: Option<Vec<String>>,
}

/// One response object, written as a single output line.  All maps are
/// deltas against the previous response; the initial message carries the
/// full state.
#[derive(Debug, Serialize, Default)]
pub struct Response {
    pub version: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Json>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub visible: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ranges: BTreeMap<String, Json>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub warnings: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    values: BTreeMap<String, Json>,
    visible: BTreeMap<String, bool>,
    ranges: BTreeMap<String, Json>,
    defaults: BTreeMap<String, bool>,
    warnings: BTreeMap<String, String>,
}

/// The single serialization point for engine access: one request in, one
/// response out, diagnostics to stderr in between.
pub struct Session {
    world: World,
    config_path: Option<PathBuf>,
    renames: Option<RenameMap>,
    policy: DefaultsPolicy,
    verbosity: Verbosity,
    last: Snapshot,
    reported: usize,
}

impl Session {
    pub fn new(
        world: World,
        config_path: Option<PathBuf>,
        renames: Option<RenameMap>,
        policy: DefaultsPolicy,
        verbosity: Verbosity,
    ) -> Session {
        Session {
            world,
            config_path,
            renames,
            policy,
            verbosity,
            last: Snapshot::default(),
            reported: 0,
        }
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Full-state message sent once before the request loop starts.
    pub fn initial_message(&mut self) -> Response {
        let snap = self.snapshot();
        self.flush_report();
        let response = Response {
            version: LATEST_VERSION,
            values: snap.values.clone(),
            visible: snap.visible.clone(),
            ranges: snap.ranges.clone(),
            defaults: snap.defaults.clone(),
            warnings: snap.warnings.clone(),
            error: Vec::new(),
        };
        self.last = snap;
        response
    }

    /// Handle one line of input.  Malformed JSON never mutates state.
    pub fn handle_line(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle_request(request),
            Err(e) => Response {
                version: LATEST_VERSION,
                error: vec![format!("Invalid request: {e}")],
                ..Response::default()
            },
        }
    }

    pub fn handle_request(&mut self, request: Request) -> Response {
        if !SUPPORTED_VERSIONS.contains(&request.version) {
            let supported = SUPPORTED_VERSIONS
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Response {
                version: request.version,
                error: vec![format!(
                    "Unsupported protocol version {}; supported versions: {supported}",
                    request.version
                )],
                ..Response::default()
            };
        }

        let mut errors = Vec::new();

        if let Some(load) = &request.load {
            self.handle_load(load, &mut errors);
        }
        if let Some(set) = &request.set {
            for (name, value) in set {
                if let Err(e) = self.apply_set(name, value) {
                    errors.push(e);
                }
            }
        }
        if let Some(reset) = &request.reset {
            for token in reset {
                if let Err(e) = self.apply_reset(token) {
                    errors.push(e);
                }
            }
        }
        if let Some(save) = &request.save {
            self.handle_save(save, &mut errors);
        }

        let snap = self.snapshot();
        self.flush_report();

        let mut response = diff(&self.last, &snap);
        response.version = request.version;
        response.error = errors;
        self.last = snap;
        response
    }

    fn handle_load(&mut self, target: &Json, errors: &mut Vec<String>) {
        let path = match self.resolve_path(target) {
            Ok(p) => p,
            Err(e) => {
                errors.push(e);
                return;
            }
        };
        match config::load_config(
            &mut self.world,
            &path,
            Origin::PrimaryConfig,
            self.renames.as_ref(),
            self.policy,
        ) {
            Ok(outcome) => {
                for c in outcome.conflicts {
                    errors.push(format!(
                        "{}: stored default {} disagrees with Kconfig default {}",
                        c.name, c.stored, c.kconfig
                    ));
                }
            }
            Err(e) => errors.push(format!("Failed to load {}: {e}", path.display())),
        }
    }

    fn handle_save(&mut self, target: &Json, errors: &mut Vec<String>) {
        let path = match self.resolve_path(target) {
            Ok(p) => p,
            Err(e) => {
                errors.push(e);
                return;
            }
        };
        if let Err(e) = config::save_config(&mut self.world, &path, self.renames.as_ref()) {
            errors.push(format!("Failed to save {}: {e}", path.display()));
        }
    }

    fn resolve_path(&self, target: &Json) -> Result<PathBuf, String> {
        match target {
            Json::Null => self
                .config_path
                .clone()
                .ok_or_else(|| "No configuration file for this session".to_string()),
            Json::String(s) => Ok(PathBuf::from(s)),
            other => Err(format!("Invalid path: {other}")),
        }
    }

    fn apply_set(&mut self, name: &str, value: &Json) -> Result<(), String> {
        let Some(id) = self.world.defined_sym_id(name) else {
            return Err(format!("Unknown symbol: {name}"));
        };
        let raw = json_to_raw(self.world.sym(id).kind, value)
            .map_err(|e| format!("{name}: {e}"))?;
        self.world
            .set_user_value(name, &raw, Origin::CommandLine, false)
    }

    fn apply_reset(&mut self, token: &str) -> Result<(), String> {
        if token == "all" {
            self.world.reset_all();
            return Ok(());
        }
        if let Some(id) = self.world.defined_sym_id(token) {
            self.world.reset_symbol(id);
            return Ok(());
        }
        let menu = (0..self.world.node_count()).find(|&i| {
            matches!(
                &self.world.node(crate::menu::NodeId(i as u32)).item,
                MenuItem::Menu { title, .. } if title == token
            )
        });
        match menu {
            Some(i) => {
                self.world.reset_menu(crate::menu::NodeId(i as u32));
                Ok(())
            }
            None => Err(format!("Unknown symbol or menu: {token}")),
        }
    }

    /// Forward new diagnostics to stderr, out of band.
    fn flush_report(&mut self) {
        self.reported = self.world.report.emit_from(self.reported, self.verbosity);
    }

    fn snapshot(&mut self) -> Snapshot {
        let mut snap = Snapshot::default();
        for id in self.world.symbols_in_menu_order() {
            let name = self.world.sym(id).name.clone();
            let value = self.world.value(id);
            snap.values.insert(name.clone(), value_to_json(&value));
            snap.visible.insert(name.clone(), self.world.visible(id));
            snap.defaults
                .insert(name.clone(), self.world.is_at_default(id));
            if let Some(bounds) = self.world.active_range(id) {
                let range = match bounds {
                    crate::eval::Bounds::Int(lo, hi) => json!([lo, hi]),
                    crate::eval::Bounds::Float(lo, hi) => json!([lo, hi]),
                };
                snap.ranges.insert(name.clone(), range);
            }
            if let Some(message) = self.world.active_warning(id) {
                snap.warnings.insert(name, message);
            }
        }
        snap
    }
}

/// Only changed entries go into a response; a range that disappeared is
/// reported as `null`.
fn diff(old: &Snapshot, new: &Snapshot) -> Response {
    let mut response = Response::default();
    for (k, v) in &new.values {
        if old.values.get(k) != Some(v) {
            response.values.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in &new.visible {
        if old.visible.get(k) != Some(v) {
            response.visible.insert(k.clone(), *v);
        }
    }
    for (k, v) in &new.defaults {
        if old.defaults.get(k) != Some(v) {
            response.defaults.insert(k.clone(), *v);
        }
    }
    for (k, v) in &new.ranges {
        if old.ranges.get(k) != Some(v) {
            response.ranges.insert(k.clone(), v.clone());
        }
    }
    for k in old.ranges.keys() {
        if !new.ranges.contains_key(k) {
            response.ranges.insert(k.clone(), Json::Null);
        }
    }
    response
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Tristate(t) => Json::Bool(t.to_bool()),
        Value::Int(v) | Value::Hex(v) => json!(v),
        Value::Str(s) => Json::String(s.clone()),
        Value::Float(v) => json!(v),
    }
}

/// Convert a request value to the engine's textual form, directed by the
/// target symbol's kind.
fn json_to_raw(kind: SymbolKind, value: &Json) -> Result<String, String> {
    match (kind, value) {
        (SymbolKind::Bool, Json::Bool(b)) => Ok(if *b { "y" } else { "n" }.to_string()),
        (SymbolKind::Bool, Json::String(s)) if s == "y" || s == "n" => Ok(s.clone()),
        (SymbolKind::Bool, other) => Err(format!("expected a bool, got {other}")),
        (SymbolKind::Hex, Json::Number(n)) => match n.as_i64() {
            Some(v) => Ok(format!("0x{v:X}")),
            None => Err(format!("{n} is not a valid hex value")),
        },
        (_, Json::Number(n)) => Ok(n.to_string()),
        (_, Json::String(s)) => Ok(s.clone()),
        (_, other) => Err(format!("unsupported value {other}")),
    }
}
