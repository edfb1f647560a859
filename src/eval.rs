use std::collections::HashSet;

use crate::expr::{ConstValue, ExprId, ExprNode};
use crate::menu::{MenuItem, NodeId};
use crate::report::{Category, Severity};
use crate::symbol::{ChoiceId, Origin, SymbolId, SymbolKind, Tristate, UserValue, Value};
use crate::world::World;

/// Cached computed fields of one symbol.  `None` means dirty; the
/// `in_progress` flags break cycles during demand-driven recomputation.
#[derive(Debug, Clone, Default)]
pub struct EvalCache {
    pub value: Option<Value>,
    pub visible: Option<bool>,
    pub range: Option<Option<Bounds>>,
    pub value_in_progress: bool,
    pub visible_in_progress: bool,
}

/// Active range bounds, typed by the symbol kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Int(i64, i64),
    Float(f64, f64),
}

impl World {
    // -----------------------------------------------------------------------
    // Computed fields
    // -----------------------------------------------------------------------

    /// Effective value of a symbol under the current assignment.
    pub fn value(&mut self, id: SymbolId) -> Value {
        if let Some(v) = &self.cache[id.0 as usize].value {
            return v.clone();
        }
        if self.cache[id.0 as usize].value_in_progress {
            // Cycle: fall back to the type's zero value for this round.
            return Value::zero(self.sym(id).kind);
        }
        self.cache[id.0 as usize].value_in_progress = true;
        let v = self.compute_value(id);
        let cache = &mut self.cache[id.0 as usize];
        cache.value_in_progress = false;
        cache.value = Some(v.clone());
        v
    }

    pub fn bool_value(&mut self, id: SymbolId) -> Tristate {
        self.value(id).as_tristate()
    }

    /// A symbol is visible iff it has a prompt, the prompt condition
    /// holds, its direct dependencies hold, and no enclosing menu hides it
    /// through `visible if`.
    pub fn visible(&mut self, id: SymbolId) -> bool {
        if let Some(v) = self.cache[id.0 as usize].visible {
            return v;
        }
        if self.cache[id.0 as usize].visible_in_progress {
            return false;
        }
        self.cache[id.0 as usize].visible_in_progress = true;
        let v = self.compute_visible(id);
        let cache = &mut self.cache[id.0 as usize];
        cache.visible_in_progress = false;
        cache.visible = Some(v);
        v
    }

    /// The first range whose condition holds, evaluated to bounds.
    pub fn active_range(&mut self, id: SymbolId) -> Option<Bounds> {
        if let Some(r) = self.cache[id.0 as usize].range {
            return r;
        }
        let r = self.compute_range(id);
        self.cache[id.0 as usize].range = Some(r);
        r
    }

    /// True when the symbol carries no explicit user decision.
    pub fn is_at_default(&self, id: SymbolId) -> bool {
        self.sym(id).user.as_ref().map_or(true, |u| u.is_default)
    }

    /// The symbol's warning message, when its condition currently holds.
    pub fn active_warning(&mut self, id: SymbolId) -> Option<String> {
        let w = self.sym(id).warning.clone()?;
        if self.eval_bool(w.condition) == Tristate::Y {
            Some(w.text)
        } else {
            None
        }
    }

    /// Force every computed field up to date.  A second call without any
    /// intervening write changes nothing.
    pub fn refresh(&mut self) {
        for i in 0..self.syms.len() {
            let id = SymbolId(i as u32);
            if !self.sym(id).is_defined {
                continue;
            }
            let _ = self.value(id);
            let _ = self.visible(id);
            let _ = self.active_range(id);
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Install an interactive user assignment.  Errors are user-facing
    /// messages; the state is unchanged when an error is returned.
    pub fn set_user_value(
        &mut self,
        name: &str,
        raw: &str,
        origin: Origin,
        is_default: bool,
    ) -> std::result::Result<(), String> {
        self.install_user_value(name, raw, origin, is_default, true)
    }

    /// Install an assignment read from a stored configuration.  Unlike an
    /// interactive write this never rejects a member `n` record and never
    /// clears sibling records, so loading a written choice round-trips.
    pub(crate) fn install_loaded_value(
        &mut self,
        name: &str,
        raw: &str,
        origin: Origin,
        is_default: bool,
    ) -> std::result::Result<(), String> {
        self.install_user_value(name, raw, origin, is_default, false)
    }

    fn install_user_value(
        &mut self,
        name: &str,
        raw: &str,
        origin: Origin,
        is_default: bool,
        interactive: bool,
    ) -> std::result::Result<(), String> {
        let Some(id) = self.defined_sym_id(name) else {
            return Err(format!("Unknown symbol: {name}"));
        };
        if !self.sym(id).has_prompt() {
            return Err(format!("{name} has no prompt and cannot be set"));
        }
        let kind = self.sym(id).kind;
        let value = Value::parse(kind, raw).map_err(|e| format!("{name}: {e}"))?;

        if kind == SymbolKind::Bool {
            if let Some(cid) = self.sym(id).choice {
                self.assign_choice_member(id, cid, value.as_tristate(), interactive)?;
            }
        }

        self.sym_mut(id).user = Some(UserValue {
            raw: value.to_raw_string(),
            origin,
            is_default,
        });
        self.invalidate(id);
        Ok(())
    }

    /// Selecting a member deselects the others; interactively disabling
    /// the active member without a replacement is rejected.
    fn assign_choice_member(
        &mut self,
        id: SymbolId,
        cid: ChoiceId,
        value: Tristate,
        interactive: bool,
    ) -> std::result::Result<(), String> {
        match value {
            Tristate::Y => {
                if interactive && self.choices[cid.0 as usize].user_selection != Some(id) {
                    let members = self.choice(cid).members.clone();
                    for m in members {
                        if m != id {
                            self.sym_mut(m).user = None;
                            self.invalidate(m);
                        }
                    }
                }
                self.choices[cid.0 as usize].user_selection = Some(id);
            }
            Tristate::N => {
                if interactive && self.choice_selection(cid) == Some(id) {
                    let name = self.sym(id).name.clone();
                    return Err(format!(
                        "cannot disable {name}: it is the selected member of its choice; \
                         select another member instead"
                    ));
                }
                if self.choices[cid.0 as usize].user_selection == Some(id) {
                    self.choices[cid.0 as usize].user_selection = None;
                }
            }
        }
        Ok(())
    }

    /// Clear the assignment, reverting the symbol to its computed default.
    pub fn reset_symbol(&mut self, id: SymbolId) {
        if let Some(cid) = self.sym(id).choice {
            if self.choices[cid.0 as usize].user_selection == Some(id) {
                self.choices[cid.0 as usize].user_selection = None;
            }
        }
        self.sym_mut(id).user = None;
        self.invalidate(id);
    }

    pub fn reset_all(&mut self) {
        for i in 0..self.syms.len() {
            self.syms[i].user = None;
        }
        for c in &mut self.choices {
            c.user_selection = None;
        }
        for cache in &mut self.cache {
            *cache = EvalCache::default();
        }
    }

    /// Reset every symbol under a menu node.
    pub fn reset_menu(&mut self, node: NodeId) {
        let mut ids = Vec::new();
        self.collect_symbols_under(node, &mut ids);
        for id in ids {
            self.reset_symbol(id);
        }
    }

    fn collect_symbols_under(&self, node: NodeId, out: &mut Vec<SymbolId>) {
        if let MenuItem::Symbol(id) = self.node(node).item {
            out.push(id);
        }
        for &child in &self.node(node).children {
            self.collect_symbols_under(child, out);
        }
    }

    /// Mark `id` and everything that depends on it dirty.  The walk
    /// tolerates cycles by visiting each symbol once.
    pub(crate) fn invalidate(&mut self, id: SymbolId) {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            let cache = &mut self.cache[n.0 as usize];
            cache.value = None;
            cache.visible = None;
            cache.range = None;
            stack.extend(self.syms[n.0 as usize].dependents.iter().copied());
        }
    }

    // -----------------------------------------------------------------------
    // Value computation - the priority ladder
    // -----------------------------------------------------------------------

    fn compute_value(&mut self, id: SymbolId) -> Value {
        if !self.sym(id).is_defined {
            if self.emitted.insert((id, Category::UndefinedSymbol)) {
                let name = self.sym(id).name.clone();
                self.report.add(
                    Severity::Warning,
                    Category::UndefinedSymbol,
                    None,
                    format!("reference to undefined symbol {name}"),
                );
            }
            // Undefined references read as the empty string (bool n).
            return Value::Str(String::new());
        }
        let kind = self.sym(id).kind;
        let value = self.compute_base_value(id, kind);
        self.clamp_to_range(id, kind, value)
    }

    fn compute_base_value(&mut self, id: SymbolId, kind: SymbolKind) -> Value {
        // Members of a choice take their value from the group selection;
        // the stored user assignment participates through it.
        if kind == SymbolKind::Bool {
            if let Some(cid) = self.sym(id).choice {
                let selected = self.choice_selection(cid) == Some(id);
                return Value::Tristate(Tristate::from_bool(selected));
            }
        }

        let user = self.sym(id).user.clone();

        // 1. Explicit user decision, while the symbol is visible.
        if let Some(u) = &user {
            if u.is_user_decision() && self.visible(id) {
                if let Ok(v) = Value::parse(kind, &u.raw) {
                    return v;
                }
            }
        }

        // 2. `set` from an enabled bool source (ignores direct deps).
        let set_by = self.sym(id).set_by.clone();
        for sc in &set_by {
            if self.bool_value(sc.source) == Tristate::Y
                && self.eval_bool(sc.condition) == Tristate::Y
            {
                if let Some(v) = self.clause_value(id, kind, sc.value) {
                    return v;
                }
            }
        }

        if kind == SymbolKind::Bool {
            // 3. `select` forces y, ignoring direct deps.
            let selected_by = self.sym(id).selected_by.clone();
            for rd in &selected_by {
                if self.bool_value(rd.source) == Tristate::Y
                    && self.eval_bool(rd.condition) == Tristate::Y
                {
                    self.warn_select_bypass(id, rd.source);
                    return Value::Tristate(Tristate::Y);
                }
            }
            // 4. `imply` forces y only when direct deps permit.
            let implied_by = self.sym(id).implied_by.clone();
            for rd in &implied_by {
                if self.bool_value(rd.source) == Tristate::Y
                    && self.eval_bool(rd.condition) == Tristate::Y
                {
                    let dep = self.sym(id).direct_dep;
                    if self.eval_bool(dep) == Tristate::Y {
                        return Value::Tristate(Tristate::Y);
                    }
                }
            }
        }

        // 5a. `set default` from an enabled source.
        let set_default_by = self.sym(id).set_default_by.clone();
        for sc in &set_default_by {
            if self.bool_value(sc.source) == Tristate::Y
                && self.eval_bool(sc.condition) == Tristate::Y
            {
                if let Some(v) = self.clause_value(id, kind, sc.value) {
                    return v;
                }
            }
        }

        // 5b. Stored default-marked assignment, while visible.
        if let Some(u) = &user {
            let marked_default = u.origin == Origin::DefaultsFile || u.is_default;
            if marked_default && self.visible(id) {
                if let Ok(v) = Value::parse(kind, &u.raw) {
                    return v;
                }
            }
        }

        // 6. First `default` clause whose condition holds.
        let defaults = self.sym(id).defaults.clone();
        for d in &defaults {
            if self.eval_bool(d.condition) != Tristate::Y {
                continue;
            }
            if let Some(v) = self.clause_value(id, kind, d.value) {
                if kind == SymbolKind::Bool {
                    let dep = self.sym(id).direct_dep;
                    let clamped = v.as_tristate().min(self.eval_bool(dep));
                    return Value::Tristate(clamped);
                }
                return v;
            }
        }

        // Nothing applies: the type's zero value.
        Value::zero(kind)
    }

    fn warn_select_bypass(&mut self, id: SymbolId, source: SymbolId) {
        let dep = self.sym(id).direct_dep;
        if self.eval_bool(dep) == Tristate::Y {
            return;
        }
        if self.emitted.insert((id, Category::ReverseDepOverride)) {
            let target = self.sym(id).name.clone();
            let source = self.sym(source).name.clone();
            let dep_str = self.expr_to_string(dep);
            let location = self.sym(id).locations.first().cloned();
            self.report.add(
                Severity::Warning,
                Category::ReverseDepOverride,
                location,
                format!(
                    "select of {target} by {source} overrides its unmet dependencies ({dep_str})"
                ),
            );
        }
    }

    /// Evaluate a default / set clause and coerce it to the symbol kind.
    /// Int, hex and float interconvert silently; everything else warns
    /// once and is dropped when unconvertible.
    fn clause_value(&mut self, id: SymbolId, kind: SymbolKind, expr: ExprId) -> Option<Value> {
        let v = self.eval_value(expr);
        if v.kind() == kind {
            return Some(v);
        }
        let silent = v.kind().is_numeric() && kind.is_numeric();
        let converted = Value::parse(kind, &v.to_raw_string()).ok();
        if !silent && self.emitted.insert((id, Category::DefaultTypeMismatch)) {
            let name = self.sym(id).name.clone();
            let location = self.sym(id).locations.first().cloned();
            self.report.add(
                Severity::Warning,
                Category::DefaultTypeMismatch,
                location,
                format!(
                    "default for {name} has type {} but the symbol is {}",
                    v.kind().as_str(),
                    kind.as_str()
                ),
            );
        }
        converted
    }

    fn clamp_to_range(&mut self, id: SymbolId, kind: SymbolKind, value: Value) -> Value {
        if !kind.is_numeric() {
            return value;
        }
        let Some(bounds) = self.active_range(id) else {
            return value;
        };
        let (clamped, changed) = match (&value, bounds) {
            (Value::Int(v), Bounds::Int(lo, hi)) => {
                let c = (*v).clamp(lo, hi);
                (Value::Int(c), c != *v)
            }
            (Value::Hex(v), Bounds::Int(lo, hi)) => {
                let c = (*v).clamp(lo, hi);
                (Value::Hex(c), c != *v)
            }
            (Value::Float(v), Bounds::Float(lo, hi)) => {
                let c = v.clamp(lo, hi);
                (Value::Float(c), c != *v)
            }
            _ => (value.clone(), false),
        };
        if changed && self.emitted.insert((id, Category::RangeViolation)) {
            let name = self.sym(id).name.clone();
            let location = self.sym(id).locations.first().cloned();
            self.report.add(
                Severity::Warning,
                Category::RangeViolation,
                location,
                format!(
                    "value {} of {name} is outside the active range, clamped to {}",
                    value.to_raw_string(),
                    clamped.to_raw_string()
                ),
            );
        }
        clamped
    }

    fn compute_visible(&mut self, id: SymbolId) -> bool {
        let Some(prompt) = self.sym(id).prompt.clone() else {
            return false;
        };
        if self.eval_bool(prompt.condition) != Tristate::Y {
            return false;
        }
        let dep = self.sym(id).direct_dep;
        if self.eval_bool(dep) != Tristate::Y {
            return false;
        }
        match self.sym(id).node {
            Some(node) => self.menu_path_visible(node),
            None => true,
        }
    }

    /// `visible if` on enclosing menus hides descendants without touching
    /// their semantics.
    fn menu_path_visible(&mut self, node: NodeId) -> bool {
        let mut current = self.node(node).parent;
        while let Some(n) = current {
            if let MenuItem::Menu { visible_if, .. } = self.node(n).item {
                if self.eval_bool(visible_if) != Tristate::Y {
                    return false;
                }
            }
            current = self.node(n).parent;
        }
        true
    }

    fn compute_range(&mut self, id: SymbolId) -> Option<Bounds> {
        let kind = self.sym(id).kind;
        if !kind.is_numeric() {
            return None;
        }
        let ranges = self.sym(id).ranges.clone();
        for r in &ranges {
            if self.eval_bool(r.condition) != Tristate::Y {
                continue;
            }
            let low = self.eval_value(r.low);
            let high = self.eval_value(r.high);
            return Some(match kind {
                SymbolKind::Float => Bounds::Float(numeric(&low), numeric(&high)),
                _ => Bounds::Int(integral(&low), integral(&high)),
            });
        }
        None
    }

    // -----------------------------------------------------------------------
    // Choice resolution
    // -----------------------------------------------------------------------

    /// The effective selection of a choice: the user's pick when visible,
    /// else the first defaulted visible member, else the first visible
    /// member, else deselected.
    pub fn choice_selection(&mut self, cid: ChoiceId) -> Option<SymbolId> {
        let choice = self.choice(cid);
        let dep = choice.direct_dep;
        let prompt_cond = choice.prompt.as_ref().map(|p| p.condition);
        let members = choice.members.clone();
        let user_selection = choice.user_selection;
        let defaults = choice.defaults.clone();

        if self.eval_bool(dep) != Tristate::Y {
            return None;
        }
        if let Some(cond) = prompt_cond {
            if self.eval_bool(cond) != Tristate::Y {
                return None;
            }
        }

        if let Some(m) = user_selection {
            if self.visible(m) {
                return Some(m);
            }
        }

        // Choice-level `default MEMBER if cond` clauses, in order.
        for d in &defaults {
            if self.eval_bool(d.condition) != Tristate::Y {
                continue;
            }
            if let ExprNode::Symbol(m) = *self.exprs.get(d.value) {
                if members.contains(&m) && self.visible(m) {
                    return Some(m);
                }
            }
        }

        // A member whose own default evaluates to y.
        for &m in &members {
            if self.visible(m) && self.member_defaults_to_y(m) {
                return Some(m);
            }
        }

        // Fall back to the first visible member.
        members.into_iter().find(|&m| self.visible(m))
    }

    fn member_defaults_to_y(&mut self, m: SymbolId) -> bool {
        let defaults = self.sym(m).defaults.clone();
        for d in &defaults {
            if self.eval_bool(d.condition) == Tristate::Y {
                return self.eval_value(d.value).as_tristate() == Tristate::Y;
            }
        }
        false
    }

    // -----------------------------------------------------------------------
    // Expression evaluation
    // -----------------------------------------------------------------------

    /// Two-valued truth of an expression.
    pub fn eval_bool(&mut self, e: ExprId) -> Tristate {
        let node = self.exprs.get(e).clone();
        match node {
            ExprNode::Const(c) => const_value(&c).as_tristate(),
            ExprNode::Symbol(s) => self.bool_value(s),
            ExprNode::Not(inner) => match self.eval_bool(inner) {
                Tristate::Y => Tristate::N,
                Tristate::N => Tristate::Y,
            },
            ExprNode::And(a, b) => self.eval_bool(a).min(self.eval_bool(b)),
            ExprNode::Or(a, b) => self.eval_bool(a).max(self.eval_bool(b)),
            ExprNode::Cmp(op, a, b) => Tristate::from_bool(self.compare(op, a, b)),
        }
    }

    /// Typed value of an expression; compound expressions reduce to their
    /// truth value.
    pub fn eval_value(&mut self, e: ExprId) -> Value {
        let node = self.exprs.get(e).clone();
        match node {
            ExprNode::Const(c) => const_value(&c),
            ExprNode::Symbol(s) => self.value(s),
            _ => Value::Tristate(self.eval_bool(e)),
        }
    }

    /// Comparison with the legacy coercion rules: any string side makes
    /// the comparison textual, otherwise both sides compare numerically
    /// with bool n=0 / y=2.
    fn compare(&mut self, op: crate::expr::CmpOp, a: ExprId, b: ExprId) -> bool {
        use crate::expr::CmpOp;
        let va = self.eval_value(a);
        let vb = self.eval_value(b);
        let ordering = if matches!(va, Value::Str(_)) || matches!(vb, Value::Str(_)) {
            va.to_raw_string().cmp(&vb.to_raw_string())
        } else if matches!(va, Value::Float(_)) || matches!(vb, Value::Float(_)) {
            numeric(&va)
                .partial_cmp(&numeric(&vb))
                .unwrap_or(std::cmp::Ordering::Equal)
        } else {
            integral(&va).cmp(&integral(&vb))
        };
        match op {
            CmpOp::Eq => ordering.is_eq(),
            CmpOp::NotEq => !ordering.is_eq(),
            CmpOp::Less => ordering.is_lt(),
            CmpOp::LessEq => ordering.is_le(),
            CmpOp::Greater => ordering.is_gt(),
            CmpOp::GreaterEq => ordering.is_ge(),
        }
    }
}

fn const_value(c: &ConstValue) -> Value {
    match c {
        ConstValue::Tristate(t) => Value::Tristate(*t),
        ConstValue::Int(v) => Value::Int(*v),
        ConstValue::Hex(v) => Value::Hex(*v),
        ConstValue::Str(s) => Value::Str(s.clone()),
        ConstValue::Float(v) => Value::Float(*v),
    }
}

fn integral(v: &Value) -> i64 {
    match v {
        Value::Tristate(t) => t.to_int(),
        Value::Int(n) | Value::Hex(n) => *n,
        Value::Float(f) => *f as i64,
        Value::Str(s) => s.parse().unwrap_or(0),
    }
}

fn numeric(v: &Value) -> f64 {
    match v {
        Value::Tristate(t) => t.to_int() as f64,
        Value::Int(n) | Value::Hex(n) => *n as f64,
        Value::Float(f) => *f,
        Value::Str(s) => s.parse().unwrap_or(0.0),
    }
}
