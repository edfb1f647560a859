use crate::menu::{MenuItem, NodeId};
use crate::symbol::SymbolId;
use crate::world::World;

/// Render a markdown reference of the whole menu tree, one section per
/// menu and one entry per symbol, in declaration order.
pub fn render_markdown(world: &mut World) -> String {
    let mut out = String::new();
    let title = world
        .mainmenu
        .clone()
        .unwrap_or_else(|| "Configuration Options".to_string());
    out.push_str(&format!("# {title}\n"));
    let root = world.root;
    render_children(world, root, 1, &mut out);
    out
}

fn render_children(world: &mut World, node: NodeId, depth: usize, out: &mut String) {
    let children = world.node(node).children.clone();
    for child in children {
        match world.node(child).item.clone() {
            MenuItem::Menu { title, .. } => {
                let level = "#".repeat((depth + 1).min(6));
                out.push_str(&format!("\n{level} {title}\n"));
                render_children(world, child, depth + 1, out);
            }
            MenuItem::Symbol(id) => {
                if world.sym(id).node == Some(child) && world.sym(id).is_defined {
                    render_symbol(world, id, out);
                }
            }
            MenuItem::Choice(cid) => {
                let prompt = world
                    .choice(cid)
                    .prompt
                    .as_ref()
                    .map(|p| p.text.clone())
                    .unwrap_or_else(|| "choice".to_string());
                out.push_str(&format!("\n*Choice: {prompt}*\n"));
                render_children(world, child, depth, out);
            }
            MenuItem::If(_) => render_children(world, child, depth, out),
            MenuItem::Comment { text, .. } => {
                out.push_str(&format!("\n> {text}\n"));
            }
        }
    }
}

fn render_symbol(world: &mut World, id: SymbolId, out: &mut String) {
    let sym = world.sym(id);
    let mut section = format!("\n**CONFIG_{}** `{}`\n", sym.name, sym.kind.as_str());
    if let Some(prompt) = &sym.prompt {
        section.push_str(&format!("\n*\"{}\"*\n", prompt.text));
    }

    let mut facts: Vec<String> = Vec::new();
    let dep = sym.direct_dep;
    let defaults: Vec<_> = sym.defaults.clone();
    let ranges: Vec<_> = sym.ranges.clone();

    if dep != crate::expr::ExprId::CONST_Y {
        facts.push(format!("Depends on: `{}`", world.expr_to_string(dep)));
    }
    for d in &defaults {
        let cond = if d.condition == crate::expr::ExprId::CONST_Y {
            String::new()
        } else {
            format!(" if `{}`", world.expr_to_string(d.condition))
        };
        facts.push(format!(
            "Default: `{}`{cond}",
            world.expr_to_string(d.value)
        ));
    }
    for r in &ranges {
        facts.push(format!(
            "Range: `{}` to `{}`",
            world.expr_to_string(r.low),
            world.expr_to_string(r.high)
        ));
    }
    if !facts.is_empty() {
        section.push('\n');
        for f in facts {
            section.push_str(&format!("- {f}\n"));
        }
    }

    if let Some(help) = &world.sym(id).help {
        section.push_str(&format!("\n{help}\n"));
    }
    section.push_str("\n---\n");
    out.push_str(&section);
}
