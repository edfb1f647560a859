use kconfig_tools::docs;
use kconfig_tools::world::World;

const KCONFIG: &str = "\
mainmenu \"Demo\"

menu \"Networking\"

config NET_LOG
    bool \"Enable network logging\"
    depends on NET_CORE
    default y
    help
        Log every packet decision.

config NET_QUEUE
    int \"Queue depth\"
    range 1 64
    default 16

endmenu

config NET_CORE
    bool \"Core networking\"
    default y
";

#[test]
fn markdown_reference_covers_the_tree() {
    let mut world = World::from_source(KCONFIG).unwrap();
    let md = docs::render_markdown(&mut world);

    assert!(md.starts_with("# Demo\n"));
    assert!(md.contains("## Networking"));
    assert!(md.contains("**CONFIG_NET_LOG** `bool`"));
    assert!(md.contains("*\"Enable network logging\"*"));
    assert!(md.contains("Depends on: `NET_CORE`"));
    assert!(md.contains("Range: `1` to `64`"));
    assert!(md.contains("Default: `16`"));
    assert!(md.contains("Log every packet decision."));
}

#[test]
fn untitled_trees_get_a_fallback_heading() {
    let mut world = World::from_source("config A\n    bool \"a\"\n").unwrap();
    let md = docs::render_markdown(&mut world);
    assert!(md.starts_with("# Configuration Options\n"));
}
