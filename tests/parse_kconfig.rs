use kconfig_tools::ast::*;
use kconfig_tools::lexer::Lexer;
use kconfig_tools::parser;
use kconfig_tools::report::Category;
use kconfig_tools::symbol::SymbolKind;
use kconfig_tools::world::World;

const SAMPLE_KCONFIG: &str = r#"
mainmenu "Demo Configuration"

config AUDIT
    bool "Auditing support"
    depends on NET
    default y
    help
        Enable the auditing infrastructure that can be used with
        another subsystem.

menuconfig FEATURES
    bool "Enable extra features"

menu "General setup"
    depends on !BARE

config SYSIPC
    bool "System IPC"
    help
        Inter-process communication support.

choice
    prompt "Optimization level"
    default OPT_PERF

config OPT_PERF
    bool "Optimize for performance"

config OPT_SIZE
    bool "Optimize for size"

endchoice

if EXPERT

config CHECKPOINT
    bool "Checkpoint support"
    select PROC_CHILDREN
    default n

endif

config FOO_RANGE
    int "Foo value"
    range 1 100
    default 50

config BAUD
    hex "Baud divisor"
    default 0x1A

config RATIO
    float "Scaling ratio"
    default 0.5

config GREETING
    string "Greeting text"
    default "say \"hi\""

endmenu
"#;

#[test]
fn lexer_tokenizes_all_keywords() {
    let (tokens, diags) = Lexer::new(SAMPLE_KCONFIG).tokenize();
    assert!(diags.is_empty(), "unexpected lexer diagnostics: {diags:?}");
    assert!(tokens.len() > 50);

    let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
    use kconfig_tools::lexer::TokenKind::*;
    assert!(kinds.contains(&&Config));
    assert!(kinds.contains(&&MenuConfig));
    assert!(kinds.contains(&&Menu));
    assert!(kinds.contains(&&EndMenu));
    assert!(kinds.contains(&&Choice));
    assert!(kinds.contains(&&EndChoice));
    assert!(kinds.contains(&&If));
    assert!(kinds.contains(&&EndIf));
    assert!(kinds.contains(&&MainMenu));
    assert!(kinds.contains(&&Bool));
    assert!(kinds.contains(&&Int));
    assert!(kinds.contains(&&Hex));
    assert!(kinds.contains(&&Float));
    assert!(kinds.contains(&&StringType));
    assert!(kinds.contains(&&Default));
    assert!(kinds.contains(&&Depends));
    assert!(kinds.contains(&&On));
    assert!(kinds.contains(&&Select));
    assert!(kinds.contains(&&Prompt));
    assert!(kinds.contains(&&Range));
    assert!(kinds.contains(&&Help));
}

#[test]
fn lexer_tracks_line_indentation() {
    let (tokens, _) = Lexer::new("config A\n    bool \"a\"\n").tokenize();
    let config = &tokens[0];
    assert_eq!(config.indent, 0);
    let bool_tok = tokens
        .iter()
        .find(|t| t.kind == kconfig_tools::lexer::TokenKind::Bool)
        .unwrap();
    assert_eq!(bool_tok.indent, 4);
}

#[test]
fn parser_produces_correct_entries() {
    let (tokens, lex_diags) = Lexer::new(SAMPLE_KCONFIG).tokenize();
    let result = parser::parse(SAMPLE_KCONFIG, tokens, lex_diags);

    let names: Vec<String> = result
        .file
        .entries
        .iter()
        .filter_map(|e| match e {
            Entry::Config(c) | Entry::MenuConfig(c) => Some(c.name.clone()),
            _ => None,
        })
        .collect();
    assert!(names.contains(&"AUDIT".to_string()));
    assert!(names.contains(&"FEATURES".to_string()));

    let has_menu = result
        .file
        .entries
        .iter()
        .any(|e| matches!(e, Entry::Menu(_)));
    assert!(has_menu);

    let has_mainmenu = result
        .file
        .entries
        .iter()
        .any(|e| matches!(e, Entry::MainMenu(_)));
    assert!(has_mainmenu);

    let errors: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == DiagSeverity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
}

#[test]
fn world_builds_symbol_table() {
    let world = World::from_source(SAMPLE_KCONFIG).unwrap();

    for name in [
        "AUDIT",
        "FEATURES",
        "SYSIPC",
        "OPT_PERF",
        "OPT_SIZE",
        "CHECKPOINT",
        "FOO_RANGE",
        "BAUD",
        "RATIO",
        "GREETING",
    ] {
        assert!(
            world.defined_sym_id(name).is_some(),
            "symbol {name} should be defined"
        );
    }

    assert_eq!(world.mainmenu.as_deref(), Some("Demo Configuration"));

    let audit = world.sym(world.defined_sym_id("AUDIT").unwrap());
    assert_eq!(audit.kind, SymbolKind::Bool);
    assert_eq!(audit.prompt.as_ref().unwrap().text, "Auditing support");
    assert!(audit.help.is_some());

    let ratio = world.sym(world.defined_sym_id("RATIO").unwrap());
    assert_eq!(ratio.kind, SymbolKind::Float);

    let greeting = world.sym(world.defined_sym_id("GREETING").unwrap());
    assert_eq!(greeting.kind, SymbolKind::String);

    assert_eq!(world.choice_count(), 1);

    // NET / BARE / EXPERT are referenced but never defined.
    assert!(world.defined_sym_id("NET").is_none());
    assert!(world.sym_id("NET").is_some());
}

#[test]
fn help_text_parsed_correctly() {
    let world = World::from_source(SAMPLE_KCONFIG).unwrap();
    let audit = world.sym(world.defined_sym_id("AUDIT").unwrap());
    let help = audit.help.as_ref().unwrap();
    assert!(help.starts_with("Enable the auditing"));
    assert!(help.contains("another subsystem."));
    assert!(!help.starts_with(' '));
}

#[test]
fn undefined_select_target_is_reported() {
    let world = World::from_source(SAMPLE_KCONFIG).unwrap();
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::UnusedReverseDep
                && d.message.contains("PROC_CHILDREN"))
    );
}

#[test]
fn option_outside_entry_is_an_indentation_error() {
    let src = "config A\n    bool \"a\"\ndefault y\n";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("bad indentation"), "{err}");
}

#[test]
fn inconsistent_option_indentation_is_an_error() {
    let src = "config A\n    bool \"a\"\n        default y\n";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("bad indentation"), "{err}");
}

#[test]
fn unterminated_string_is_an_error() {
    let src = "config A\n    bool \"unclosed\n";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("unterminated string"), "{err}");
}

#[test]
fn duplicate_type_option_is_an_error() {
    let src = "config A\n    bool \"a\"\n    int \"a again\"\n";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("duplicate type"), "{err}");
}

#[test]
fn string_literal_default_on_int_is_an_error() {
    let src = "config A\n    int \"a\"\n    default \"nope\"\n";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("string literal"), "{err}");
}

#[test]
fn non_bool_select_source_is_rejected() {
    let src = "\
config COUNT
    int \"count\"
    select HELPER

config HELPER
    bool \"helper\"
";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("bool required"), "{err}");
}

#[test]
fn select_of_non_bool_target_is_rejected() {
    let src = "\
config SRC
    bool \"src\"
    select COUNT

config COUNT
    int \"count\"
";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("bool required"), "{err}");
}

#[test]
fn multiple_definitions_merge_with_notification() {
    let src = "\
config DUP
    bool \"dup\"

config DUP
    default y
";
    let mut world = World::from_source(src).unwrap();
    assert!(
        world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::MultipleDefinition)
    );
    let id = world.defined_sym_id("DUP").unwrap();
    assert_eq!(
        world.value(id),
        kconfig_tools::symbol::Value::Tristate(kconfig_tools::symbol::Tristate::Y)
    );
}

#[test]
fn ignore_pragma_suppresses_multiple_definition() {
    let src = "\
config DUP
    bool \"dup\"

# ignore: multiple-definition
config DUP
    default y
";
    let world = World::from_source(src).unwrap();
    assert!(
        !world
            .report
            .diagnostics()
            .iter()
            .any(|d| d.category == Category::MultipleDefinition)
    );
}

#[test]
fn macro_assignment_expands_in_expressions() {
    let src = "\
FOO = 42

config BAR
    int \"bar\"
    default $(FOO)
";
    let mut world = World::from_source(src).unwrap();
    let id = world.defined_sym_id("BAR").unwrap();
    assert_eq!(world.value(id), kconfig_tools::symbol::Value::Int(42));
}

#[test]
fn macro_expands_from_environment_in_quoted_context() {
    let src = "\
config GREET
    string \"greeting\"
    default \"$(NAME)\"
";
    let env = std::collections::HashMap::from([("NAME".to_string(), "hello".to_string())]);
    let mut world = World::from_source_with_env(src, env).unwrap();
    let id = world.defined_sym_id("GREET").unwrap();
    assert_eq!(
        world.value(id),
        kconfig_tools::symbol::Value::Str("hello".to_string())
    );
}

#[test]
fn unset_macro_in_quoted_context_is_empty() {
    let src = "\
config GREET
    string \"greeting\"
    default \"$(MISSING)\"
";
    let mut world = World::from_source(src).unwrap();
    let id = world.defined_sym_id("GREET").unwrap();
    assert_eq!(
        world.value(id),
        kconfig_tools::symbol::Value::Str(String::new())
    );
}

#[test]
fn unset_macro_in_bare_context_is_a_parse_error() {
    let src = "\
config BAR
    int \"bar\"
    default $(MISSING)
";
    let err = World::from_source(src).unwrap_err();
    assert!(err.to_string().contains("MISSING"), "{err}");
}
