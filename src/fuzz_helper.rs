use crate::{
    parser::parse,
    to_spel::{OperatorMap, PrinterConfig, render_with},
};

/// Runs arbitrary text through the whole pipeline. Errors are fine, panics
///  are not; a successful parse must render the same way twice.
pub fn parse_and_render(input: &str) {
    parse_and_render_with(input, "#root", "");
}

/// Like [parse_and_render], but also renders with [context] and the
///  `;`-separated `KEY=TEXT` overrides in [overrides]. Overrides that don't
///  parse are dropped.
pub fn parse_and_render_with(input: &str, context: &str, overrides: &str) {
    let mut operators = OperatorMap::new();
    for entry in overrides.split(';') {
        if let Ok((tag, text)) = OperatorMap::parse_override(entry) {
            operators.insert(tag, text);
        }
    }

    if let Ok(tree) = parse(input) {
        for config in [
            PrinterConfig::default(),
            PrinterConfig {
                context: context.to_string(),
                operators: operators.clone(),
            },
        ] {
            let first = render_with(&tree, &config);
            let second = render_with(&tree, &config);
            assert_eq!(first, second);
        }

        // The debug printer has to cope with anything the parser builds
        _ = tree.to_string();
    }
}
