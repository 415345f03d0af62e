#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::{Arbitrary, Unstructured};

/// A clause plus the printer settings to render it with.
#[derive(Debug)]
pub struct ClauseInput {
    pub clause: String,
    pub context: String,
    /// `;`-separated `KEY=TEXT` entries
    pub overrides: String,
}

impl<'a> Arbitrary<'a> for ClauseInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let context = bounded_string(u, MAX_CONTEXT_LENGTH)?;
        let overrides = override_entries(u)?;
        let clause = bounded_string(u, MAX_CLAUSE_LENGTH)?;
        Ok(ClauseInput {
            clause,
            context,
            overrides,
        })
    }
}

// Clauses are short; long inputs only slow the fuzzer down
const MAX_CLAUSE_LENGTH: usize = 2000;
const MAX_CONTEXT_LENGTH: usize = 32;

const KEYS: &[&str] = &[
    "EQ", "NE", "LT", "LE", "GT", "GE", "AND", "OR", "NOT", "LIKE", "ADD", "SUB", "MUL", "DIV",
    "MOD", "NEG", "=", "<>", "!=", "<=", ">=",
];

fn bounded_string(u: &mut Unstructured, max: usize) -> arbitrary::Result<String> {
    let s: String = u.arbitrary()?;
    Ok(s.chars().take(max).collect())
}

// Mostly well-formed entries so the overrides actually reach the renderer
fn override_entries(u: &mut Unstructured) -> arbitrary::Result<String> {
    let mut entries = Vec::new();
    for _ in 0..u.int_in_range(0..=4)? {
        let key = u.choose(KEYS)?;
        let text = bounded_string(u, 8)?;
        entries.push(format!("{key}={text}"));
    }
    Ok(entries.join(";"))
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = Unstructured::new(data).arbitrary::<ClauseInput>() {
        mssql_spel::fuzz_helper::parse_and_render_with(
            &input.clause,
            &input.context,
            &input.overrides,
        );
    }
});
