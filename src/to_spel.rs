//! Renders a parsed clause as Spring Expression Language.
//!
//! Rendering is total: every [Expression] has a rendering and every
//!  [OperatorTag] has a default text, so nothing here can fail. The only
//!  fallible step is turning textual overrides into an [OperatorMap].
use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result},
};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};
use tracing::debug;

use crate::{
    ast::{BinaryOp, Expression, Literal, UnaryOp, When},
    functions::KnownFunction,
};

/// The operators whose rendered text can be overridden. Parsing accepts the
///  tag name or the SQL spelling, ignoring case.
#[derive(StrumDisplay, EnumString, EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(ascii_case_insensitive)]
pub enum OperatorTag {
    #[strum(to_string = "EQ", serialize = "=")]
    Eq,
    #[strum(to_string = "NE", serialize = "<>", serialize = "!=")]
    Ne,
    #[strum(to_string = "LT", serialize = "<")]
    Lt,
    #[strum(to_string = "LE", serialize = "<=")]
    Le,
    #[strum(to_string = "GT", serialize = ">")]
    Gt,
    #[strum(to_string = "GE", serialize = ">=")]
    Ge,
    #[strum(to_string = "AND")]
    And,
    #[strum(to_string = "OR")]
    Or,
    #[strum(to_string = "NOT")]
    Not,
    #[strum(to_string = "LIKE")]
    Like,
    #[strum(to_string = "ADD", serialize = "+")]
    Add,
    #[strum(to_string = "SUB", serialize = "-")]
    Sub,
    #[strum(to_string = "MUL", serialize = "*")]
    Mul,
    #[strum(to_string = "DIV", serialize = "/")]
    Div,
    #[strum(to_string = "MOD", serialize = "%")]
    Mod,
    #[strum(to_string = "NEG")]
    Neg,
}

impl OperatorTag {
    /// Infix texts include their surrounding spaces; NOT and NEG are prefixes.
    pub fn default_text(self) -> &'static str {
        match self {
            OperatorTag::Eq => " == ",
            OperatorTag::Ne => " != ",
            OperatorTag::Lt => " < ",
            OperatorTag::Le => " <= ",
            OperatorTag::Gt => " > ",
            OperatorTag::Ge => " >= ",
            OperatorTag::And => " and ",
            OperatorTag::Or => " or ",
            OperatorTag::Not => "not ",
            OperatorTag::Like => " matches ",
            OperatorTag::Add => " + ",
            OperatorTag::Sub => " - ",
            OperatorTag::Mul => " * ",
            OperatorTag::Div => " / ",
            OperatorTag::Mod => " % ",
            OperatorTag::Neg => "-",
        }
    }
}

impl From<BinaryOp> for OperatorTag {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => OperatorTag::Add,
            BinaryOp::Sub => OperatorTag::Sub,
            BinaryOp::Mul => OperatorTag::Mul,
            BinaryOp::Div => OperatorTag::Div,
            BinaryOp::Mod => OperatorTag::Mod,
            BinaryOp::Eq => OperatorTag::Eq,
            BinaryOp::Ne => OperatorTag::Ne,
            BinaryOp::Lt => OperatorTag::Lt,
            BinaryOp::Le => OperatorTag::Le,
            BinaryOp::Gt => OperatorTag::Gt,
            BinaryOp::Ge => OperatorTag::Ge,
            BinaryOp::And => OperatorTag::And,
            BinaryOp::Or => OperatorTag::Or,
        }
    }
}

impl From<UnaryOp> for OperatorTag {
    fn from(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Not => OperatorTag::Not,
            UnaryOp::Neg => OperatorTag::Neg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("Unknown operator `{0}` in mapping override")]
    UnknownOperator(String),
    #[error("Malformed mapping override `{0}`, expected KEY=TEXT")]
    MalformedOverride(String),
}

/// Caller-supplied replacements for the default operator texts. Only the
///  overrides are stored; everything else falls back to
///  [OperatorTag::default_text].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorMap {
    overrides: HashMap<OperatorTag, String>,
}

impl OperatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: OperatorTag, text: impl Into<String>) -> Self {
        self.insert(tag, text);
        self
    }

    pub fn insert(&mut self, tag: OperatorTag, text: impl Into<String>) {
        self.overrides.insert(tag, text.into());
    }

    pub fn text(&self, tag: OperatorTag) -> &str {
        self.overrides
            .get(&tag)
            .map(String::as_str)
            .unwrap_or_else(|| tag.default_text())
    }

    /// Parses `KEY=TEXT`. The key may itself contain `=` (`<==le`), so the
    ///  longest prefix that names an operator wins. TEXT is kept verbatim.
    pub fn parse_override(entry: &str) -> std::result::Result<(OperatorTag, String), MappingError> {
        let mut found = None;
        for (i, _) in entry.match_indices('=') {
            if let Ok(tag) = entry[..i].trim().parse::<OperatorTag>() {
                found = Some((tag, entry[i + 1..].to_string()));
            }
        }
        match (found, entry.split_once('=')) {
            (Some(pair), _) => Ok(pair),
            (None, Some((key, _))) => Err(MappingError::UnknownOperator(key.trim().to_string())),
            (None, None) => Err(MappingError::MalformedOverride(entry.to_string())),
        }
    }

    /// Applies a list of `KEY=TEXT` entries in order; later entries win.
    pub fn apply<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<(), MappingError> {
        for entry in entries {
            let (tag, text) = Self::parse_override(entry)?;
            self.insert(tag, text);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Prefix of every variable reference. Empty renders bare names.
    pub context: String,
    pub operators: OperatorMap,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            context: "#root".to_string(),
            operators: OperatorMap::default(),
        }
    }
}

pub struct Printer<'a, T> {
    tree: &'a T,
    config: &'a PrinterConfig,
}

impl<'a, T> Printer<'a, T> {
    pub fn new(tree: &'a T, config: &'a PrinterConfig) -> Self {
        Self { tree, config }
    }
}

pub trait ToSpel {
    fn to_spel(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result;
}

impl<T> ToSpel for Box<T>
where
    T: ToSpel,
{
    fn to_spel(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        self.as_ref().to_spel(out, conf)
    }
}

impl<T> Display for Printer<'_, T>
where
    T: ToSpel,
{
    fn fmt(&self, f: &mut Formatter) -> Result {
        self.tree.to_spel(f, self.config)
    }
}

/// Renders [ast] with the given context prefix and operator overrides.
pub fn render(ast: &Expression, context: &str, overrides: &OperatorMap) -> String {
    let config = PrinterConfig {
        context: context.to_string(),
        operators: overrides.clone(),
    };
    render_with(ast, &config)
}

pub fn render_with(ast: &Expression, config: &PrinterConfig) -> String {
    let rendered = Printer::new(ast, config).to_string();
    debug!(%rendered, "rendered clause");
    rendered
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
enum Parenthesize {
    Yes,
    #[default]
    No,
}

impl Parenthesize {
    fn when(cond: bool) -> Self {
        if cond {
            Parenthesize::Yes
        } else {
            Parenthesize::No
        }
    }
    fn open(&self, out: &mut Formatter) -> Result {
        self.write(out, "(")
    }
    fn close(&self, out: &mut Formatter) -> Result {
        self.write(out, ")")
    }
    fn write(&self, out: &mut Formatter, str: &str) -> Result {
        if self == &Parenthesize::Yes {
            out.write_str(str)
        } else {
            Ok(())
        }
    }
}

/// How tightly a rendered node holds together, loosest first. Nodes that
///  render with their own parentheses or as a method call are [Tier::Atom].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Or,
    And,
    Not,
    Predicate,
    Additive,
    Multiplicative,
    Negation,
    Atom,
}

impl Tier {
    fn of(expr: &Expression) -> Tier {
        match expr {
            Expression::BinaryOperator(_, op, _) => match op {
                BinaryOp::Or => Tier::Or,
                BinaryOp::And => Tier::And,
                BinaryOp::Add | BinaryOp::Sub => Tier::Additive,
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => Tier::Multiplicative,
                op if op.is_comparison() => Tier::Predicate,
                _ => Tier::Atom,
            },
            Expression::UnaryOperator(UnaryOp::Not, _) => Tier::Not,
            Expression::UnaryOperator(UnaryOp::Neg, _) => Tier::Negation,
            Expression::Between { negated: true, .. }
            | Expression::In { negated: true, .. }
            | Expression::Like { negated: true, .. } => Tier::Not,
            Expression::Like { .. } | Expression::NullCheck { .. } => Tier::Predicate,
            _ => Tier::Atom,
        }
    }
}

/// Writes [child], parenthesized if it binds more loosely than [min].
fn write_operand(out: &mut Formatter, conf: &PrinterConfig, child: &Expression, min: Tier) -> Result {
    write_wrapped(out, conf, child, Parenthesize::when(Tier::of(child) < min))
}

fn write_wrapped(
    out: &mut Formatter,
    conf: &PrinterConfig,
    child: &Expression,
    p: Parenthesize,
) -> Result {
    p.open(out)?;
    child.to_spel(out, conf)?;
    p.close(out)
}

fn write_list(out: &mut Formatter, conf: &PrinterConfig, items: &[Expression]) -> Result {
    let mut is_first = true;
    for item in items {
        if is_first {
            is_first = false;
        } else {
            write!(out, ", ")?;
        }
        item.to_spel(out, conf)?;
    }
    Ok(())
}

fn write_string(out: &mut Formatter, s: &str) -> Result {
    write!(out, "'{}'", s.replace('\'', "''"))
}

/// `(<x> != null ? <x> : <rest>)`
fn write_null_fallback(
    out: &mut Formatter,
    conf: &PrinterConfig,
    x: &Expression,
    rest: impl FnOnce(&mut Formatter) -> Result,
) -> Result {
    write!(out, "(")?;
    write_operand(out, conf, x, Tier::Additive)?;
    write!(out, "{}null ? ", conf.operators.text(OperatorTag::Ne))?;
    x.to_spel(out, conf)?;
    write!(out, " : ")?;
    rest(out)?;
    write!(out, ")")
}

fn write_coalesce(out: &mut Formatter, conf: &PrinterConfig, args: &[Expression]) -> Result {
    match args {
        [] => write!(out, "null"),
        [last] => last.to_spel(out, conf),
        [first, rest @ ..] => {
            write_null_fallback(out, conf, first, |out| write_coalesce(out, conf, rest))
        }
    }
}

fn write_known_function(
    out: &mut Formatter,
    conf: &PrinterConfig,
    function: KnownFunction,
    args: &[Expression],
) -> Result {
    match (function, args) {
        (KnownFunction::ISNULL | KnownFunction::COALESCE, _) => write_coalesce(out, conf, args),
        (KnownFunction::IIF, [cond, when_true, when_false]) => {
            write!(out, "(")?;
            cond.to_spel(out, conf)?;
            write!(out, " ? ")?;
            when_true.to_spel(out, conf)?;
            write!(out, " : ")?;
            when_false.to_spel(out, conf)?;
            write!(out, ")")
        }
        (KnownFunction::NULLIF, [a, b]) => {
            write!(out, "(")?;
            write_operand(out, conf, a, Tier::Additive)?;
            out.write_str(conf.operators.text(OperatorTag::Eq))?;
            write_operand(out, conf, b, Tier::Additive)?;
            write!(out, " ? null : ")?;
            a.to_spel(out, conf)?;
            write!(out, ")")
        }
        // The parser checks arity, hand-built trees get the plain call
        _ => write_call(out, conf, &function.to_string(), args),
    }
}

fn write_call(out: &mut Formatter, conf: &PrinterConfig, name: &str, args: &[Expression]) -> Result {
    write!(out, "{name}(")?;
    write_list(out, conf, args)?;
    write!(out, ")")
}

/// `(<cond1> ? <res1> : (<cond2> ? <res2> : <else-or-null>))`
fn write_case(
    out: &mut Formatter,
    conf: &PrinterConfig,
    branches: &[When],
    r#else: Option<&Expression>,
) -> Result {
    let Some((When { cond, then }, rest)) = branches.split_first() else {
        return match r#else {
            Some(r#else) => r#else.to_spel(out, conf),
            None => write!(out, "null"),
        };
    };
    write!(out, "(")?;
    cond.to_spel(out, conf)?;
    write!(out, " ? ")?;
    then.to_spel(out, conf)?;
    write!(out, " : ")?;
    write_case(out, conf, rest, r#else)?;
    write!(out, ")")
}

fn write_variable(out: &mut Formatter, conf: &PrinterConfig, name: &str) -> Result {
    if !conf.context.is_empty() {
        write!(out, "{}.", conf.context)?;
    }
    let mut is_first = true;
    for segment in name.split('.') {
        if is_first {
            is_first = false;
        } else {
            write!(out, ".")?;
        }
        out.write_str(&camel_case(segment))?;
    }
    Ok(())
}

/// `first-name` and `First Name` both become `firstName`. Segments without
///  separators are left alone.
fn camel_case(segment: &str) -> String {
    if !segment.contains(['-', ' ']) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    for (i, word) in segment
        .split(['-', ' '])
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(c) = chars.next() {
            if i == 0 {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Translates a LIKE pattern into a regex for SpEL's `matches`, which must
///  match the whole string just as LIKE does.
pub(crate) fn like_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '%' | '_' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '%' { ".*" } else { "." });
            }
            '[' => match rest
                .chars()
                .next()
                .map(char::len_utf8)
                .and_then(|first| rest[first..].find(']').map(|i| i + first))
                .filter(|&close| &rest[..close] != "^")
            {
                // A class needs at least one member; `[]`, `[^]` and `[abc` are text
                Some(close) => {
                    out.push_str(&regex::escape(&literal));
                    literal.clear();
                    let class = &rest[..close];
                    out.push('[');
                    let members = match class.strip_prefix('^') {
                        Some(members) => {
                            out.push('^');
                            members
                        }
                        None => class,
                    };
                    for m in members.chars() {
                        if matches!(m, '\\' | '[') {
                            out.push('\\');
                        }
                        out.push(m);
                    }
                    out.push(']');
                    rest = &rest[close + 1..];
                }
                None => literal.push(c),
            },
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

impl ToSpel for Expression {
    fn to_spel(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        let ops = &conf.operators;
        match self {
            Expression::Literal(Literal::String(s)) => write_string(out, s),
            Expression::Literal(Literal::Number(n)) => out.write_str(n),
            Expression::Literal(Literal::Boolean(b)) => {
                write!(out, "{}", if *b { "true" } else { "false" })
            }
            Expression::Literal(Literal::Null) => write!(out, "null"),
            Expression::Variable { name } => write_variable(out, conf, name),

            // NOT binds tighter than comparisons and `matches` too
            Expression::UnaryOperator(UnaryOp::Not, exp) => {
                out.write_str(ops.text(OperatorTag::Not))?;
                write_wrapped(
                    out,
                    conf,
                    exp,
                    Parenthesize::when(Tier::of(exp) <= Tier::Predicate),
                )
            }
            Expression::UnaryOperator(UnaryOp::Neg, exp) => {
                out.write_str(ops.text(OperatorTag::Neg))?;
                // `--5` would read as a decrement
                let signed = matches!(
                    exp.as_ref(),
                    Expression::UnaryOperator(UnaryOp::Neg, _)
                ) || matches!(
                    exp.as_ref(),
                    Expression::Literal(Literal::Number(n)) if n.starts_with(['-', '+'])
                );
                write_wrapped(
                    out,
                    conf,
                    exp,
                    Parenthesize::when(signed || Tier::of(exp) < Tier::Negation),
                )
            }
            Expression::BinaryOperator(l, op, r) => {
                let parent = Tier::of(self);
                let chains = matches!(parent, Tier::And | Tier::Or);
                let predicate = parent == Tier::Predicate;

                let left = Tier::of(l);
                write_wrapped(
                    out,
                    conf,
                    l,
                    Parenthesize::when(left < parent || (predicate && left == parent)),
                )?;
                out.write_str(ops.text(OperatorTag::from(*op)))?;
                let right = Tier::of(r);
                write_wrapped(
                    out,
                    conf,
                    r,
                    Parenthesize::when(right < parent || (!chains && right == parent)),
                )
            }

            Expression::Between {
                operand,
                low,
                high,
                negated,
            } => {
                if *negated {
                    out.write_str(ops.text(OperatorTag::Not))?;
                }
                write!(out, "(")?;
                write_operand(out, conf, operand, Tier::Additive)?;
                out.write_str(ops.text(OperatorTag::Ge))?;
                write_operand(out, conf, low, Tier::Additive)?;
                out.write_str(ops.text(OperatorTag::And))?;
                write_operand(out, conf, operand, Tier::Additive)?;
                out.write_str(ops.text(OperatorTag::Le))?;
                write_operand(out, conf, high, Tier::Additive)?;
                write!(out, ")")
            }
            Expression::In {
                operand,
                list,
                negated,
            } => {
                if *negated {
                    out.write_str(ops.text(OperatorTag::Not))?;
                }
                write!(out, "{{")?;
                write_list(out, conf, list)?;
                write!(out, "}}.contains(")?;
                operand.to_spel(out, conf)?;
                write!(out, ")")
            }
            Expression::Like {
                operand,
                pattern,
                negated,
            } => {
                // NOT binds tighter than `matches`
                let p = Parenthesize::when(*negated);
                if *negated {
                    out.write_str(ops.text(OperatorTag::Not))?;
                }
                p.open(out)?;
                write_operand(out, conf, operand, Tier::Additive)?;
                out.write_str(ops.text(OperatorTag::Like))?;
                write_string(out, &like_regex(pattern))?;
                p.close(out)
            }
            Expression::NullCheck { operand, negated } => {
                write_operand(out, conf, operand, Tier::Additive)?;
                let tag = if *negated {
                    OperatorTag::Ne
                } else {
                    OperatorTag::Eq
                };
                write!(out, "{}null", ops.text(tag))
            }

            Expression::FunctionCall { name, args } => match KnownFunction::lookup(name) {
                Some(function) if function.accepts(args.len()) => {
                    write_known_function(out, conf, function, args)
                }
                _ => write_call(out, conf, name, args),
            },
            Expression::Case { branches, r#else } => {
                write_case(out, conf, branches, r#else.as_deref())
            }
        }
    }
}
