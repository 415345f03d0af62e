use std::fmt::{Display, Formatter};

/// Every infix operator the parser can produce. Source spellings are
///  normalized while parsing: `<>` and `!=` are both [BinaryOp::Ne], `!<` is
///  [BinaryOp::Ge] and `!>` is [BinaryOp::Le].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// The canonical T-SQL spelling.
    pub fn sql(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A constant. The variant is the kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "value", rename_all = "lowercase")
)]
pub enum Literal {
    /// Unescaped contents, without quotes
    String(String),
    /// Kept as written (sign and fraction included) so rendering is exact
    Number(String),
    Boolean(bool),
    Null,
}

/// A WHEN branch of CASE
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct When {
    pub cond: Expression,
    pub then: Expression,
}

/// The parsed clause. Each node owns its children outright; there is no node
///  for explicit parentheses, grouping only shows in the shape of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expression {
    Literal(Literal),
    /// A column reference. Qualified names are joined with `.`: `t.[col]`
    ///  becomes `t.col`.
    Variable {
        name: String,
    },
    UnaryOperator(UnaryOp, Box<Expression>),
    BinaryOperator(Box<Expression>, BinaryOp, Box<Expression>),
    /// `operand [NOT] BETWEEN low AND high`, inclusive
    Between {
        operand: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    /// `operand [NOT] IN (list...)`. The list is never empty and keeps source
    ///  order.
    In {
        operand: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    /// `operand [NOT] LIKE 'pattern'`, pattern unescaped
    Like {
        operand: Box<Expression>,
        pattern: String,
        negated: bool,
    },
    /// `operand IS [NOT] NULL`
    NullCheck {
        operand: Box<Expression>,
        negated: bool,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    /// Searched CASE. There is always at least one branch.
    Case {
        branches: Vec<When>,
        r#else: Option<Box<Expression>>,
    },
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable { name: name.into() }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Expression::Literal(Literal::Number(text.into()))
    }

    pub fn binary(l: Expression, op: BinaryOp, r: Expression) -> Self {
        Expression::BinaryOperator(Box::new(l), op, Box::new(r))
    }

    pub fn not(operand: Expression) -> Self {
        Expression::UnaryOperator(UnaryOp::Not, Box::new(operand))
    }
}

// These From implementations keep hand-built trees in tests readable
impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::Literal(Literal::String(s.to_string()))
    }
}
impl From<i64> for Expression {
    fn from(n: i64) -> Self {
        Expression::Literal(Literal::Number(n.to_string()))
    }
}
impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Literal(Literal::Boolean(b))
    }
}

fn write_list(f: &mut Formatter, items: &[Expression]) -> std::fmt::Result {
    let mut first = true;
    for item in items {
        if first {
            first = false;
        } else {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Prints the tree back as SQL with every compound node parenthesized, which
///  makes the parsed grouping visible.
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expression::Literal(Literal::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expression::Literal(Literal::Number(n)) => write!(f, "{n}"),
            Expression::Literal(Literal::Boolean(b)) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expression::Literal(Literal::Null) => write!(f, "NULL"),
            Expression::Variable { name } => write!(f, "{name}"),
            Expression::UnaryOperator(UnaryOp::Not, child) => write!(f, "(NOT {child})"),
            Expression::UnaryOperator(UnaryOp::Neg, child) => write!(f, "(-{child})"),
            Expression::BinaryOperator(l, op, r) => write!(f, "({l} {} {r})", op.sql()),
            Expression::Between {
                operand,
                low,
                high,
                negated,
            } => write!(f, "({operand} {}BETWEEN {low} AND {high})", not(negated)),
            Expression::In {
                operand,
                list,
                negated,
            } => {
                write!(f, "({operand} {}IN (", not(negated))?;
                write_list(f, list)?;
                write!(f, "))")
            }
            Expression::Like {
                operand,
                pattern,
                negated,
            } => write!(
                f,
                "({operand} {}LIKE '{}')",
                not(negated),
                pattern.replace('\'', "''")
            ),
            Expression::NullCheck { operand, negated } => {
                write!(f, "({operand} IS {}NULL)", not(negated))
            }
            Expression::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::Case { branches, r#else } => {
                write!(f, "CASE")?;
                for When { cond, then } in branches {
                    write!(f, " WHEN {cond} THEN {then}")?;
                }
                if let Some(r#else) = r#else {
                    write!(f, " ELSE {}", r#else)?;
                }
                write!(f, " END")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_grouping() {
        let tree = Expression::binary(
            Expression::not(Expression::binary(
                Expression::variable("a"),
                BinaryOp::Or,
                Expression::variable("b"),
            )),
            BinaryOp::And,
            Expression::In {
                operand: Box::new(Expression::variable("role")),
                list: vec!["x".into(), 1.into()],
                negated: true,
            },
        );
        assert_eq!(
            tree.to_string(),
            "((NOT (a OR b)) AND (role NOT IN ('x', 1)))"
        );
    }

    #[test]
    fn display_case() {
        let tree = Expression::Case {
            branches: vec![When {
                cond: Expression::NullCheck {
                    operand: Box::new(Expression::variable("n")),
                    negated: false,
                },
                then: "O'Neil".into(),
            }],
            r#else: Some(Box::new(Expression::Literal(Literal::Null))),
        };
        assert_eq!(tree.to_string(), "CASE WHEN (n IS NULL) THEN 'O''Neil' ELSE NULL END");
    }

    #[test]
    fn comparison_ops() {
        assert!(BinaryOp::Ne.is_comparison());
        assert!(!BinaryOp::And.is_comparison());
        assert!(!BinaryOp::Mod.is_comparison());
    }
}
