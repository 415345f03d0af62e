use tracing::debug;

use crate::{
    ast::{BinaryOp, Expression, Literal, UnaryOp, When},
    functions::KnownFunction,
    lex::{self, Token, TokenType, tokenize},
};

impl TryFrom<TokenType> for BinaryOp {
    type Error = ();
    fn try_from(value: TokenType) -> Result<Self, Self::Error> {
        match value {
            TokenType::Plus => Ok(BinaryOp::Add),
            TokenType::Minus => Ok(BinaryOp::Sub),
            TokenType::Asterisk => Ok(BinaryOp::Mul),
            TokenType::ForwardSlash => Ok(BinaryOp::Div),
            TokenType::Percent => Ok(BinaryOp::Mod),
            TokenType::Equals => Ok(BinaryOp::Eq),
            TokenType::NotEquals => Ok(BinaryOp::Ne),
            TokenType::LT => Ok(BinaryOp::Lt),
            TokenType::LTE => Ok(BinaryOp::Le),
            TokenType::GT => Ok(BinaryOp::Gt),
            TokenType::GTE => Ok(BinaryOp::Ge),
            TokenType::And => Ok(BinaryOp::And),
            TokenType::Or => Ok(BinaryOp::Or),
            _ => Err(()),
        }
    }
}

/// Valid SQL that this translator deliberately does not handle.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    #[strum(to_string = "subquery")]
    Subquery,
    #[strum(to_string = "JOIN")]
    Join,
    #[strum(to_string = "window function OVER clause")]
    WindowFunction,
    #[strum(to_string = "EXISTS predicate")]
    Exists,
    #[strum(to_string = "set operation (UNION/INTERSECT/EXCEPT)")]
    SetOperation,
    #[strum(to_string = "quantified comparison (ALL/ANY/SOME)")]
    Quantifier,
    #[strum(to_string = "bitwise operator")]
    BitwiseOperator,
    #[strum(to_string = "MOD/DIV keyword operator")]
    KeywordOperator,
    #[strum(to_string = "wildcard (*) function argument")]
    WildcardArgument,
    #[strum(to_string = "FROM/GROUP BY/ORDER BY clause")]
    Clause,
    #[strum(to_string = "data modification or definition statement")]
    Statement,
}

impl Feature {
    fn from_keyword(word: &str) -> Feature {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" => Feature::Subquery,
            "JOIN" => Feature::Join,
            "OVER" | "PARTITION" => Feature::WindowFunction,
            "EXISTS" => Feature::Exists,
            "UNION" | "INTERSECT" | "EXCEPT" => Feature::SetOperation,
            "ALL" | "ANY" | "SOME" => Feature::Quantifier,
            "MOD" | "DIV" => Feature::KeywordOperator,
            "FROM" | "GROUP" | "ORDER" => Feature::Clause,
            _ => Feature::Statement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Lexical error: {0}")]
    Lexical(#[from] lex::Error),
    /// `index` is the 0-based position in the token sequence (after any
    ///  leading WHERE/HAVING is dropped).
    #[error("Syntax error at token {index}: expected {expected}, found {found}")]
    Syntax {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("Unsupported feature: {0}")]
    Unsupported(Feature),
}

/// Parses a WHERE/HAVING clause or a CASE expression. The leading keyword is
///  optional.
pub fn parse(input: &str) -> Result<Expression, Error> {
    debug!(input, "parsing clause");
    let mut parser = Parser {
        source: input,
        tokens: tokenize(input)?,
        pos: 0,
        depth: 0,
    };

    let root = parser.parse_logical(0)?;

    // Make sure we've completely parsed the input
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("end of input"));
    }
    debug!(tree = %root, "parsed clause");
    Ok(root)
}

/// Deepest nesting of parentheses, NOT, unary signs and CASE accepted.
pub const MAX_DEPTH: usize = 128;

struct Parser<'input> {
    source: &'input str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'input> Parser<'input> {
    #[inline]
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    #[inline]
    fn peek_ty(&self) -> Option<TokenType> {
        self.peek().map(|t| t.ty)
    }

    #[inline]
    fn peek_ty_at(&self, at: usize) -> Option<TokenType> {
        self.tokens.get(self.pos + at).map(|t| t.ty)
    }

    /// If the next token is a [ty], consume it and return true.
    fn consume(&mut self, ty: TokenType) -> bool {
        if self.peek_ty() == Some(ty) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ty: TokenType, expected: &str) -> Result<Token, Error> {
        match self.peek() {
            Some(token) if token.ty == ty => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error(expected)),
        }
    }

    /// Runs [f] one nesting level deeper, failing at the current token once
    ///  [MAX_DEPTH] is passed.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("at most {MAX_DEPTH} levels of nesting")));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn error(&self, expected: impl Into<String>) -> Error {
        self.error_at(self.pos, expected)
    }

    /// Builds the error for a grammar that can't advance at [index]. Running
    ///  into a keyword we know but don't support is reported as such rather
    ///  than as a syntax error.
    fn error_at(&self, index: usize, expected: impl Into<String>) -> Error {
        match self.tokens.get(index) {
            Some(token) if token.ty == TokenType::Unsupported => {
                Error::Unsupported(Feature::from_keyword(token.source_of(self.source)))
            }
            Some(token) if token.ty == TokenType::Bitwise => {
                Error::Unsupported(Feature::BitwiseOperator)
            }
            found => Error::Syntax {
                index,
                expected: expected.into(),
                found: match found {
                    Some(token) => format!("`{}`", token.source_of(self.source)),
                    None => "end of input".to_string(),
                },
            },
        }
    }

    /// or_expr, and_expr and not_expr
    fn parse_logical(&mut self, min_binding_power: u8) -> Result<Expression, Error> {
        let mut lhs = if let Some(((), pow)) = self.peek_ty().and_then(prefix_binding) {
            self.pos += 1;
            let operand = self.nested(|p| p.parse_logical(pow))?;
            Expression::UnaryOperator(UnaryOp::Not, Box::new(operand))
        } else {
            self.parse_predicate()?
        };

        loop {
            let Some(ty) = self.peek_ty() else {
                break;
            };
            let Some((l_pow, r_pow)) = logical_binding(ty) else {
                break;
            };
            if l_pow < min_binding_power {
                break;
            }
            let Ok(op) = BinaryOp::try_from(ty) else {
                break;
            };

            // Consume the operator token
            self.pos += 1;
            let rhs = self.parse_logical(r_pow)?;
            lhs = Expression::binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    /// An operand optionally followed by exactly one comparison-type test.
    ///  Chains like `a = b = c` stop after the first test and fail in the
    ///  caller.
    fn parse_predicate(&mut self) -> Result<Expression, Error> {
        let operand = self.parse_operand(0)?;
        let Some(ty) = self.peek_ty() else {
            return Ok(operand);
        };

        match ty {
            TokenType::Equals
            | TokenType::NotEquals
            | TokenType::LT
            | TokenType::LTE
            | TokenType::GT
            | TokenType::GTE => {
                self.pos += 1;
                let rhs = self.parse_operand(0)?;
                let op = BinaryOp::try_from(ty).map_err(|()| self.error("comparison"))?;
                Ok(Expression::binary(operand, op, rhs))
            }
            TokenType::Between | TokenType::In | TokenType::Like => {
                self.parse_range_or_set(operand, false)
            }
            TokenType::Not => match self.peek_ty_at(1) {
                Some(TokenType::Between | TokenType::In | TokenType::Like) => {
                    self.pos += 1;
                    self.parse_range_or_set(operand, true)
                }
                _ => Err(self.error_at(self.pos + 1, "BETWEEN, IN or LIKE")),
            },
            TokenType::Is => {
                self.pos += 1;
                let negated = self.consume(TokenType::Not);
                self.expect(TokenType::Null, "NULL")?;
                Ok(Expression::NullCheck {
                    operand: Box::new(operand),
                    negated,
                })
            }
            _ => Ok(operand),
        }
    }

    /// BETWEEN, IN and LIKE, with the keyword as the next token
    fn parse_range_or_set(&mut self, operand: Expression, negated: bool) -> Result<Expression, Error> {
        let operand = Box::new(operand);
        if self.consume(TokenType::Between) {
            let low = self.parse_operand(0)?;
            self.expect(TokenType::And, "AND")?;
            let high = self.parse_operand(0)?;
            Ok(Expression::Between {
                operand,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            })
        } else if self.consume(TokenType::In) {
            self.expect(TokenType::ParenLeft, "'('")?;
            let mut list = Vec::new();
            loop {
                list.push(self.parse_operand(0)?);
                if !self.consume(TokenType::Comma) {
                    self.expect(TokenType::ParenRight, "',' or ')'")?;
                    break;
                }
            }
            Ok(Expression::In {
                operand,
                list,
                negated,
            })
        } else {
            self.expect(TokenType::Like, "LIKE")?;
            let pattern = match self.peek() {
                Some(token)
                    if matches!(
                        token.ty,
                        TokenType::StringSingleQuote | TokenType::StringDoubleQuote
                    ) =>
                {
                    token.contents(self.source)
                }
                _ => return Err(self.error("string literal")),
            };
            self.pos += 1;
            Ok(Expression::Like {
                operand,
                pattern,
                negated,
            })
        }
    }

    /// Arithmetic over primaries
    fn parse_operand(&mut self, min_binding_power: u8) -> Result<Expression, Error> {
        let mut lhs = self.parse_primary()?;

        loop {
            let Some(ty) = self.peek_ty() else {
                break;
            };
            let Some((l_pow, r_pow)) = arithmetic_binding(ty) else {
                break;
            };
            if l_pow < min_binding_power {
                break;
            }
            let Ok(op) = BinaryOp::try_from(ty) else {
                break;
            };

            self.pos += 1;
            let rhs = self.parse_operand(r_pow)?;
            lhs = Expression::binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("operand"));
        };

        match token.ty {
            // Parse the inner clause and expect a closing paren. The parens
            //  themselves leave no trace in the tree.
            TokenType::ParenLeft => {
                self.pos += 1;
                let inner = self.nested(|p| p.parse_logical(0))?;
                self.expect(TokenType::ParenRight, "')'")?;
                Ok(inner)
            }
            TokenType::Minus => {
                self.pos += 1;
                let operand = self.nested(Self::parse_primary)?;
                Ok(Expression::UnaryOperator(UnaryOp::Neg, Box::new(operand)))
            }
            TokenType::Plus => {
                self.pos += 1;
                self.nested(Self::parse_primary)
            }
            TokenType::Number => {
                self.pos += 1;
                Ok(Expression::number(token.source_of(self.source)))
            }
            TokenType::StringSingleQuote | TokenType::StringDoubleQuote => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::String(token.contents(self.source))))
            }
            TokenType::True | TokenType::False => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::Boolean(token.ty == TokenType::True)))
            }
            TokenType::Null => {
                self.pos += 1;
                Ok(Expression::Literal(Literal::Null))
            }
            TokenType::Case => self.nested(Self::parse_case),
            TokenType::Identifier if self.peek_ty_at(1) == Some(TokenType::ParenLeft) => {
                self.nested(|p| p.parse_fn_call(token))
            }
            TokenType::Identifier | TokenType::BracketIdentifier => self.parse_name(),
            _ => Err(self.error("operand")),
        }
    }

    // Handles `col`, `t.col` and `[t].[some col]`
    fn parse_name(&mut self) -> Result<Expression, Error> {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(token) if is_name_segment(token, self.source) => {
                    name.push_str(&token.contents(self.source));
                    self.pos += 1;
                }
                _ => return Err(self.error("identifier")),
            }
            if !self.consume(TokenType::Dot) {
                break;
            }
            name.push('.');
        }
        Ok(Expression::Variable { name })
    }

    fn parse_fn_call(&mut self, name_token: Token) -> Result<Expression, Error> {
        let name_index = self.pos;
        // Name and the ParenLeft we peeked
        self.pos += 2;

        if self.peek_ty() == Some(TokenType::Asterisk)
            && self.peek_ty_at(1) == Some(TokenType::ParenRight)
        {
            return Err(Error::Unsupported(Feature::WildcardArgument));
        }

        // Zero or more arguments
        let mut args = Vec::new();
        if !self.consume(TokenType::ParenRight) {
            loop {
                args.push(self.parse_logical(0)?);
                if !self.consume(TokenType::Comma) {
                    self.expect(TokenType::ParenRight, "',' or ')'")?;
                    break;
                }
            }
        }

        let name = name_token.source_of(self.source).to_string();
        if let Some(known) = KnownFunction::lookup(&name) {
            if !known.accepts(args.len()) {
                return Err(Error::Syntax {
                    index: name_index,
                    expected: format!("{} to {known}", known.arity()),
                    found: format!("{} arguments", args.len()),
                });
            }
        }

        Ok(Expression::FunctionCall { name, args })
    }

    fn parse_case(&mut self) -> Result<Expression, Error> {
        // CASE
        self.pos += 1;

        let mut branches = Vec::new();
        while self.consume(TokenType::When) {
            let cond = self.parse_logical(0)?;
            self.expect(TokenType::Then, "THEN")?;
            let then = self.parse_operand(0)?;
            branches.push(When { cond, then });
        }
        if branches.is_empty() {
            return Err(self.error("WHEN"));
        }

        let r#else = if self.consume(TokenType::Else) {
            let r#else = self.parse_operand(0)?;
            self.expect(TokenType::End, "END")?;
            Some(Box::new(r#else))
        } else {
            self.expect(TokenType::End, "WHEN, ELSE or END")?;
            None
        };

        Ok(Expression::Case { branches, r#else })
    }
}

/// After a dot any word is a name: `emp.type`, `t.[order]`.
fn is_name_segment(token: &Token, source: &str) -> bool {
    match token.ty {
        TokenType::Identifier | TokenType::BracketIdentifier => true,
        _ => token
            .source_of(source)
            .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'),
    }
}

// NOTE prefix_binding and the infix bindings specify the "binding power" of
//  the operators. Binding power is a more intuitive version of "precedence":
//  higher binding power means the operator binds more tightly. Comparisons,
//  BETWEEN, IN, LIKE and IS sit between NOT and arithmetic but never chain,
//  so they are handled by parse_predicate instead of a table entry.
fn prefix_binding(ty: TokenType) -> Option<((), u8)> {
    match ty {
        TokenType::Not => Some(((), 30)),
        _ => None,
    }
}

// NOTE for infix bindings we specify a left and right side of the operator,
//  this slight asymmetry prevents us from getting stuck on ties and makes
//  every operator here left-associative.
fn logical_binding(ty: TokenType) -> Option<(u8, u8)> {
    match ty {
        TokenType::And => Some((20, 21)),
        TokenType::Or => Some((10, 11)),
        _ => None,
    }
}

fn arithmetic_binding(ty: TokenType) -> Option<(u8, u8)> {
    match ty {
        TokenType::Plus | TokenType::Minus => Some((50, 51)),
        TokenType::Asterisk | TokenType::ForwardSlash | TokenType::Percent => Some((60, 61)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    fn syntax(index: usize, expected: &str, found: &str) -> Error {
        Error::Syntax {
            index,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    #[test]
    fn comparison() {
        let root = parse("WHERE age > 18").expect("a valid parse");
        assert_eq!(root, Expression::binary(var("age"), BinaryOp::Gt, 18.into()));
    }

    #[test]
    fn not_equals_is_normalized() {
        let a = parse("a <> 1").expect("a valid parse");
        let b = parse("a != 1").expect("a valid parse");
        assert_eq!(a, b);
        assert_eq!(a, Expression::binary(var("a"), BinaryOp::Ne, 1.into()));

        assert_eq!(
            parse("a !< 1").expect("a valid parse"),
            Expression::binary(var("a"), BinaryOp::Ge, 1.into())
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let root = parse("a = 1 OR b = 2 AND c = 3").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::Or, rhs) = root else {
            panic!("Expected an OR, got {root:?}");
        };
        assert_eq!(*lhs, Expression::binary(var("a"), BinaryOp::Eq, 1.into()));
        let Expression::BinaryOperator(_, BinaryOp::And, _) = *rhs else {
            panic!("Expected an AND, got {rhs:?}");
        };
    }

    #[test]
    fn and_chains_are_left_deep() {
        let root = parse("a AND b AND c").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(
                Expression::binary(var("a"), BinaryOp::And, var("b")),
                BinaryOp::And,
                var("c")
            )
        );
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let root = parse("NOT a = 1 AND b = 2").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::And, _) = root else {
            panic!("Expected an AND, got {root:?}");
        };
        assert_eq!(
            *lhs,
            Expression::not(Expression::binary(var("a"), BinaryOp::Eq, 1.into()))
        );

        let root = parse("NOT NOT x").expect("a valid parse");
        assert_eq!(root, Expression::not(Expression::not(var("x"))));
    }

    #[test]
    fn parentheses_leave_no_node() {
        assert_eq!(
            parse("((a = 1))").expect("a valid parse"),
            parse("a = 1").expect("a valid parse")
        );

        let root = parse("(a OR b) AND c").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(
                Expression::binary(var("a"), BinaryOp::Or, var("b")),
                BinaryOp::And,
                var("c")
            )
        );
    }

    #[test]
    fn between_consumes_its_and() {
        let root = parse("age BETWEEN 18 AND 65 AND x = 1").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::And, _) = root else {
            panic!("Expected an AND, got {root:?}");
        };
        assert_eq!(
            *lhs,
            Expression::Between {
                operand: Box::new(var("age")),
                low: Box::new(18.into()),
                high: Box::new(65.into()),
                negated: false,
            }
        );
    }

    #[test]
    fn in_list_keeps_order() {
        let root = parse("role NOT IN ('admin', 'manager', 'user')").expect("a valid parse");
        assert_eq!(
            root,
            Expression::In {
                operand: Box::new(var("role")),
                list: vec!["admin".into(), "manager".into(), "user".into()],
                negated: true,
            }
        );
    }

    #[test]
    fn like() {
        let root = parse("name LIKE 'Jo%'").expect("a valid parse");
        assert_eq!(
            root,
            Expression::Like {
                operand: Box::new(var("name")),
                pattern: "Jo%".into(),
                negated: false,
            }
        );

        let root = parse("name NOT LIKE \"x_\"").expect("a valid parse");
        let Expression::Like { negated: true, .. } = root else {
            panic!("Expected a negated LIKE, got {root:?}");
        };

        assert_eq!(parse("name LIKE 5"), Err(syntax(2, "string literal", "`5`")));
    }

    #[test]
    fn null_checks() {
        let root = parse("a IS NULL OR b IS NOT NULL").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(
                Expression::NullCheck {
                    operand: Box::new(var("a")),
                    negated: false
                },
                BinaryOp::Or,
                Expression::NullCheck {
                    operand: Box::new(var("b")),
                    negated: true
                },
            )
        );
        assert_eq!(parse("a IS 1"), Err(syntax(2, "NULL", "`1`")));
    }

    #[test]
    fn fn_calls() {
        let root = parse("ISNULL(nickname, name) = 'John'").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::Eq, _) = root else {
            panic!("Expected an Eq, got {root:?}");
        };
        assert_eq!(
            *lhs,
            Expression::FunctionCall {
                name: "ISNULL".into(),
                args: vec![var("nickname"), var("name")],
            }
        );

        let root = parse("GETDATE() > d").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::Gt, _) = root else {
            panic!("Expected a Gt, got {root:?}");
        };
        assert_eq!(
            *lhs,
            Expression::FunctionCall {
                name: "GETDATE".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn known_function_arity() {
        assert_eq!(
            parse("x = ISNULL(a)"),
            Err(syntax(2, "exactly 2 arguments to ISNULL", "1 arguments"))
        );
        assert!(parse("COALESCE(a, b, c, 'x') = 'x'").is_ok());
    }

    #[test]
    fn case() {
        let root = parse("CASE WHEN a > 1 THEN 'big' WHEN a > 0 THEN 'small' ELSE 'none' END")
            .expect("a valid parse");
        let Expression::Case { branches, r#else } = root else {
            panic!("Expected a CASE, got {root:?}");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].then, Expression::from("small"));
        assert_eq!(r#else, Some(Box::new(Expression::from("none"))));

        let root = parse("CASE WHEN a THEN 1 END = 1").expect("a valid parse");
        let Expression::BinaryOperator(lhs, BinaryOp::Eq, _) = root else {
            panic!("Expected an Eq, got {root:?}");
        };
        let Expression::Case { r#else: None, .. } = *lhs else {
            panic!("Expected a CASE without ELSE, got {lhs:?}");
        };

        assert_eq!(parse("CASE ELSE 1 END"), Err(syntax(1, "WHEN", "`ELSE`")));
        assert_eq!(
            parse("CASE WHEN a THEN 1"),
            Err(syntax(5, "WHEN, ELSE or END", "end of input"))
        );
    }

    #[test]
    fn qualified_names() {
        let root = parse("[user-profile].[first-name] = u.type").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(var("user-profile.first-name"), BinaryOp::Eq, var("u.type"))
        );
        assert_eq!(parse("t. = 1"), Err(syntax(2, "identifier", "`=`")));
    }

    #[test]
    fn arithmetic() {
        let root = parse("a + b * c >= -5").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(
                Expression::binary(
                    var("a"),
                    BinaryOp::Add,
                    Expression::binary(var("b"), BinaryOp::Mul, var("c"))
                ),
                BinaryOp::Ge,
                Expression::number("-5"),
            )
        );

        let root = parse("a - b - c").expect("a valid parse");
        assert_eq!(
            root,
            Expression::binary(
                Expression::binary(var("a"), BinaryOp::Sub, var("b")),
                BinaryOp::Sub,
                var("c")
            )
        );
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse("WHERE age >"), Err(syntax(2, "operand", "end of input")));
        assert_eq!(parse("age > AND x = 1"), Err(syntax(2, "operand", "`AND`")));
        assert_eq!(parse("(a = 1"), Err(syntax(4, "')'", "end of input")));
        assert_eq!(parse("x IN ()"), Err(syntax(3, "operand", "`)`")));
        assert_eq!(parse("a = 1 b"), Err(syntax(3, "end of input", "`b`")));
        assert_eq!(parse("a = b = c"), Err(syntax(3, "end of input", "`=`")));
        assert_eq!(parse("a NOT = 1"), Err(syntax(2, "BETWEEN, IN or LIKE", "`=`")));
        assert_eq!(parse(""), Err(syntax(0, "operand", "end of input")));
        assert_eq!(parse("WHERE"), Err(syntax(0, "operand", "end of input")));
        assert_eq!(parse("INVALID SQL HERE"), Err(syntax(1, "end of input", "`SQL`")));
    }

    #[test]
    fn unsupported_features() {
        assert_eq!(
            parse("id IN (SELECT id FROM t)"),
            Err(Error::Unsupported(Feature::Subquery))
        );
        assert_eq!(
            parse("age MOD 2 = 0"),
            Err(Error::Unsupported(Feature::KeywordOperator))
        );
        assert_eq!(
            parse("flags & 4 = 4"),
            Err(Error::Unsupported(Feature::BitwiseOperator))
        );
        assert_eq!(
            parse("HAVING COUNT(*) > 1"),
            Err(Error::Unsupported(Feature::WildcardArgument))
        );
        assert_eq!(
            parse("ROW_NUMBER() OVER (ORDER BY x) = 1"),
            Err(Error::Unsupported(Feature::WindowFunction))
        );
        assert_eq!(
            parse("EXISTS (SELECT 1)"),
            Err(Error::Unsupported(Feature::Exists))
        );
        assert_eq!(parse("a JOIN b"), Err(Error::Unsupported(Feature::Join)));
        assert_eq!(
            Error::Unsupported(Feature::Subquery).to_string(),
            "Unsupported feature: subquery"
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let limit = format!("at most {MAX_DEPTH} levels of nesting");
        let parens = |n: usize| format!("{}a = 1{}", "(".repeat(n), ")".repeat(n));

        assert!(parse(&parens(MAX_DEPTH)).is_ok());
        assert_eq!(
            parse(&parens(MAX_DEPTH + 1)),
            Err(syntax(MAX_DEPTH + 1, &limit, "`a`"))
        );
        assert_eq!(parse(&parens(10_000)), Err(syntax(MAX_DEPTH + 1, &limit, "`(`")));

        let nots = format!("{}a = 1", "NOT ".repeat(10_000));
        assert_eq!(parse(&nots), Err(syntax(MAX_DEPTH + 1, &limit, "`NOT`")));

        let signs = format!("a = {}b", "- ".repeat(10_000));
        assert_eq!(parse(&signs), Err(syntax(MAX_DEPTH + 3, &limit, "`-`")));

        let cases = format!("{}1{}", "CASE WHEN a = 1 THEN ".repeat(10_000), " END".repeat(10_000));
        assert!(matches!(parse(&cases), Err(Error::Syntax { expected, .. }) if expected == limit));
    }

    #[test]
    fn lexical_errors_propagate() {
        assert_eq!(
            parse("name = 'John"),
            Err(Error::Lexical(lex::Error::UnterminatedStringLiteral(7)))
        );
    }

    #[test]
    fn deterministic() {
        let source = "CASE WHEN ([a-b].c IN (1, 2) AND NOT d LIKE '%x') THEN ISNULL(e, 0) ELSE f * 2 END > 3";
        assert_eq!(parse(source), parse(source));
        assert!(parse(source).is_ok());
    }
}
