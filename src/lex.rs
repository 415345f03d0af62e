//! Tokenizer for T-SQL clause text.
//!
//! # Notes
//! `+` and `-` directly in front of a digit are folded into the Number token
//!  when the previous token can't end an operand (`age > -5`, `IN (-1, 2)`).
//!  Everywhere else they become Plus and Minus tokens and the parser treats
//!  them as arithmetic.
use tracing::{debug, trace};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenType {
    ParenLeft,
    ParenRight,
    Comma,
    Dot,
    Plus,
    Minus,
    Asterisk,
    ForwardSlash,
    Percent,
    Bitwise,   // & | ^ ~
    Equals,    // =
    NotEquals, // <> or !=
    LT,        // <
    GT,        // >
    LTE,       // <= or !>
    GTE,       // >= or !<
    Number,
    StringSingleQuote,
    StringDoubleQuote,
    Identifier,
    BracketIdentifier, // [name]
    And,
    Or,
    Not,
    Between,
    In,
    Like,
    Is,
    Null,
    Case,
    When,
    Then,
    Else,
    End,
    True,
    False,
    Where,
    Having,
    /// A SQL keyword we recognize but which has no place in a predicate
    ///  (SELECT, JOIN, OVER...). The parser reports these as unsupported.
    Unsupported,
}

const KEYWORDS: [(&str, TokenType); 38] = [
    ("AND", TokenType::And),
    ("OR", TokenType::Or),
    ("NOT", TokenType::Not),
    ("BETWEEN", TokenType::Between),
    ("IN", TokenType::In),
    ("LIKE", TokenType::Like),
    ("IS", TokenType::Is),
    ("NULL", TokenType::Null),
    ("CASE", TokenType::Case),
    ("WHEN", TokenType::When),
    ("THEN", TokenType::Then),
    ("ELSE", TokenType::Else),
    ("END", TokenType::End),
    ("TRUE", TokenType::True),
    ("FALSE", TokenType::False),
    ("WHERE", TokenType::Where),
    ("HAVING", TokenType::Having),
    ("SELECT", TokenType::Unsupported),
    ("FROM", TokenType::Unsupported),
    ("JOIN", TokenType::Unsupported),
    ("OVER", TokenType::Unsupported),
    ("PARTITION", TokenType::Unsupported),
    ("EXISTS", TokenType::Unsupported),
    ("UNION", TokenType::Unsupported),
    ("INTERSECT", TokenType::Unsupported),
    ("EXCEPT", TokenType::Unsupported),
    ("ALL", TokenType::Unsupported),
    ("ANY", TokenType::Unsupported),
    ("SOME", TokenType::Unsupported),
    ("INSERT", TokenType::Unsupported),
    ("UPDATE", TokenType::Unsupported),
    ("DELETE", TokenType::Unsupported),
    ("CREATE", TokenType::Unsupported),
    ("DROP", TokenType::Unsupported),
    ("GROUP", TokenType::Unsupported),
    ("ORDER", TokenType::Unsupported),
    ("MOD", TokenType::Unsupported),
    ("DIV", TokenType::Unsupported),
];

impl TokenType {
    /// Case-insensitive keyword lookup; `None` means a plain identifier.
    pub fn keyword(word: &str) -> Option<TokenType> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| word.eq_ignore_ascii_case(kw))
            .map(|(_, ty)| *ty)
    }

    /// True for tokens after which a `+`/`-` must be a binary operator.
    pub fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenType::Number
                | TokenType::StringSingleQuote
                | TokenType::StringDoubleQuote
                | TokenType::Identifier
                | TokenType::BracketIdentifier
                | TokenType::ParenRight
                | TokenType::True
                | TokenType::False
                | TokenType::Null
                | TokenType::End
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source
    start: usize,
    end: usize,
}

impl Token {
    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of<'input>(&self, source: &'input str) -> &'input str {
        &source[self.start..self.end]
    }

    /// Like [Token::source_of] but strips the delimiters of quoted strings and
    ///  bracketed identifiers and collapses their doubled-delimiter escapes.
    pub fn contents(&self, source: &str) -> String {
        let s = self.source_of(source);
        match self.ty {
            TokenType::StringSingleQuote => s[1..s.len() - 1].replace("''", "'"),
            TokenType::StringDoubleQuote => s[1..s.len() - 1].replace("\"\"", "\""),
            TokenType::BracketIdentifier => s[1..s.len() - 1].replace("]]", "]"),
            _ => s.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
    #[error("Unterminated bracketed identifier starting at {0}")]
    UnterminatedIdentifier(usize),
    #[error("Unexpected character at {0}")]
    UnexpectedCharacter(usize),
}

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
    /// Type of the previously produced token, needed to tell a signed number
    ///  from a binary operator.
    last: Option<TokenType>,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self {
            source,
            current: 0,
            last: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    #[inline]
    pub fn peek_at(&self, at: usize) -> Option<u8> {
        self.source.as_bytes().get(self.current + at).copied()
    }

    #[inline]
    fn pop_unchecked(&mut self) -> u8 {
        let res = self.source.as_bytes()[self.current];
        self.current += 1;
        res
    }

    #[inline]
    pub fn remaining(&self) -> &'input str {
        &self.source[self.current..]
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if self.peek() == Some(prefix) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.current += 1;
        }
    }

    /// Clause text is often pasted from elsewhere: tabs, newlines and
    ///  non-breaking spaces all count.
    fn consume_whitespace(&mut self) {
        while let Some(c) = self.remaining().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.current += c.len_utf8();
        }
    }

    fn consume_number(&mut self) {
        self.consume_while(|b| b.is_ascii_digit());

        // Optional fraction
        if let Some(b'.') = self.peek() {
            self.current += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
    }

    /// Consumes up to and including the closing [term]. A doubled [term] is an
    ///  escaped [term] and does not close the token.
    fn consume_delimited(&mut self, term: u8) -> bool {
        loop {
            self.consume_while(|b| b != term);
            if self.is_empty() {
                return false;
            }
            self.current += 1;
            if !self.consume1(term) {
                return true;
            }
        }
    }

    fn at_number(&self) -> bool {
        match self.peek() {
            Some(b'0'..=b'9') => true,
            Some(b'.') => matches!(self.peek_at(1), Some(b'0'..=b'9')),
            _ => false,
        }
    }

    fn after_operand(&self) -> bool {
        self.last.is_some_and(TokenType::ends_operand)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        // Convenience macro for returning a token from `start` to `self.current`
        macro_rules! tok {
            ($name:ident) => {{
                Token {
                    ty: TokenType::$name,
                    start,
                    end: self.current,
                }
            }};
        }

        let token = match self.pop_unchecked() {
            b'(' => tok!(ParenLeft),
            b')' => tok!(ParenRight),
            b',' => tok!(Comma),
            b'*' => tok!(Asterisk),
            b'/' => tok!(ForwardSlash),
            b'%' => tok!(Percent),
            b'=' => tok!(Equals),
            b'&' | b'|' | b'^' | b'~' => tok!(Bitwise),

            sign @ (b'+' | b'-') => {
                if self.at_number() && !self.after_operand() {
                    self.consume_number();
                    tok!(Number)
                } else if sign == b'+' {
                    tok!(Plus)
                } else {
                    tok!(Minus)
                }
            }
            b'<' => {
                if self.consume1(b'>') {
                    tok!(NotEquals)
                } else if self.consume1(b'=') {
                    tok!(LTE)
                } else {
                    tok!(LT)
                }
            }
            b'>' => {
                if self.consume1(b'=') {
                    tok!(GTE)
                } else {
                    tok!(GT)
                }
            }
            b'!' => {
                if self.consume1(b'=') {
                    tok!(NotEquals)
                } else if self.consume1(b'<') {
                    tok!(GTE)
                } else if self.consume1(b'>') {
                    tok!(LTE)
                } else {
                    return Err(Error::UnexpectedCharacter(start));
                }
            }

            term @ (b'\'' | b'"') => {
                if !self.consume_delimited(term) {
                    return Err(Error::UnterminatedStringLiteral(start));
                }
                if term == b'"' {
                    tok!(StringDoubleQuote)
                } else {
                    tok!(StringSingleQuote)
                }
            }
            b'[' => {
                if !self.consume_delimited(b']') {
                    return Err(Error::UnterminatedIdentifier(start));
                }
                tok!(BracketIdentifier)
            }

            // A dot is either a name separator (`t.col`) or starts a number
            b'.' => {
                if self.after_operand() || !matches!(self.peek(), Some(b'0'..=b'9')) {
                    tok!(Dot)
                } else {
                    self.consume_number();
                    tok!(Number)
                }
            }
            b'0'..=b'9' => {
                self.consume_number();
                tok!(Number)
            }

            // Identifiers start with a-Z or underscore
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_');
                let word = &self.source[start..self.current];
                Token {
                    ty: TokenType::keyword(word).unwrap_or(TokenType::Identifier),
                    start,
                    end: self.current,
                }
            }
            _ => return Err(Error::UnexpectedCharacter(start)),
        };

        trace!(ty = ?token.ty, start, end = token.end, "token");
        self.last = Some(token.ty);
        Ok(Some(token))
    }
}

/// Lexes a whole clause. A leading WHERE or HAVING only marks the clause
///  position and is dropped.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::with_capacity(source.len() / 4);
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }

    if tokens
        .first()
        .is_some_and(|t| matches!(t.ty, TokenType::Where | TokenType::Having))
    {
        tokens.remove(0);
    }

    debug!(tokens = tokens.len(), "tokenized clause");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_basic() {
        //NOTE this test doesn't use the handy assert_toks macro because we're
        //  checking that the token boundaries are correct as well.
        //              0         1         2
        //              0123456789012345678901234
        let source = r#"'single' "double" (,) NOT"#;
        let mut lexer = Lexer::new(source);

        let tok = lexer.next_token();
        assert_eq!(
            tok,
            Ok(Some(Token {
                ty: TokenType::StringSingleQuote,
                start: 0,
                end: 8
            }))
        );
        assert_eq!(tok.unwrap().unwrap().contents(source), "single");

        let tok = lexer.next_token();
        assert_eq!(
            tok,
            Ok(Some(Token {
                ty: TokenType::StringDoubleQuote,
                start: 9,
                end: 17
            }))
        );
        assert_eq!(tok.unwrap().unwrap().contents(source), "double");

        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::ParenLeft,
                start: 18,
                end: 19
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Comma,
                start: 19,
                end: 20
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::ParenRight,
                start: 20,
                end: 21
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Not,
                start: 22,
                end: 25
            }))
        );
        assert_eq!(lexer.next_token(), Ok(None));
    }

    #[test]
    fn lex_numbers() {
        //             0         1
        //             0123456789012345
        let source = "12.3 4+5. - .6";
        let mut lexer = Lexer::new(source);
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 0,
                end: 4,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 5,
                end: 6,
            }))
        );
        // After an operand a sign is an operator
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Plus,
                start: 6,
                end: 7,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 7,
                end: 9,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Minus,
                start: 10,
                end: 11,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 12,
                end: 14,
            }))
        );
    }

    macro_rules! assert_tok {
        ($lex:ident, $tok_ty:ident) => {{
            let tok = $lex.next_token();
            assert!(
                matches!(
                    tok,
                    Ok(Some(Token {
                        ty: TokenType::$tok_ty,
                        ..
                    }))
                ),
                "Expected {}, got {tok:?}",
                stringify!($tok_ty)
            );
        }};
    }
    macro_rules! assert_toks {
        ($lex:ident, $tok_ty:ident) => {{
            assert_tok!($lex, $tok_ty)
        }};
        ($lex:ident, $tok_ty:ident, $($rest:tt)*) => {
            assert_tok!($lex, $tok_ty);
            assert_toks!($lex, $($rest)*)
        };
    }

    #[test]
    fn lex_comparisons() {
        let mut lexer = Lexer::new("= <> != < > <= >= !< !>");
        assert_toks!(
            lexer, Equals, NotEquals, NotEquals, LT, GT, LTE, GTE, GTE, LTE
        );
    }

    #[test]
    fn longest_match_without_spaces() {
        let mut lexer = Lexer::new("age>=18AND x<>'a'");
        assert_toks!(lexer, Identifier, GTE, Number, And, Identifier, NotEquals, StringSingleQuote);
    }

    #[test]
    fn keywords_ignore_case() {
        let mut lexer = Lexer::new("and Or nOt between IN like Is null case When THEN else End true FALSE");
        assert_toks!(
            lexer, And, Or, Not, Between, In, Like, Is, Null, Case, When, Then, Else, End, True,
            False
        );
    }

    #[test]
    fn signed_numbers() {
        let mut lexer = Lexer::new("x > -5 AND y IN (-1, +2) AND z - 1");
        assert_toks!(
            lexer, Identifier, GT, Number, And, Identifier, In, ParenLeft, Number, Comma, Number,
            ParenRight, And, Identifier, Minus, Number
        );
    }

    #[test]
    fn qualified_names() {
        let source = "[user-profile].[first-name] = t.col";
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.ty, TokenType::BracketIdentifier);
        assert_eq!(tok.contents(source), "user-profile");
        assert_toks!(lexer, Dot, BracketIdentifier, Equals, Identifier, Dot, Identifier);
    }

    #[test]
    fn escaped_quotes() {
        let source = "'O''Brien' [a]]b]";
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.contents(source), "O'Brien");
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.contents(source), "a]b");
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new("name = 'John");
        assert_toks!(lexer, Identifier, Equals);
        assert_eq!(lexer.next_token(), Err(Error::UnterminatedStringLiteral(7)));
    }

    #[test]
    fn unexpected_character() {
        assert_eq!(tokenize("a = @b"), Err(Error::UnexpectedCharacter(4)));
        assert_eq!(tokenize("a ! b"), Err(Error::UnexpectedCharacter(2)));
        assert_eq!(tokenize("[open"), Err(Error::UnterminatedIdentifier(0)));
    }

    #[test]
    fn unicode_whitespace() {
        let tokens = tokenize("age\u{a0}>\u{2009}18\n\tAND\u{2009}x").expect("tokens");
        let types: Vec<_> = tokens.iter().map(|t| t.ty).collect();
        assert_eq!(
            types,
            [
                TokenType::Identifier,
                TokenType::GT,
                TokenType::Number,
                TokenType::And,
                TokenType::Identifier
            ]
        );
    }

    #[test]
    fn leading_clause_keyword_is_dropped() {
        let tokens = tokenize("WHERE age > 18").expect("tokens");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].ty, TokenType::Identifier);

        let tokens = tokenize("having COUNT(x) > 1").expect("tokens");
        assert_eq!(tokens[0].ty, TokenType::Identifier);

        // Only at the start
        let tokens = tokenize("a = 1 WHERE").expect("tokens");
        assert_eq!(tokens.last().map(|t| t.ty), Some(TokenType::Where));
    }

    #[test]
    fn unsupported_keywords() {
        let mut lexer = Lexer::new("SELECT join Over exists");
        assert_toks!(lexer, Unsupported, Unsupported, Unsupported, Unsupported);
    }
}
