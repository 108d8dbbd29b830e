//! SPDX license expression matching.
//!
//! Supports compound expressions with proper operator precedence:
//! - `AND` binds tighter than `OR`
//! - Parentheses override precedence
//! - `WITH` exception clauses are recognised but only the base license is matched
//! - `/` is accepted as an `OR` shorthand
//!
//! [`matches`] asks whether some choice of licenses satisfies the predicate: `OR`
//! matches if any side does, `AND` only if both do. [`unavoidable`] asks whether
//! every choice does, since the licensee picks one side of an `OR`: `OR` matches
//! only if both sides do, `AND` if either does.

/// Tokens produced by [`tokenize`].
#[derive(Debug, PartialEq, Clone)]
enum Token {
    Id(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::RParen);
            chars.next();
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                s.push(c);
                chars.next();
            }
            let token = match s.as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "WITH" => Token::With,
                _ => Token::Id(s),
            };
            tokens.push(token);
        }
    }
    tokens
}

/// Recursive descent matcher.
///
/// ```text
/// expr     := or_expr
/// or_expr  := and_expr ( "OR" and_expr )*
/// and_expr := atom ( "AND" atom )*
/// atom     := "(" expr ")" | id ( "WITH" id )?
/// ```
struct ExprMatcher<'a, F> {
    tokens: Vec<Token>,
    pos: usize,
    matches_id: &'a F,
    every_choice: bool,
}

impl<'a, F> ExprMatcher<'a, F>
where
    F: Fn(&str) -> bool,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> bool {
        let mut result = self.parse_and();
        while matches!(self.peek(), Some(Token::Or)) {
            self.consume();
            let rhs = self.parse_and();
            result = if self.every_choice {
                result && rhs
            } else {
                result || rhs
            };
        }
        result
    }

    fn parse_and(&mut self) -> bool {
        let mut result = self.parse_atom();
        while matches!(self.peek(), Some(Token::And)) {
            self.consume();
            let rhs = self.parse_atom();
            result = if self.every_choice {
                result || rhs
            } else {
                result && rhs
            };
        }
        result
    }

    fn parse_atom(&mut self) -> bool {
        match self.consume() {
            Some(Token::LParen) => {
                let result = self.parse_or();
                if matches!(self.peek(), Some(Token::RParen)) {
                    self.consume();
                }
                result
            }
            Some(Token::Id(id)) => {
                if matches!(self.peek(), Some(Token::With)) {
                    self.consume(); // WITH
                    self.consume(); // exception identifier
                }
                (self.matches_id)(&id)
            }
            _ => false,
        }
    }
}

/// Whether some license choice offered by `expr` satisfies `matches_id`.
pub fn matches<F>(expr: &str, matches_id: F) -> bool
where
    F: Fn(&str) -> bool,
{
    evaluate(expr, &matches_id, false)
}

/// Whether every license choice offered by `expr` involves an identifier
/// satisfying `matches_id`.
pub fn unavoidable<F>(expr: &str, matches_id: F) -> bool
where
    F: Fn(&str) -> bool,
{
    evaluate(expr, &matches_id, true)
}

fn evaluate<F>(expr: &str, matches_id: &F, every_choice: bool) -> bool
where
    F: Fn(&str) -> bool,
{
    let normalized = expr.replace('/', " OR ");
    let tokens = tokenize(&normalized);
    if tokens.is_empty() {
        return false;
    }
    ExprMatcher {
        tokens,
        pos: 0,
        matches_id,
        every_choice,
    }
    .parse_or()
}
