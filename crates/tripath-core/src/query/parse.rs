//! Text form of a pipeline.
//!
//! Grammar:
//!
//! ```text
//! chain    := ["g" "."] "v" "(" args ")" { "." call }
//! call     := ident "(" args ")"
//! args     := [ arg { "," arg } ]
//! arg      := string | integer | "[" [ string { "," string } ] "]"
//! ```
//!
//! Strings take single or double quotes with `\` escapes. A chain without a
//! terminal (`all`, `count`, `view`) materializes as `all`.

use super::{Pipeline, Seed, Step};
use crate::TripathError;

/// How a parsed chain is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Terminal {
    #[default]
    All,
    Count,
    View(String),
}

/// A validated query plus its terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub query: super::Query,
    pub terminal: Terminal,
}

/// Name given to `view()` when called without one.
const DEFAULT_VIEW_NAME: &str = "view";

/// Parse and validate a chain such as `v("alice").out("follows").all()`.
///
/// # Errors
///
/// `TripathError::InvalidArgument` for syntax errors, unknown steps, wrong
/// arity, and anything [`Pipeline::build`] rejects.
pub fn parse(text: &str) -> Result<ParsedQuery, TripathError> {
    let tokens = lex(text)?;
    Parser { tokens, pos: 0 }.chain()
}

// =============================================================================
// LEXER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

fn syntax(at: usize, msg: impl std::fmt::Display) -> TripathError {
    TripathError::invalid(format!("query syntax error at {}: {}", at, msg))
}

fn lex(text: &str) -> Result<Vec<(usize, Token)>, TripathError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(at, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | ',' | '.' => {
                chars.next();
                let token = match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    _ => Token::Dot,
                };
                tokens.push((at, token));
            }
            '"' | '\'' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some((_, c2)) = chars.next() {
                    match c2 {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => s.push(escaped),
                            None => break,
                        },
                        q if q == c => {
                            closed = true;
                            break;
                        }
                        other => s.push(other),
                    }
                }
                if !closed {
                    return Err(syntax(at, "unterminated string"));
                }
                tokens.push((at, Token::Str(s)));
            }
            '-' | '0'..='9' => {
                chars.next();
                let mut digits = String::from(c);
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| syntax(at, format!("invalid integer '{}'", digits)))?;
                tokens.push((at, Token::Int(n)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !(d.is_ascii_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push((at, Token::Ident(ident)));
            }
            other => return Err(syntax(at, format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

// =============================================================================
// PARSER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Str(String),
    Int(i64),
    List(Vec<String>),
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(at, _)| *at)
            .unwrap_or_else(|| self.tokens.last().map_or(0, |(at, _)| at + 1))
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn expect(&mut self, want: &Token, what: &str) -> Result<(), TripathError> {
        let at = self.offset();
        match self.next() {
            Some(ref t) if t == want => Ok(()),
            _ => Err(syntax(at, format!("expected {}", what))),
        }
    }

    fn ident(&mut self) -> Result<String, TripathError> {
        let at = self.offset();
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(syntax(at, "expected a step name")),
        }
    }

    fn args(&mut self) -> Result<Vec<Arg>, TripathError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.next();
            return Ok(args);
        }
        loop {
            args.push(self.arg()?);
            let at = self.offset();
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err(syntax(at, "expected ',' or ')'")),
            }
        }
    }

    fn arg(&mut self) -> Result<Arg, TripathError> {
        let at = self.offset();
        match self.next() {
            Some(Token::Str(s)) => Ok(Arg::Str(s)),
            Some(Token::Int(n)) => Ok(Arg::Int(n)),
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.next();
                    return Ok(Arg::List(items));
                }
                loop {
                    let at = self.offset();
                    match self.next() {
                        Some(Token::Str(s)) => items.push(s),
                        _ => return Err(syntax(at, "list items must be strings")),
                    }
                    let at = self.offset();
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => return Ok(Arg::List(items)),
                        _ => return Err(syntax(at, "expected ',' or ']'")),
                    }
                }
            }
            _ => Err(syntax(at, "expected a string, integer or list")),
        }
    }

    fn chain(mut self) -> Result<ParsedQuery, TripathError> {
        let mut name = self.ident()?;
        if name == "g" {
            self.expect(&Token::Dot, "'.' after g")?;
            name = self.ident()?;
        }
        if !name.eq_ignore_ascii_case("v") {
            return Err(TripathError::invalid(format!(
                "query must start with v(), found {}()",
                name
            )));
        }
        let seed = match self.args()?.as_slice() {
            [] => Seed::All,
            [arg] => Seed::Nodes(strings(arg, "v")?),
            _ => return Err(TripathError::invalid("v() takes at most one argument")),
        };

        let mut pipeline = Pipeline::v(seed);
        let mut terminal = None;

        while self.peek().is_some() {
            if let Some(t) = &terminal {
                return Err(TripathError::invalid(format!(
                    "nothing may follow the terminal {:?}",
                    t
                )));
            }
            self.expect(&Token::Dot, "'.'")?;
            let name = self.ident()?;
            let args = self.args()?;
            match name.as_str() {
                "all" => {
                    arity(&name, &args, 0)?;
                    terminal = Some(Terminal::All);
                }
                "count" => {
                    arity(&name, &args, 0)?;
                    terminal = Some(Terminal::Count);
                }
                "view" => {
                    let view_name = match args.as_slice() {
                        [] => DEFAULT_VIEW_NAME.to_string(),
                        [Arg::Str(s)] => s.clone(),
                        _ => return Err(TripathError::invalid("view() takes one name")),
                    };
                    terminal = Some(Terminal::View(view_name));
                }
                _ => pipeline = pipeline.step(step(&name, &args)?),
            }
        }

        Ok(ParsedQuery {
            query: pipeline.build()?,
            terminal: terminal.unwrap_or_default(),
        })
    }
}

fn arity(name: &str, args: &[Arg], n: usize) -> Result<(), TripathError> {
    if args.len() != n {
        return Err(TripathError::invalid(format!(
            "{}() takes {} argument(s), got {}",
            name,
            n,
            args.len()
        )));
    }
    Ok(())
}

fn string(arg: &Arg, name: &str) -> Result<String, TripathError> {
    match arg {
        Arg::Str(s) => Ok(s.clone()),
        _ => Err(TripathError::invalid(format!("{}() expects a string", name))),
    }
}

fn strings(arg: &Arg, name: &str) -> Result<Vec<String>, TripathError> {
    match arg {
        Arg::Str(s) => Ok(vec![s.clone()]),
        Arg::List(items) => Ok(items.clone()),
        Arg::Int(_) => Err(TripathError::invalid(format!(
            "{}() expects a node name or list of names",
            name
        ))),
    }
}

fn count(arg: &Arg, name: &str) -> Result<i64, TripathError> {
    match arg {
        Arg::Int(n) => Ok(*n),
        _ => Err(TripathError::invalid(format!("{}() expects an integer", name))),
    }
}

fn optional_predicate(name: &str, args: &[Arg]) -> Result<Option<String>, TripathError> {
    match args {
        [] => Ok(None),
        [arg] => string(arg, name).map(Some),
        _ => Err(TripathError::invalid(format!(
            "{}() takes at most one predicate",
            name
        ))),
    }
}

fn step(name: &str, args: &[Arg]) -> Result<Step, TripathError> {
    let step = match name {
        "out" => Step::Out(optional_predicate(name, args)?),
        "inc" | "in" => Step::In(optional_predicate(name, args)?),
        "both" => Step::Both(optional_predicate(name, args)?),
        "has" => match args {
            [p, v] => Step::Has {
                predicate: string(p, name)?,
                value: string(v, name)?,
            },
            _ => return Err(TripathError::invalid("has() takes a predicate and a value")),
        },
        "is" => {
            arity(name, args, 1)?;
            Step::Is(strings(&args[0], name)?)
        }
        "tag" | "as" => {
            arity(name, args, 1)?;
            Step::Tag(string(&args[0], name)?)
        }
        "back" => {
            arity(name, args, 1)?;
            Step::Back(string(&args[0], name)?)
        }
        "unique" => {
            arity(name, args, 0)?;
            Step::Unique
        }
        "limit" | "skip" => {
            arity(name, args, 1)?;
            let n = count(&args[0], name)?;
            let n = usize::try_from(n).map_err(|_| {
                TripathError::invalid(format!("{} must be non-negative, got {}", name, n))
            })?;
            if name == "limit" {
                Step::Limit(n)
            } else {
                Step::Skip(n)
            }
        }
        other => {
            return Err(TripathError::invalid(format!("unknown step '{}'", other)));
        }
    };
    Ok(step)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(text: &str) -> Vec<Step> {
        parse(text).expect("parse").query.steps().to_vec()
    }

    #[test]
    fn parses_basic_chain() {
        let parsed = parse(r#"v("alice").out("follows").unique().limit(5).all()"#).expect("parse");
        assert_eq!(parsed.terminal, Terminal::All);
        assert_eq!(
            parsed.query.steps(),
            &[
                Step::Seed(Seed::Nodes(vec!["alice".to_string()])),
                Step::Out(Some("follows".to_string())),
                Step::Unique,
                Step::Limit(5),
            ]
        );
    }

    #[test]
    fn missing_terminal_means_all() {
        assert_eq!(parse("v()").expect("parse").terminal, Terminal::All);
    }

    #[test]
    fn accepts_single_quotes_lists_and_g_prefix() {
        assert_eq!(
            steps("g.V(['a', \"b\"]).inc('knows')"),
            vec![
                Step::Seed(Seed::Nodes(vec!["a".to_string(), "b".to_string()])),
                Step::In(Some("knows".to_string())),
            ]
        );
    }

    #[test]
    fn in_is_alias_of_inc() {
        assert_eq!(steps("v().in()"), steps("v().inc()"));
    }

    #[test]
    fn escapes_inside_strings() {
        assert_eq!(
            steps(r#"v("say \"hi\"")"#)[0],
            Step::Seed(Seed::Nodes(vec!["say \"hi\"".to_string()]))
        );
    }

    #[test]
    fn count_and_view_terminals() {
        assert_eq!(parse("v().count()").expect("count").terminal, Terminal::Count);
        assert_eq!(
            parse(r#"v().tag("a").out().tag("b").view("net")"#)
                .expect("view")
                .terminal,
            Terminal::View("net".to_string())
        );
    }

    #[test]
    fn rejects_negative_limit() {
        assert!(matches!(
            parse("v().limit(-1)"),
            Err(TripathError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_seed_list_rejected() {
        assert!(matches!(parse("v([])"), Err(TripathError::InvalidArgument(_))));
        assert!(parse("v()").is_ok());
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in [
            "",
            "out()",
            "v(",
            "v().out(",
            "v().bogus()",
            "v().has(\"likes\")",
            "v().limit(\"3\")",
            "v().all().out()",
            "v(\"unterminated)",
            "v() + 1",
        ] {
            assert!(
                matches!(parse(bad), Err(TripathError::InvalidArgument(_))),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn display_output_parses_back() {
        let parsed = parse(r#"v(["a","b"]).both("x").has("p","v").tag("t").back("t").skip(1)"#)
            .expect("parse");
        let again = parse(&parsed.query.to_string()).expect("reparse");
        assert_eq!(again.query, parsed.query);
    }
}
