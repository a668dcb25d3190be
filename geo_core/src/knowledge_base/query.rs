//! Attribute query engine.
//!
//! Grammar:
//!
//! ```text
//! expr       := term ( AND term )* | term ( OR term )*
//! term       := '(' expr ')' | comparison
//! comparison := ATTR OP VALUE
//! OP         := '<' | '<=' | '>' | '>=' | '==' | '!='
//! VALUE      := number | "string" | 'string'
//! ```
//!
//! A chain uses one connective; mixing `AND` and `OR` requires parentheses,
//! and groups nest at most [`MAX_NESTING`] deep. Clauses are evaluated left
//! to right.

use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while};
use nom::character::complete::{anychar, char as pchar, multispace0, satisfy};
use nom::combinator::{map, not, opt, recognize, value, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::many1;
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{AttributeValue, Record};
use crate::QuerySyntaxError;

/// Pseudo-attribute resolving to the record name.
const NAME_ATTRIBUTE: &str = "name";

const END_TOKEN: &str = "<end>";

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    Text(String),
}

/// A single `attr OP value` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub attribute: String,
    pub op: CompareOp,
    pub value: Literal,
}

impl Comparison {
    /// Evaluate against one record. Missing attributes and type mismatches are false.
    pub fn matches(&self, record: &Record) -> bool {
        let name_value;
        let actual = match record.attribute(&self.attribute) {
            Some(value) => value,
            None if self.attribute == NAME_ATTRIBUTE => {
                name_value = AttributeValue::Text(record.name.clone());
                &name_value
            }
            None => return false,
        };

        let ordering = match (actual, &self.value) {
            (AttributeValue::Number(a), Literal::Number(b)) => a.partial_cmp(b),
            (AttributeValue::Text(a), Literal::Text(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            _ => None,
        };

        ordering.is_some_and(|o| self.op.holds(o))
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Literal::Number(n) => write!(f, "{} {} {}", self.attribute, self.op.symbol(), n),
            Literal::Text(s) => write!(f, "{} {} {:?}", self.attribute, self.op.symbol(), s),
        }
    }
}

/// Parsed boolean expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Compare(Comparison),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Expr::Compare(c) => c.matches(record),
            Expr::And(terms) => terms.iter().all(|t| t.matches(record)),
            Expr::Or(terms) => terms.iter().any(|t| t.matches(record)),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (terms, joiner) = match self {
            Expr::Compare(c) => return write!(f, "{}", c),
            Expr::And(terms) => (terms, " AND "),
            Expr::Or(terms) => (terms, " OR "),
        };
        f.write_str("(")?;
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            write!(f, "{}", term)?;
        }
        f.write_str(")")
    }
}

/// A parsed, reusable search expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
}

impl Query {
    /// Parse a search expression such as `hardness>5 AND color=="white"`.
    pub fn parse(input: &str) -> Result<Self, QuerySyntaxError> {
        match expr(input, 0) {
            Ok((rest, expr)) => {
                let rest = skip_ws(rest);
                if !rest.is_empty() {
                    let fault = ParseFault {
                        at: rest,
                        message: "unexpected token after expression",
                    };
                    return Err(fault.into_syntax_error(input));
                }
                Ok(Self { expr })
            }
            Err(nom::Err::Error(fault) | nom::Err::Failure(fault)) => {
                Err(fault.into_syntax_error(input))
            }
            Err(nom::Err::Incomplete(_)) => Err(QuerySyntaxError::new(
                END_TOKEN,
                input.len(),
                "incomplete expression",
            )),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.expr.matches(record)
    }
}

impl std::str::FromStr for Query {
    type Err = QuerySyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

/// Deepest parenthesis nesting accepted.
pub const MAX_NESTING: usize = 64;

type PResult<'a, O> = IResult<&'a str, O, ParseFault<'a>>;

/// Where parsing stopped and why. `at` is always a suffix of the input.
#[derive(Debug)]
struct ParseFault<'a> {
    at: &'a str,
    message: &'static str,
}

impl<'a> ParseFault<'a> {
    fn fail<O>(at: &'a str, message: &'static str) -> PResult<'a, O> {
        Err(nom::Err::Failure(Self {
            at: skip_ws(at),
            message,
        }))
    }

    fn into_syntax_error(self, input: &str) -> QuerySyntaxError {
        let position = input.len().saturating_sub(self.at.len());
        QuerySyntaxError::new(token_text(self.at), position, self.message)
    }
}

impl<'a> ParseError<&'a str> for ParseFault<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            at: input,
            message: "unexpected input",
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn keyword(self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

fn expr<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (rest, first) = term(input, depth)?;
    let Ok((_, joined_by)) = connective(rest) else {
        return Ok((rest, first));
    };

    let (rest, more) = many1(preceded(keyword(joined_by.keyword()), move |i: &'a str| {
        term(i, depth)
    }))(rest)?;
    if connective(rest).is_ok() {
        return ParseFault::fail(rest, "mixing AND and OR requires parentheses");
    }

    let mut terms = Vec::with_capacity(more.len() + 1);
    terms.push(first);
    terms.extend(more);
    Ok((
        rest,
        match joined_by {
            Connective::And => Expr::And(terms),
            Connective::Or => Expr::Or(terms),
        },
    ))
}

fn term<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let input = skip_ws(input);
    if input.starts_with('(') && depth >= MAX_NESTING {
        return ParseFault::fail(input, "nesting too deep");
    }
    alt((
        delimited(
            pchar('('),
            move |i: &'a str| expr(i, depth + 1),
            expect("expected `)`", ws(pchar(')'))),
        ),
        map(comparison, Expr::Compare),
    ))(input)
}

fn comparison(input: &str) -> PResult<'_, Comparison> {
    let (input, attribute) = expect("expected attribute name", ws(attribute))(input)?;
    let (input, op) = expect("expected comparison operator", ws(operator))(input)?;
    let (input, value) = expect("expected a number or quoted string", ws(literal))(input)?;
    Ok((
        input,
        Comparison {
            attribute,
            op,
            value,
        },
    ))
}

fn connective(input: &str) -> PResult<'_, Connective> {
    alt((
        value(Connective::And, keyword("and")),
        value(Connective::Or, keyword("or")),
    ))(input)
}

fn attribute(input: &str) -> PResult<'_, String> {
    map(
        verify(word, |w: &str| {
            !w.eq_ignore_ascii_case("and") && !w.eq_ignore_ascii_case("or")
        }),
        str::to_string,
    )(input)
}

fn operator(input: &str) -> PResult<'_, CompareOp> {
    alt((
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))(input)
}

fn literal(input: &str) -> PResult<'_, Literal> {
    alt((
        number,
        map(quoted('"'), Literal::Text),
        map(quoted('\''), Literal::Text),
    ))(input)
}

fn number(input: &str) -> PResult<'_, Literal> {
    let (rest, text) = recognize_float::<_, ParseFault>(input)?;
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((rest, Literal::Number(n))),
        _ => ParseFault::fail(input, "invalid number"),
    }
}

/// A string literal in `quote`s; a backslash escapes the next character.
fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> PResult<'a, String> {
    let stop = if quote == '"' { "\\\"" } else { "\\'" };
    move |input: &'a str| {
        let (body, _) = pchar::<_, ParseFault>(quote)(input)?;
        let escaped: PResult<'a, Option<String>> =
            opt(escaped_transform(is_not(stop), '\\', anychar))(body);
        let (rest, content) = escaped?;
        match pchar::<_, ParseFault>(quote)(rest) {
            Ok((rest, _)) => Ok((rest, content.unwrap_or_default())),
            Err(_) => ParseFault::fail(input, "unterminated string literal"),
        }
    }
}

fn word(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_continue)))(input)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    ws(terminated(tag_no_case(kw), not(satisfy(is_ident_continue))))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ws<'a, O>(inner: impl FnMut(&'a str) -> PResult<'a, O>) -> impl FnMut(&'a str) -> PResult<'a, O> {
    preceded(multispace0, inner)
}

/// Turn a recoverable miss into a failure with `message` at the first non-blank byte.
fn expect<'a, O>(
    message: &'static str,
    mut parser: impl FnMut(&'a str) -> PResult<'a, O>,
) -> impl FnMut(&'a str) -> PResult<'a, O> {
    move |input: &'a str| match parser(input) {
        Err(nom::Err::Error(_)) => ParseFault::fail(input, message),
        other => other,
    }
}

fn skip_ws(input: &str) -> &str {
    input.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// The token starting at `at`, for error reports.
fn token_text(at: &str) -> String {
    if at.is_empty() {
        return END_TOKEN.to_string();
    }
    let recognized: PResult<'_, &str> = alt((
        recognize(operator),
        recognize_float::<&str, ParseFault>,
        word,
        recognize(quoted('"')),
        recognize(quoted('\'')),
    ))(at);
    match recognized {
        Ok((_, text)) if !text.is_empty() => text.to_string(),
        _ => at.chars().next().map(String::from).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quartz() -> Record {
        Record::new("Quartz")
            .with_attribute("hardness", 7.0)
            .with_attribute("color", "White")
            .with_attribute("luster", "vitreous")
    }

    fn talc() -> Record {
        Record::new("Talc")
            .with_attribute("hardness", 1.0)
            .with_attribute("color", "white")
    }

    #[test]
    fn test_simple_comparison() {
        let query = Query::parse("hardness>5").unwrap();
        assert!(query.matches(&quartz()));
        assert!(!query.matches(&talc()));
    }

    #[test]
    fn test_all_operators() {
        let record = quartz();
        for (expr, expected) in [
            ("hardness < 7", false),
            ("hardness <= 7", true),
            ("hardness > 6.5", true),
            ("hardness >= 7.5", false),
            ("hardness == 7", true),
            ("hardness != 7", false),
        ] {
            assert_eq!(Query::parse(expr).unwrap().matches(&record), expected, "{expr}");
        }
    }

    #[test]
    fn test_text_comparison_ignores_case() {
        assert!(Query::parse(r#"color == "white""#).unwrap().matches(&quartz()));
        assert!(Query::parse("color != 'black'").unwrap().matches(&quartz()));
    }

    #[test]
    fn test_missing_attribute_is_false() {
        let query = Query::parse("streak == \"white\"").unwrap();
        assert!(!query.matches(&quartz()));

        let negated = Query::parse("streak != \"white\"").unwrap();
        assert!(!negated.matches(&quartz()));
    }

    #[test]
    fn test_type_mismatch_is_false() {
        assert!(!Query::parse("luster > 3").unwrap().matches(&quartz()));
        assert!(!Query::parse("luster != 3").unwrap().matches(&quartz()));
        assert!(!Query::parse("hardness == \"7\"").unwrap().matches(&quartz()));
    }

    #[test]
    fn test_name_pseudo_attribute() {
        assert!(Query::parse("name == 'quartz'").unwrap().matches(&quartz()));
        assert!(!Query::parse("name == 'quartz'").unwrap().matches(&talc()));
    }

    #[test]
    fn test_and_or_chains() {
        let both = Query::parse(r#"hardness>5 AND color=="white""#).unwrap();
        assert!(both.matches(&quartz()));
        assert!(!both.matches(&talc()));

        let either = Query::parse("hardness > 5 or hardness < 2").unwrap();
        assert!(either.matches(&quartz()));
        assert!(either.matches(&talc()));
    }

    #[test]
    fn test_parentheses_allow_mixing() {
        let query = Query::parse(r#"(hardness > 5 AND luster == "vitreous") OR hardness < 2"#).unwrap();
        assert!(query.matches(&quartz()));
        assert!(query.matches(&talc()));
        assert!(matches!(query.expr(), Expr::Or(terms) if terms.len() == 2));
    }

    #[test]
    fn test_mixed_connectives_rejected() {
        let err = Query::parse("hardness > 5 AND color == 'white' OR hardness < 2").unwrap_err();
        assert_eq!(err.token, "OR");
        assert_eq!(err.position, 34);
    }

    #[test]
    fn test_missing_value() {
        let err = Query::parse("hardness >").unwrap_err();
        assert_eq!(err.token, "<end>");
        assert_eq!(err.position, 10);
    }

    #[test]
    fn test_syntax_errors_name_token() {
        let err = Query::parse("hardness = 5").unwrap_err();
        assert_eq!(err.token, "=");
        assert_eq!(err.position, 9);

        let err = Query::parse("> 5").unwrap_err();
        assert_eq!(err.token, ">");
        assert_eq!(err.position, 0);

        let err = Query::parse("color == \"white").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.contains("unterminated"));

        let err = Query::parse("(hardness > 5").unwrap_err();
        assert_eq!(err.token, "<end>");

        let err = Query::parse("hardness > 5 luster").unwrap_err();
        assert_eq!(err.token, "luster");

        assert!(Query::parse("").is_err());
        assert!(Query::parse("hardness > 1.2.3").is_err());
        assert!(Query::parse("hardness > 5 AND").is_err());
    }

    #[test]
    fn test_display_normalizes() {
        let query = Query::parse(r#"(hardness>5 and color=='white') OR name=="Talc""#).unwrap();
        assert_eq!(
            query.expr().to_string(),
            r#"((hardness > 5 AND color == "white") OR name == "Talc")"#
        );
    }

    #[test]
    fn test_numbers() {
        let record = Record::new("Ice").with_attribute("density", 0.917);
        assert!(Query::parse("density < 1e0").unwrap().matches(&record));
        assert!(Query::parse("density > -0.5").unwrap().matches(&record));
        assert!(Query::parse("density >= .9").unwrap().matches(&record));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("{}hardness > 1{}", "(".repeat(depth), ")".repeat(depth))
        };
        assert!(Query::parse(&nested(MAX_NESTING)).is_ok());

        let err = Query::parse(&nested(MAX_NESTING + 1)).unwrap_err();
        assert_eq!(err.token, "(");
        assert_eq!(err.position, MAX_NESTING);
        assert!(err.message.contains("nesting too deep"));

        let err = Query::parse(&nested(5_000)).unwrap_err();
        assert_eq!(err.position, MAX_NESTING);
    }

    #[test]
    fn test_keywords_need_word_boundary() {
        let record = Record::new("Orthoclase").with_attribute("order", 2.0);
        assert!(Query::parse("order == 2").unwrap().matches(&record));
        assert!(Query::parse("and > 1").is_err());
        assert!(Query::parse("order == 2 ANDorder == 2").is_err());
    }

    #[test]
    fn test_string_escapes() {
        let record = Record::new("Cinnabar").with_attribute("note", "it's \"red\"");
        assert!(Query::parse(r#"note == 'it\'s "red"'"#).unwrap().matches(&record));
        assert!(Query::parse(r#"note != """#).unwrap().matches(&record));
    }
}
