//! Restricted filter expressions.
//!
//! Expressions are checked against a character whitelist, parsed into a small
//! AST and compiled into a Polars predicate. Nothing is ever evaluated as
//! code. The grammar is:
//!
//! ```text
//! or      := and ('|' and)*
//! and     := unary ('&' unary)*
//! unary   := '(' or ')' | operand [cmp operand]
//! cmp     := '==' | '=' | '!=' | '<' | '>' | '<=' | '>='
//! operand := column | number | 'string' | "string" | true | false
//! ```

use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::ingest::parse_timestamp_millis;
use crate::resolver;
use crate::types::{FilterPreview, ToolOutcome};
use crate::utils::{
    column_names, dataframe_to_records, is_datetime_dtype, is_numeric_dtype, is_text_dtype,
};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

static ALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\w\s=!<>&|'"\-:.,()]+$"#).expect("Invalid regex: filter whitelist")
});

/// Apply `expression` to the table and preview the matching rows.
///
/// Returns at most `limit` rows plus the total number of matches.
pub fn filter_preview(
    df: &DataFrame,
    expression: &str,
    limit: usize,
    config: &ExplorerConfig,
) -> ToolOutcome<FilterPreview> {
    let result = run(df, expression, limit, config);
    if let Err(e) = &result {
        warn!("Rejected filter {:?}: {}", expression, e);
    }
    ToolOutcome::from_result(result)
}

fn run(df: &DataFrame, expression: &str, limit: usize, config: &ExplorerConfig) -> Result<FilterPreview> {
    let columns = column_names(df);
    let fallback = || columns.iter().take(config.max_suggestions).cloned().collect::<Vec<_>>();

    if !ALLOWED.is_match(expression) {
        return Err(AnalysisError::invalid_filter(
            "query contains unsupported characters",
            fallback(),
        ));
    }

    let ast = Parser::new(expression)
        .and_then(|p| p.parse())
        .map_err(|reason| AnalysisError::invalid_filter(reason, fallback()))?;
    debug!("Parsed filter {:?} into {:?}", expression, ast);

    let predicate = Compiler { df, config }.compile(&ast)?;

    let matched = df
        .clone()
        .lazy()
        .filter(predicate)
        .collect()
        .map_err(|e| AnalysisError::invalid_filter(format!("could not evaluate: {e}"), fallback()))?;

    Ok(FilterPreview {
        rows: dataframe_to_records(&matched.head(Some(limit)))?,
        count: matched.height(),
    })
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Cmp(CmpOp),
    And,
    Or,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += if next == Some('&') { 2 } else { 1 };
            }
            '|' => {
                tokens.push(Token::Or);
                i += if next == Some('|') { 2 } else { 1 };
            }
            '=' => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::NotEq));
                i += 2;
            }
            '<' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::LtEq));
                i += 2;
            }
            '>' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::GtEq));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Cmp(CmpOp::Lt));
                i += 1;
            }
            '>' => {
                tokens.push(Token::Cmp(CmpOp::Gt));
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == quote)
                    .map(|p| start + p)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '.') && next.is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if chars.get(i).is_some_and(|ch| ch.is_alphanumeric() || *ch == '_') {
                    return Err(format!("malformed number near '{text}'"));
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("malformed number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected '{other}'")),
        }
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Column(String),
    Number(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Compare(Operand, CmpOp, Operand),
    Bare(Operand),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> std::result::Result<Self, String> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn parse(mut self) -> std::result::Result<Node, String> {
        let node = self.parse_or()?;
        match self.tokens.get(self.pos) {
            None => Ok(node),
            Some(tok) => Err(format!("unexpected {} after expression", describe_token(tok))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> std::result::Result<Node, String> {
        let mut nodes = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            nodes.push(self.parse_and()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Or(nodes)
        })
    }

    fn parse_and(&mut self) -> std::result::Result<Node, String> {
        let mut nodes = vec![self.parse_unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            nodes.push(self.parse_unary()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::And(nodes)
        })
    }

    fn parse_unary(&mut self) -> std::result::Result<Node, String> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.advance() {
                Some(Token::RParen) => Ok(inner),
                _ => Err("missing closing parenthesis".to_string()),
            };
        }

        let lhs = self.parse_operand()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.parse_operand()?;
            return Ok(Node::Compare(lhs, op, rhs));
        }
        Ok(Node::Bare(lhs))
    }

    fn parse_operand(&mut self) -> std::result::Result<Operand, String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(match name.to_ascii_lowercase().as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),
                _ => Operand::Column(name),
            }),
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(tok) => Err(format!("expected a column or value, found {}", describe_token(&tok))),
            None => Err("expression ends too early".to_string()),
        }
    }
}

fn describe_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("'{s}'"),
        Token::Number(n) => format!("'{n}'"),
        Token::Str(s) => format!("'{s}'"),
        Token::Cmp(_) => "comparison operator".to_string(),
        Token::And => "'&'".to_string(),
        Token::Or => "'|'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
    }
}

// =============================================================================
// Compilation to Polars
// =============================================================================

struct Compiler<'a> {
    df: &'a DataFrame,
    config: &'a ExplorerConfig,
}

impl Compiler<'_> {
    fn compile(&self, node: &Node) -> Result<Expr> {
        match node {
            Node::Or(nodes) => self.fold(nodes, |a, b| a.or(b)),
            Node::And(nodes) => self.fold(nodes, |a, b| a.and(b)),
            Node::Compare(lhs, op, rhs) => {
                let lhs_dtype = self.operand_dtype(lhs)?;
                let rhs_dtype = self.operand_dtype(rhs)?;
                self.check_comparable(lhs, lhs_dtype.as_ref(), rhs)?;
                self.check_comparable(rhs, rhs_dtype.as_ref(), lhs)?;
                let l = self.operand_expr(lhs, rhs_dtype.as_ref())?;
                let r = self.operand_expr(rhs, lhs_dtype.as_ref())?;
                Ok(match op {
                    CmpOp::Eq => l.eq(r),
                    CmpOp::NotEq => l.neq(r),
                    CmpOp::Lt => l.lt(r),
                    CmpOp::Gt => l.gt(r),
                    CmpOp::LtEq => l.lt_eq(r),
                    CmpOp::GtEq => l.gt_eq(r),
                })
            }
            Node::Bare(Operand::Bool(b)) => Ok(lit(*b)),
            Node::Bare(Operand::Column(name)) => {
                let column = self.column(name)?;
                if column.dtype() != &DataType::Boolean {
                    return Err(self.error(format!(
                        "column '{name}' is not boolean; compare it to a value"
                    )));
                }
                Ok(col(name.as_str()))
            }
            Node::Bare(_) => Err(self.error("expected a comparison".to_string())),
        }
    }

    fn fold(&self, nodes: &[Node], combine: fn(Expr, Expr) -> Expr) -> Result<Expr> {
        let mut exprs = nodes.iter().map(|n| self.compile(n));
        let first = exprs
            .next()
            .ok_or_else(|| self.error("empty expression".to_string()))??;
        exprs.try_fold(first, |acc, next| Ok(combine(acc, next?)))
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.df.column(name).map_err(|_| {
            let mut candidates = resolver::closest(&column_names(self.df), name, self.config);
            if candidates.is_empty() {
                candidates = column_names(self.df)
                    .into_iter()
                    .take(self.config.max_suggestions)
                    .collect();
            }
            AnalysisError::invalid_filter(format!("unknown column '{name}'"), candidates)
        })
    }

    fn operand_dtype(&self, operand: &Operand) -> Result<Option<DataType>> {
        match operand {
            Operand::Column(name) => Ok(Some(self.column(name)?.dtype().clone())),
            _ => Ok(None),
        }
    }

    /// Reject column-vs-literal comparisons whose types can never match.
    fn check_comparable(
        &self,
        operand: &Operand,
        dtype: Option<&DataType>,
        other: &Operand,
    ) -> Result<()> {
        let (Operand::Column(name), Some(dtype)) = (operand, dtype) else {
            return Ok(());
        };
        let mismatch = match other {
            Operand::Str(_) => is_numeric_dtype(dtype),
            Operand::Number(_) => is_text_dtype(dtype),
            _ => false,
        };
        if mismatch {
            return Err(self.error(format!(
                "column '{name}' ({dtype}) cannot be compared with {}",
                match other {
                    Operand::Str(s) => format!("text '{s}'"),
                    _ => "a number".to_string(),
                }
            )));
        }
        Ok(())
    }

    /// Expression for one side of a comparison. `other` is the dtype of the
    /// opposite side when it is a column.
    fn operand_expr(&self, operand: &Operand, other: Option<&DataType>) -> Result<Expr> {
        Ok(match operand {
            Operand::Column(name) => col(name.as_str()),
            Operand::Bool(b) => lit(*b),
            Operand::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => lit(*n as i64),
            Operand::Number(n) => lit(*n),
            Operand::Str(s) => match other {
                Some(dtype) if is_datetime_dtype(dtype) => {
                    let millis = parse_timestamp_millis(s).ok_or_else(|| {
                        self.error(format!("'{s}' is not a recognised date or timestamp"))
                    })?;
                    lit(millis)
                        .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                        .cast(dtype.clone())
                }
                _ => lit(s.as_str()),
            },
        })
    }

    fn error(&self, reason: String) -> AnalysisError {
        AnalysisError::invalid_filter(
            reason,
            column_names(self.df)
                .into_iter()
                .take(self.config.max_suggestions)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FILTER_EXAMPLE;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn orders() -> DataFrame {
        let dates = Series::new(
            "order_date".into(),
            &[
                parse_timestamp_millis("2024-01-05").unwrap(),
                parse_timestamp_millis("2024-02-10").unwrap(),
                parse_timestamp_millis("2024-03-15").unwrap(),
                parse_timestamp_millis("2024-04-20").unwrap(),
            ],
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();

        let mut df = df!(
            "region" => &["West", "East", "West", "North"],
            "total_sales" => &[10.0f64, 250.0, 120.0, 40.0],
            "qty" => &[1i64, 5, 3, 2],
            "is_priority" => &[true, false, true, false],
        )
        .unwrap();
        df.with_column(dates).unwrap();
        df
    }

    fn preview(expr: &str) -> ToolOutcome<FilterPreview> {
        filter_preview(&orders(), expr, 20, &ExplorerConfig::default())
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("qty >= 3 & region == 'West'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("qty".to_string()),
                Token::Cmp(CmpOp::GtEq),
                Token::Number(3.0),
                Token::And,
                Token::Ident("region".to_string()),
                Token::Cmp(CmpOp::Eq),
                Token::Str("West".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_negative_and_decimal_numbers() {
        let tokens = tokenize("x > -1.5").unwrap();
        assert_eq!(tokens[2], Token::Number(-1.5));
    }

    #[test]
    fn test_parse_precedence() {
        let ast = Parser::new("a == 1 | b == 2 & c == 3").unwrap().parse().unwrap();
        match ast {
            Node::Or(nodes) => {
                assert_eq!(nodes.len(), 2);
                assert!(matches!(nodes[1], Node::And(_)));
            }
            other => panic!("unexpected ast {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::new("").is_err());
        assert!(Parser::new("(a == 1").unwrap().parse().is_err());
        assert!(Parser::new("a == ").unwrap().parse().is_err());
        assert!(Parser::new("a == 1 b").unwrap().parse().is_err());
        assert!(Parser::new("a == 'open").is_err());
    }

    #[test]
    fn test_simple_numeric_filter() {
        let out = preview("total_sales > 100");
        let result = out.success().unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.rows[0]["region"], json!("East"));
    }

    #[test]
    fn test_combined_filter() {
        let out = preview("total_sales > 20 & region == 'West'");
        assert_eq!(out.success().unwrap().count, 1);

        let out = preview("(region == \"North\") | qty >= 5");
        assert_eq!(out.success().unwrap().count, 2);
    }

    #[test]
    fn test_single_equals_and_booleans() {
        assert_eq!(preview("region = 'West'").success().unwrap().count, 2);
        assert_eq!(preview("is_priority == true").success().unwrap().count, 2);
        assert_eq!(preview("is_priority").success().unwrap().count, 2);
    }

    #[test]
    fn test_datetime_comparison() {
        let out = preview("order_date >= '2024-03-01'");
        assert_eq!(out.success().unwrap().count, 2);
    }

    #[test]
    fn test_limit_caps_rows_but_not_count() {
        let out = filter_preview(&orders(), "qty > 0", 2, &ExplorerConfig::default());
        let result = out.success().unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.count, 4);
    }

    #[test]
    fn test_unsupported_characters_rejected() {
        let out = preview("region == 'West'; DROP TABLE x");
        let failure = out.failure().unwrap();
        assert_eq!(failure.code, "INVALID_FILTER_EXPRESSION");
        assert!(failure.error.contains("unsupported characters"));
        assert!(failure.suggestions.iter().any(|s| s.contains(FILTER_EXAMPLE)));
    }

    #[test]
    fn test_unknown_column_suggests_candidates() {
        let out = preview("total_sale > 5");
        let failure = out.failure().unwrap();
        assert!(failure.error.contains("unknown column"));
        assert!(failure.candidates.contains(&"total_sales".to_string()));
    }

    #[test]
    fn test_type_mismatch_is_reported_not_raised() {
        let out = preview("total_sales == 'lots'");
        assert_eq!(out.failure().unwrap().code, "INVALID_FILTER_EXPRESSION");

        let out = preview("5 < region");
        assert!(out.failure().unwrap().error.contains("region"));
    }

    #[test]
    fn test_bare_non_boolean_column_rejected() {
        let out = preview("region");
        assert!(out.failure().unwrap().error.contains("not boolean"));
    }
}
