//! A small deterministic expression evaluator over JSON values.
//!
//! Supports:
//! - Literals: numbers, `'single'`/`"double"` quoted strings, `true`, `false`,
//!   `null`, arrays `[..]` and objects `{key: ..}`
//! - Bindings: `x`/`value`, `i`/`index`, `acc`/`accumulator`, `e`/`error`,
//!   plus any alias bound by an import
//! - Member access `.name`, indexing `[expr]`, `.length`
//! - Operators: `+ - * / % **`, `< <= > >= == !=`, `&& || !`
//! - Methods: `split`, `join`, `includes`, `toUpperCase`, `toLowerCase`, `trim`
//!
//! Does NOT support:
//! - Assignment, functions, or statements
//! - Calling into imported modules (exports are data)
//!
//! Source is lexed and parsed with chumsky; the tree is then walked directly.

use crate::collaborators::Evaluator;
use crate::types::{BIND_ACCUMULATOR, BIND_ERROR, BIND_INDEX, BIND_VALUE};
use crate::{Bindings, Environment, Item};
use async_trait::async_trait;
use chumsky::{input::Stream, input::ValueInput, pratt::*, prelude::*};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Evaluator for the expression language described in the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    /// Create a new evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse and evaluate `source` synchronously.
    pub fn eval_str(
        &self,
        source: &str,
        bindings: &Bindings,
        env: &Environment,
    ) -> Result<Item, String> {
        let ast = parse(source)?;
        Scope { bindings, env }.eval(&ast)
    }
}

#[async_trait]
impl Evaluator for ExprEvaluator {
    fn compile(&self, source: &str) -> Result<(), String> {
        parse(source).map(|_| ())
    }

    async fn evaluate(
        &self,
        source: &str,
        bindings: &Bindings,
        env: &Environment,
    ) -> Result<Item, String> {
        self.eval_str(source, bindings, env)
    }
}

// =============================================================================
// LEXER
// =============================================================================

type Span = SimpleSpan;
type ParseError<'src, T> = Rich<'src, T, Span>;
type Extra<'src> = extra::Err<ParseError<'src, Token<'src>>>;

#[derive(Debug, Clone, PartialEq)]
enum Token<'src> {
    Number(f64),
    Text(&'src str),
    Identifier(&'src str),
    Op(&'static str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => write!(f, "'{text}'"),
            Self::Identifier(name) => f.write_str(name),
            Self::Op(op) => f.write_str(op),
        }
    }
}

fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<(Token<'src>, Span)>, extra::Err<ParseError<'src, char>>> {
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .try_map(|literal: &str, span| {
            literal
                .parse::<f64>()
                .map(Token::Number)
                .map_err(|_| Rich::custom(span, format!("invalid number literal: {literal}")))
        });

    let single_quoted = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''));
    let double_quoted = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'));
    let string = single_quoted.or(double_quoted).map(Token::Text);

    let identifier = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_' || *c == '$')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .repeated(),
        )
        .to_slice()
        .map(Token::Identifier);

    let sym = |s: &'static str| just(s).to(s);

    let compound = choice((
        sym("**"),
        sym("=="),
        sym("!="),
        sym("<="),
        sym(">="),
        sym("&&"),
        sym("||"),
    ));
    let single = choice((
        sym("+"),
        sym("-"),
        sym("*"),
        sym("/"),
        sym("%"),
        sym("<"),
        sym(">"),
        sym("!"),
    ));
    let punctuation = choice((
        sym("("),
        sym(")"),
        sym("["),
        sym("]"),
        sym("{"),
        sym("}"),
        sym(","),
        sym("."),
        sym(":"),
    ));
    let operator = choice((compound, single, punctuation)).map(Token::Op);

    choice((number, string, identifier, operator))
        .map_with(|token, extra| (token, extra.span()))
        .padded()
        .repeated()
        .collect()
}

// =============================================================================
// PARSER
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Lit(Value),
    Number(f64),
    Ident(String),
    Array(Vec<Ast>),
    Object(Vec<(String, Ast)>),
    Neg(Box<Ast>),
    Not(Box<Ast>),
    Binary(&'static str, Box<Ast>, Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Member(Box<Ast>, String),
    Index(Box<Ast>, Box<Ast>),
    Call(Box<Ast>, String, Vec<Ast>),
}

enum Suffix {
    Member(String),
    Call(String, Vec<Ast>),
    Index(Ast),
}

fn op<'src, I>(symbol: &'static str) -> impl Parser<'src, I, Token<'src>, Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    just(Token::Op(symbol))
}

fn symbol(token: &Token<'_>) -> &'static str {
    match token {
        Token::Op(op) => *op,
        _ => "",
    }
}

fn binary(token: Token<'_>, left: Ast, right: Ast) -> Ast {
    match symbol(&token) {
        "&&" => Ast::And(Box::new(left), Box::new(right)),
        "||" => Ast::Or(Box::new(left), Box::new(right)),
        op => Ast::Binary(op, Box::new(left), Box::new(right)),
    }
}

fn parser<'src, I>() -> impl Parser<'src, I, Ast, Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    recursive(|expression| {
        let name = select! { Token::Identifier(name) => name.to_string() };

        let literal = select! {
            Token::Number(n) => Ast::Number(n),
            Token::Text(text) => Ast::Lit(Value::String(text.to_string())),
            Token::Identifier("true") => Ast::Lit(Value::Bool(true)),
            Token::Identifier("false") => Ast::Lit(Value::Bool(false)),
            Token::Identifier("null") => Ast::Lit(Value::Null),
            Token::Identifier(name) => Ast::Ident(name.to_string()),
        };

        let list = expression
            .clone()
            .separated_by(op(","))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = list
            .clone()
            .delimited_by(op("["), op("]"))
            .map(Ast::Array);

        let key = select! {
            Token::Identifier(key) => key.to_string(),
            Token::Text(key) => key.to_string(),
        };
        let object = key
            .then_ignore(op(":"))
            .then(expression.clone())
            .separated_by(op(","))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(op("{"), op("}"))
            .map(Ast::Object);

        let nested = expression.clone().delimited_by(op("("), op(")"));

        let atom = choice((literal, array, object, nested));

        let suffix = choice((
            op(".")
                .ignore_then(name)
                .then(list.delimited_by(op("("), op(")")).or_not())
                .map(|(name, args)| match args {
                    Some(args) => Suffix::Call(name, args),
                    None => Suffix::Member(name),
                }),
            expression
                .delimited_by(op("["), op("]"))
                .map(Suffix::Index),
        ));

        let postfix = atom.foldl(suffix.repeated(), |target, suffix| match suffix {
            Suffix::Member(name) => Ast::Member(Box::new(target), name),
            Suffix::Call(name, args) => Ast::Call(Box::new(target), name, args),
            Suffix::Index(index) => Ast::Index(Box::new(target), Box::new(index)),
        });

        postfix.pratt((
            prefix(9, op("-"), |_, rhs, _| Ast::Neg(Box::new(rhs))),
            prefix(9, op("+"), |_, rhs, _| rhs),
            prefix(9, op("!"), |_, rhs, _| Ast::Not(Box::new(rhs))),
            infix(right(8), op("**"), |l, t, r, _| binary(t, l, r)),
            infix(left(7), choice((op("*"), op("/"), op("%"))), |l, t, r, _| {
                binary(t, l, r)
            }),
            infix(left(6), choice((op("+"), op("-"))), |l, t, r, _| binary(t, l, r)),
            infix(
                left(5),
                choice((op("<="), op(">="), op("<"), op(">"))),
                |l, t, r, _| binary(t, l, r),
            ),
            infix(left(4), choice((op("=="), op("!="))), |l, t, r, _| {
                binary(t, l, r)
            }),
            infix(left(3), op("&&"), |l, t, r, _| binary(t, l, r)),
            infix(left(2), op("||"), |l, t, r, _| binary(t, l, r)),
        ))
    })
}

fn describe<T: fmt::Display>(errors: &[ParseError<'_, T>]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse(source: &str) -> Result<Ast, String> {
    let tokens = lexer()
        .parse(source)
        .into_result()
        .map_err(|errors| describe(&errors))?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let end = source.len();
    parser()
        .parse(Stream::from_iter(tokens).map((end..end).into(), |(t, s): (_, _)| (t, s)))
        .into_result()
        .map_err(|errors| describe(&errors))
}

// =============================================================================
// EVALUATION
// =============================================================================

struct Scope<'a> {
    bindings: &'a Bindings,
    env: &'a Environment,
}

impl Scope<'_> {
    fn eval(&self, ast: &Ast) -> Result<Item, String> {
        match ast {
            Ast::Ident(name) => self.lookup(name),
            Ast::And(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() { self.eval(r) } else { Ok(left) }
            }
            Ast::Or(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() { Ok(left) } else { self.eval(r) }
            }
            Ast::Not(inner) => Ok(Item::value(!self.eval(inner)?.is_truthy())),
            other => self.eval_value(other).map(Item::Value),
        }
    }

    /// Evaluate a subexpression whose result must be an ordinary value.
    fn value_of(&self, ast: &Ast) -> Result<Value, String> {
        match self.eval(ast)? {
            Item::Value(v) => Ok(v),
            Item::Error(e) => Err(format!("cannot use an error value here: {}", e.message)),
        }
    }

    /// Like `value_of`, but an error reads as its `{message, cause, value}`
    /// object so its fields can be inspected.
    fn fields_of(&self, ast: &Ast) -> Result<Value, String> {
        match self.eval(ast)? {
            Item::Value(v) => Ok(v),
            Item::Error(e) => Ok(e.to_value()),
        }
    }

    fn eval_value(&self, ast: &Ast) -> Result<Value, String> {
        match ast {
            Ast::Lit(v) => Ok(v.clone()),
            Ast::Array(items) => items
                .iter()
                .map(|a| self.value_of(a))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Ast::Object(fields) => {
                let mut map = Map::new();
                for (key, a) in fields {
                    map.insert(key.clone(), self.value_of(a)?);
                }
                Ok(Value::Object(map))
            }
            Ast::Number(n) => number(*n),
            Ast::Neg(inner) => number(-to_number(&self.value_of(inner)?)?),
            Ast::Binary(op, l, r) => eval_binary(op, self.value_of(l)?, self.value_of(r)?),
            Ast::Member(target, name) => Ok(member(&self.fields_of(target)?, name)),
            Ast::Index(target, index) => {
                let target = self.fields_of(target)?;
                match self.value_of(index)? {
                    Value::String(key) => Ok(member(&target, &key)),
                    Value::Number(n) => Ok(n
                        .as_u64()
                        .and_then(|i| element(&target, i as usize))
                        .unwrap_or(Value::Null)),
                    other => Err(format!("cannot index with {other}")),
                }
            }
            Ast::Call(target, method, args) => {
                let receiver = self.value_of(target)?;
                let args = args
                    .iter()
                    .map(|a| self.value_of(a))
                    .collect::<Result<Vec<_>, _>>()?;
                call(&receiver, method, &args)
            }
            Ast::Ident(_) | Ast::And(..) | Ast::Or(..) | Ast::Not(_) => self.value_of(ast),
        }
    }

    fn lookup(&self, name: &str) -> Result<Item, String> {
        let bound = |key: &str| self.bindings.get(key).cloned();
        let found = match name {
            "x" | "value" => bound(BIND_VALUE).or_else(|| bound(BIND_ERROR)),
            "i" | "index" => bound(BIND_INDEX),
            "acc" | "accumulator" => bound(BIND_ACCUMULATOR),
            "e" | "error" => bound(BIND_ERROR),
            _ => None,
        };
        found
            .or_else(|| self.env.get(name).cloned().map(Item::Value))
            .ok_or_else(|| format!("{name} is not defined"))
    }
}

/// Normalize a float into a JSON number, using an integer when exact.
fn number(n: f64) -> Result<Value, String> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        return Err(format!("numeric result {n} is not finite"));
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| format!("numeric result {n} is not representable"))
}

fn to_number(v: &Value) -> Result<f64, String> {
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a number")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number")),
        other => Err(format!("{other} is not a number")),
    }
}

fn text(v: &Value) -> String {
    Item::Value(v.clone()).to_string()
}

fn eval_binary(op: &str, left: Value, right: Value) -> Result<Value, String> {
    match op {
        "+" => {
            if left.is_string() || right.is_string() {
                Ok(Value::String(text(&left) + &text(&right)))
            } else {
                number(to_number(&left)? + to_number(&right)?)
            }
        }
        "-" => number(to_number(&left)? - to_number(&right)?),
        "*" => number(to_number(&left)? * to_number(&right)?),
        "/" | "%" => {
            let divisor = to_number(&right)?;
            if divisor == 0.0 {
                return Err("division by zero".to_string());
            }
            let dividend = to_number(&left)?;
            number(if op == "/" { dividend / divisor } else { dividend % divisor })
        }
        "**" => number(to_number(&left)?.powf(to_number(&right)?)),
        "==" => Ok(Value::Bool(loose_eq(&left, &right))),
        "!=" => Ok(Value::Bool(!loose_eq(&left, &right))),
        "<" | "<=" | ">" | ">=" => Ok(Value::Bool(compare(op, &left, &right))),
        _ => Err(format!("unknown operator '{op}'")),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(op: &str, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (to_number(left), to_number(right)) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    }
}

fn member(target: &Value, name: &str) -> Value {
    match (target, name) {
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::String(s), "length") => Value::from(s.chars().count()),
        (Value::Object(map), key) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(_) | Value::String(_), key) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| element(target, i))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn element(target: &Value, index: usize) -> Option<Value> {
    match target {
        Value::Array(items) => items.get(index).cloned(),
        Value::String(s) => s.chars().nth(index).map(|c| Value::String(c.to_string())),
        _ => None,
    }
}

fn string_arg(method: &str, args: &[Value], position: usize) -> Result<String, String> {
    match args.get(position) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(text(other)),
        None => Err(format!("{method} expects an argument")),
    }
}

fn call(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, String> {
    match (receiver, method) {
        (Value::String(s), "split") => {
            let sep = string_arg(method, args, 0)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::from).collect()
            };
            Ok(Value::Array(parts))
        }
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::String(s), "includes") => {
            Ok(Value::Bool(s.contains(string_arg(method, args, 0)?.as_str())))
        }
        (Value::Array(items), "includes") => {
            let needle = args.first().cloned().unwrap_or(Value::Null);
            Ok(Value::Bool(items.iter().any(|v| loose_eq(v, &needle))))
        }
        (Value::Array(items), "join") => {
            let sep = match args.first() {
                Some(_) => string_arg(method, args, 0)?,
                None => ",".to_string(),
            };
            Ok(Value::String(
                items.iter().map(text).collect::<Vec<_>>().join(&sep),
            ))
        }
        _ => Err(format!("{method} is not a function on {receiver}")),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorValue;
    use serde_json::json;

    fn eval(source: &str) -> Result<Item, String> {
        ExprEvaluator.eval_str(source, &Bindings::new(), &Environment::new())
    }

    fn eval_with(source: &str, x: Value) -> Result<Item, String> {
        ExprEvaluator.eval_str(source, &Bindings::for_item(Item::Value(x), 2), &Environment::new())
    }

    #[test]
    fn literals() {
        assert_eq!(eval("10"), Ok(Item::value(10)));
        assert_eq!(eval("1.5"), Ok(Item::value(1.5)));
        assert_eq!(eval("'a,b'"), Ok(Item::value("a,b")));
        assert_eq!(eval("[1, 'two', null]"), Ok(Item::value(json!([1, "two", null]))));
        assert_eq!(eval("{ name: 'kai' }"), Ok(Item::value(json!({"name": "kai"}))));
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Item::value(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Item::value(9)));
        assert_eq!(eval("10**2"), Ok(Item::value(100)));
        assert_eq!(eval("2 ** 3 ** 2"), Ok(Item::value(512)));
        assert_eq!(eval("-3 + 1"), Ok(Item::value(-2)));
        assert!(eval("1 / 0").is_err());
    }

    #[test]
    fn bindings_resolve() {
        assert_eq!(eval_with("x + i", json!(10)), Ok(Item::value(12)));
        assert_eq!(eval_with("x > 2", json!(3)), Ok(Item::value(true)));
        assert_eq!(eval_with("x.name", json!({"name": "jes"})), Ok(Item::value("jes")));
        assert_eq!(eval_with("x[1]", json!([1, 2])), Ok(Item::value(2)));
        assert_eq!(eval_with("x.length", json!([1, 2, 3])), Ok(Item::value(3)));
        assert!(eval("x").is_err());
    }

    #[test]
    fn string_methods() {
        assert_eq!(
            eval_with("x.split(',')", json!("a,b")),
            Ok(Item::value(json!(["a", "b"])))
        );
        assert!(eval_with("x.split(',')", json!(10)).is_err());
        assert_eq!(eval_with("x.toUpperCase()", json!("hi")), Ok(Item::value("HI")));
        assert_eq!(eval_with("x.join('-')", json!([1, 2])), Ok(Item::value("1-2")));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval_with("'n' + x", json!(1)), Ok(Item::value("n1")));
        assert_eq!(eval_with("\"a\" + 'b'", json!(0)), Ok(Item::value("ab")));
    }

    #[test]
    fn method_chains_and_indexing() {
        assert_eq!(
            eval_with("x.split(',')[1].toUpperCase()", json!("a,b")),
            Ok(Item::value("B"))
        );
        assert_eq!(eval_with("x.trim().length", json!("  ab ")), Ok(Item::value(2)));
        assert_eq!(eval_with("[1, 2,].includes(x)", json!(2)), Ok(Item::value(true)));
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        assert_eq!(eval_with("x + 1 > 2 && x < 5", json!(2)), Ok(Item::value(true)));
        assert_eq!(eval("1 == 1 || missing"), Ok(Item::value(true)));
        assert_eq!(eval("10 % 4 * 2"), Ok(Item::value(4)));
        assert_eq!(eval("-2 ** 2"), Ok(Item::value(4)));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval("0 || 'fallback'"), Ok(Item::value("fallback")));
        assert_eq!(eval("0 && missing"), Ok(Item::value(0)));
        assert_eq!(eval("!0"), Ok(Item::value(true)));
    }

    #[test]
    fn error_values_pass_through_identifiers_only() {
        let err = Item::error("failed", "cause");
        let bindings = Bindings::for_error(err.clone(), 0);
        let env = Environment::new();
        assert_eq!(ExprEvaluator.eval_str("x", &bindings, &env), Ok(err));
        assert!(ExprEvaluator.eval_str("x + 1", &bindings, &env).is_err());
        assert!(ExprEvaluator.eval_str("x.split(',')", &bindings, &env).is_err());
    }

    #[test]
    fn error_fields_are_readable() {
        let mut error = ErrorValue::new("failed", "cause");
        error.value = Some(json!([1, null]));
        let bindings = Bindings::for_error(Item::Error(error), 0);
        let env = Environment::new();
        assert_eq!(ExprEvaluator.eval_str("e.message", &bindings, &env), Ok(Item::value("failed")));
        assert_eq!(ExprEvaluator.eval_str("e.value[0]", &bindings, &env), Ok(Item::value(1)));
        assert_eq!(ExprEvaluator.eval_str("e['cause']", &bindings, &env), Ok(Item::value("cause")));
    }

    #[test]
    fn environment_aliases_are_visible() {
        let env = Environment::new().with_alias("cfg", json!({"limit": 3}));
        assert_eq!(
            ExprEvaluator.eval_str("cfg.limit * 2", &Bindings::new(), &env),
            Ok(Item::value(6))
        );
    }

    #[test]
    fn compile_rejects_malformed_source() {
        assert!(ExprEvaluator.compile("x +").is_err());
        assert!(ExprEvaluator.compile("'open").is_err());
        assert!(ExprEvaluator.compile("").is_err());
        assert!(ExprEvaluator.compile("x + 1").is_ok());
    }
}
