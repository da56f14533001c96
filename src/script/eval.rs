//! Tree-walk evaluator for the preview script subset.
//!
//! Values are JSON values with JS-flavored semantics: `+` concatenates when
//! either side is a string, conditions use truthiness, and a script that
//! falls off the end of a function yields null. A step-count guard bounds
//! evaluation so a runaway loop becomes an ordinary execution error instead
//! of hanging the host.

use std::collections::HashMap;

use serde_json::{Number as JsonNumber, Value as JsonValue};

use crate::error::RuleError;

use super::parser::{BinaryOp, Expr, FunctionDecl, Stmt, UnaryOp};

const MAX_EVAL_STEPS: u64 = 250_000;
const MAX_CALL_DEPTH: usize = 64;

/// Executes a parsed program and invokes its `configure` function with the
/// given parameter bag.
pub fn run_configure(program: &[Stmt], parameters: JsonValue) -> Result<JsonValue, RuleError> {
    let mut interp = Interpreter::new();

    for statement in program {
        if let Stmt::Function(decl) = statement {
            interp.functions.insert(decl.name.clone(), decl.clone());
        }
    }
    // Top-level non-function statements run once, in the global scope.
    let mut globals = Scope::new();
    for statement in program {
        if !matches!(statement, Stmt::Function(_)) {
            interp.exec_statement(statement, &mut globals)?;
        }
    }

    let configure = interp
        .functions
        .get("configure")
        .cloned()
        .ok_or_else(|| RuleError::Script("configure is not defined".to_string()))?;
    interp.call_function(&configure, vec![parameters])
}

struct Scope {
    frames: Vec<HashMap<String, JsonValue>>,
}

impl Scope {
    fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    fn declare(&mut self, name: &str, value: JsonValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn assign(&mut self, name: &str, value: JsonValue) -> Result<(), RuleError> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(RuleError::Script(format!("{name} is not defined")))
    }

    fn lookup(&self, name: &str) -> Option<&JsonValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }
}

struct Interpreter {
    functions: HashMap<String, FunctionDecl>,
    steps: u64,
    depth: usize,
}

impl Interpreter {
    fn new() -> Self {
        Self {
            functions: HashMap::new(),
            steps: 0,
            depth: 0,
        }
    }

    fn step(&mut self) -> Result<(), RuleError> {
        self.steps += 1;
        if self.steps > MAX_EVAL_STEPS {
            return Err(RuleError::Script(format!(
                "script exceeded {MAX_EVAL_STEPS} evaluation steps; check for an infinite loop"
            )));
        }
        Ok(())
    }

    fn call_function(
        &mut self,
        decl: &FunctionDecl,
        args: Vec<JsonValue>,
    ) -> Result<JsonValue, RuleError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuleError::Script(format!(
                "call depth exceeded {MAX_CALL_DEPTH} in '{}'",
                decl.name
            )));
        }
        self.depth += 1;

        let mut scope = Scope::new();
        let mut args = args.into_iter();
        for param in &decl.params {
            scope.declare(param, args.next().unwrap_or(JsonValue::Null));
        }
        let result = self.exec_block(&decl.body, &mut scope);
        self.depth -= 1;
        Ok(result?.unwrap_or(JsonValue::Null))
    }

    /// Runs a statement list; `Some(value)` means a `return` fired.
    fn exec_block(
        &mut self,
        statements: &[Stmt],
        scope: &mut Scope,
    ) -> Result<Option<JsonValue>, RuleError> {
        for statement in statements {
            if let Some(value) = self.exec_statement(statement, scope)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn exec_statement(
        &mut self,
        statement: &Stmt,
        scope: &mut Scope,
    ) -> Result<Option<JsonValue>, RuleError> {
        self.step()?;
        match statement {
            Stmt::Function(decl) => {
                self.functions.insert(decl.name.clone(), decl.clone());
                Ok(None)
            }
            Stmt::Declare { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr, scope)?,
                    None => JsonValue::Null,
                };
                scope.declare(name, value);
                Ok(None)
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(value, scope)?;
                scope.assign(name, value)?;
                Ok(None)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let test = self.eval(condition, scope)?;
                scope.push();
                let result = if truthy(&test) {
                    self.exec_block(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch, scope)
                } else {
                    Ok(None)
                };
                scope.pop();
                result
            }
            Stmt::While { condition, body } => {
                loop {
                    self.step()?;
                    let test = self.eval(condition, scope)?;
                    if !truthy(&test) {
                        break;
                    }
                    scope.push();
                    let result = self.exec_block(body, scope);
                    scope.pop();
                    if let Some(value) = result? {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                scope.push();
                let result = (|| {
                    if let Some(init) = init {
                        self.exec_statement(init, scope)?;
                    }
                    loop {
                        self.step()?;
                        if let Some(condition) = condition {
                            let test = self.eval(condition, scope)?;
                            if !truthy(&test) {
                                break;
                            }
                        }
                        scope.push();
                        let iteration = self.exec_block(body, scope);
                        scope.pop();
                        if let Some(value) = iteration? {
                            return Ok(Some(value));
                        }
                        if let Some(update) = update {
                            self.exec_statement(update, scope)?;
                        }
                    }
                    Ok(None)
                })();
                scope.pop();
                result
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => JsonValue::Null,
                };
                Ok(Some(value))
            }
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(None)
            }
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &mut Scope) -> Result<JsonValue, RuleError> {
        self.step()?;
        match expr {
            Expr::Number(n) => number(*n),
            Expr::String(s) => Ok(JsonValue::String(s.clone())),
            Expr::Bool(b) => Ok(JsonValue::Bool(*b)),
            Expr::Null => Ok(JsonValue::Null),
            Expr::Array(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    out.push(self.eval(element, scope)?);
                }
                Ok(JsonValue::Array(out))
            }
            Expr::Ident(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| RuleError::Script(format!("{name} is not defined"))),
            Expr::Member { object, property } => {
                let value = self.eval(object, scope)?;
                member_value(&value, property)
            }
            Expr::Index { object, index } => {
                let value = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                index_value(&value, &index)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, scope)?;
                match op {
                    UnaryOp::Neg => number(-as_f64(&value)?),
                    UnaryOp::Not => Ok(JsonValue::Bool(!truthy(&value))),
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let l = self.eval(left, scope)?;
                    if !truthy(&l) {
                        return Ok(l);
                    }
                    self.eval(right, scope)
                }
                BinaryOp::Or => {
                    let l = self.eval(left, scope)?;
                    if truthy(&l) {
                        return Ok(l);
                    }
                    self.eval(right, scope)
                }
                _ => {
                    let l = self.eval(left, scope)?;
                    let r = self.eval(right, scope)?;
                    eval_binary(*op, l, r)
                }
            },
            Expr::Ternary {
                condition,
                then_value,
                else_value,
            } => {
                let test = self.eval(condition, scope)?;
                if truthy(&test) {
                    self.eval(then_value, scope)
                } else {
                    self.eval(else_value, scope)
                }
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        scope: &mut Scope,
    ) -> Result<JsonValue, RuleError> {
        // Math.* is a namespace, not a value; dispatch before evaluating.
        if let Expr::Member { object, property } = callee {
            if matches!(&**object, Expr::Ident(name) if name == "Math") {
                let evaluated = self.eval_args(args, scope)?;
                return math_builtin(property, &evaluated);
            }
            let receiver = self.eval(object, scope)?;
            let evaluated = self.eval_args(args, scope)?;
            return method_call(&receiver, property, &evaluated);
        }

        if let Expr::Ident(name) = callee {
            if let Some(decl) = self.functions.get(name).cloned() {
                let evaluated = self.eval_args(args, scope)?;
                return self.call_function(&decl, evaluated);
            }
            let evaluated = self.eval_args(args, scope)?;
            return global_builtin(name, &evaluated);
        }

        Err(RuleError::Script("value is not callable".to_string()))
    }

    fn eval_args(
        &mut self,
        args: &[Expr],
        scope: &mut Scope,
    ) -> Result<Vec<JsonValue>, RuleError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval(arg, scope)?);
        }
        Ok(out)
    }
}

fn member_value(value: &JsonValue, property: &str) -> Result<JsonValue, RuleError> {
    if property == "length" {
        match value {
            JsonValue::String(s) => return number(s.chars().count() as f64),
            JsonValue::Array(a) => return number(a.len() as f64),
            _ => {}
        }
    }
    match value {
        JsonValue::Object(map) => Ok(map.get(property).cloned().unwrap_or(JsonValue::Null)),
        _ => Ok(JsonValue::Null),
    }
}

fn index_value(value: &JsonValue, index: &JsonValue) -> Result<JsonValue, RuleError> {
    match (value, index) {
        (JsonValue::Array(items), JsonValue::Number(_)) => {
            let i = as_f64(index)?;
            if i < 0.0 {
                return Ok(JsonValue::Null);
            }
            Ok(items.get(i as usize).cloned().unwrap_or(JsonValue::Null))
        }
        (JsonValue::Object(map), JsonValue::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(JsonValue::Null))
        }
        _ => Ok(JsonValue::Null),
    }
}

fn math_builtin(name: &str, args: &[JsonValue]) -> Result<JsonValue, RuleError> {
    match name {
        "min" => fold_f64(args, f64::INFINITY, f64::min),
        "max" => fold_f64(args, f64::NEG_INFINITY, f64::max),
        "abs" => unary_f64(name, args, f64::abs),
        "floor" => unary_f64(name, args, f64::floor),
        "ceil" => unary_f64(name, args, f64::ceil),
        "round" => unary_f64(name, args, f64::round),
        _ => Err(RuleError::Script(format!("Math.{name} is not a function"))),
    }
}

fn fold_f64(
    args: &[JsonValue],
    start: f64,
    fold: fn(f64, f64) -> f64,
) -> Result<JsonValue, RuleError> {
    let mut acc = start;
    for value in args {
        acc = fold(acc, as_f64(value)?);
    }
    number(acc)
}

fn unary_f64(name: &str, args: &[JsonValue], apply: fn(f64) -> f64) -> Result<JsonValue, RuleError> {
    if args.len() != 1 {
        return Err(RuleError::Script(format!(
            "Math.{name} expects 1 argument, got {}",
            args.len()
        )));
    }
    number(apply(as_f64(&args[0])?))
}

fn method_call(
    receiver: &JsonValue,
    method: &str,
    args: &[JsonValue],
) -> Result<JsonValue, RuleError> {
    match (receiver, method) {
        (JsonValue::String(s), "includes") => {
            let needle = args
                .first()
                .and_then(|v| v.as_str())
                .map(|v| v.to_string())
                .unwrap_or_else(|| args.first().map(json_to_string).unwrap_or_default());
            Ok(JsonValue::Bool(s.contains(&needle)))
        }
        (JsonValue::String(s), "toUpperCase") => Ok(JsonValue::String(s.to_uppercase())),
        (JsonValue::String(s), "toLowerCase") => Ok(JsonValue::String(s.to_lowercase())),
        (JsonValue::Array(items), "includes") => {
            let needle = args.first().cloned().unwrap_or(JsonValue::Null);
            Ok(JsonValue::Bool(items.contains(&needle)))
        }
        _ => Err(RuleError::Script(format!(
            "{}.{method} is not a function",
            json_type_name(receiver)
        ))),
    }
}

fn global_builtin(name: &str, args: &[JsonValue]) -> Result<JsonValue, RuleError> {
    match name {
        "Number" => {
            let value = args.first().cloned().unwrap_or(JsonValue::Null);
            match value {
                JsonValue::Number(_) => Ok(value),
                JsonValue::Bool(b) => number(if b { 1.0 } else { 0.0 }),
                JsonValue::String(s) => match s.trim().parse::<f64>() {
                    Ok(n) => number(n),
                    Err(_) => Err(RuleError::Script(format!("'{s}' is not a number"))),
                },
                other => Err(RuleError::Script(format!(
                    "cannot convert {} to a number",
                    json_type_name(&other)
                ))),
            }
        }
        "String" => Ok(JsonValue::String(
            args.first().map(json_to_string).unwrap_or_default(),
        )),
        "Boolean" => Ok(JsonValue::Bool(
            args.first().map(truthy).unwrap_or(false),
        )),
        _ => Err(RuleError::Script(format!("{name} is not defined"))),
    }
}

fn eval_binary(op: BinaryOp, left: JsonValue, right: JsonValue) -> Result<JsonValue, RuleError> {
    match op {
        BinaryOp::Add => {
            if left.is_string() || right.is_string() {
                Ok(JsonValue::String(format!(
                    "{}{}",
                    json_to_string(&left),
                    json_to_string(&right)
                )))
            } else {
                number(as_f64(&left)? + as_f64(&right)?)
            }
        }
        BinaryOp::Sub => number(as_f64(&left)? - as_f64(&right)?),
        BinaryOp::Mul => number(as_f64(&left)? * as_f64(&right)?),
        BinaryOp::Div => {
            let rhs = as_f64(&right)?;
            if rhs == 0.0 {
                return Err(RuleError::Script("division by zero".to_string()));
            }
            number(as_f64(&left)? / rhs)
        }
        BinaryOp::Mod => {
            let rhs = as_f64(&right)?;
            if rhs == 0.0 {
                return Err(RuleError::Script("modulo by zero".to_string()));
            }
            number(as_f64(&left)? % rhs)
        }
        BinaryOp::Eq => Ok(JsonValue::Bool(loose_eq(&left, &right))),
        BinaryOp::NotEq => Ok(JsonValue::Bool(!loose_eq(&left, &right))),
        BinaryOp::Lt => compare(left, right, |a, b| a < b),
        BinaryOp::Lte => compare(left, right, |a, b| a <= b),
        BinaryOp::Gt => compare(left, right, |a, b| a > b),
        BinaryOp::Gte => compare(left, right, |a, b| a >= b),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited in eval"),
    }
}

fn loose_eq(left: &JsonValue, right: &JsonValue) -> bool {
    if let (JsonValue::Number(_), JsonValue::Number(_)) = (left, right) {
        return left.as_f64() == right.as_f64();
    }
    left == right
}

fn compare<F>(left: JsonValue, right: JsonValue, cmp: F) -> Result<JsonValue, RuleError>
where
    F: Fn(f64, f64) -> bool,
{
    if let (JsonValue::String(l), JsonValue::String(r)) = (&left, &right) {
        let ordering = l.cmp(r);
        return Ok(JsonValue::Bool(cmp(
            match ordering {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            },
            0.0,
        )));
    }
    Ok(JsonValue::Bool(cmp(as_f64(&left)?, as_f64(&right)?)))
}

/// JS-flavored truthiness.
pub(crate) fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn as_f64(value: &JsonValue) -> Result<f64, RuleError> {
    value.as_f64().ok_or_else(|| {
        RuleError::Script(format!("expected number, got {}", json_type_name(value)))
    })
}

/// Normalizes integral results to integer JSON numbers so equality and
/// display behave the way authors expect.
fn number(value: f64) -> Result<JsonValue, RuleError> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        return Ok(JsonValue::Number(JsonNumber::from(value as i64)));
    }
    let num = JsonNumber::from_f64(value)
        .ok_or_else(|| RuleError::Script(format!("invalid numeric result {value}")))?;
    Ok(JsonValue::Number(num))
}

/// Runtime type name used in error messages.
pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    if value.is_null() {
        "null"
    } else if value.is_boolean() {
        "boolean"
    } else if value.is_number() {
        "number"
    } else if value.is_string() {
        "string"
    } else if value.is_array() {
        "array"
    } else {
        "object"
    }
}

fn json_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(v) => v.clone(),
        _ => value.to_string(),
    }
}
