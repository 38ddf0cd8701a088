//! # Formula Evaluator
//!
//! Evaluates the restricted arithmetic formulas attached to `FORMULA` rules.
//!
//! ## Grammar
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := unary (('*' | '/') unary)*
//! unary      := ('+' | '-') unary | primary
//! primary    := NUMBER
//!             | VARIABLE
//!             | FUNCTION '(' expression (',' expression)* ')'
//!             | '(' expression ')'
//!
//! VARIABLE   := panelCount | systemSize | batteryCapacity | hasBattery
//! FUNCTION   := CEIL | FLOOR | ROUND | MAX | MIN
//! ```
//!
//! ## Pipeline
//! ```text
//! "CEIL(panelCount / 4)"
//!      │ tokenize
//!      ▼
//! [CEIL] [(] [panelCount] [/] [4] [)]
//!      │ parse  (unknown names rejected HERE, before anything runs)
//!      ▼
//! Call(Ceil, [Binary(Var(PanelCount), Div, Num(4))])
//!      │ evaluate against FormulaVariables
//!      ▼
//! 6.0   (panelCount = 21)
//! ```
//!
//! Nothing in a formula can reach state outside [`FormulaVariables`]: the
//! tree only has nodes for numbers, the four variables, the five functions
//! and arithmetic.

use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{FormulaError, FormulaResult};
use crate::types::JobSpecs;

/// Longest formula accepted. Keeps parse and evaluation recursion bounded.
pub const MAX_FORMULA_LEN: usize = 1024;

// =============================================================================
// Variables
// =============================================================================

/// Names a formula may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    PanelCount,
    SystemSize,
    BatteryCapacity,
    HasBattery,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::PanelCount,
        Variable::SystemSize,
        Variable::BatteryCapacity,
        Variable::HasBattery,
    ];

    /// Name as written in formulas.
    pub const fn name(&self) -> &'static str {
        match self {
            Variable::PanelCount => "panelCount",
            Variable::SystemSize => "systemSize",
            Variable::BatteryCapacity => "batteryCapacity",
            Variable::HasBattery => "hasBattery",
        }
    }

    fn lookup(name: &str) -> Option<Self> {
        Variable::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Values bound to the formula variables for one job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaVariables {
    pub panel_count: f64,
    pub system_size: f64,
    /// 0 when the job records no capacity.
    pub battery_capacity: f64,
    /// 1 with a battery, 0 without.
    pub has_battery: f64,
}

impl FormulaVariables {
    pub fn from_specs(specs: &JobSpecs) -> Self {
        FormulaVariables {
            panel_count: f64::from(specs.panel_count),
            system_size: specs.system_size_kw,
            battery_capacity: specs.battery_capacity_kwh.unwrap_or(0.0),
            has_battery: if specs.has_battery { 1.0 } else { 0.0 },
        }
    }

    pub fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::PanelCount => self.panel_count,
            Variable::SystemSize => self.system_size,
            Variable::BatteryCapacity => self.battery_capacity,
            Variable::HasBattery => self.has_battery,
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Helper functions available to formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Ceil,
    Floor,
    Round,
    Max,
    Min,
}

impl Function {
    pub const fn name(&self) -> &'static str {
        match self {
            Function::Ceil => "CEIL",
            Function::Floor => "FLOOR",
            Function::Round => "ROUND",
            Function::Max => "MAX",
            Function::Min => "MIN",
        }
    }

    fn lookup(name: &str) -> Option<Self> {
        match name {
            "CEIL" => Some(Function::Ceil),
            "FLOOR" => Some(Function::Floor),
            "ROUND" => Some(Function::Round),
            "MAX" => Some(Function::Max),
            "MIN" => Some(Function::Min),
            _ => None,
        }
    }

    fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        let (ok, expected) = match self {
            Function::Ceil | Function::Floor | Function::Round => (actual == 1, "1"),
            Function::Max | Function::Min => (actual >= 1, "at least 1"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                function: self.name(),
                expected,
                actual,
            })
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Function::Ceil => args[0].ceil(),
            Function::Floor => args[0].floor(),
            Function::Round => round_half_up(args[0]),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Nearest integer, halves toward positive infinity (2.5 → 3, -2.5 → -2).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn tokenize(formula: &str) -> FormulaResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = formula.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => continue,
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            ',' => tokens.push(Token::Comma),
            '0'..='9' | '.' => {
                let mut number = String::from(ch);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        number.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value =
                    f64::from_str(&number).map_err(|_| FormulaError::InvalidNumber(number))?;
                if !value.is_finite() {
                    return Err(FormulaError::NonFinite);
                }
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position,
                })
            }
        }
    }

    Ok(tokens)
}

// =============================================================================
// Expression Tree
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(Variable),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Variables the tree references, in first-use order without repeats.
    pub fn variables(&self) -> Vec<Variable> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables(&self, found: &mut Vec<Variable>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(v) => {
                if !found.contains(v) {
                    found.push(*v);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_variables(found),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(found);
                right.collect_variables(found);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(found);
                }
            }
        }
    }

    /// Walks the tree against a set of variable values.
    ///
    /// Every node must produce a finite value; an infinity or NaN anywhere
    /// in the tree fails the whole formula.
    pub fn evaluate(&self, vars: &FormulaVariables) -> FormulaResult<f64> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Variable(v) => vars.get(*v),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(vars)?;
                match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                }
            }
            Expr::Binary { left, op, right } => {
                let a = left.evaluate(vars)?;
                let b = right.evaluate(vars)?;
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide if b == 0.0 => return Err(FormulaError::DivisionByZero),
                    BinaryOp::Divide => a / b,
                }
            }
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(vars))
                    .collect::<FormulaResult<Vec<f64>>>()?;
                // Trees built by hand skip the parser's arity check
                function.check_arity(values.len())?;
                function.apply(&values)
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.advance() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn parse_formula(&mut self) -> FormulaResult<Expr> {
        let expr = self.parse_expression()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
        }
    }

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        let mut expr = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> FormulaResult<Expr> {
        let mut expr = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Minus,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LeftParen) => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LeftParen) {
                    let function = Function::lookup(&name)
                        .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                    self.advance();
                    let args = self.parse_arguments()?;
                    function.check_arity(args.len())?;
                    Ok(Expr::Call { function, args })
                } else if let Some(variable) = Variable::lookup(&name) {
                    Ok(Expr::Variable(variable))
                } else {
                    Err(FormulaError::UnknownIdentifier(name))
                }
            }
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// Parses `arg (, arg)* )` after the opening parenthesis.
    fn parse_arguments(&mut self) -> FormulaResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RightParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => return Ok(args),
                Some(token) => return Err(FormulaError::UnexpectedToken(token.to_string())),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Parses a formula into an expression tree.
pub fn parse(formula: &str) -> FormulaResult<Expr> {
    let formula = formula.trim();
    if formula.is_empty() {
        return Err(FormulaError::Empty);
    }
    if formula.chars().count() > MAX_FORMULA_LEN {
        return Err(FormulaError::TooLong {
            max: MAX_FORMULA_LEN,
        });
    }

    let tokens = tokenize(formula)?;
    Parser::new(tokens).parse_formula()
}

/// Checks a catalog formula without a job.
///
/// Useful at catalog-load time, before any job specs exist.
pub fn validate_formula(formula: &str) -> FormulaResult<()> {
    parse(formula).map(|_| ())
}

/// Evaluates a formula for a job, exposing the failure reason.
pub fn try_evaluate(formula: &str, specs: &JobSpecs) -> FormulaResult<f64> {
    parse(formula)?.evaluate(&FormulaVariables::from_specs(specs))
}

/// Evaluates a formula for a job.
///
/// Returns `0.0` on any failure and logs a warning; a broken formula must
/// never abort the rest of the calculation.
pub fn evaluate(formula: &str, specs: &JobSpecs) -> f64 {
    match try_evaluate(formula, specs) {
        Ok(value) => value,
        Err(error) => {
            warn!(formula = %formula, error = %error, "Formula evaluation failed, using 0");
            0.0
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(panels: u32) -> JobSpecs {
        JobSpecs::new(6.6, panels)
    }

    #[test]
    fn test_ceil_of_panels_per_four() {
        assert_eq!(evaluate("CEIL(panelCount / 4)", &specs(21)), 6.0);
        assert_eq!(evaluate("CEIL(panelCount / 4)", &specs(20)), 5.0);
    }

    #[test]
    fn test_operator_precedence() {
        let s = specs(10);
        assert_eq!(try_evaluate("2 + 3 * 4", &s).unwrap(), 14.0);
        assert_eq!(try_evaluate("(2 + 3) * 4", &s).unwrap(), 20.0);
        assert_eq!(try_evaluate("panelCount - 4 - 3", &s).unwrap(), 3.0);
        assert_eq!(try_evaluate("panelCount / 5 / 2", &s).unwrap(), 1.0);
    }

    #[test]
    fn test_unary_operators() {
        let s = specs(10);
        assert_eq!(try_evaluate("-panelCount + 12", &s).unwrap(), 2.0);
        assert_eq!(try_evaluate("--3", &s).unwrap(), 3.0);
        assert_eq!(try_evaluate("+2 * -3", &s).unwrap(), -6.0);
    }

    #[test]
    fn test_all_variables() {
        let s = JobSpecs::new(8.5, 20).with_battery(13.5);
        assert_eq!(try_evaluate("panelCount", &s).unwrap(), 20.0);
        assert_eq!(try_evaluate("systemSize", &s).unwrap(), 8.5);
        assert_eq!(try_evaluate("batteryCapacity", &s).unwrap(), 13.5);
        assert_eq!(try_evaluate("hasBattery", &s).unwrap(), 1.0);

        let s = specs(20);
        assert_eq!(try_evaluate("batteryCapacity", &s).unwrap(), 0.0);
        assert_eq!(try_evaluate("hasBattery * 4", &s).unwrap(), 0.0);
    }

    #[test]
    fn test_functions() {
        let s = specs(10);
        assert_eq!(try_evaluate("FLOOR(7.9)", &s).unwrap(), 7.0);
        assert_eq!(try_evaluate("ROUND(2.5)", &s).unwrap(), 3.0);
        assert_eq!(try_evaluate("ROUND(-2.5)", &s).unwrap(), -2.0);
        assert_eq!(try_evaluate("ROUND(2.49)", &s).unwrap(), 2.0);
        assert_eq!(try_evaluate("MAX(2, panelCount, 4)", &s).unwrap(), 10.0);
        assert_eq!(try_evaluate("MIN(panelCount * 2, 12)", &s).unwrap(), 12.0);
        assert_eq!(try_evaluate("MAX(1)", &s).unwrap(), 1.0);
        assert_eq!(
            try_evaluate("MAX(2, CEIL(systemSize * 1.5))", &s).unwrap(),
            10.0
        );
    }

    #[test]
    fn test_unknown_identifier_is_rejected() {
        assert_eq!(
            parse("panelCount + process"),
            Err(FormulaError::UnknownIdentifier("process".into()))
        );
        assert_eq!(evaluate("storeys * 2", &specs(10)), 0.0);
    }

    #[test]
    fn test_injection_attempts_evaluate_to_zero() {
        let s = specs(10);
        for formula in [
            "require('fs').readFileSync('/etc/passwd')",
            "context.constructor.constructor('return process')()",
            "this",
            "panelCount; while(true){}",
            "globalThis.panelCount",
            "`${panelCount}`",
            "panelcount",
            "ceil(panelCount)",
        ] {
            assert_eq!(evaluate(formula, &s), 0.0, "formula {formula:?}");
            assert!(try_evaluate(formula, &s).is_err(), "formula {formula:?}");
        }
    }

    #[test]
    fn test_malformed_syntax() {
        assert_eq!(parse(""), Err(FormulaError::Empty));
        assert_eq!(parse("   "), Err(FormulaError::Empty));
        assert_eq!(parse("2 +"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse("(2 + 3"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse("2 + 3)"), Err(FormulaError::UnexpectedToken(")".into())));
        assert_eq!(parse("2 3"), Err(FormulaError::UnexpectedToken("3".into())));
        assert_eq!(parse("1.2.3"), Err(FormulaError::InvalidNumber("1.2.3".into())));
        assert!(matches!(
            parse("2 ^ 3"),
            Err(FormulaError::UnexpectedChar { ch: '^', position: 2 })
        ));
        assert_eq!(
            parse("CEIL"),
            Err(FormulaError::UnknownIdentifier("CEIL".into()))
        );
        assert_eq!(
            parse("SQRT(4)"),
            Err(FormulaError::UnknownFunction("SQRT".into()))
        );
    }

    #[test]
    fn test_arity() {
        assert!(matches!(
            parse("CEIL(1, 2)"),
            Err(FormulaError::Arity { function: "CEIL", actual: 2, .. })
        ));
        assert!(matches!(
            parse("MAX()"),
            Err(FormulaError::Arity { function: "MAX", actual: 0, .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let s = specs(0);
        assert_eq!(
            try_evaluate("10 / panelCount", &s),
            Err(FormulaError::DivisionByZero)
        );
        assert_eq!(evaluate("10 / panelCount", &s), 0.0);
    }

    #[test]
    fn test_overlong_formula_is_rejected() {
        let formula = "1+".repeat(MAX_FORMULA_LEN) + "1";
        assert_eq!(
            parse(&formula),
            Err(FormulaError::TooLong {
                max: MAX_FORMULA_LEN
            })
        );
    }

    #[test]
    fn test_non_finite_intermediates_are_rejected() {
        let s = specs(10);
        let huge = "9".repeat(400);

        assert_eq!(parse(&huge), Err(FormulaError::NonFinite));
        assert_eq!(
            try_evaluate(&format!("MAX({huge} - {huge}, 2)"), &s),
            Err(FormulaError::NonFinite)
        );
        assert_eq!(evaluate(&format!("MAX({huge} - {huge}, 2)"), &s), 0.0);

        // 1e200 * 1e200 overflows partway, MIN would otherwise hide it
        let big = format!("1{}", "0".repeat(200));
        assert_eq!(
            try_evaluate(&format!("MIN({big} * {big}, 5)"), &s),
            Err(FormulaError::NonFinite)
        );

        let wild = JobSpecs::new(f64::INFINITY, 10);
        assert_eq!(
            try_evaluate("MIN(systemSize - systemSize, 3)", &wild),
            Err(FormulaError::NonFinite)
        );
    }

    #[test]
    fn test_variables_in_first_use_order() {
        let expr = parse("MAX(systemSize, panelCount / 4) + systemSize * hasBattery").unwrap();
        assert_eq!(
            expr.variables(),
            vec![Variable::SystemSize, Variable::PanelCount, Variable::HasBattery]
        );
        assert!(parse("CEIL(7 / 2)").unwrap().variables().is_empty());
    }

    #[test]
    fn test_hand_built_tree_checks_arity() {
        let expr = Expr::Call {
            function: Function::Ceil,
            args: vec![],
        };
        let vars = FormulaVariables::from_specs(&specs(10));
        assert!(matches!(
            expr.evaluate(&vars),
            Err(FormulaError::Arity { function: "CEIL", actual: 0, .. })
        ));
    }

    #[test]
    fn test_validate_formula() {
        assert!(validate_formula("CEIL(panelCount / 4) + hasBattery * 2").is_ok());
        assert!(validate_formula("panelCount +").is_err());
    }
}
