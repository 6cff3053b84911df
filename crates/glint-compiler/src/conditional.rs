//! Conditional-compilation tracking for include expansion.
//!
//! Includes are spliced before the engine's preprocessor runs, so the
//! expander has to know on its own whether a line sits in a skipped `#if`
//! branch. Conditions are evaluated over the macros defined so far. When a
//! condition cannot be evaluated here (function-like macros, builtin macros
//! such as `__VERSION__`) the branch is [`Liveness::Unknown`] and the
//! expander treats it like a live one.

use fxhash::FxHashMap;

/// Whether lines in the current region reach the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Liveness {
    Live,
    Dead,
    Unknown,
}

impl Liveness {
    fn from_condition(condition: Option<bool>) -> Self {
        match condition {
            Some(true) => Liveness::Live,
            Some(false) => Liveness::Dead,
            None => Liveness::Unknown,
        }
    }

    fn and(self, other: Liveness) -> Liveness {
        match (self, other) {
            (Liveness::Dead, _) | (_, Liveness::Dead) => Liveness::Dead,
            (Liveness::Live, Liveness::Live) => Liveness::Live,
            _ => Liveness::Unknown,
        }
    }

    pub(crate) fn is_dead(self) -> bool {
        self == Liveness::Dead
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MacroState {
    /// Object-like macro and its replacement text
    Object(String),
    Function,
    /// Defined or undefined in a branch that could not be evaluated
    Unknown,
}

/// Macros visible to `#if` evaluation, shared across included sources.
#[derive(Debug, Clone, Default)]
pub(crate) struct MacroTable {
    macros: FxHashMap<String, MacroState>,
}

/// Replacement text is re-evaluated at most this deep.
const MAX_MACRO_NESTING: usize = 16;

impl MacroTable {
    /// A table holding the definitions passed with the compile options.
    pub(crate) fn with_defines(defines: &[(String, String)]) -> Self {
        let macros = defines
            .iter()
            .map(|(name, value)| (name.clone(), MacroState::Object(value.clone())))
            .collect();
        Self { macros }
    }

    /// Records `#define <body>` seen in a region of the given liveness.
    pub(crate) fn define(&mut self, body: &str, liveness: Liveness) {
        let body = body.trim_start();
        let name_len = body
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(body.len());
        let (name, rest) = body.split_at(name_len);
        if name.is_empty() {
            return;
        }

        let state = match liveness {
            Liveness::Dead => return,
            Liveness::Unknown => MacroState::Unknown,
            Liveness::Live if rest.starts_with('(') => MacroState::Function,
            Liveness::Live => MacroState::Object(rest.trim().to_string()),
        };
        self.macros.insert(name.to_string(), state);
    }

    /// Records `#undef <name>` seen in a region of the given liveness.
    pub(crate) fn undefine(&mut self, name: &str, liveness: Liveness) {
        let name = first_identifier(name);
        match liveness {
            Liveness::Dead => {}
            Liveness::Live => {
                self.macros.remove(name);
            }
            Liveness::Unknown => {
                self.macros.insert(name.to_string(), MacroState::Unknown);
            }
        }
    }

    /// `None` when it depends on something this table cannot know.
    pub(crate) fn is_defined(&self, name: &str) -> Option<bool> {
        let name = first_identifier(name);
        match self.macros.get(name) {
            Some(MacroState::Unknown) => None,
            Some(_) => Some(true),
            None if is_builtin(name) => None,
            None => Some(false),
        }
    }

    /// Evaluates an `#if`/`#elif` expression.
    pub(crate) fn evaluate(&self, expression: &str) -> Option<bool> {
        self.value_of(expression, 0).map(|value| value != 0)
    }

    fn value_of(&self, expression: &str, nesting: usize) -> Option<i64> {
        if nesting > MAX_MACRO_NESTING {
            return None;
        }
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens: &tokens,
            position: 0,
            macros: self,
            nesting,
        };
        let value = parser.expression(0).ok()?;
        if parser.position != tokens.len() {
            return None;
        }
        value
    }

    fn identifier_value(&self, name: &str, nesting: usize) -> Option<i64> {
        match self.macros.get(name) {
            Some(MacroState::Object(text)) if !text.is_empty() => self.value_of(text, nesting + 1),
            Some(_) => None,
            None if is_builtin(name) => None,
            // Undefined identifiers are zero in preprocessor arithmetic.
            None => Some(0),
        }
    }
}

/// Macros the engine's preprocessor predefines.
fn is_builtin(name: &str) -> bool {
    name.starts_with("GL_") || name.starts_with("__") || name == "VULKAN"
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn first_identifier(text: &str) -> &str {
    let text = text.trim_start();
    let len = text
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(text.len());
    &text[..len]
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Number(i64),
    Identifier(&'a str),
    Operator(&'static str),
    Open,
    Close,
}

const OPERATORS: [&str; 20] = [
    "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "&", "|", "^",
    "!", "~",
];

fn tokenize(expression: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = expression.trim_start();

    while let Some(c) = rest.chars().next() {
        let len = if c.is_ascii_digit() {
            let len = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
            tokens.push(Token::Number(parse_number(&rest[..len])?));
            len
        } else if is_identifier_char(c) {
            let len = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
            tokens.push(Token::Identifier(&rest[..len]));
            len
        } else if c == '(' {
            tokens.push(Token::Open);
            1
        } else if c == ')' {
            tokens.push(Token::Close);
            1
        } else {
            let operator = OPERATORS.iter().find(|op| rest.starts_with(*op))?;
            tokens.push(Token::Operator(*operator));
            operator.len()
        };
        rest = rest[len..].trim_start();
    }
    Some(tokens)
}

fn parse_number(literal: &str) -> Option<i64> {
    let digits = literal.trim_end_matches(|c: char| c == 'u' || c == 'U');
    let (digits, radix) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };
    i64::from_str_radix(digits, radix).ok()
}

fn binary_precedence(operator: &str) -> Option<u8> {
    Some(match operator {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

/// Raised for expressions that are not well-formed.
#[derive(Debug)]
struct Syntax;

/// Precedence-climbing evaluator. Values are `None` when unknown.
struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    position: usize,
    macros: &'t MacroTable,
    nesting: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn next(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.position)
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Option<i64>, Syntax> {
        let mut lhs = self.unary()?;
        while let Some(Token::Operator(operator)) = self.peek() {
            let Some(precedence) = binary_precedence(operator) else {
                break;
            };
            if precedence <= min_precedence {
                break;
            }
            self.position += 1;
            let rhs = self.expression(precedence)?;
            lhs = apply(operator, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Option<i64>, Syntax> {
        match self.next().ok_or(Syntax)? {
            Token::Number(value) => Ok(Some(*value)),
            Token::Open => {
                let value = self.expression(0)?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(Syntax),
                }
            }
            Token::Operator(operator) => {
                let operand = self.unary()?;
                Ok(match *operator {
                    "!" => operand.map(|v| i64::from(v == 0)),
                    "~" => operand.map(|v| !v),
                    "-" => operand.map(i64::wrapping_neg),
                    "+" => operand,
                    _ => return Err(Syntax),
                })
            }
            Token::Identifier("defined") => {
                let name = match self.next() {
                    Some(Token::Identifier(name)) => *name,
                    Some(Token::Open) => match (self.next(), self.next()) {
                        (Some(Token::Identifier(name)), Some(Token::Close)) => *name,
                        _ => return Err(Syntax),
                    },
                    _ => return Err(Syntax),
                };
                Ok(self.macros.is_defined(name).map(i64::from))
            }
            Token::Identifier(name) => Ok(self.macros.identifier_value(name, self.nesting)),
            Token::Close => Err(Syntax),
        }
    }
}

fn apply(operator: &str, lhs: Option<i64>, rhs: Option<i64>) -> Option<i64> {
    match operator {
        "||" => match (lhs, rhs) {
            (Some(a), _) if a != 0 => Some(1),
            (_, Some(b)) if b != 0 => Some(1),
            (Some(_), Some(_)) => Some(0),
            _ => None,
        },
        "&&" => match (lhs, rhs) {
            (Some(0), _) | (_, Some(0)) => Some(0),
            (Some(_), Some(_)) => Some(1),
            _ => None,
        },
        _ => {
            let (a, b) = (lhs?, rhs?);
            match operator {
                "|" => Some(a | b),
                "^" => Some(a ^ b),
                "&" => Some(a & b),
                "==" => Some(i64::from(a == b)),
                "!=" => Some(i64::from(a != b)),
                "<" => Some(i64::from(a < b)),
                ">" => Some(i64::from(a > b)),
                "<=" => Some(i64::from(a <= b)),
                ">=" => Some(i64::from(a >= b)),
                "<<" => Some(a.wrapping_shl(u32::try_from(b).ok()?)),
                ">>" => Some(a.wrapping_shr(u32::try_from(b).ok()?)),
                "+" => Some(a.wrapping_add(b)),
                "-" => Some(a.wrapping_sub(b)),
                "*" => Some(a.wrapping_mul(b)),
                "/" => a.checked_div(b),
                "%" => a.checked_rem(b),
                _ => None,
            }
        }
    }
}

#[derive(Debug)]
struct Frame {
    enclosing: Liveness,
    branch: Liveness,
    /// Whether an earlier branch of this group was taken
    taken: Liveness,
    seen_else: bool,
    line: u32,
}

/// The `#if` nesting of one source.
#[derive(Debug, Default)]
pub(crate) struct Conditionals {
    frames: Vec<Frame>,
}

impl Conditionals {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn liveness(&self) -> Liveness {
        self.frames
            .last()
            .map_or(Liveness::Live, |frame| frame.enclosing.and(frame.branch))
    }

    /// Opens a group for `#if`, `#ifdef` or `#ifndef` on `line`.
    pub(crate) fn open(&mut self, condition: Option<bool>, line: u32) {
        let branch = Liveness::from_condition(condition);
        self.frames.push(Frame {
            enclosing: self.liveness(),
            branch,
            taken: branch,
            seen_else: false,
            line,
        });
    }

    pub(crate) fn elif(&mut self, condition: Option<bool>) -> Result<(), &'static str> {
        let frame = self.frames.last_mut().ok_or("#elif without #if")?;
        if frame.seen_else {
            return Err("#elif after #else");
        }
        frame.branch = match frame.taken {
            Liveness::Live => Liveness::Dead,
            Liveness::Dead => Liveness::from_condition(condition),
            Liveness::Unknown if condition == Some(false) => Liveness::Dead,
            Liveness::Unknown => Liveness::Unknown,
        };
        frame.taken = match (frame.taken, frame.branch) {
            (Liveness::Live, _) | (_, Liveness::Live) => Liveness::Live,
            (Liveness::Dead, Liveness::Dead) => Liveness::Dead,
            _ => Liveness::Unknown,
        };
        Ok(())
    }

    pub(crate) fn otherwise(&mut self) -> Result<(), &'static str> {
        let frame = self.frames.last_mut().ok_or("#else without #if")?;
        if frame.seen_else {
            return Err("#else after #else");
        }
        frame.seen_else = true;
        frame.branch = match frame.taken {
            Liveness::Live => Liveness::Dead,
            Liveness::Dead => Liveness::Live,
            Liveness::Unknown => Liveness::Unknown,
        };
        frame.taken = Liveness::Live;
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<(), &'static str> {
        self.frames.pop().map(|_| ()).ok_or("#endif without #if")
    }

    /// Line of the innermost group still open, if any.
    pub(crate) fn unterminated(&self) -> Option<u32> {
        self.frames.last().map(|frame| frame.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MacroTable {
        let mut table = MacroTable::with_defines(&[("FROM_OPTIONS".to_string(), "2".to_string())]);
        table.define("ONE 1", Liveness::Live);
        table.define("EMPTY", Liveness::Live);
        table.define("TWICE(x) ((x) * 2)", Liveness::Live);
        table.define("ALIAS ONE + FROM_OPTIONS", Liveness::Live);
        table
    }

    #[test]
    fn test_evaluates_arithmetic_and_logic() {
        let table = table();
        assert_eq!(table.evaluate("0"), Some(false));
        assert_eq!(table.evaluate("1"), Some(true));
        assert_eq!(table.evaluate("(2 + 3) * 4 == 20"), Some(true));
        assert_eq!(table.evaluate("0x10 >> 4 && !0"), Some(true));
        assert_eq!(table.evaluate("1 - 1 || 010 != 8"), Some(false));
        assert_eq!(table.evaluate("1 / 0"), None);
    }

    #[test]
    fn test_evaluates_macros() {
        let table = table();
        assert_eq!(table.evaluate("ONE"), Some(true));
        assert_eq!(table.evaluate("ALIAS == 3"), Some(true));
        assert_eq!(table.evaluate("NEVER_DEFINED"), Some(false));
        assert_eq!(table.evaluate("defined(EMPTY) && defined ONE"), Some(true));
        assert_eq!(table.evaluate("!defined(NEVER_DEFINED)"), Some(true));
    }

    #[test]
    fn test_unknowable_conditions() {
        let table = table();
        assert_eq!(table.evaluate("__VERSION__ >= 450"), None);
        assert_eq!(table.evaluate("TWICE(2)"), None);
        assert_eq!(table.evaluate("EMPTY"), None);
        assert_eq!(table.is_defined("GL_core_profile"), None);
        // A known operand still decides the result of a logical operator.
        assert_eq!(table.evaluate("0 && __VERSION__"), Some(false));
        assert_eq!(table.evaluate("ONE || __VERSION__"), Some(true));
    }

    #[test]
    fn test_self_referencing_macro_is_unknown() {
        let mut table = MacroTable::default();
        table.define("LOOP LOOP + 1", Liveness::Live);
        assert_eq!(table.evaluate("LOOP"), None);
    }

    #[test]
    fn test_definitions_follow_liveness() {
        let mut table = MacroTable::default();
        table.define("SKIPPED 1", Liveness::Dead);
        table.define("MAYBE 1", Liveness::Unknown);
        assert_eq!(table.is_defined("SKIPPED"), Some(false));
        assert_eq!(table.is_defined("MAYBE"), None);

        table.define("GONE 1", Liveness::Live);
        table.undefine("GONE", Liveness::Live);
        assert_eq!(table.is_defined("GONE"), Some(false));
    }

    #[test]
    fn test_if_elif_else_branches() {
        let mut conditionals = Conditionals::new();
        conditionals.open(Some(false), 1);
        assert_eq!(conditionals.liveness(), Liveness::Dead);
        conditionals.elif(Some(true)).unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Live);
        conditionals.elif(Some(true)).unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Dead);
        conditionals.otherwise().unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Dead);
        conditionals.close().unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Live);
        assert_eq!(conditionals.unterminated(), None);
    }

    #[test]
    fn test_nested_groups_inherit_dead_regions() {
        let mut conditionals = Conditionals::new();
        conditionals.open(Some(false), 1);
        conditionals.open(Some(true), 2);
        assert_eq!(conditionals.liveness(), Liveness::Dead);
        conditionals.otherwise().unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Dead);
        assert_eq!(conditionals.unterminated(), Some(2));
    }

    #[test]
    fn test_unknown_branch_keeps_else_unknown() {
        let mut conditionals = Conditionals::new();
        conditionals.open(None, 1);
        assert_eq!(conditionals.liveness(), Liveness::Unknown);
        conditionals.otherwise().unwrap();
        assert_eq!(conditionals.liveness(), Liveness::Unknown);
    }

    #[test]
    fn test_unbalanced_directives() {
        let mut conditionals = Conditionals::new();
        assert!(conditionals.close().is_err());
        assert!(conditionals.otherwise().is_err());
        assert!(conditionals.elif(Some(true)).is_err());

        conditionals.open(Some(true), 1);
        conditionals.otherwise().unwrap();
        assert!(conditionals.otherwise().is_err());
        assert!(conditionals.elif(Some(true)).is_err());
    }
}
