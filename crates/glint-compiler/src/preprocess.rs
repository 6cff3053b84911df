//! Include expansion ahead of the engine's own preprocessor.
//!
//! The engine only sees a single string, so `#include` directives are
//! spliced in here. Every line of the expanded text remembers where it came
//! from, which lets diagnostics name the user's file and line instead of a
//! position inside the expanded text.
//!
//! Directives are only recognized outside comments. Includes in `#if`
//! branches that are known to be skipped are left out, so the expander
//! tracks `#define`, `#undef` and conditional nesting as it goes.
//!
//! Expansion also:
//! - consumes the `#extension` lines that enable include support
//! - inserts `#version 450` when the root source declares no version
//! - reports `#error` in live code and unbalanced conditionals
//! - notices translation units with no declarations at all

use crate::conditional::{Conditionals, Liveness, MacroTable};
use crate::error::ShaderDiagnostic;
use glint_source::{IncludeError, IncludeKind, IncludeRequest, IncludeResolver};

/// Version directive inserted when the root source has none.
pub const DEFAULT_VERSION_DIRECTIVE: &str = "#version 450";

const INCLUDE_EXTENSIONS: [&str; 2] = [
    "GL_GOOGLE_include_directive",
    "GL_ARB_shading_language_include",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineOrigin {
    source: usize,
    line: u32,
}

/// Shader text after include expansion, with a per-line origin map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    text: String,
    line_starts: Vec<usize>,
    origins: Vec<Option<LineOrigin>>,
    sources: Vec<String>,
    blank: bool,
}

impl TranslationUnit {
    /// Expands `source` into a translation unit.
    ///
    /// `resolver` serves `#include` directives; without one any include is an
    /// error. Includes nested deeper than `max_depth` are rejected, which also
    /// stops include cycles. `defines` are visible to `#if` conditions.
    pub fn expand(
        root_name: &str,
        source: &str,
        resolver: Option<&dyn IncludeResolver>,
        defines: &[(String, String)],
        max_depth: usize,
    ) -> Result<Self, ShaderDiagnostic> {
        let mut expander = Expander {
            resolver,
            max_depth,
            macros: MacroTable::with_defines(defines),
            unit: TranslationUnit {
                text: String::with_capacity(source.len() + DEFAULT_VERSION_DIRECTIVE.len() + 1),
                line_starts: Vec::new(),
                origins: Vec::new(),
                sources: Vec::new(),
                blank: false,
            },
        };

        if !has_version_directive(source) {
            expander.push_line(DEFAULT_VERSION_DIRECTIVE, None);
        }

        let root = expander.add_source(root_name);
        expander.expand_source(root, source, 0)?;

        let mut unit = expander.unit;
        unit.blank = is_blank(&unit.text);
        log::debug!(
            "expanded '{}' into {} lines from {} sources",
            root_name,
            unit.line_starts.len(),
            unit.sources.len()
        );
        Ok(unit)
    }

    /// The expanded text handed to the engine.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True if the unit has nothing but whitespace, comments and directives.
    ///
    /// Such a unit declares no entry point. Engines still have to check its
    /// directives.
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Name of the root source.
    pub fn root_name(&self) -> &str {
        &self.sources[0]
    }

    /// Every source spliced into the unit, the root first.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Maps a byte offset in [`text`](Self::text) to its source name and 1-based line.
    ///
    /// Returns `None` for offsets past the end and for synthesized lines.
    pub fn locate(&self, offset: usize) -> Option<(&str, u32)> {
        if offset > self.text.len() {
            return None;
        }
        let index = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .checked_sub(1)?;
        let origin = self.origins.get(index).copied().flatten()?;
        Some((self.sources[origin.source].as_str(), origin.line))
    }

    /// Builds a diagnostic for the engine error at `offset`, falling back
    /// to the root source when the offset has no origin.
    pub fn diagnostic_at(&self, offset: Option<usize>, message: impl Into<String>) -> ShaderDiagnostic {
        match offset.and_then(|offset| self.locate(offset)) {
            Some((source, line)) => ShaderDiagnostic::new(source, Some(line), message),
            None => ShaderDiagnostic::new(self.root_name(), None, message),
        }
    }
}

struct Expander<'r> {
    resolver: Option<&'r dyn IncludeResolver>,
    max_depth: usize,
    macros: MacroTable,
    unit: TranslationUnit,
}

impl<'r> Expander<'r> {
    fn add_source(&mut self, name: &str) -> usize {
        match self.unit.sources.iter().position(|known| known == name) {
            Some(index) => index,
            None => {
                self.unit.sources.push(name.to_string());
                self.unit.sources.len() - 1
            }
        }
    }

    fn push_line(&mut self, line: &str, origin: Option<LineOrigin>) {
        self.unit.line_starts.push(self.unit.text.len());
        self.unit.origins.push(origin);
        self.unit.text.push_str(line);
        self.unit.text.push('\n');
    }

    fn expand_source(&mut self, source: usize, text: &str, depth: usize) -> Result<(), ShaderDiagnostic> {
        let mut comments = CommentScanner::default();
        let mut conditionals = Conditionals::new();
        let mut last_line = 0;

        for (index, line) in text.lines().enumerate() {
            let origin = LineOrigin {
                source,
                line: u32::try_from(index + 1).unwrap_or(u32::MAX),
            };
            last_line = origin.line;

            // A `#` following the end of a multi-line comment is not at the
            // start of a line.
            let continues_comment = comments.in_comment();
            let code = comments.strip(line);
            let directive = if continues_comment {
                None
            } else {
                parse_directive(&code)
            };
            let liveness = conditionals.liveness();

            match directive {
                None => self.push_line(line, Some(origin)),
                Some(Directive::Include { target, kind }) if !liveness.is_dead() => {
                    self.include(target, kind, origin, depth)?;
                    if comments.in_comment() {
                        self.push_line("/*", Some(origin));
                    }
                }
                Some(Directive::Malformed(reason)) if !liveness.is_dead() => {
                    return Err(self.error_at(origin, IncludeError::Malformed(reason)));
                }
                Some(Directive::Include { .. } | Directive::Malformed(_) | Directive::IncludeExtension) => {
                    self.push_line(comments.placeholder(), Some(origin));
                }
                Some(Directive::Error(message)) if liveness == Liveness::Live => {
                    return Err(self.fail(origin, format!("#error {message}").trim_end()));
                }
                Some(directive) => {
                    self.track(&directive, liveness, &mut conditionals, origin.line)
                        .map_err(|message| self.fail(origin, message))?;
                    self.push_line(line, Some(origin));
                }
            }
        }

        if let Some(line) = conditionals.unterminated() {
            return Err(self.fail(LineOrigin { source, line }, "unterminated conditional directive"));
        }
        if depth > 0 && comments.in_comment() {
            return Err(self.fail(
                LineOrigin { source, line: last_line },
                "unterminated comment at end of included file",
            ));
        }
        Ok(())
    }

    /// Applies a macro or conditional directive to the expansion state.
    fn track(
        &mut self,
        directive: &Directive<'_>,
        liveness: Liveness,
        conditionals: &mut Conditionals,
        line: u32,
    ) -> Result<(), &'static str> {
        match *directive {
            Directive::Define(body) => self.macros.define(body, liveness),
            Directive::Undef(name) => self.macros.undefine(name, liveness),
            Directive::If(expression) => conditionals.open(self.macros.evaluate(expression), line),
            Directive::Ifdef(name) => conditionals.open(self.macros.is_defined(name), line),
            Directive::Ifndef(name) => {
                conditionals.open(self.macros.is_defined(name).map(|defined| !defined), line)
            }
            Directive::Elif(expression) => conditionals.elif(self.macros.evaluate(expression))?,
            Directive::Else => conditionals.otherwise()?,
            Directive::Endif => conditionals.close()?,
            Directive::Include { .. }
            | Directive::IncludeExtension
            | Directive::Malformed(_)
            | Directive::Error(_) => {}
        }
        Ok(())
    }

    fn include(
        &mut self,
        target: &str,
        kind: IncludeKind,
        origin: LineOrigin,
        depth: usize,
    ) -> Result<(), ShaderDiagnostic> {
        let resolver = self
            .resolver
            .ok_or_else(|| self.error_at(origin, IncludeError::NoResolver(target.to_string())))?;

        if depth + 1 > self.max_depth {
            return Err(self.error_at(
                origin,
                IncludeError::DepthExceeded {
                    target: target.to_string(),
                    limit: self.max_depth,
                },
            ));
        }

        let requesting_source = self.unit.sources[origin.source].clone();
        let request = IncludeRequest {
            target,
            kind,
            requesting_source: &requesting_source,
            depth: depth + 1,
        };
        let resolved = resolver
            .resolve(&request)
            .map_err(|err| self.error_at(origin, err))?;

        log::debug!(
            "including '{}' from {}:{} (depth {})",
            resolved.name,
            requesting_source,
            origin.line,
            depth + 1
        );

        let source = self.add_source(&resolved.name);
        self.expand_source(source, &resolved.content, depth + 1)
    }

    fn error_at(&self, origin: LineOrigin, err: IncludeError) -> ShaderDiagnostic {
        self.fail(origin, err.to_string())
    }

    fn fail(&self, origin: LineOrigin, message: impl Into<String>) -> ShaderDiagnostic {
        ShaderDiagnostic::new(
            self.unit.sources[origin.source].as_str(),
            Some(origin.line),
            message,
        )
    }
}

/// Tracks block comments across the lines of one source.
#[derive(Debug, Default)]
struct CommentScanner {
    in_block: bool,
}

impl CommentScanner {
    fn in_comment(&self) -> bool {
        self.in_block
    }

    /// Returns the code on `line`, each comment replaced by a space.
    fn strip(&mut self, line: &str) -> String {
        let mut code = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        let mut in_quotes = false;

        while let Some(c) = chars.next() {
            if self.in_block {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block = false;
                }
                continue;
            }
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    code.push(c);
                }
                '/' if !in_quotes && chars.peek() == Some(&'/') => break,
                '/' if !in_quotes && chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block = true;
                    code.push(' ');
                }
                _ => code.push(c),
            }
        }
        code
    }

    /// Stands in for a consumed directive line, keeping an open comment open.
    fn placeholder(&self) -> &'static str {
        if self.in_block {
            "/*"
        } else {
            ""
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Include { target: &'a str, kind: IncludeKind },
    IncludeExtension,
    Malformed(String),
    Define(&'a str),
    Undef(&'a str),
    If(&'a str),
    Ifdef(&'a str),
    Ifndef(&'a str),
    Elif(&'a str),
    Else,
    Endif,
    Error(&'a str),
}

fn directive_body(line: &str) -> Option<&str> {
    Some(line.trim_start().strip_prefix('#')?.trim_start())
}

/// Strips `keyword` from the front of a directive body, requiring a word boundary after it.
fn strip_keyword<'a>(body: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = body.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let body = directive_body(line)?;
    let keyword_len = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let (keyword, rest) = body.split_at(keyword_len);

    Some(match keyword {
        "include" => parse_include(rest.trim_start()),
        "extension" => {
            let name = rest.trim_start().split(|c: char| c.is_whitespace() || c == ':').next()?;
            if !INCLUDE_EXTENSIONS.contains(&name) {
                return None;
            }
            Directive::IncludeExtension
        }
        "define" => Directive::Define(rest),
        "undef" => Directive::Undef(rest),
        "if" => Directive::If(rest),
        "ifdef" => Directive::Ifdef(rest),
        "ifndef" => Directive::Ifndef(rest),
        "elif" => Directive::Elif(rest),
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        "error" => Directive::Error(rest.trim()),
        _ => return None,
    })
}

fn parse_include(rest: &str) -> Directive<'_> {
    let (kind, close) = match rest.chars().next() {
        Some('"') => (IncludeKind::Relative, '"'),
        Some('<') => (IncludeKind::Standard, '>'),
        _ => return Directive::Malformed("expected \"file\" or <file>".to_string()),
    };

    let body = &rest[1..];
    let Some(end) = body.find(close) else {
        return Directive::Malformed(format!("missing closing '{close}'"));
    };

    let target = &body[..end];
    if target.is_empty() {
        return Directive::Malformed("empty file name".to_string());
    }

    let trailing = body[end + 1..].trim();
    if !trailing.is_empty() && !trailing.starts_with("//") {
        return Directive::Malformed(format!("unexpected text after file name: {trailing}"));
    }

    Directive::Include { target, kind }
}

fn has_version_directive(source: &str) -> bool {
    let mut comments = CommentScanner::default();
    source.lines().any(|line| {
        let continues_comment = comments.in_comment();
        let code = comments.strip(line);
        !continues_comment
            && directive_body(&code).is_some_and(|body| strip_keyword(body, "version").is_some())
    })
}

/// True if `text` contains only whitespace, comments and preprocessor lines.
fn is_blank(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '\n' => at_line_start = true,
            c if c.is_whitespace() => {}
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                at_line_start = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        at_line_start = true;
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '#' if at_line_start => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                at_line_start = true;
            }
            _ => return false,
        }
    }
    true
}
