//! Natural-language step definitions.
//!
//! A thin adapter between Given/When/Then sentences and core steps: handlers
//! register under a pattern with `{string}`, `{int}`, and `{word}`
//! placeholders, and the registry expands a literal sentence into the steps
//! its matching handler produces. Parsing feature-file grammar is out of
//! scope; callers hand the registry plain sentences.

use regex::Regex;

use crate::error::{HarnessError, HarnessResult};
use crate::scenario::Step;

/// A typed placeholder value extracted from a sentence
#[derive(Debug, Clone, PartialEq)]
pub enum StepArg {
    Str(String),
    Int(i64),
    Word(String),
}

impl StepArg {
    pub fn as_str(&self) -> &str {
        match self {
            StepArg::Str(s) | StepArg::Word(s) => s,
            StepArg::Int(_) => "",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StepArg::Int(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamKind {
    Str,
    Int,
    Word,
}

type Handler = Box<dyn Fn(&[StepArg]) -> HarnessResult<Vec<Step>> + Send + Sync>;

struct Definition {
    pattern: String,
    regex: Regex,
    params: Vec<ParamKind>,
    handler: Handler,
}

/// Registry of step definitions
#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<Definition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a placeholder pattern, e.g.
    /// `I sign in as {string} with password {string}`.
    pub fn register<F>(&mut self, pattern: &str, handler: F) -> HarnessResult<()>
    where
        F: Fn(&[StepArg]) -> HarnessResult<Vec<Step>> + Send + Sync + 'static,
    {
        if self.definitions.iter().any(|d| d.pattern == pattern) {
            return Err(HarnessError::SuiteParse(format!(
                "step pattern already registered: {pattern}"
            )));
        }

        let (regex, params) = compile_pattern(pattern)?;
        self.definitions.push(Definition {
            pattern: pattern.to_string(),
            regex,
            params,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Expand one sentence through its single matching definition
    pub fn resolve(&self, sentence: &str) -> HarnessResult<Vec<Step>> {
        let mut matches = self
            .definitions
            .iter()
            .filter(|d| d.regex.is_match(sentence));

        let definition = matches.next().ok_or_else(|| {
            HarnessError::SuiteParse(format!("no step definition matches: {sentence}"))
        })?;
        if let Some(other) = matches.next() {
            return Err(HarnessError::SuiteParse(format!(
                "ambiguous sentence '{sentence}': matches '{}' and '{}'",
                definition.pattern, other.pattern
            )));
        }

        let captures = definition
            .regex
            .captures(sentence)
            .expect("is_match implies captures");
        let mut args = Vec::with_capacity(definition.params.len());
        for (i, kind) in definition.params.iter().enumerate() {
            let raw = captures.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
            let arg = match kind {
                ParamKind::Str => StepArg::Str(raw.to_string()),
                ParamKind::Word => StepArg::Word(raw.to_string()),
                ParamKind::Int => StepArg::Int(raw.parse::<i64>().map_err(|_| {
                    HarnessError::SuiteParse(format!("'{raw}' is not an integer in: {sentence}"))
                })?),
            };
            args.push(arg);
        }

        (definition.handler)(&args)
    }

    /// Expand a whole scenario written as sentences
    pub fn compile<S: AsRef<str>>(&self, sentences: &[S]) -> HarnessResult<Vec<Step>> {
        let mut steps = Vec::new();
        for sentence in sentences {
            steps.extend(self.resolve(sentence.as_ref())?);
        }
        Ok(steps)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Compile a placeholder pattern into an anchored regex and its parameter
/// kinds. `{string}` matches a double-quoted literal; `{int}` a signed
/// integer; `{word}` a bare token.
fn compile_pattern(pattern: &str) -> HarnessResult<(Regex, Vec<ParamKind>)> {
    let mut source = String::from("^");
    let mut params = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        let close = rest[open..].find('}').ok_or_else(|| {
            HarnessError::SuiteParse(format!("unclosed placeholder in pattern: {pattern}"))
        })? + open;

        source.push_str(&regex::escape(&rest[..open]));
        match &rest[open + 1..close] {
            "string" => {
                source.push_str("\"([^\"]*)\"");
                params.push(ParamKind::Str);
            }
            "int" => {
                source.push_str("(-?\\d+)");
                params.push(ParamKind::Int);
            }
            "word" => {
                source.push_str("(\\S+)");
                params.push(ParamKind::Word);
            }
            other => {
                return Err(HarnessError::SuiteParse(format!(
                    "unknown placeholder '{{{other}}}' in pattern: {pattern}"
                )))
            }
        }
        rest = &rest[close + 1..];
    }
    source.push_str(&regex::escape(rest));
    source.push('$');

    let regex = Regex::new(&source)
        .map_err(|e| HarnessError::SuiteParse(format!("bad pattern '{pattern}': {e}")))?;
    Ok((regex, params))
}
