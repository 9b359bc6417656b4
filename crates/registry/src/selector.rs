//! Advice selection by include/exclude name patterns.

use regex::Regex;
use weft_core::{Advice, AdviceInstance, OperationDef, PointcutRules};

/// Errors raised when compiling selection rules.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// Pattern could not be compiled
    #[error("Invalid pointcut pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Compiler error
        #[source]
        source: regex::Error,
    },
}

/// Compiled [`PointcutRules`].
#[derive(Debug, Clone)]
pub struct PointcutSelector {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PointcutSelector {
    /// Selector that keeps everything.
    pub fn any() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Compile rules.
    ///
    /// Patterns are wildcards (`*` within a dotted segment, `**` across
    /// segments, `?` for one character) unless prefixed with `re:`, in which
    /// case the rest is a regular expression matched against the whole name.
    pub fn compile(rules: &PointcutRules) -> Result<Self, SelectorError> {
        Ok(Self {
            include: rules.include.iter().map(|p| compile_pattern(p)).collect::<Result<_, _>>()?,
            exclude: rules.exclude.iter().map(|p| compile_pattern(p)).collect::<Result<_, _>>()?,
        })
    }

    /// Whether `name` is selected.
    pub fn select(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|r| r.is_match(name));
        included && !self.exclude.iter().any(|r| r.is_match(name))
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, SelectorError> {
    let source = match pattern.strip_prefix("re:") {
        Some(raw) => format!("^(?:{raw})$"),
        None => wildcard_to_regex(pattern),
    };
    Regex::new(&source).map_err(|source| SelectorError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^.]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

/// Keep the advices that apply to `op`.
///
/// Each advice's own rules are matched against the operation's full name;
/// then the operation's local rules are matched against the advice type
/// name. A local exclusion therefore always wins.
pub fn select(op: &OperationDef, advices: Vec<AdviceInstance>) -> Result<Vec<AdviceInstance>, SelectorError> {
    let name = op.id.full_name();
    let local = PointcutSelector::compile(&op.advice_rules)?;

    // replicated instances share one advice; decide once per advice
    let mut decided: Vec<(Advice, bool)> = Vec::new();
    let mut selected = Vec::with_capacity(advices.len());
    for instance in advices {
        let keep = match decided.iter().find(|(a, _)| a.ptr_eq(&instance.advice)) {
            Some((_, keep)) => *keep,
            None => {
                let keep = PointcutSelector::compile(instance.advice.rules())?.select(&name)
                    && local.select(instance.advice.type_name());
                decided.push((instance.advice.clone(), keep));
                keep
            }
        };
        if keep {
            selected.push(instance);
        } else {
            tracing::trace!(operation = %op.id, advice = instance.advice.type_name(), "Advice not selected");
        }
    }
    Ok(selected)
}
