use regex::Regex;

use jolt_classfile::{to_binary_name, to_internal_name};

use crate::ProbeError;

/// Selects classes by name.
///
/// * `/regex/` matches the dotted class name (anchored at both ends).
/// * `+Name` matches classes whose direct superclass or interface is `Name`.
/// * anything else is an exact class name in dotted or internal form.
#[derive(Debug, Clone)]
pub enum ClassPattern {
    Exact(String),
    Regex(Regex),
    Subtype(String),
}

impl ClassPattern {
    pub fn parse(pattern: &str) -> Result<Self, ProbeError> {
        let pattern = pattern.trim();
        if let Some(inner) = pattern
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .filter(|inner| !inner.is_empty())
        {
            let regex = Regex::new(&format!("^(?:{inner})$")).map_err(|source| {
                ProbeError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                }
            })?;
            return Ok(ClassPattern::Regex(regex));
        }
        if let Some(parent) = pattern.strip_prefix('+') {
            return Ok(ClassPattern::Subtype(to_internal_name(parent)));
        }
        Ok(ClassPattern::Exact(to_internal_name(pattern)))
    }

    /// `class_name` is in internal form; `supertypes` are the direct
    /// supertypes, also internal form.
    pub fn matches<'a>(
        &self,
        class_name: &str,
        mut supertypes: impl Iterator<Item = &'a str>,
    ) -> bool {
        match self {
            ClassPattern::Exact(name) => name == class_name,
            ClassPattern::Regex(regex) => regex.is_match(&to_binary_name(class_name)),
            ClassPattern::Subtype(parent) => supertypes.any(|s| s == parent),
        }
    }

    /// Subtype patterns need the class's supertypes to be known.
    pub fn needs_supertypes(&self) -> bool {
        matches!(self, ClassPattern::Subtype(_))
    }
}
