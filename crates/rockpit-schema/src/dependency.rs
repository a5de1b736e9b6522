use crate::types::RockName;
use crate::version::RockVersion;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid dependency specifier '{specifier}': {reason}")]
    Specifier { specifier: String, reason: String },
    #[error("invalid version '{0}'")]
    Version(String),
}

impl ParseError {
    fn specifier(specifier: &str, reason: impl Into<String>) -> Self {
        Self::Specifier {
            specifier: specifier.to_owned(),
            reason: reason.into(),
        }
    }

    /// The offending input, verbatim.
    pub fn input(&self) -> &str {
        match self {
            Self::Specifier { specifier, .. } => specifier,
            Self::Version(version) => version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
    /// `~>`: matches versions sharing the constraint's leading segments.
    Pessimistic,
}

impl Operator {
    // Longest tokens first so `>=` is not read as `>`.
    const TOKENS: [(&'static str, Operator); 8] = [
        ("==", Operator::Eq),
        ("~=", Operator::Ne),
        ("~>", Operator::Pessimistic),
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("=", Operator::Eq),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Pessimistic => "~>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Operator,
    pub version: RockVersion,
}

impl Constraint {
    pub fn matches(&self, candidate: &RockVersion) -> bool {
        match self.op {
            Operator::Eq => candidate == &self.version,
            Operator::Ne => candidate != &self.version,
            Operator::Ge => candidate >= &self.version,
            Operator::Gt => candidate > &self.version,
            Operator::Le => candidate <= &self.version,
            Operator::Lt => candidate < &self.version,
            Operator::Pessimistic => candidate.has_prefix(&self.version),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.version)
    }
}

/// A parsed dependency specifier: a rock name plus zero or more
/// comma-separated version constraints, all of which must hold.
///
/// Accepted forms: `foo`, `foo >= 1.2`, `foo >= 1.0, < 2.0`, `foo ~> 3.1`,
/// and `foo 1.2` (a bare version means `==`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: RockName,
    pub constraints: Vec<Constraint>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl DependencySpec {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        let name_len = trimmed
            .find(|c: char| c.is_whitespace() || "=~<>,".contains(c))
            .unwrap_or(trimmed.len());
        let (name, rest) = trimmed.split_at(name_len);

        if name.is_empty() {
            return Err(ParseError::specifier(input, "missing rock name"));
        }
        if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(ParseError::specifier(
                input,
                format!("unexpected character '{bad}' in rock name"),
            ));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ParseError::specifier(
                input,
                "rock name must start with a letter or digit",
            ));
        }

        let rest = rest.trim();
        let mut constraints = Vec::new();
        if !rest.is_empty() {
            for part in rest.split(',') {
                constraints.push(parse_constraint(input, part.trim())?);
            }
        }

        Ok(Self {
            name: RockName::new(name.to_ascii_lowercase()),
            constraints,
        })
    }

    pub fn matches(&self, version: &RockVersion) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Convenience for version strings that may not parse; those never match
    /// a constrained specifier.
    pub fn matches_str(&self, version: &str) -> bool {
        if self.constraints.is_empty() {
            return true;
        }
        RockVersion::parse(version).is_ok_and(|v| self.matches(&v))
    }
}

fn parse_constraint(input: &str, part: &str) -> Result<Constraint, ParseError> {
    if part.is_empty() {
        return Err(ParseError::specifier(input, "empty version constraint"));
    }
    let (op, version) = Operator::TOKENS
        .iter()
        .find_map(|(token, op)| part.strip_prefix(token).map(|v| (*op, v.trim())))
        .unwrap_or((Operator::Eq, part));

    if version.is_empty() {
        return Err(ParseError::specifier(
            input,
            format!("operator '{}' has no version", op.as_str()),
        ));
    }
    let version = RockVersion::parse(version)
        .map_err(|_| ParseError::specifier(input, format!("invalid version '{version}'")))?;
    Ok(Constraint { op, version })
}

impl FromStr for DependencySpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{constraint}")?;
        }
        Ok(())
    }
}
