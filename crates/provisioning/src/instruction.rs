//! Touchpoint instruction parsing
//!
//! An instruction body is a `;`-separated list of statements of the form
//! `name(key:value, key:value)`. Names may be qualified with a touchpoint
//! namespace (`native.mkdir`). Values may reference string parameters as
//! `${name}`; references are expanded when the action runs.

use crate::error::{Error, Result};
use crate::parameters::Parameters;
use regex::Regex;
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is valid"));

/// One parsed statement of an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl Statement {
    /// Split `ns.name` into namespace and local name
    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace().is_some()
    }
}

/// Parse an instruction body into statements
pub fn parse(body: &str) -> Result<Vec<Statement>> {
    split_statements(body)?
        .into_iter()
        .map(parse_statement)
        .collect()
}

/// Split on `;` outside of parentheses
fn split_statements(body: &str) -> Result<Vec<&str>> {
    let mut statements = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::syntax(body.trim(), "unbalanced ')'"))?;
            }
            ';' if depth == 0 => {
                statements.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::syntax(body.trim(), "missing ')'"));
    }
    statements.push(&body[start..]);

    Ok(statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect())
}

fn parse_statement(statement: &str) -> Result<Statement> {
    let open = statement
        .find('(')
        .ok_or_else(|| Error::syntax(statement, "expected '('"))?;
    if !statement.ends_with(')') {
        return Err(Error::syntax(statement, "expected ')' at end of statement"));
    }

    let name = statement[..open].trim();
    if name.is_empty() {
        return Err(Error::syntax(statement, "missing action name"));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(Error::syntax(statement, "invalid action name"));
    }

    let inner = &statement[open + 1..statement.len() - 1];
    let mut args = Vec::new();
    for arg in inner.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let (key, value) = arg
            .split_once(':')
            .ok_or_else(|| Error::syntax(statement, format!("argument '{arg}' is not key:value")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::syntax(statement, "empty argument name"));
        }
        args.push((key.to_string(), value.trim().to_string()));
    }

    Ok(Statement {
        name: name.to_string(),
        args,
    })
}

/// Expand `${name}` references against string parameters
///
/// Unknown references are left in place.
pub fn expand_variables(value: &str, params: &Parameters) -> String {
    VARIABLE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            params
                .get_str(&caps[1])
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}
