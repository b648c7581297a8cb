//! Template name conventions
//!
//! Controllers address views as `group/action`. The action segment is
//! case-normalized before lookup so `user/getUserInfo` can live on disk as
//! `user/get_user_info.hbs`.

use std::path::MAIN_SEPARATOR;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("valid regex"));

/// How the action segment of a template name is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRule {
    /// `getUserInfo` -> `get_user_info`
    #[default]
    SnakeCase,
    /// `GetUserInfo` -> `getuserinfo`
    Lowercase,
    /// Leave the name alone
    Preserve,
}

impl AutoRule {
    /// Interpret the `auto_rule` option (1, 2 or 3)
    ///
    /// Missing or null means [`AutoRule::SnakeCase`]. Anything that is not
    /// one of the integers 1, 2 or 3 leaves names untouched.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::SnakeCase,
            Some(value) => match value.as_i64() {
                Some(1) => Self::SnakeCase,
                Some(2) => Self::Lowercase,
                _ => Self::Preserve,
            },
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::SnakeCase => 1,
            Self::Lowercase => 2,
            Self::Preserve => 3,
        }
    }

    fn apply(&self, action: &str) -> String {
        match self {
            Self::SnakeCase => camel_to_snake(action),
            Self::Lowercase => action.to_ascii_lowercase(),
            Self::Preserve => action.to_string(),
        }
    }
}

/// Insert `_` before every ASCII capital except a leading one, then lowercase
pub fn camel_to_snake(s: &str) -> String {
    UPPERCASE
        .replace_all(s, |caps: &Captures| match caps.get(0) {
            Some(m) if m.start() > 0 => format!("_{}", m.as_str()),
            Some(m) => m.as_str().to_string(),
            None => String::new(),
        })
        .to_ascii_lowercase()
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Apply the naming convention to a template identifier
///
/// Only identifiers containing a path separator are rewritten; the group
/// prefix is kept as-is and the result always uses `/`.
pub fn transform_template_name(template: &str, rule: AutoRule) -> String {
    debug!(%template, ?rule, "transform_template_name: called");
    if rule == AutoRule::Preserve || !template.contains(is_separator) {
        return template.to_string();
    }

    let normalized = template.replace(MAIN_SEPARATOR, "/");
    let (prefix, action) = normalized.rsplit_once('/').unwrap_or(("", normalized.as_str()));
    let transformed = format!("{}/{}", prefix, rule.apply(action));
    debug!(%transformed, "transform_template_name: rewritten");
    transformed
}
