//! Keystroke policy for node data: a short numeric-looking token, kept as text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_DATA_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
}

impl FromStr for Key {
    type Err = String;

    /// Accepts DOM-style key names: `Backspace`, `Delete`, or a single character.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Backspace" => Ok(Key::Backspace),
            "Delete" => Ok(Key::Delete),
            _ => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Key::Char(ch)),
                    _ => Err(format!("unsupported key '{value}'")),
                }
            }
        }
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(ch) => write!(f, "{ch}"),
            Key::Backspace => f.write_str("Backspace"),
            Key::Delete => f.write_str("Delete"),
        }
    }
}

/// The data string after `key`, or `None` when the keystroke is not accepted.
pub fn apply_key(current: &str, key: Key) -> Option<String> {
    let ch = match key {
        Key::Backspace | Key::Delete => return Some(String::new()),
        Key::Char(ch) => ch,
    };
    if current.chars().count() >= MAX_DATA_LEN {
        return None;
    }

    let accepted = match ch {
        '0'..='9' => true,
        '-' => current.is_empty(),
        '.' => !current.contains('.'),
        _ => false,
    };
    accepted.then(|| format!("{current}{ch}"))
}

/// Whether `data` could have been typed under [`apply_key`].
pub fn is_well_formed(data: &str) -> bool {
    let mut typed = String::new();
    for ch in data.chars() {
        match apply_key(&typed, Key::Char(ch)) {
            Some(next) => typed = next,
            None => return false,
        }
    }
    true
}
