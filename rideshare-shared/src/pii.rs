use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Wraps a phone number or similar contact detail so it never shows up in
/// `Debug`/`Display` output (and therefore never in a tracing field), while
/// still serializing to the real value for outbound provider calls.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(&self.0.to_string()))
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(&self.0.to_string()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

// Keeps the last two characters so log lines stay correlatable.
fn redact(value: &str) -> String {
    let tail: String = value.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
    format!("******{}", tail)
}

/// Phone as shown on a public profile: `+XX-XXXXXX` followed by the last four digits.
pub fn mask_phone(phone: &str) -> String {
    if phone.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = phone.chars().collect();
    let start = chars.len().saturating_sub(4);
    let last_four: String = chars[start..].iter().collect();
    format!("+XX-XXXXXX{}", last_four)
}

/// Display name when the owner asked to hide their full name.
pub fn abbreviate_name(name: &str) -> String {
    match name.chars().next() {
        Some(first) => format!("{}...", first),
        None => String::new(),
    }
}
