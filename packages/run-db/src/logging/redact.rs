use std::fmt;

pub const REDACTED: &str = "[REDACTED]";

/// A wrapper that never prints the secret it holds.
///
/// Used for passwords in `Debug` output and log fields. An empty secret is
/// shown as empty so a missing password is still visible when debugging.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "{REDACTED}")
        }
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
