//! Recipient addresses and the structural address check.

/// A message recipient: display name plus bare address.
///
/// # Examples
/// - `Recipient::new("Ann Lee", "ann@acme.com").display()` → `"Ann Lee <ann@acme.com>"`
/// - `Recipient::new("", "ann@acme.com").display()` → `"ann@acme.com"`
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct Recipient {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl Recipient {
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Structural address check.
///
/// Accepts `local@domain` where:
/// - there is exactly one `@`
/// - the local part is non-empty
/// - the domain has a `.` with at least one character on each side
/// - nothing contains whitespace
///
/// This is deliberately not RFC 5322: quoted local parts and IP literals are
/// rejected, and the mail server gets the final word on deliverability.
pub fn is_structurally_valid(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = address.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() {
        return false;
    }

    let last = domain.len().saturating_sub(1);
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i < last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name() {
        let r = Recipient::new("Ann Lee", "ann@acme.com");
        assert_eq!(r.display(), "Ann Lee <ann@acme.com>");
        assert_eq!(r.to_string(), "Ann Lee <ann@acme.com>");
    }

    #[test]
    fn test_display_bare() {
        let r = Recipient::new("", "ann@acme.com");
        assert_eq!(r.display(), "ann@acme.com");
    }

    #[test]
    fn test_valid_addresses() {
        assert!(is_structurally_valid("ann@x.com"));
        assert!(is_structurally_valid("first.last+tag@mail.example.co.uk"));
    }

    #[test]
    fn test_missing_at() {
        assert!(!is_structurally_valid("ann.x.com"));
    }

    #[test]
    fn test_two_ats() {
        assert!(!is_structurally_valid("ann@x@y.com"));
    }

    #[test]
    fn test_empty_local_part() {
        assert!(!is_structurally_valid("@x.com"));
    }

    #[test]
    fn test_domain_without_dot() {
        assert!(!is_structurally_valid("ann@localhost"));
    }

    #[test]
    fn test_domain_dot_at_edges() {
        assert!(!is_structurally_valid("ann@.com"));
        assert!(!is_structurally_valid("ann@com."));
    }

    #[test]
    fn test_embedded_whitespace() {
        assert!(!is_structurally_valid("ann lee@x.com"));
        assert!(!is_structurally_valid("ann@x .com"));
    }
}
