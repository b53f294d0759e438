//! Platform version as reported by `GET /version`.

use std::fmt;

/// Major/minor pair of the platform release. Patch and build suffixes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
}

/// Role updates are served from this release on.
pub const ROLE_UPDATES_SINCE: PlatformVersion = PlatformVersion::new(5, 6);

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `"X.Y.Z"` (anything after the last dot is dropped).
    ///
    /// `"5.7"` is read as 5.0 since its last component is treated as the
    /// patch level.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let head = match raw.rfind('.') {
            Some(idx) => &raw[..idx],
            None => raw,
        };

        let mut parts = head.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => leading_digits(minor)?,
            None => 0,
        };
        Some(Self { major, minor })
    }

    /// Role update endpoint is available.
    pub fn supports_role_updates(&self) -> bool {
        *self >= ROLE_UPDATES_SINCE
    }

    /// Identity-provider group membership mirrors `_systemRoles`. Only
    /// releases after 5.6 manage roles through groups.
    pub fn manages_role_groups(&self) -> bool {
        *self > ROLE_UPDATES_SINCE
    }
}

fn leading_digits(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_versions() {
        assert_eq!(PlatformVersion::parse("5.7.1"), Some(PlatformVersion::new(5, 7)));
        assert_eq!(PlatformVersion::parse("5.10.0"), Some(PlatformVersion::new(5, 10)));
        assert_eq!(PlatformVersion::parse("6.0.2-rc1"), Some(PlatformVersion::new(6, 0)));
        assert_eq!(PlatformVersion::parse("5.7"), Some(PlatformVersion::new(5, 0)));
        assert_eq!(PlatformVersion::parse("garbage"), None);
        assert_eq!(PlatformVersion::parse(""), None);
    }

    #[test]
    fn test_minor_compares_numerically() {
        // 5.10 is newer than 5.6 even though 5.10 < 5.6 as a decimal
        assert!(PlatformVersion::new(5, 10) > PlatformVersion::new(5, 6));
    }

    #[test]
    fn test_role_gates() {
        let v55 = PlatformVersion::new(5, 5);
        let v56 = PlatformVersion::new(5, 6);
        let v57 = PlatformVersion::new(5, 7);

        assert!(!v55.supports_role_updates());
        assert!(v56.supports_role_updates());
        assert!(!v56.manages_role_groups());
        assert!(v57.manages_role_groups());
    }
}
