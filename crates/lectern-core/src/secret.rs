use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// An API credential. The value never appears in `Debug` or `Display`
/// output; only the variable it was read from does.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    value: String,
    origin: Option<&'static str>,
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }

    /// The first of `vars` that is set to something other than whitespace.
    /// Surrounding whitespace (a pasted trailing newline) is dropped.
    #[must_use]
    pub fn from_env(vars: &[&'static str]) -> Option<Self> {
        vars.iter().find_map(|&var| {
            let raw = std::env::var(var).ok()?;
            let value = raw.trim();
            (!value.is_empty()).then(|| Self {
                value: value.to_owned(),
                origin: Some(var),
            })
        })
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Environment variable the value came from, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&'static str> {
        self.origin
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Some(var) => write!(f, "Secret({var}={REDACTED})"),
            None => write!(f, "Secret({REDACTED})"),
        }
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn formatting_hides_value() {
        let secret = Secret::new("sk-or-123");
        assert_eq!(secret.expose(), "sk-or-123");
        assert_eq!(format!("{secret}"), REDACTED);
        assert_eq!(format!("{secret:?}"), "Secret([REDACTED])");
        assert!(!format!("{:?}", Some(&secret)).contains("sk-or"));
    }

    #[test]
    #[serial]
    fn from_env_skips_blank_and_trims() {
        unsafe {
            std::env::set_var("LECTERN_TEST_KEY_A", "   ");
            std::env::set_var("LECTERN_TEST_KEY_B", "sk-live-9\n");
        }
        let secret = Secret::from_env(&["LECTERN_TEST_KEY_A", "LECTERN_TEST_KEY_B"]).unwrap();
        unsafe {
            std::env::remove_var("LECTERN_TEST_KEY_A");
            std::env::remove_var("LECTERN_TEST_KEY_B");
        }
        assert_eq!(secret.expose(), "sk-live-9");
        assert_eq!(secret.origin(), Some("LECTERN_TEST_KEY_B"));
        assert_eq!(format!("{secret:?}"), "Secret(LECTERN_TEST_KEY_B=[REDACTED])");
    }

    #[test]
    #[serial]
    fn from_env_none_when_unset() {
        unsafe { std::env::remove_var("LECTERN_TEST_KEY_C") };
        assert!(Secret::from_env(&["LECTERN_TEST_KEY_C"]).is_none());
    }
}
