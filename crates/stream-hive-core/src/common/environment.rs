use core::fmt;
use core::str::FromStr;

/// Deployment tier read from `APP_ENV`.
///
/// Only the three named tiers are recognised; anything else (including an
/// empty value) is treated as a local developer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    Staging,
    Development,
    #[default]
    Local,
}

impl Environment {
    /// Whether the service runs in a deployed tier.
    pub const fn is_deployed(self) -> bool {
        !matches!(self, Self::Local)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
            Self::Local => "local",
        }
    }

    /// Deployed tiers log JSON for shipping, local runs log pretty text.
    #[cfg(feature = "telemetry")]
    pub const fn log_format(self) -> crate::telemetry::LogFormat {
        if self.is_deployed() {
            crate::telemetry::LogFormat::Json
        } else {
            crate::telemetry::LogFormat::Pretty
        }
    }
}

impl FromStr for Environment {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => Self::Local,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_tiers_are_recognised() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Staging".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!(" development ".parse::<Environment>(), Ok(Environment::Development));
    }

    #[test]
    fn unknown_values_fall_back_to_local() {
        assert_eq!("".parse::<Environment>(), Ok(Environment::Local));
        assert_eq!("qa".parse::<Environment>(), Ok(Environment::Local));
        assert!(!Environment::Local.is_deployed());
        assert!(Environment::Staging.is_deployed());
    }
}
