use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("environment name must not be empty")]
    Empty,
}

/// The environment a release is deployed into.
///
/// Only production is treated specially. Every other environment is
/// reachable on the internal network only and gets its own hostname prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
    Named(String),
}

impl Environment {
    /// Short form, used in release names and as the Doppler config name.
    pub fn short_name(&self) -> &str {
        match self {
            Environment::Production => "prod",
            Environment::Development => "dev",
            Environment::Named(name) => name,
        }
    }

    pub fn long_name(&self) -> &str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
            Environment::Named(name) => name,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Prepended to every hostname outside production, e.g. `dev-brain.example.org`.
    pub fn hostname_prefix(&self) -> String {
        if self.is_production() {
            String::new()
        } else {
            format!("{}-", self.short_name())
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(Error::Empty),
            "prod" | "production" => Ok(Environment::Production),
            "dev" | "development" => Ok(Environment::Development),
            name => Ok(Environment::Named(name.to_string())),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.long_name())
    }
}

/// Whether ingress routes are reachable from outside the cluster network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    External,
    Internal,
}

impl Exposure {
    pub fn for_environment(environment: &Environment) -> Self {
        if environment.is_production() {
            Exposure::External
        } else {
            Exposure::Internal
        }
    }
}

impl Display for Exposure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Exposure::External => "external",
            Exposure::Internal => "internal",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_environment_names() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" Development ".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!("staging".parse::<Environment>(), Ok(Environment::Named("staging".into())));
        assert_eq!("".parse::<Environment>(), Err(Error::Empty));
    }

    #[test]
    fn short_and_long_names() {
        assert_eq!(Environment::Production.short_name(), "prod");
        assert_eq!(Environment::Production.long_name(), "production");
        assert_eq!(Environment::Development.short_name(), "dev");
        assert_eq!(Environment::Named("qa".into()).long_name(), "qa");
    }

    #[test]
    fn only_production_is_external() {
        assert_eq!(Exposure::for_environment(&Environment::Production), Exposure::External);
        assert_eq!(Exposure::for_environment(&Environment::Development), Exposure::Internal);
        assert_eq!(
            Exposure::for_environment(&Environment::Named("staging".into())),
            Exposure::Internal
        );
    }

    #[test]
    fn hostname_prefix() {
        assert_eq!(Environment::Production.hostname_prefix(), "");
        assert_eq!(Environment::Development.hostname_prefix(), "dev-");
        assert_eq!(Environment::Named("staging".into()).hostname_prefix(), "staging-");
    }
}
