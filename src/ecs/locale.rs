//! Service locales, their endpoints and default associate tags.

use crate::error::EcsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host and path serving one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: &'static str,
    pub path: &'static str,
}

impl Endpoint {
    /// Base URL of the endpoint, without the path.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.host)
    }
}

/// Supported service locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ca,
    De,
    Fr,
    Jp,
    Uk,
    #[default]
    Us,
}

impl Locale {
    /// Returns the service endpoint for this locale.
    pub fn endpoint(&self) -> Endpoint {
        let host = match self {
            Locale::Ca => "ecs.amazonaws.ca",
            Locale::De => "ecs.amazonaws.de",
            Locale::Fr => "ecs.amazonaws.fr",
            Locale::Jp => "ecs.amazonaws.jp",
            Locale::Uk => "ecs.amazonaws.co.uk",
            Locale::Us => "ecs.amazonaws.com",
        };
        Endpoint { host, path: "/onca/xml" }
    }

    /// Associate tag used when none is configured.
    pub fn default_associate(&self) -> &'static str {
        match self {
            Locale::Ca => "caliban-20",
            Locale::De => "calibanorg0a-21",
            Locale::Fr => "caliban08-21",
            Locale::Jp => "calibanorg-20",
            Locale::Uk => "caliban-21",
            Locale::Us => "calibanorg-20",
        }
    }

    /// Returns the currency code for this locale.
    pub fn currency(&self) -> &'static str {
        match self {
            Locale::Ca => "CAD",
            Locale::De | Locale::Fr => "EUR",
            Locale::Jp => "JPY",
            Locale::Uk => "GBP",
            Locale::Us => "USD",
        }
    }

    /// Returns all supported locales.
    pub fn all() -> &'static [Locale] {
        &[Locale::Ca, Locale::De, Locale::Fr, Locale::Jp, Locale::Uk, Locale::Us]
    }
}

/// Maps an ISO 3166 country code onto the locale its shoppers most likely use.
///
/// Countries not listed explicitly fall back to [`Locale::Us`].
pub fn localise(country_code: &str) -> Locale {
    const DE: &[&str] = &["at", "ch", "de"];
    const UK: &[&str] = &[
        "ad", "al", "ba", "be", "cy", "cz", "dk", "ee", "es", "fi", "fo", "gg", "gi", "gr", "gl",
        "hu", "ie", "im", "is", "it", "je", "li", "lt", "lu", "lv", "mk", "mt", "nl", "no", "pl",
        "pt", "ro", "se", "si", "sk", "sm", "uk",
    ];

    let code = country_code.trim().to_lowercase();
    match code.as_str() {
        "ca" => Locale::Ca,
        "fr" => Locale::Fr,
        "jp" => Locale::Jp,
        c if DE.contains(&c) => Locale::De,
        c if UK.contains(&c) => Locale::Uk,
        _ => Locale::Us,
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Locale::Ca => "ca",
            Locale::De => "de",
            Locale::Fr => "fr",
            Locale::Jp => "jp",
            Locale::Uk => "uk",
            Locale::Us => "us",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for Locale {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ca" => Ok(Locale::Ca),
            "de" => Ok(Locale::De),
            "fr" => Ok(Locale::Fr),
            "jp" => Ok(Locale::Jp),
            "uk" => Ok(Locale::Uk),
            "us" => Ok(Locale::Us),
            _ => Err(EcsError::Locale(s.to_string())),
        }
    }
}
