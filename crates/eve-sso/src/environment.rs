//! SSO deployment environments
//!
//! The SSO provider runs three independent deployments. Each one has its own
//! login host, its own ESI host and a datasource name that ESI expects as a
//! query parameter. The mapping is a fixed table; anything else is rejected
//! when configuration is parsed, never at request time.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// Deployment target of the SSO provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsoEnvironment {
    /// Production cluster
    Tranquility,
    /// Public test cluster
    Singularity,
    /// Alternate-region cluster, operated separately
    Serenity,
}

impl SsoEnvironment {
    pub const ALL: [SsoEnvironment; 3] = [
        SsoEnvironment::Tranquility,
        SsoEnvironment::Singularity,
        SsoEnvironment::Serenity,
    ];

    /// Base URL of the login host, without a trailing slash.
    pub fn sso_base(self) -> &'static str {
        match self {
            SsoEnvironment::Tranquility => "https://login.eveonline.com",
            SsoEnvironment::Singularity => "https://sisilogin.testeveonline.com",
            SsoEnvironment::Serenity => "https://login.evepc.163.com",
        }
    }

    /// Base URL of the ESI host, with a trailing slash.
    pub fn esi_base(self) -> &'static str {
        match self {
            SsoEnvironment::Tranquility | SsoEnvironment::Singularity => {
                "https://esi.evetech.net/"
            }
            SsoEnvironment::Serenity => "https://esi.evepc.163.com/",
        }
    }

    /// Value of the `datasource` query parameter for ESI calls.
    pub fn datasource(self) -> &'static str {
        match self {
            SsoEnvironment::Tranquility => "tranquility",
            SsoEnvironment::Singularity => "singularity",
            SsoEnvironment::Serenity => "serenity",
        }
    }
}

impl fmt::Display for SsoEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.datasource())
    }
}

impl FromStr for SsoEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SsoEnvironment::ALL
            .into_iter()
            .find(|env| env.datasource() == wanted)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown SSO environment {s:?} (expected tranquility, singularity or serenity)"
                ))
            })
    }
}

/// Resolved hosts for one flow.
///
/// Normally derived from an [`SsoEnvironment`]; [`Endpoints::custom`] points
/// the client somewhere else (a local mock, an egress proxy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub sso_base: String,
    pub esi_base: String,
    pub datasource: String,
}

impl Endpoints {
    pub fn for_environment(environment: SsoEnvironment) -> Self {
        Self {
            sso_base: environment.sso_base().to_string(),
            esi_base: environment.esi_base().to_string(),
            datasource: environment.datasource().to_string(),
        }
    }

    /// Custom hosts. A trailing slash on `sso_base` is dropped and one is
    /// added to `esi_base` so path joining stays uniform.
    pub fn custom(sso_base: &str, esi_base: &str, datasource: &str) -> Self {
        let mut esi_base = esi_base.to_string();
        if !esi_base.ends_with('/') {
            esi_base.push('/');
        }
        Self {
            sso_base: sso_base.trim_end_matches('/').to_string(),
            esi_base,
            datasource: datasource.to_string(),
        }
    }

    pub(crate) fn authorize_url(&self) -> String {
        format!("{}/oauth/authorize/", self.sso_base)
    }

    pub(crate) fn authorize_url_v2(&self) -> String {
        format!("{}/v2/oauth/authorize/", self.sso_base)
    }

    pub(crate) fn token_url(&self) -> String {
        format!("{}/oauth/token", self.sso_base)
    }

    pub(crate) fn token_url_v2(&self) -> String {
        format!("{}/v2/oauth/token", self.sso_base)
    }

    pub(crate) fn verify_url(&self) -> String {
        format!("{}/oauth/verify", self.sso_base)
    }

    pub(crate) fn affiliation_url(&self) -> String {
        format!(
            "{}v1/characters/affiliation/?datasource={}",
            self.esi_base, self.datasource
        )
    }
}

impl From<SsoEnvironment> for Endpoints {
    fn from(environment: SsoEnvironment) -> Self {
        Endpoints::for_environment(environment)
    }
}
