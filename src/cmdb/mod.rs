//! ServiceNow CMDB output
//!
//! Records are written into import set tables through the ServiceNow Import
//! Set API. ServiceNow transforms them into CMDB configuration items on its
//! side.
//!
//! # Module Structure
//!
//! - [`http`] - Authenticated HTTP client
//! - [`sink`] - Record sinks (CMDB import and dry run)

pub mod http;
pub mod sink;

use std::fmt;

pub use http::CmdbHttpClient;
pub use sink::{CmdbSink, DryRunSink, RecordSink};

/// ServiceNow instance and basic auth credentials
#[derive(Clone, PartialEq, Eq)]
pub struct CmdbCredentials {
    /// Instance host name, e.g. `acme.service-now.com`
    pub hostname: String,
    pub user: String,
    pub password: String,
}

impl CmdbCredentials {
    /// Default API root for the instance
    pub fn base_url(&self) -> String {
        format!("https://{}", self.hostname)
    }
}

impl fmt::Debug for CmdbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdbCredentials")
            .field("hostname", &self.hostname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
