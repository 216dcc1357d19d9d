//! Minimal `scheme://authority/path` URIs.
//!
//! Binder identity rides on these: `mindroid://<node-id>/<hex-id>` for
//! numeric id-URIs, `mindroid://serviceManager` (or any symbolic authority)
//! for service lookups. Only as much URI grammar as the runtime needs —
//! no query strings, no fragments, no percent-decoding.

use crate::error::MindroidError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    scheme: String,
    authority: String,
    path: String,
}

impl Uri {
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>, path: impl Into<String>) -> Self {
        Uri {
            scheme: scheme.into(),
            authority: authority.into(),
            path: path.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The authority parsed as a decimal node id, if it is one.
    pub fn node_id(&self) -> Option<u32> {
        self.authority.parse().ok()
    }

    /// The path parsed as a hex-encoded local id, if it is one.
    pub fn local_id(&self) -> Option<u32> {
        u32::from_str_radix(&self.path, 16).ok()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority, self.path)
    }
}

impl FromStr for Uri {
    type Err = MindroidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = value
            .split_once("://")
            .ok_or_else(|| MindroidError::parse_error(format!("missing scheme separator in {value:?}")))?;
        if scheme.is_empty() {
            return Err(MindroidError::parse_error("empty scheme"));
        }
        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, path),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(MindroidError::parse_error(format!("empty authority in {value:?}")));
        }
        Ok(Uri::new(scheme, authority, path))
    }
}

/// Builds the canonical URI for a binder id on a given node, using the
/// supplied native scheme name.
pub fn id_uri(scheme: &str, node_id: u32, local_id: u32) -> Uri {
    Uri::new(scheme, node_id.to_string(), format!("{local_id:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_id_uri() {
        let uri = id_uri("mindroid", 1, 0x2a);
        assert_eq!(uri.to_string(), "mindroid://1/2a");
        let parsed: Uri = uri.to_string().parse().unwrap();
        assert_eq!(parsed, uri);
        assert_eq!(parsed.node_id(), Some(1));
        assert_eq!(parsed.local_id(), Some(0x2a));
    }

    #[test]
    fn symbolic_service_uri() {
        let uri: Uri = "mindroid://serviceManager".parse().unwrap();
        assert_eq!(uri.authority(), "serviceManager");
        assert_eq!(uri.path(), "");
        assert_eq!(uri.node_id(), None);
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!("not-a-uri".parse::<Uri>().is_err());
    }
}
