//! Reads the runtime's node id, peer table, plugin table and well-known
//! service ids out of a TOML document.
//!
//! `spec.md`'s option table names values, not a document format; the
//! original reads XML, this reads TOML — the format the rest of this
//! corpus's configuration layers already standardize on.

use crate::error::{MindroidError, Result};
use crate::uri::Uri;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct PluginSection {
    pub class: String,
    #[serde(default)]
    pub server_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    pub id: u32,
    pub interface: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PeerSection {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct NodeSection {
    id: u32,
    #[serde(flatten)]
    peers: HashMap<String, PeerSection>,
}

#[derive(Debug, Deserialize)]
struct Document {
    node: NodeSection,
    #[serde(default)]
    plugin: HashMap<String, PluginSection>,
    #[serde(default)]
    service: HashMap<String, ServiceSection>,
}

/// A parsed configuration document: this node's id, the URIs of its
/// peers, the transport plugins to load, and the reserved ids of
/// well-known services.
#[derive(Debug, Clone)]
pub struct Configuration {
    node_id: u32,
    peers: HashMap<u32, Uri>,
    plugins: HashMap<String, PluginSection>,
    services: HashMap<String, ServiceSection>,
}

impl Configuration {
    pub fn parse(document: &str) -> Result<Configuration> {
        let document: Document = toml::from_str(document).map_err(MindroidError::parse_error)?;
        let mut peers = HashMap::with_capacity(document.node.peers.len());
        for (key, peer) in document.node.peers {
            let node_id: u32 = key
                .parse()
                .map_err(|_| MindroidError::parse_error(format!("non-numeric peer node id {key:?}")))?;
            let uri: Uri = peer.uri.parse()?;
            peers.insert(node_id, uri);
        }
        Ok(Configuration {
            node_id: document.node.id,
            peers,
            plugins: document.plugin,
            services: document.service,
        })
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn peer_uri(&self, node_id: u32) -> Option<&Uri> {
        self.peers.get(&node_id)
    }

    pub fn peers(&self) -> impl Iterator<Item = (u32, &Uri)> {
        self.peers.iter().map(|(node_id, uri)| (*node_id, uri))
    }

    pub fn plugin(&self, scheme: &str) -> Option<&PluginSection> {
        self.plugins.get(scheme)
    }

    pub fn plugins(&self) -> impl Iterator<Item = (&str, &PluginSection)> {
        self.plugins.iter().map(|(scheme, section)| (scheme.as_str(), section))
    }

    pub fn service_id(&self, name: &str) -> Option<u32> {
        self.services.get(name).map(|service| service.id)
    }

    pub fn service_interface(&self, name: &str) -> Option<&str> {
        self.services.get(name).map(|service| service.interface.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [node]
        id = 1

        [plugin.mindroid]
        class = "mindroid-transport-tcp"
        server_uri = "mindroid://1/"

        [node.2]
        uri = "mindroid://host:9000/"

        [service.serviceManager]
        id = 1
        interface = "mindroid://interfaces/IServiceManager"
    "#;

    #[test]
    fn parses_node_plugin_and_service_sections() {
        let configuration = Configuration::parse(SAMPLE).unwrap();
        assert_eq!(configuration.node_id(), 1);
        assert_eq!(configuration.peer_uri(2).unwrap().to_string(), "mindroid://host:9000/");
        assert_eq!(configuration.plugin("mindroid").unwrap().class, "mindroid-transport-tcp");
        assert_eq!(configuration.service_id("serviceManager"), Some(1));
        assert_eq!(configuration.service_interface("serviceManager"), Some("mindroid://interfaces/IServiceManager"));
    }

    #[test]
    fn rejects_non_numeric_peer_ids() {
        let bad = r#"
            [node]
            id = 1
            [node.not-a-number]
            uri = "mindroid://host:9000/"
        "#;
        assert!(Configuration::parse(bad).is_err());
    }
}
