//! A remote stand-in for a binder living on another node.

use crate::binder::FLAG_ONE_WAY;
use crate::parcel::Parcel;
use crate::promise::Promise;
use crate::transport::PluginRef;
use crate::uri::Uri;

pub struct Proxy {
    uri: Uri,
    remote_id: u64,
    plugin: PluginRef,
}

impl Proxy {
    pub fn new(uri: Uri, remote_id: u64, plugin: PluginRef) -> Self {
        Proxy { uri, remote_id, plugin }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn remote_id(&self) -> u64 {
        self.remote_id
    }

    /// Delegates to the owning plugin's `transact`. A `ONE_WAY` call still
    /// reaches the plugin (the frame still has to go out) but the reply
    /// Promise is dropped rather than returned.
    pub fn transact(&self, what: i32, data: Parcel, flags: i32) -> Option<Promise<Parcel>> {
        let _span = crate::observability::transact_span(&self.uri.to_string(), what, None).entered();
        let reply = self.plugin.transact(&self.uri, what, data, flags);
        if flags & FLAG_ONE_WAY != 0 {
            None
        } else {
            Some(reply)
        }
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Proxy {}
