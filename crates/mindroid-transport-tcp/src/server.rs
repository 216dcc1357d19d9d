//! Binds a listening socket for the node and dispatches every accepted
//! connection's transactions against the running Runtime.

use crate::error::map_io_error;
use crate::frame;
use mindroid_core::error::Result;
use mindroid_core::transport::Frame;
use mindroid_core::{BinderRef, Parcel, Runtime, Uri};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::warn;

/// Binds `addr` and serves connections until the socket errors out. The
/// caller is expected to run this inside a task it can abort on shutdown.
pub async fn serve(addr: SocketAddr, max_in_flight: usize) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(map_io_error("bind"))?;
    loop {
        let (stream, _peer) = listener.accept().await.map_err(map_io_error("accept"))?;
        tokio::spawn(handle_connection(stream, max_in_flight));
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, max_in_flight: usize) {
    let (mut read_half, write_half) = stream.into_split();
    let write_half = Arc::new(AsyncMutex::new(write_half));
    let in_flight = Arc::new(Semaphore::new(max_in_flight));
    loop {
        let frame = match frame::read_frame(&mut read_half).await {
            Ok(frame) => frame,
            Err(_) => return,
        };
        let permit = in_flight
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed while the connection task is alive");
        let write_half = write_half.clone();
        tokio::spawn(async move {
            let _permit = permit;
            dispatch(frame, write_half).await;
        });
    }
}

async fn dispatch(frame: Frame, write_half: Arc<AsyncMutex<OwnedWriteHalf>>) {
    let transaction_id = frame.transaction_id;
    let uri = frame.uri.clone();
    let what = frame.what;

    let runtime = match Runtime::current() {
        Some(runtime) => runtime,
        None => {
            warn!(target: "mindroid_transport_tcp::server", %uri, transaction_id, "no Runtime is current on this node; failing transaction");
            send_exception(&write_half, uri, transaction_id, what, "Binder transaction failure").await;
            return;
        }
    };

    let binder = match runtime.get_binder(&uri) {
        Some(BinderRef::Local(binder)) => binder,
        _ => {
            warn!(target: "mindroid_transport_tcp::server", %uri, transaction_id, "no local binder for uri; failing transaction");
            send_exception(&write_half, uri, transaction_id, what, "Binder transaction failure").await;
            return;
        }
    };

    let data = Parcel::from_bytes(frame.payload);
    let Some(reply) = binder.transact(what as i32, data, 0) else {
        // ONE_WAY is a local-caller concept; a peer's inbound request
        // always expects a reply and never sets it here.
        return;
    };

    match tokio::task::spawn_blocking(move || reply.get()).await {
        Ok(Ok(parcel)) => {
            let out = Frame::transaction(uri, transaction_id, what, parcel.into_bytes());
            let mut writer = write_half.lock().await;
            let _ = frame::write_frame(&mut *writer, &out).await;
        }
        Ok(Err(error)) => {
            send_exception(&write_half, uri, transaction_id, what, error.to_string()).await;
        }
        Err(_join_error) => {
            send_exception(&write_half, uri, transaction_id, what, "binder transact task panicked").await;
        }
    }
}

async fn send_exception(write_half: &AsyncMutex<OwnedWriteHalf>, uri: Uri, transaction_id: u32, what: u32, message: impl Into<String>) {
    let frame = Frame::exception(uri, transaction_id, what, message);
    let mut writer = write_half.lock().await;
    let _ = frame::write_frame(&mut *writer, &frame).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tracing_test::{logs_contain, traced_test};

    async fn connected_write_half() -> Arc<AsyncMutex<OwnedWriteHalf>> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let _client_side = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (_read_half, write_half) = accepted.await.unwrap().into_split();
        Arc::new(AsyncMutex::new(write_half))
    }

    #[traced_test]
    #[tokio::test]
    async fn dispatch_warns_when_no_runtime_is_current() {
        let write_half = connected_write_half().await;
        let uri: Uri = "mindroid://1/11".parse().unwrap();
        dispatch(Frame::transaction(uri, 1, 1, Vec::new()), write_half).await;
        assert!(logs_contain("no Runtime is current on this node"));
    }
}
