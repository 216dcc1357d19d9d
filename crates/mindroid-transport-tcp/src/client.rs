//! One connection per peer node: assigns transaction ids, correlates
//! replies to the Promises callers are holding, and times out pending
//! transactions that never get an answer.

use crate::error::map_io_error;
use crate::frame;
use mindroid_core::error::{MindroidError, Result};
use mindroid_core::transport::{Frame, FrameType};
use mindroid_core::{Parcel, Promise, Uri};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Default timeout for a pending outbound transaction, matching the
/// original plugin's `BINDER_TRANSACTION_TIMEOUT`.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_millis(10_000);

type PendingReply = oneshot::Sender<std::result::Result<Parcel, MindroidError>>;

pub struct MindroidTcpClient {
    write_half: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Mutex<HashMap<u32, PendingReply>>,
    next_transaction_id: AtomicU32,
    timeout: Duration,
    handle: Handle,
}

impl MindroidTcpClient {
    /// Must be called with a Tokio runtime entered (e.g. from inside
    /// `rt.block_on`): the returned client spawns its reader and every
    /// subsequent `transact` call's writer task onto the runtime whose
    /// `Handle` is current at connect time, so later calls work even from
    /// plain synchronous call sites that never re-enter the runtime.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Arc<MindroidTcpClient>> {
        let stream = TcpStream::connect(addr).await.map_err(map_io_error("connect"))?;
        let (read_half, write_half) = stream.into_split();
        let client = Arc::new(MindroidTcpClient {
            write_half: tokio::sync::Mutex::new(write_half),
            pending: Mutex::new(HashMap::new()),
            next_transaction_id: AtomicU32::new(1),
            timeout,
            handle: Handle::current(),
        });
        client.handle.spawn(client.clone().run_reader(read_half));
        Ok(client)
    }

    /// Assigns the next transaction id, writes the frame, and returns a
    /// Promise completed by whichever of: the matching reply frame
    /// arrives, the connection drops, or the timeout elapses first.
    pub fn transact(self: &Arc<Self>, uri: &Uri, what: i32, data: Parcel) -> Promise<Parcel> {
        let promise = Promise::new();
        let transaction_id = self.next_transaction_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(transaction_id, tx);

        let frame = Frame::transaction(uri.clone(), transaction_id, what as u32, data.into_bytes());
        let this = self.clone();
        let completion = promise.clone();
        let timeout = self.timeout;
        self.handle.spawn(async move {
            if let Err(error) = this.write_frame(&frame).await {
                this.pending.lock().unwrap().remove(&transaction_id);
                completion.complete_with(error);
                return;
            }
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(Ok(parcel))) => {
                    completion.complete(parcel);
                }
                Ok(Ok(Err(error))) => {
                    completion.complete_with(error);
                }
                Ok(Err(_canceled)) => {
                    completion.complete_with(MindroidError::transaction_failure("connection closed before reply"));
                }
                Err(_elapsed) => {
                    this.pending.lock().unwrap().remove(&transaction_id);
                    completion.complete_with(MindroidError::timeout("transaction timeout"));
                }
            }
        });
        promise
    }

    async fn write_frame(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.write_half.lock().await;
        frame::write_frame(&mut *writer, frame).await
    }

    async fn run_reader(self: Arc<Self>, mut read_half: tokio::net::tcp::OwnedReadHalf) {
        loop {
            match frame::read_frame(&mut read_half).await {
                Ok(frame) => {
                    let outcome = match frame.frame_type {
                        FrameType::Transaction => Ok(Parcel::from_bytes(frame.payload)),
                        FrameType::Exception => Err(MindroidError::remote_exception(String::from_utf8_lossy(&frame.payload).into_owned())),
                    };
                    if let Some(sender) = self.pending.lock().unwrap().remove(&frame.transaction_id) {
                        let _ = sender.send(outcome);
                    }
                }
                Err(error) => {
                    self.fail_all_pending(error);
                    return;
                }
            }
        }
    }

    /// Fails every transaction still awaiting a reply with `error`, without
    /// touching the underlying connection. Called both by the reader task on
    /// a read error and by the owning plugin when it is torn down.
    pub fn fail_all_pending(&self, error: MindroidError) {
        let mut pending = self.pending.lock().unwrap();
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(error.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transact_round_trip_clears_the_pending_map() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut read_half, mut write_half) = stream.into_split();
            let request = frame::read_frame(&mut read_half).await.unwrap();
            let mut payload = Parcel::new();
            payload.put_string("fine, thanks");
            let reply = Frame::transaction(request.uri, request.transaction_id, request.what, payload.into_bytes());
            frame::write_frame(&mut write_half, &reply).await.unwrap();
        });

        let client = MindroidTcpClient::connect(addr, Duration::from_secs(5)).await.unwrap();
        let uri: Uri = "mindroid://1/11".parse().unwrap();
        let mut data = Parcel::new();
        data.put_string("how are you?");
        let reply = client.transact(&uri, 1, data);

        let mut parcel = reply.get().unwrap();
        assert_eq!(parcel.get_string().unwrap(), "fine, thanks");
        assert!(client.pending.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn a_remote_exception_frame_fails_the_promise() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut read_half, mut write_half) = stream.into_split();
            let request = frame::read_frame(&mut read_half).await.unwrap();
            let reply = Frame::exception(request.uri, request.transaction_id, request.what, "no such service");
            frame::write_frame(&mut write_half, &reply).await.unwrap();
        });

        let client = MindroidTcpClient::connect(addr, Duration::from_secs(5)).await.unwrap();
        let uri: Uri = "mindroid://1/11".parse().unwrap();
        let result = client.transact(&uri, 1, Parcel::new()).get();
        assert!(matches!(result, Err(MindroidError::RemoteException(_))));
    }
}
