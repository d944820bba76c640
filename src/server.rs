use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Result;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
    sync::{Mutex, mpsc},
};
use tracing::{debug, info, warn};

use crate::{
    frame::{DELIMITER, FrameBuffer, frame_text},
    policy::{POLICY_REQUEST, PolicyConfig},
};

type ClientId = u64;

const READ_CHUNK: usize = 4096;

pub struct Relay {
    listener: TcpListener,
    state: Arc<RelayState>,
}

impl Relay {
    pub fn new(listener: TcpListener, policy: PolicyConfig) -> Self {
        Self {
            listener,
            state: Arc::new(RelayState::new(policy)),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Relay { listener, state } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("relay shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &state);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<RelayState>,
) {
    match result {
        Ok((stream, peer)) => spawn_client_handler(stream, peer, state),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_client_handler(stream: TcpStream, peer: SocketAddr, state: &Arc<RelayState>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, peer, state).await {
            warn!(peer = %peer, error = ?err, "client connection closed with error");
        }
    });
}

struct RelayState {
    clients: Mutex<HashMap<ClientId, Arc<ClientHandle>>>,
    next_id: AtomicU64,
    policy: PolicyConfig,
}

struct ClientHandle {
    id: ClientId,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl RelayState {
    fn new(policy: PolicyConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            policy,
        }
    }

    async fn register_client(&self, peer: SocketAddr, writer: OwnedWriteHalf) -> Arc<ClientHandle> {
        let (outbound, queue) = mpsc::unbounded_channel();
        let handle = Arc::new(ClientHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            peer,
            outbound,
        });
        tokio::spawn(run_client_writer(queue, writer, peer));
        let mut clients = self.clients.lock().await;
        clients.insert(handle.id, Arc::clone(&handle));
        handle
    }

    /// Idempotent: the client may already be gone after a broadcast-time failure.
    async fn remove_client(&self, id: ClientId) -> bool {
        let mut clients = self.clients.lock().await;
        clients.remove(&id).is_some()
    }

    async fn snapshot(&self) -> Vec<Arc<ClientHandle>> {
        let clients = self.clients.lock().await;
        clients.values().cloned().collect()
    }

    /// Fans a delimiter-terminated payload out to every registered client,
    /// including the sender. Enqueueing never suspends: each client's writer
    /// task drains its own queue at its own pace, so one slow or failing peer
    /// cannot block delivery to the rest.
    async fn broadcast(&self, payload: &[u8]) {
        let members = self.snapshot().await;

        let mut dead = Vec::new();
        for member in &members {
            if member.outbound.send(payload.to_vec()).is_err() {
                debug!(peer = %member.peer, "dropping client whose writer has gone away");
                dead.push(member.id);
            }
        }

        for id in dead {
            self.remove_client(id).await;
        }
    }
}

/// Owns a connection's write half and drains its outbound queue. Ends either
/// when a write or flush fails (the closed queue is then observed and pruned
/// by a later fan-out pass, or by the handler's own cleanup) or when the last
/// queue handle is dropped, at which point everything still pending has been
/// delivered and the transport is closed.
async fn run_client_writer(
    mut queue: mpsc::UnboundedReceiver<Vec<u8>>,
    mut writer: OwnedWriteHalf,
    peer: SocketAddr,
) {
    while let Some(payload) = queue.recv().await {
        if let Err(err) = writer.write_all(&payload).await {
            debug!(peer = %peer, error = ?err, "failed to deliver to client");
            return;
        }
        if let Err(err) = writer.flush().await {
            debug!(peer = %peer, error = ?err, "failed to flush to client");
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<RelayState>,
) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let client = state.register_client(peer, writer).await;
    info!(%peer, "client connected");

    let outcome = run_session(&state, &mut reader, &client).await;
    cleanup_client(&state, &client).await;
    outcome
}

async fn run_session(
    state: &RelayState,
    reader: &mut OwnedReadHalf,
    client: &Arc<ClientHandle>,
) -> Result<()> {
    let mut buffer = FrameBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let bytes = reader.read(&mut chunk).await?;
        if bytes == 0 {
            // Peer closed; any buffered partial frame is discarded.
            return Ok(());
        }
        buffer.extend(&chunk[..bytes]);

        while let Some(frame) = buffer.next_frame() {
            if frame.is_empty() {
                continue;
            }
            // Re-checked on every frame, not just the first of the session.
            if frame_text(&frame) == POLICY_REQUEST {
                serve_policy(state, client).await;
                return Ok(());
            }
            let mut payload = frame;
            payload.push(DELIMITER);
            state.broadcast(&payload).await;
        }
    }
}

async fn serve_policy(state: &RelayState, client: &Arc<ClientHandle>) {
    let mut payload = state.policy.render().into_bytes();
    payload.push(DELIMITER);

    // Enqueueing fails only if the writer already died; either way this
    // connection is done.
    if client.outbound.send(payload).is_ok() {
        info!(peer = %client.peer, "policy file served");
    }

    // Leave the registry before the transport closes so a concurrent fan-out
    // pass cannot race a write against the imminent shutdown. Once the last
    // queue handle drops, the writer delivers the document and closes.
    state.remove_client(client.id).await;
}

async fn cleanup_client(state: &RelayState, client: &Arc<ClientHandle>) {
    // Idempotent; the client may already be gone via the policy path or a
    // failed fan-out write. Dropping the final handle closes the writer's
    // queue, which drains anything still pending and closes the transport.
    if state.remove_client(client.id).await {
        info!(peer = %client.peer, "client disconnected");
    }
}
