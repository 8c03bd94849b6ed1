//! TCP transport between observers and the runtime.
//!
//! Each connection opens with `Hello`. From then on the connection receives
//! every replicated message whose audience includes its network id, and its
//! `UseAction`/`Leave` requests are forwarded to the runtime.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Result, bail};
use battle_core::protocol::{self, FrameDecoder};
use battle_core::{BattleError, ClientMessage, NetworkId};
use runtime::{Event, RuntimeError, RuntimeHandle, Topic};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::lobby::Lobby;

const READ_BUFFER: usize = 4096;

/// Accept connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    handle: RuntimeHandle,
    lobby: Arc<Lobby>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);
    info!(target: "server::transport", addr = ?listener.local_addr().ok(), "listening");
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(target: "server::transport", error = %err, "accept failed");
                        continue;
                    }
                };
                let handle = handle.clone();
                let lobby = lobby.clone();
                connections.spawn(async move {
                    if let Err(err) = Connection::new(stream, peer).run(handle, lobby).await {
                        warn!(target: "server::transport", %peer, error = %err, "connection dropped");
                    }
                });
            }
        }
    }

    info!(
        target: "server::transport",
        open = connections.len(),
        "stopped accepting connections"
    );
    connections.shutdown().await;
    Ok(())
}

struct Connection {
    peer: SocketAddr,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    decoder: FrameDecoder,
    buffer: Vec<u8>,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            peer,
            reader,
            writer,
            decoder: FrameDecoder::new(),
            buffer: vec![0; READ_BUFFER],
        }
    }

    /// Read more bytes into the decoder. `false` once the peer hung up.
    async fn fill(&mut self) -> Result<bool> {
        let n = self.reader.read(&mut self.buffer).await?;
        self.decoder.push(&self.buffer[..n]);
        Ok(n > 0)
    }

    fn next_message(&mut self) -> Result<Option<ClientMessage>> {
        match self.decoder.next_frame()? {
            Some(frame) => Ok(Some(frame.decode()?)),
            None => Ok(None),
        }
    }

    async fn hello(&mut self) -> Result<Option<NetworkId>> {
        loop {
            match self.next_message()? {
                Some(ClientMessage::Hello { network_id }) => return Ok(Some(network_id)),
                Some(other) => bail!("expected hello, got {}", other.name()),
                None => {
                    if !self.fill().await? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn run(mut self, handle: RuntimeHandle, lobby: Arc<Lobby>) -> Result<()> {
        let Some(network_id) = self.hello().await? else {
            return Ok(());
        };
        // Subscribe before entering so the opening BattleStart is not missed.
        let mut replication = handle.subscribe(Topic::Replication);
        lobby.enter(&handle, network_id).await?;
        info!(target: "server::transport", peer = %self.peer, %network_id, "player connected");

        let result = self.pump(&handle, &lobby, network_id, &mut replication).await;

        if let Ok(Some(encounter)) = handle.locate(network_id).await {
            let _ = handle.leave(encounter, network_id).await;
        }
        info!(target: "server::transport", peer = %self.peer, %network_id, "player disconnected");
        result
    }

    async fn pump(
        &mut self,
        handle: &RuntimeHandle,
        lobby: &Lobby,
        network_id: NetworkId,
        replication: &mut tokio::sync::broadcast::Receiver<Event>,
    ) -> Result<()> {
        loop {
            while let Some(message) = self.next_message()? {
                if !dispatch(handle, lobby, network_id, message).await? {
                    return Ok(());
                }
            }

            tokio::select! {
                read = self.reader.read(&mut self.buffer) => {
                    let n = read?;
                    if n == 0 {
                        return Ok(());
                    }
                    self.decoder.push(&self.buffer[..n]);
                }
                event = replication.recv() => match event {
                    Ok(Event::Replication(envelope)) if envelope.is_for(network_id) => {
                        let frame = protocol::encode(envelope.message.channel(), &envelope.message)?;
                        self.writer.write_all(&frame).await?;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(target: "server::transport", %network_id, missed, "replication lagged, resyncing");
                        if !handle.resync(network_id).await? {
                            debug!(target: "server::transport", %network_id, "nothing to resync");
                        }
                    }
                    Err(RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

/// Forward one client request. `false` ends the connection.
///
/// A repeated `Hello` after the player's encounter has ended starts a new one.
async fn dispatch(
    handle: &RuntimeHandle,
    lobby: &Lobby,
    network_id: NetworkId,
    message: ClientMessage,
) -> Result<bool> {
    match message {
        ClientMessage::Hello { .. } => {
            lobby.enter(handle, network_id).await?;
            Ok(true)
        }
        ClientMessage::UseAction { slot, targets } => {
            let Some(encounter) = handle.locate(network_id).await? else {
                debug!(target: "server::transport", %network_id, "action outside of an encounter");
                return Ok(true);
            };
            match handle.use_action(encounter, network_id, slot, targets).await {
                Ok(()) => Ok(true),
                Err(err) => reject(network_id, err).map(|()| true),
            }
        }
        ClientMessage::Leave => {
            if let Some(encounter) = handle.locate(network_id).await? {
                if let Err(err) = handle.leave(encounter, network_id).await {
                    reject(network_id, err)?;
                }
            }
            Ok(false)
        }
    }
}

/// Rejected intents are logged and dropped; worker failures end the connection.
fn reject(network_id: NetworkId, err: RuntimeError) -> Result<()> {
    if err.severity().is_internal() {
        return Err(err.into());
    }
    debug!(
        target: "server::transport",
        %network_id,
        code = err.error_code(),
        error = %err,
        "request rejected"
    );
    Ok(())
}
