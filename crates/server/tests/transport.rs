use std::time::Duration;

use battle_content::ContentFactory;
use battle_core::protocol::{self, FrameDecoder};
use battle_core::{Channel, ClientMessage, NetworkId, ServerMessage};
use battle_server::ServerConfig;
use battle_server::lobby::MONSTER_ID_BASE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

struct Client {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            decoder: FrameDecoder::new(),
        }
    }

    async fn send(&mut self, message: &ClientMessage) {
        let frame = protocol::encode(message.channel(), message).unwrap();
        self.stream.write_all(&frame).await.unwrap();
    }

    /// Next server message, or `None` once the server closed the stream.
    async fn recv(&mut self) -> Option<(Channel, ServerMessage)> {
        let mut buf = [0u8; 1024];
        loop {
            if let Some(frame) = self.decoder.next_frame().unwrap() {
                return Some((frame.channel, frame.decode().unwrap()));
            }
            let n = self.stream.read(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            self.decoder.push(&buf[..n]);
        }
    }
}

async fn start_server() -> (std::net::SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../content");
    let content = ContentFactory::new(dir).load().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        content_dir: dir.into(),
        bind_addr: addr,
        seed: Some(11),
        ..ServerConfig::default()
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(battle_server::serve(config, content, listener, async {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx, server)
}

#[tokio::test]
async fn hello_places_the_player_in_a_demo_encounter() {
    let (addr, stop, server) = start_server().await;
    let mut client = Client::connect(addr).await;
    client
        .send(&ClientMessage::Hello {
            network_id: NetworkId(7),
        })
        .await;

    let start = timeout(Duration::from_secs(5), async {
        loop {
            match client.recv().await {
                Some((channel, ServerMessage::BattleStart { combatants, zone, .. })) => {
                    return (channel, combatants, zone);
                }
                Some(_) => continue,
                None => panic!("server closed the connection"),
            }
        }
    })
    .await
    .unwrap();

    let (channel, combatants, zone) = start;
    assert_eq!(channel, Channel::Reliable);
    assert_eq!(zone, Some(battle_core::ZoneId(1)));
    let ids: Vec<u32> = combatants.iter().map(|c| c.network_id.0).collect();
    assert_eq!(ids, [7, MONSTER_ID_BASE, MONSTER_ID_BASE + 1]);

    client.send(&ClientMessage::Leave).await;
    let closed = timeout(Duration::from_secs(5), async {
        while client.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "leave should end the connection");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn anything_but_hello_first_is_refused() {
    let (addr, stop, server) = start_server().await;
    let mut client = Client::connect(addr).await;
    client
        .send(&ClientMessage::UseAction {
            slot: 0,
            targets: vec![],
        })
        .await;

    let closed = timeout(Duration::from_secs(5), client.recv()).await.unwrap();
    assert!(closed.is_none());

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
