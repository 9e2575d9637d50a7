//! Chat transport (§4.G, §9 "Chat transport as a state machine"): a
//! small explicit state machine driving a single owned socket, built
//! directly on `tokio_util::codec::LinesCodec` rather than a
//! higher-level chat framework.

pub mod split;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use split::split_message;

/// Delay interposed between consecutive sends and between channel
/// joins, to stay within server rate limits.
const RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat connection failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("chat protocol framing error: {0}")]
    Framing(#[from] LinesCodecError),
    #[error("chat transport has shut down")]
    ShutDown,
}

/// Connection parameters for the chat server.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    pub password: String,
    pub channels: Vec<String>,
}

/// Where the connection is in its lifecycle.
///
/// `Disconnected -> Connecting -> (Recovering ->)? Identifying ->
/// Joining -> Ready -> Sending* -> Disconnected`. A nick collision
/// (`NickTaken?` in the design notes) detours through `Recovering`
/// before retrying identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Disconnected,
    Connecting,
    Recovering,
    Identifying,
    Joining,
    Ready,
}

enum Command {
    Send {
        channel: String,
        message: String,
        done: oneshot::Sender<()>,
    },
}

/// Thread-safe handle the Reporter task uses to enqueue sends onto the
/// chat task's send queue — the transport's only externally callable
/// entry point.
#[derive(Clone)]
pub struct ChatHandle {
    tx: mpsc::Sender<Command>,
}

impl ChatHandle {
    /// Enqueue `message` for `channel`. Resolves once the transport has
    /// accepted the send (not once it's actually on the wire — the
    /// rate-limit queue may still be draining).
    pub async fn send(&self, channel: impl Into<String>, message: impl Into<String>) -> Result<(), ChatError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Command::Send {
                channel: channel.into(),
                message: message.into(),
                done: done_tx,
            })
            .await
            .map_err(|_| ChatError::ShutDown)?;
        done_rx.await.map_err(|_| ChatError::ShutDown)
    }
}

/// Owns the socket and the send queue; run as a dedicated task via
/// [`ChatTransport::run`].
pub struct ChatTransport {
    config: ChatConfig,
    rx: mpsc::Receiver<Command>,
    state: ChatState,
}

impl ChatTransport {
    pub fn new(config: ChatConfig) -> (Self, ChatHandle) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                config,
                rx,
                state: ChatState::Disconnected,
            },
            ChatHandle { tx },
        )
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Connect, identify, join every configured channel, and then
    /// service the send queue until the socket drops — at which point
    /// the caller is expected to reconnect by calling `run` again.
    pub async fn run(&mut self) -> Result<(), ChatError> {
        self.state = ChatState::Connecting;
        let stream = TcpStream::connect((self.config.server.as_str(), self.config.port)).await?;
        let mut framed = Framed::new(stream, LinesCodec::new());

        self.identify(&mut framed).await?;
        self.join_channels(&mut framed).await?;

        self.state = ChatState::Ready;
        info!(nick = %self.config.nickname, "chat transport ready");

        loop {
            tokio::select! {
                line = framed.next() => {
                    match line {
                        Some(Ok(line)) => self.handle_line(&mut framed, &line).await?,
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            self.state = ChatState::Disconnected;
                            return Ok(());
                        }
                    }
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(Command::Send { channel, message, done }) => {
                            self.send_rate_limited(&mut framed, &channel, &message).await?;
                            let _ = done.send(());
                        }
                        None => {
                            self.state = ChatState::Disconnected;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn identify(&mut self, framed: &mut Framed<TcpStream, LinesCodec>) -> Result<(), ChatError> {
        self.state = ChatState::Identifying;
        framed.send(format!("NICK {}", self.config.nickname)).await?;
        framed.send(format!("USER {0} 0 * :{0}", self.config.nickname)).await?;

        loop {
            let Some(line) = framed.next().await else {
                return Err(ChatError::ShutDown);
            };
            let line = line?;
            if is_nickname_in_use(&line) {
                self.recover_from_nick_collision(framed).await?;
                continue;
            }
            if is_welcome(&line) {
                framed
                    .send(format!("PRIVMSG nickserv :identify {} ", self.config.password))
                    .await?;
                debug!("identified with chat server");
                return Ok(());
            }
        }
    }

    /// Ghost/release/identify reclaim sequence triggered by a nick
    /// collision, before retrying under the original nickname.
    async fn recover_from_nick_collision(
        &mut self,
        framed: &mut Framed<TcpStream, LinesCodec>,
    ) -> Result<(), ChatError> {
        self.state = ChatState::Recovering;
        info!("nick previously in use, recovering");
        let temp_nick = format!("{}_", self.config.nickname);
        framed.send(format!("NICK {temp_nick}")).await?;
        framed
            .send(format!("PRIVMSG nickserv :identify {} ", self.config.password))
            .await?;
        framed
            .send(format!(
                "PRIVMSG nickserv :ghost {} {}",
                self.config.nickname, self.config.password
            ))
            .await?;
        framed
            .send(format!(
                "PRIVMSG nickserv :release {} {}",
                self.config.nickname, self.config.password
            ))
            .await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        framed.send(format!("NICK {}", self.config.nickname)).await?;
        self.state = ChatState::Identifying;
        Ok(())
    }

    async fn join_channels(&mut self, framed: &mut Framed<TcpStream, LinesCodec>) -> Result<(), ChatError> {
        self.state = ChatState::Joining;
        for channel in self.config.channels.clone() {
            framed.send(format!("JOIN {channel}")).await?;
            debug!(%channel, "joined channel");
            tokio::time::sleep(RATE_LIMIT_DELAY).await;
        }
        Ok(())
    }

    async fn handle_line(
        &mut self,
        framed: &mut Framed<TcpStream, LinesCodec>,
        line: &str,
    ) -> Result<(), ChatError> {
        if is_nickname_in_use(line) {
            self.recover_from_nick_collision(framed).await?;
        }
        // Other server traffic (PING, channel chatter) is not acted on;
        // this transport only sends, it does not participate in chat.
        if let Some(rest) = line.strip_prefix("PING ") {
            framed.send(format!("PONG {rest}")).await?;
        }
        Ok(())
    }

    /// Send `message` to `channel`, splitting into ≤400-byte chunks on
    /// word boundaries and spacing consecutive sends by
    /// [`RATE_LIMIT_DELAY`].
    async fn send_rate_limited(
        &mut self,
        framed: &mut Framed<TcpStream, LinesCodec>,
        channel: &str,
        message: &str,
    ) -> Result<(), ChatError> {
        for chunk in split_message(message) {
            info!(%channel, %chunk, "sending chat message");
            framed.send(format!("PRIVMSG {channel} :{chunk}")).await?;
            tokio::time::sleep(RATE_LIMIT_DELAY).await;
        }
        Ok(())
    }
}

fn is_welcome(line: &str) -> bool {
    line.splitn(2, ' ').nth(1).map(|rest| rest.starts_with("001")).unwrap_or(false)
}

fn is_nickname_in_use(line: &str) -> bool {
    line.splitn(2, ' ').nth(1).map(|rest| rest.starts_with("433")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn welcome_and_nickname_in_use_are_recognized_by_numeric() {
        assert!(is_welcome(":server 001 nick :Welcome"));
        assert!(!is_welcome(":server 002 nick :Your host"));
        assert!(is_nickname_in_use(":server 433 * nick :Nickname is already in use"));
        assert!(!is_nickname_in_use(":server 001 nick :Welcome"));
    }

    /// Drives the transport against a hand-rolled local TCP "server"
    /// that plays the welcome/join handshake, then accepts one send.
    #[tokio::test(flavor = "multi_thread")]
    async fn connects_identifies_joins_and_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(socket, LinesCodec::new());

            // NICK, USER
            framed.next().await.unwrap().unwrap();
            framed.next().await.unwrap().unwrap();
            framed.send(":server 001 bot :Welcome".to_string()).await.unwrap();

            // identify privmsg to nickserv
            let identify = framed.next().await.unwrap().unwrap();
            assert!(identify.contains("identify"));

            // JOIN
            let join = framed.next().await.unwrap().unwrap();
            assert!(join.starts_with("JOIN #openstack-qa"));

            // PRIVMSG send
            let privmsg = framed.next().await.unwrap().unwrap();
            assert!(privmsg.starts_with("PRIVMSG #openstack-qa :hello"));
        });

        let (mut transport, handle) = ChatTransport::new(ChatConfig {
            server: "127.0.0.1".to_string(),
            port: addr.port(),
            nickname: "bot".to_string(),
            password: "secret".to_string(),
            channels: vec!["#openstack-qa".to_string()],
        });

        let run_task = tokio::spawn(async move {
            let _ = transport.run().await;
        });

        handle.send("#openstack-qa", "hello").await.unwrap();

        server.await.unwrap();
        run_task.abort();
    }
}
