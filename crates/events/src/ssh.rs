//! SSH-backed [`EventFeed`](crate::EventFeed): runs `gerrit
//! stream-events` over an authenticated SSH session and yields its
//! stdout line by line.

use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::path::Path;

use ssh2::Session;
use tracing::debug;

use crate::{EventFeed, EventSourceError};

/// Connection parameters for the review system's SSH event stream.
#[derive(Debug, Clone)]
pub struct SshFeedConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: String,
}

/// Owns the SSH session and the buffered reader over its stdout.
pub struct SshEventFeed {
    reader: BufReader<ssh2::Channel>,
    // Keep the session/tcp stream alive for the lifetime of the channel.
    _session: Session,
}

impl SshEventFeed {
    /// Connect, authenticate with `config.key_path`, and start the
    /// `gerrit stream-events` command.
    pub fn connect(config: &SshFeedConfig) -> Result<Self, EventSourceError> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;

        let mut session = Session::new()
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;
        session
            .userauth_pubkey_file(&config.user, None, Path::new(&config.key_path), None)
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;

        if !session.authenticated() {
            return Err(EventSourceError::Connection(
                "SSH authentication failed".to_string(),
            ));
        }

        let mut channel = session
            .channel_session()
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;
        channel
            .exec("gerrit stream-events")
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;

        debug!(host = %config.host, user = %config.user, "connected to event stream");

        Ok(Self {
            reader: BufReader::new(channel),
            _session: session,
        })
    }
}

impl EventFeed for SshEventFeed {
    fn next_line(&mut self) -> Result<String, EventSourceError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| EventSourceError::Connection(e.to_string()))?;
        if read == 0 {
            return Err(EventSourceError::Connection(
                "event stream closed".to_string(),
            ));
        }
        Ok(line)
    }
}
