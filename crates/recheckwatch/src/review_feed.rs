//! SSH-backed [`ReviewFeed`]: posts review comments via `gerrit
//! review` over the same kind of authenticated SSH session the event
//! source consumes.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;

use async_trait::async_trait;
use recheckwatch_report::ReviewFeed;
use ssh2::Session;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SshReviewFeedConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: String,
}

pub struct SshReviewFeed {
    config: SshReviewFeedConfig,
}

impl SshReviewFeed {
    pub fn new(config: SshReviewFeedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ReviewFeed for SshReviewFeed {
    async fn post_comment(&self, project: &str, change_id: &str, message: &str) -> Result<(), String> {
        let config = self.config.clone();
        let project = project.to_string();
        let change_id = change_id.to_string();
        let message = message.to_string();

        tokio::task::spawn_blocking(move || run_gerrit_review(&config, &project, &change_id, &message))
            .await
            .map_err(|e| e.to_string())?
    }
}

fn run_gerrit_review(
    config: &SshReviewFeedConfig,
    project: &str,
    change_id: &str,
    message: &str,
) -> Result<(), String> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(|e| e.to_string())?;
    let mut session = Session::new().map_err(|e| e.to_string())?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| e.to_string())?;
    session
        .userauth_pubkey_file(&config.user, None, Path::new(&config.key_path), None)
        .map_err(|e| e.to_string())?;

    let mut channel = session.channel_session().map_err(|e| e.to_string())?;
    let command = format!(
        "gerrit review --project {} --message '{}' {}",
        shell_quote(project),
        shell_quote(message),
        change_id
    );
    debug!(%change_id, "posting review comment");
    channel.exec(&command).map_err(|e| e.to_string())?;

    let mut output = String::new();
    channel.read_to_string(&mut output).ok();
    channel.wait_close().ok();

    let exit_status = channel.exit_status().map_err(|e| e.to_string())?;
    if exit_status != 0 {
        return Err(format!("gerrit review exited with status {exit_status}: {output}"));
    }
    Ok(())
}

/// Escape a string for embedding inside single quotes in a shell
/// command sent over the SSH channel.
fn shell_quote(s: &str) -> String {
    s.replace('\'', r"'\''")
}
