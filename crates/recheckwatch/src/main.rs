//! Process entry point: parses the CLI, loads configuration, wires the
//! components described in SPEC_FULL.md §4 together, and runs the
//! orchestrator loop alongside the chat transport task.

mod app_config;
mod cli;
mod orchestrator;
mod review_feed;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use recheckwatch_chat::{ChatConfig, ChatTransport};
use recheckwatch_classify::Classifier;
use recheckwatch_events::ssh::{SshEventFeed, SshFeedConfig};
use recheckwatch_events::FilterConfig;
use recheckwatch_model::channel::{ChannelConfig, ChannelConfigDocument};
use recheckwatch_readiness::{ReadinessConfig, ReadinessGate};
use recheckwatch_report::Reporter;
use recheckwatch_search::{SearchClient, SearchConfig};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use app_config::AppConfig;
use cli::Cli;
use orchestrator::Orchestrator;
use review_feed::{SshReviewFeed, SshReviewFeedConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load(&cli.conffile)
        .with_context(|| format!("loading configuration from {}", cli.conffile))?;

    let channel_config = load_channel_config(&config.ircbot.channel_config)
        .with_context(|| format!("loading channel config from {}", config.ircbot.channel_config))?;

    let filter_config = build_filter_config(&config)?;

    let search_client = Arc::new(SearchClient::new(SearchConfig {
        base_url: config.data_source.base_url.clone(),
        index_template: config.data_source.index_template.clone(),
        timeout_secs: config.data_source.timeout_secs,
    }));

    let readiness = ReadinessGate::new(search_client.clone(), ReadinessConfig::default());
    let classifier = Classifier::new(search_client, config.recheckwatch.catalog_dir.clone());

    let review_feed = Arc::new(SshReviewFeed::new(SshReviewFeedConfig {
        host: config.event_source.host.clone(),
        port: config.event_source.port,
        user: config.event_source.user.clone(),
        key_path: config.event_source.key.clone(),
    }));

    let chat_handle = if cli.noirc {
        None
    } else {
        let (mut transport, handle) = ChatTransport::new(ChatConfig {
            server: config.ircbot.server.clone(),
            port: config.ircbot.port,
            nickname: config.ircbot.nick.clone(),
            password: config.ircbot.pass.clone(),
            channels: channel_config.channels().map(str::to_string).collect(),
        });
        // The chat transport runs in its own task for the life of the
        // process; the orchestrator only ever talks to it through
        // `ChatHandle::send`.
        tokio::spawn(async move {
            if let Err(e) = transport.run().await {
                tracing::error!(error = %e, "chat transport exited");
            }
        });
        Some(handle)
    };

    let reporter = Reporter::new(chat_handle, review_feed, channel_config, cli.nocomment)
        .with_check_queue_chat_suppression(config.recheckwatch.suppress_check_queue_chat);

    let event_feed = SshEventFeed::connect(&SshFeedConfig {
        host: config.event_source.host.clone(),
        port: config.event_source.port,
        user: config.event_source.user.clone(),
        key_path: config.event_source.key.clone(),
    })
    .context("connecting to the review event stream")?;

    let mut orchestrator = Orchestrator::new(
        Box::new(event_feed),
        filter_config,
        readiness,
        classifier,
        reporter,
    );

    orchestrator.run().await;
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "recheckwatch=debug" } else { "recheckwatch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_channel_config(path: &str) -> anyhow::Result<ChannelConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| app_config::ConfigError::ChannelConfigMissing(path.to_string()))?;
    let doc: ChannelConfigDocument = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing channel config YAML at {path}"))?;
    Ok(ChannelConfig::from_document(doc))
}

fn build_filter_config(config: &AppConfig) -> anyhow::Result<FilterConfig> {
    let gating_job_patterns = config
        .recheckwatch
        .gating_job_patterns
        .iter()
        .map(|pattern| Regex::new(pattern).with_context(|| format!("invalid gating job pattern {pattern:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(FilterConfig {
        ci_username: config.recheckwatch.ci_username.clone(),
        failure_line: FilterConfig::default_failure_line(),
        suppressed_job_substrings: config.recheckwatch.suppressed_job_substrings.clone(),
        suppress_nonvoting_annotation: config.recheckwatch.suppress_nonvoting_annotation,
        gating_job_patterns,
    })
}
