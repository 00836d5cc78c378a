//! CLI module.
//!
//! Drives a [`DebugContext`] against a real backend and prints the view
//! events to stdout.
//!
//! ```ignore
//! use debugscope::cli::{parse_args, run_cli_command};
//! use debugscope::config::DebugConfig;
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command, DebugConfig::from_env()?).await?;
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use version::{version_line, VERSION};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{FileSessionStore, InMemorySessionStore, ReqwestHttpClient};
use crate::client::StreamRequest;
use crate::config::DebugConfig;
use crate::engine::DebugContext;
use crate::error::DebugError;
use crate::render::{format_metrics, ConsoleRenderer};
use crate::stream::{StreamController, StreamOutcome};
use crate::traits::SessionStore;

/// Execute a parsed command.
pub async fn run_cli_command(command: CliCommand, config: DebugConfig) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Invalid(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            Err(eyre!("invalid arguments: {}", message))
        }
        CliCommand::Replay {
            session_id,
            details,
        } => {
            let (controller, mut ctx) = build(&config, details);
            ctx.bind_session(&session_id);
            controller
                .replay_manager()
                .full_replay(&mut ctx)
                .await
                .map_err(report)?;
            print_summary(&ctx);
            Ok(())
        }
        CliCommand::Watch {
            session_id,
            details,
        } => {
            let (mut controller, mut ctx) = build(&config, details);
            ctx.bind_session(&session_id);
            controller
                .replay_manager()
                .full_replay(&mut ctx)
                .await
                .map_err(report)?;

            let stop = ctrl_c_token();
            controller.scheduler_mut().arm();
            let reason = controller.poll(&mut ctx, &stop).await.map_err(report)?;
            info!(?reason, "Stopped watching");
            print_summary(&ctx);
            Ok(())
        }
        CliCommand::Ask {
            question,
            session_id,
            once,
            details,
        } => {
            let (mut controller, mut ctx) = build(&config, details);
            match session_id {
                Some(id) => ctx.bind_session(&id),
                None => controller.new_session(&mut ctx).await,
            }
            let request = StreamRequest::new(config.user_id.clone(), question)
                .with_session_id(ctx.session_id().map(str::to_string));

            if once {
                controller
                    .send_once(&mut ctx, &request)
                    .await
                    .map_err(report)?;
            } else {
                let cancel = ctrl_c_token();
                let outcome = controller
                    .start(&mut ctx, &request, cancel)
                    .await
                    .map_err(report)?;
                if outcome == StreamOutcome::Cancelled {
                    if let Err(e) = controller.cancel(&mut ctx).await {
                        warn!(error = %e, "Backend cancel failed");
                    }
                    controller.wait_for_cancel_settle(&mut ctx).await;
                }
            }
            print_summary(&ctx);
            Ok(())
        }
        CliCommand::Cancel { session_id } => {
            let (mut controller, mut ctx) = build(&config, false);
            ctx.bind_session(&session_id);
            controller.cancel(&mut ctx).await.map_err(report)?;
            let settled = controller.wait_for_cancel_settle(&mut ctx).await;
            println!(
                "session {} is {}{}",
                session_id,
                ctx.session().status,
                if settled { "" } else { " (still settling)" }
            );
            Ok(())
        }
    }
}

fn build(config: &DebugConfig, details: bool) -> (StreamController, DebugContext) {
    let store: Arc<dyn SessionStore> = match FileSessionStore::new() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Session id will not persist");
            Arc::new(InMemorySessionStore::new())
        }
    };
    let renderer = ConsoleRenderer::stdout().with_details(details);
    let ctx = DebugContext::new(Box::new(renderer), store);

    let http = Arc::new(ReqwestHttpClient::new());
    let controller = StreamController::new(config.api_client(http), config.stream_settings());
    (controller, ctx)
}

/// Print the user-facing side of `err` and turn it into a report.
fn report(err: impl Into<DebugError>) -> color_eyre::Report {
    let err = err.into();
    eprintln!("{} ({})", err.user_message(), err.recovery_hint());
    warn!(code = err.error_code(), category = %err.category(), "Command failed");
    eyre!(err)
}

/// Token cancelled on the first Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            trigger.cancel();
        }
    });
    token
}

fn print_summary(ctx: &DebugContext) {
    println!();
    if let Some(id) = ctx.session_id() {
        println!("session {} ({})", id, ctx.session().status);
    }
    for line in format_metrics(&ctx.metrics()) {
        println!("{}", line);
    }
}
