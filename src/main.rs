use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_orchestrator::{
    create_router, AppState, Config, DetachedMedia, HttpCredentialClient, HttpReportClient,
    InterviewOrchestrator, NatsRoomTransport, Session, SessionContext,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interview-orchestrator")]
#[command(about = "Voice interview session orchestrator")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/interview-orchestrator")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the room credential HTTP API
    Serve,

    /// Join one interview session and wait for its report
    Join {
        #[arg(long)]
        session_id: String,

        /// Participant display name
        #[arg(long, default_value = "Candidate")]
        name: String,

        /// Question count of the interview, until the backend says otherwise
        #[arg(long, default_value = "0")]
        questions: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Join {
            session_id,
            name,
            questions,
        } => join(cfg, session_id, name, questions).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let app = create_router(AppState::from_config(&cfg));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Credential API listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn join(cfg: Config, session_id: String, name: String, questions: u32) -> Result<()> {
    let orchestrator = InterviewOrchestrator::from_config(
        &cfg,
        Arc::new(HttpCredentialClient::new(
            cfg.service.credential_base_url.clone(),
            cfg.realtime.room_prefix.clone(),
        )),
        Arc::new(NatsRoomTransport::new()),
        Arc::new(HttpReportClient::from_config(&cfg.report)),
    );

    let mut ctx = SessionContext::new(Session::new(session_id, &cfg.realtime.room_prefix), questions);
    let leave = CancellationToken::new();
    let cancel = CancellationToken::new();

    // First Ctrl-C leaves the room, a second one abandons the report wait
    {
        let leave = leave.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Leave requested");
                leave.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Abandoning report wait");
                cancel.cancel();
            }
        });
    }

    let navigation = orchestrator
        .run(&mut ctx, &name, Box::new(DetachedMedia::new()), &leave, &cancel)
        .await;

    for fragment in ctx.transcript() {
        println!("[{:?}] {}", fragment.speaker_role, fragment.text);
    }
    for notice in ctx.notices() {
        println!("! {}", notice.message());
    }

    match navigation {
        Some(nav) => println!("{}", serde_json::to_string_pretty(&nav)?),
        None => info!("No navigation, session abandoned"),
    }

    Ok(())
}
