use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use taskframe_core::domain::{LogLevel, RenderMode, SessionStatus, TaskUuid};
use taskframe_core::harness::{HARNESS_ORIGIN, HostHooks, InitRequest, SyntheticHost};
use taskframe_core::impls::{InMemoryFrame, ReqwestTransport};
use taskframe_core::{
    ExecutionReport, InvocationContext, MountedSession, SdkConfig, SessionHooks, TaskApiClient,
    TaskTransport,
};

const DEMO_TASK_ORIGIN: &str = "http://localhost:5173";
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "taskframe", version, about = "Embedded task protocol tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a task session against the synthetic host and print the outcome.
    Demo {
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, value_enum, default_value_t = Mode::Interaction)]
        render_mode: Mode,
    },
    /// Invoke a remote task once and print `{ success, output | error }`.
    Execute {
        #[arg(long)]
        task_id: String,
        #[arg(long, default_value = "{}")]
        inputs: String,
        #[arg(long, env = "TASKFRAME_API_TOKEN")]
        token: Option<String>,
        #[arg(long)]
        conversation_id: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        /// Host (or full origin) the task would be served from; drives the
        /// dev / prod base URL selection.
        #[arg(long, default_value = "localhost")]
        hostname: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Display,
    Interaction,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Display => RenderMode::Display,
            Mode::Interaction => RenderMode::Interaction,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = SdkConfig::from_env().context("loading configuration")?;

    match cli.command {
        Command::Demo {
            delay_ms,
            run_id,
            render_mode,
        } => demo(config, Duration::from_millis(delay_ms), run_id, render_mode.into()).await,
        Command::Execute {
            task_id,
            inputs,
            token,
            conversation_id,
            base_url,
            hostname,
        } => {
            let inputs: Value = serde_json::from_str(&inputs).context("--inputs must be JSON")?;
            let context = InvocationContext {
                api_token: token,
                conversation_id,
                api_base_url: base_url,
            };
            execute(config, TaskUuid::new(task_id), inputs, context, hostname).await
        }
    }
}

/// host 側のイベント
#[derive(Debug)]
enum HostEvent {
    Ready(String),
    Complete(Value),
}

async fn demo(
    config: SdkConfig,
    delay: Duration,
    run_id: Option<String>,
    render_mode: RenderMode,
) -> Result<()> {
    let frame = InMemoryFrame::shared(DEMO_TASK_ORIGIN);
    let mut host = SyntheticHost::standalone(frame.clone());

    let (tx, mut events) = mpsc::unbounded_channel();
    let ready_tx = tx.clone();
    let _host_listener = host.listen(
        HostHooks::new()
            .on_ready(move |p| {
                let _ = ready_tx.send(HostEvent::Ready(p.version.clone()));
            })
            .on_complete(move |p| {
                let _ = tx.send(HostEvent::Complete(p.output.clone()));
            })
            .on_log(|p| {
                tracing::info!(run_id = %p.run_id, level = ?p.level, "task: {}", p.message)
            }),
    );

    let transport = TaskTransport::standalone(frame).with_target_origin(config.target_origin);
    let mounted = MountedSession::mount(
        transport,
        SessionHooks::new().on_init(|run_id| tracing::info!(%run_id, "run started")),
        config.debug,
    )
    .context("mounting session")?;
    let session = mounted.handle();

    match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Some(HostEvent::Ready(version))) => tracing::info!(%version, "task is ready"),
        Ok(other) => return Err(anyhow!("expected READY, got {other:?}")),
        Err(_) => return Err(anyhow!("timed out waiting for READY")),
    }

    let mut request = InitRequest::new()
        .with_delay(delay)
        .with_render_mode(render_mode)
        .with_inputs(json!({ "greeting": "hello" }));
    if let Some(run_id) = run_id {
        request = request.with_run_id(run_id);
    }
    let run_id = host.init(request).await;

    let mut states = session.watch();
    tokio::time::timeout(
        EVENT_TIMEOUT,
        states.wait_for(|s| s.status == SessionStatus::Ready),
    )
    .await
    .context("timed out waiting for INIT to be applied")?
    .context("session closed before INIT")?;

    let inputs = session.inputs().unwrap_or(Value::Null);
    session.log(LogLevel::Info, "echoing inputs", None);
    session
        .complete(json!({ "echo": inputs }))
        .context("completing run")?;

    match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Some(HostEvent::Complete(output))) => {
            tracing::info!(%run_id, origin = HARNESS_ORIGIN, "host received COMPLETE");
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Ok(other) => return Err(anyhow!("expected COMPLETE, got {other:?}")),
        Err(_) => return Err(anyhow!("timed out waiting for COMPLETE")),
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    mounted.unmount();
    Ok(())
}

async fn execute(
    config: SdkConfig,
    task_id: TaskUuid,
    inputs: Value,
    context: InvocationContext,
    hostname: String,
) -> Result<()> {
    let transport = Arc::new(ReqwestTransport::new().context("building HTTP client")?);
    let client = if hostname.contains("://") {
        TaskApiClient::for_origin(transport, config.api, &hostname)
    } else {
        TaskApiClient::new(transport, config.api, hostname)
    };
    tracing::info!(%task_id, base_url = %client.base_url(&context), "invoking");

    let report = ExecutionReport::from(
        client
            .execute_task::<Value>(&task_id, inputs, &context)
            .await,
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    match report.error {
        Some(error) => Err(anyhow!(error).context(format!("task {task_id} failed"))),
        None => Ok(()),
    }
}
