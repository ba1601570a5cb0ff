use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evently_client::config::ClientConfig;
use evently_client::report::{is_ready, step_report};
use evently_core::persistence::load_draft;
use evently_core::steps::last_step;
use evently_core::wizard::Transition;
use evently_core::{WizardController, WizardError};

#[derive(Parser, Debug)]
#[command(name = "evently-draft")]
#[command(about = "Inspect and submit a saved event draft")]
#[command(version)]
struct Args {
    /// User whose draft to load
    #[arg(short, long, env = "EVENTLY_USER")]
    user: String,

    /// Submit the draft when every step is valid
    #[arg(long)]
    submit: bool,

    /// Override the draft directory
    #[arg(long)]
    draft_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evently_client=info,evently_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // --- Configuration ---
    let mut config = ClientConfig::from_env();
    if let Some(dir) = args.draft_dir {
        config.draft_dir = dir;
    }
    tracing::info!(
        api = %config.api_base_url,
        draft_dir = %config.draft_dir.display(),
        "Loaded client configuration",
    );

    let services = evently_client::build_services(&config)?;

    // --- Report ---
    let Some(snapshot) = load_draft(services.store.as_ref(), &args.user)? else {
        println!("No saved draft for {}", args.user);
        return Ok(());
    };
    println!(
        "Draft for {} saved at {} (step: {})",
        args.user,
        snapshot.saved_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.current_step.label(),
    );
    let reports = step_report(&snapshot.draft);
    for report in &reports {
        println!("{report}");
    }

    if !args.submit {
        return Ok(());
    }
    if !is_ready(&reports) {
        anyhow::bail!("Draft is not ready; fix the steps marked [!!] first");
    }

    // --- Submit ---
    let mut wizard = WizardController::open(args.user.as_str(), config.wizard.clone(), services)
        .await
        .map_err(friendly)?;
    wizard.mount();
    wizard.edit_step(last_step()).map_err(friendly)?;
    let outcome = wizard.submit().await;
    for notice in wizard.take_notices() {
        tracing::info!(level = ?notice.level, "{}", notice.message);
    }
    match outcome.map_err(friendly)? {
        Transition::Submitted(created) => {
            println!("Created event {}", created.id);
            Ok(())
        }
        Transition::Blocked { step } => {
            anyhow::bail!("Submission blocked on step {}", step.label())
        }
        other => anyhow::bail!("Unexpected wizard transition: {other:?}"),
    }
}

fn friendly(err: WizardError) -> anyhow::Error {
    tracing::error!(error = %err, "Wizard operation failed");
    anyhow::anyhow!(err.user_message())
}
