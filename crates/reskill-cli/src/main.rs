mod cmd;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reskill",
    about = "Run skill-evolution prompt templates against a model rotation",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a prompt template and execute it against the model rotation
    Run(cmd::run::RunArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        // Session failures carry their own exit code; everything else is 1.
        let code = e
            .downcast_ref::<prompt_runner::RunnerError>()
            .map(prompt_runner::RunnerError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
