mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;
use crate::output::Output;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose, cli.global.log_json);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout is reserved for rendered output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "aquarium", &mut std::io::stdout());
            Ok(())
        }

        // Config commands don't need a device
        Command::Config(args) => {
            let cfg = config::load_config_or_default();
            let out = output_for(&global, &cfg);
            commands::config_cmd::handle(args, &global, &out)
        }

        // All other commands talk to the device
        cmd => {
            let cfg = config::load_config()?;
            let out = output_for(&global, &cfg);
            let resolved = config::resolve(&global, &cfg)?;

            tracing::debug!(
                command = ?cmd,
                profile = %resolved.profile_name,
                address = %resolved.address,
                "dispatching command"
            );
            commands::dispatch(cmd, resolved, &out).await
        }
    }
}

fn output_for(global: &GlobalOpts, cfg: &config::Config) -> Output {
    Output::new(
        config::output_format(global, cfg),
        config::color_mode(global, cfg),
        global.quiet,
    )
}
