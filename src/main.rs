use clap::Parser;
use apk_controller::cli::commands::{
    RunOptions, cmd_capture, cmd_devices, cmd_graph, cmd_run, cmd_verify,
};
use apk_controller::cli::config::{Cli, Commands, load_config, resolve_device};
use apk_controller::logging::init_logging;
use apk_controller::navigation::{cancel::CancelToken, engine::RetryPolicy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());

    // Resolve device settings: CLI > config > defaults
    let device = resolve_device(&cli, &config);

    match cli.command {
        Commands::Run {
            script,
            from,
            to,
            no_retry,
            max_transitions,
            trace,
            export_dir,
            skip_version_check,
        } => {
            let cancel = CancelToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("Cancelling at the next probe...");
                handler_token.cancel();
            })?;

            let options = RunOptions {
                from,
                to,
                policy: RetryPolicy {
                    retry: !no_retry && config.navigation.retry,
                    max_transitions: max_transitions.unwrap_or(config.navigation.max_transitions),
                },
                trace: trace.or(config.trace.path.clone()),
                export_dir: export_dir.unwrap_or_else(|| config.export.dir.clone()),
                skip_version_check,
            };

            let reached = cmd_run(&device, &script, &options, cancel)?;
            if !reached {
                std::process::exit(1);
            }
        }
        Commands::Verify {
            script,
            dump,
            screens,
        } => {
            let matched = cmd_verify(&script, &dump, &screens)?;
            if !matched {
                std::process::exit(1);
            }
        }
        Commands::Capture { script, export_dir } => {
            let export_dir = export_dir.unwrap_or_else(|| config.export.dir.clone());
            cmd_capture(&device, &script, &export_dir)?;
        }
        Commands::Graph { script } => {
            cmd_graph(&script)?;
        }
        Commands::Devices => {
            cmd_devices(&device)?;
        }
    }

    Ok(())
}
