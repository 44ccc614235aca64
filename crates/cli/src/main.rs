//! Entry point for the command-line interface.

use thistle::args::{parse_cli, Commands, RulesCmd};
use thistle::rules::{list_rules, verify_rules};
use thistle::scan::run_scan;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    let code = match cli.command {
        Commands::Scan(args) => {
            init_tracing(args.debug);
            run_scan(args)?
        }
        Commands::Rules(cmd) => {
            init_tracing(false);
            match cmd {
                RulesCmd::Verify { path } => verify_rules(&path)?,
                RulesCmd::List { path } => list_rules(&path)?,
            }
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
