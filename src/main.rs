use peelkit::cli::commands::{CliArgs, Commands};
use peelkit::cli::handlers::{handle_build_script, handle_detect};
use peelkit::util::logging::{config_from_env, init_logging, parse_level};
use peelkit::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("peelkit v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args),
        Commands::BuildScript(build_args) => handle_build_script(build_args),
    };

    std::process::exit(exit_code);
}

/// Flags override `PEELKIT_LOG_LEVEL`; the output format always comes from
/// the environment.
fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();
    if let Some(level) = &args.log_level {
        config.level = parse_level(level);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
