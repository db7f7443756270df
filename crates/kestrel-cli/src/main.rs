use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use kestrel_cli::OutputFormat;
use kestrel_cli::commands::{self, run::RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author, version)]
#[command(
    about = "End-to-end UI verification harness driving a headless browser",
    long_about = "Kestrel runs declarative UI scenarios (navigate, assert URL, assert a visible \
                  element, take a screenshot) against a web application in headless Chrome, \
                  and exits with a code identifying the first kind of failure."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios and report their verdicts
    #[command(after_help = "EXIT CODES:\n  \
                            0   all scenarios passed\n  \
                            10  assertion failed\n  \
                            11  navigation error\n  \
                            12  I/O error\n  \
                            13  timeout\n  \
                            20  infrastructure error (browser unavailable)")]
    Run {
        /// Scenario files, directories or glob patterns
        #[arg(value_name = "SCENARIOS", required = true)]
        scenarios: Vec<String>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Check scenario files without running them
    Validate {
        /// Scenario files, directories or glob patterns
        #[arg(value_name = "SCENARIOS", required = true)]
        scenarios: Vec<String>,

        /// Directory screenshot paths are checked for collisions under
        #[arg(long, env = "KESTREL_ARTIFACTS_DIR", default_value = ".")]
        artifacts_dir: PathBuf,
    },

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:\n  \
                            bash, zsh, fish, powershell, elvish\n\n\
                            INSTALLATION:\n  \
                            bash: kestrel completion --shell bash >> ~/.bashrc\n  \
                            zsh:  kestrel completion --shell zsh > \"${fpath[1]}/_kestrel\"\n  \
                            fish: kestrel completion --shell fish > ~/.config/fish/completions/kestrel.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Run { scenarios, options } => {
            commands::run::execute(&scenarios, &options, cli.format)?
        }
        Commands::Validate {
            scenarios,
            artifacts_dir,
        } => commands::validate::execute(&scenarios, &artifacts_dir, cli.format)?,
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())?;
            0
        }
    };

    std::process::exit(code)
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "kestrel=debug,kestrel_cli=debug,kestrel_core=debug,kestrel_runner=debug,kestrel_browser=debug",
        )
    } else {
        EnvFilter::new("kestrel=info,kestrel_cli=info,kestrel_runner=warn,kestrel_browser=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
