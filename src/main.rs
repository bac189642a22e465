use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use bdb::cli::commands::{completions, config, entities, files, init, open, parse, paths, props};
use bdb::cli::{Cli, Commands, GlobalOpts};

/// Log to stderr; `BDB_LOG` wins over the verbosity flags
fn init_logging(global: &GlobalOpts) {
    let default = if global.verbose {
        "bdb=debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("BDB_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` ends quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => init::run(args),
        Commands::Entities(args) => entities::run_entities(args, &global),
        Commands::Path(args) => entities::run_path(args, &global),
        Commands::Components(args) => entities::run_components(args, &global),
        Commands::Free(args) => entities::run_free(args, &global),
        Commands::New(args) => entities::run_new(args, &global),
        Commands::NewComponent(args) => entities::run_new_component(args, &global),
        Commands::Resolve(args) => paths::run_resolve(args, &global),
        Commands::Relative(args) => paths::run_relative(args, &global),
        Commands::Absolute(args) => paths::run_absolute(args, &global),
        Commands::Parse(args) => parse::run(args, &global),
        Commands::Files(args) => files::run_files(args, &global),
        Commands::Revisions(args) => files::run_revisions(args, &global),
        Commands::Props(args) => props::run(args, &global),
        Commands::Open(args) => open::run(args, &global),
        Commands::Config(cmd) => config::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}
