mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, assign, reconcile};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    match commands.command {
        Commands::Reconcile(args) => reconcile::reconcile(args).await,
        Commands::Assign {
            names,
            prefix,
            algorithm,
        } => assign::assign(&names, &prefix, &algorithm),
    }
}
