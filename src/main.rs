use clap::{Parser, Subcommand};
use eyre::Result;
use rusty_dson::subcommand;

#[derive(Parser, Debug)]
#[command(version, about = "Convert DSON save files to JSON and back")]
struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file; direction is detected from its content.
    Convert {
        /// Path to the source file.
        #[arg(long, value_name = "PATH")]
        from: String,

        /// Path to the destination file.
        #[arg(long, value_name = "PATH")]
        to: String,

        /// Overwrite the destination if it already exists.
        #[arg(long)]
        force: bool,

        /// Emit the full decoded structure with every inferred field.
        #[arg(long)]
        debug: bool,
    },
    /// Browse a save interactively (stub).
    Interactive,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let app = App::parse();
    match app.command {
        Command::Convert {
            from,
            to,
            force,
            debug,
        } => subcommand::convert::run(&from, &to, force, debug),
        Command::Interactive => subcommand::interactive::run(),
    }
}
