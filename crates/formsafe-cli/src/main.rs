use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Target;

#[derive(Parser)]
#[command(name = "formsafe")]
#[command(about = "formsafe CLI - inspect and drive persisted form state", long_about = None)]
struct Cli {
    /// Storage root (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML file with persistence settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Form id, overrides the one in --config
    #[arg(long, global = true)]
    form: Option<String>,

    /// Extra file field, added to the ones in --config (repeatable)
    #[arg(long = "file-field", global = true)]
    file_fields: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the form and print what was restored
    Status,
    /// Set one field; VALUE is parsed as JSON when it is valid JSON
    Set { field: String, value: String },
    /// Replace the files of a field
    Attach {
        field: String,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// MIME type recorded for every file
        #[arg(long, default_value = "")]
        mime: String,
    },
    /// Mount, then signal a clean close
    Close,
    /// Remove everything stored for the form
    Clear {
        /// Also put the fields back to their initial values
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let target = Target::resolve(
        cli.data_dir,
        cli.config.as_deref(),
        cli.form,
        cli.file_fields,
    )?;
    formsafe_application::init_tracing(target.config.error_reporting);

    match cli.command {
        Commands::Status => commands::status::run(&target).await?,
        Commands::Set { field, value } => commands::edit::set(&target, &field, &value).await?,
        Commands::Attach { field, paths, mime } => {
            commands::edit::attach(&target, &field, &paths, &mime).await?
        }
        Commands::Close => commands::lifecycle::close(&target).await?,
        Commands::Clear { reset } => commands::lifecycle::clear(&target, reset).await?,
    }

    Ok(())
}
