use ballotbox::cli::{self, Cli, Command, ConfigCommand};
use ballotbox::{config, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let cfg = config::load_config()?;
            logging::init_logging(&cfg.logging)?;
            cli::handle_run(cfg).await?;
        }
        Command::ParseDuration { input } => cli::handle_parse_duration(&input)?,
        Command::Results { data_dir } => cli::handle_results(data_dir)?,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show()?,
        Command::Config(ConfigCommand::Path) => cli::handle_config_path(),
        Command::Config(ConfigCommand::Schema) => cli::handle_config_schema()?,
        Command::Version => cli::handle_version(),
    }
    Ok(())
}
