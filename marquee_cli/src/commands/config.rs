use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::{config_store, Result};
use crate::output::{format_output, OutputData};
use owo_colors::OwoColorize;

pub fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    let store = config_store(cli);
    match action {
        ConfigAction::Show => {
            let config = store.load()?;
            match cli.output {
                OutputFormat::Pretty => {
                    println!();
                    println!("{}", "Effective Configuration".bold().cyan());
                    println!("{}", "=======================".cyan());
                    println!("Config file: {}", store.path().display().dimmed());
                    if !store.path().exists() {
                        println!("{}", "(not created yet; showing defaults)".yellow());
                    }
                    println!();
                    print!("{}", serde_yaml::to_string(&config)?);
                }
                _ => format_output(&OutputData::ConfigInfo(config), &cli.output)?,
            }
        }
        ConfigAction::Path => {
            let path = store.path().display().to_string();
            match cli.output {
                OutputFormat::Pretty => println!("{}", path),
                _ => format_output(&OutputData::ConfigPath(path), &cli.output)?,
            }
        }
    }
    Ok(())
}
