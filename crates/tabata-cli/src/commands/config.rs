use clap::Subcommand;
use tabata_core::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a config file populated with the defaults
    Init,
    /// Print the config file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load()?;
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigAction::Init => {
            let path = Settings::config_path()?;
            if path.exists() {
                eprintln!("config already exists at {}", path.display());
                return Ok(());
            }
            Settings::default().save()?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Settings::config_path()?.display());
        }
    }
    Ok(())
}
