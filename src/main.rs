#![windows_subsystem = "windows"]

use anyhow::Result;
use coleta::{config::AutomationConfig, gui, settings::Settings};
use tracing_subscriber;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    // Settings are loaded once here and owned by the GUI from then on
    let settings = Settings::load();
    let config = AutomationConfig::from_env()?;
    gui::launch(config, settings)?;

    Ok(())
}
