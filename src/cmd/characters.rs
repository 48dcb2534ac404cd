//! Persona listing (`rpchat characters`).

use anyhow::Result;
use console::style;

use rpchat::config::Config;
use rpchat::persona::PersonaStore;
use rpchat::ui::icons::{CROSS, FOLDER};

pub fn cmd_characters(config: &Config) -> Result<()> {
    let store = PersonaStore::new(&config.characters_dir);
    let ids = store.list()?;

    println!("{}{}", FOLDER, style(store.dir().display()).dim());
    if ids.is_empty() {
        println!("No characters found. Add <id>.json files with \"name\" and \"setting\".");
        return Ok(());
    }

    for id in ids {
        match store.load(&id) {
            Ok(persona) => println!(
                "  {:<16} {}",
                style(&id).cyan().bold(),
                persona.name
            ),
            Err(e) => println!("  {:<16} {}{}", style(&id).red(), CROSS, style(format!("{:#}", e)).dim()),
        }
    }
    Ok(())
}
