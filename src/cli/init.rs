use std::path::PathBuf;

use crate::error::Result;
use crate::rules::RuleSet;
use crate::settings::{config_dir, load_settings, save_settings, settings_file_exists, shellexpand_path, SALT_ENV};

pub fn run(output_dir: Option<String>, force: bool) -> Result<()> {
    let mut settings = load_settings()?;
    if let Some(dir) = output_dir {
        settings.output_dir = shellexpand_path(&dir);
    }
    let existed = settings_file_exists();
    save_settings(&settings)?;
    std::fs::create_dir_all(&settings.output_dir)?;

    let rules_path = PathBuf::from(shellexpand_path(&settings.rules_path));
    if force || !rules_path.exists() {
        if let Some(parent) = rules_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&rules_path, format!("{}\n", RuleSet::builtin()?.to_json()?))?;
        println!("Wrote rules to {}", rules_path.display());
    } else {
        println!("Kept existing rules at {}", rules_path.display());
    }

    let verb = if existed { "Updated" } else { "Created" };
    println!("{verb} settings in {}", config_dir().display());
    println!("Output tables go to {}", settings.output_dir);
    println!(
        "Provide the hashing salt via {SALT_ENV} or {}",
        config_dir().join("secret.json").display()
    );
    Ok(())
}
