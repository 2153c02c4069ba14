use rand::RngCore;

use crate::db;
use crate::error::Result;
use crate::settings::{load_file_settings, save_settings, shellexpand_path};

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn run(data_dir: Option<String>) -> Result<()> {
    // Only file values and explicit flags are persisted; env overrides apply
    // to this run alone.
    let mut stored = load_file_settings();
    if let Some(dir) = &data_dir {
        stored.data_dir = shellexpand_path(dir);
    }
    if stored.token_secret.is_empty() {
        stored.token_secret = generate_secret();
    }
    save_settings(&stored)?;

    let mut settings = stored.clone().with_process_env();
    if data_dir.is_some() {
        settings.data_dir = stored.data_dir;
    }
    std::fs::create_dir_all(&settings.data_dir)?;
    db::open(&settings.db_path())?;

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", settings.db_path().display());
    println!("Ready. Create a user with `fintrack signup`.");
    Ok(())
}
