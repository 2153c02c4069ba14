use std::path::PathBuf;

use crate::cli::session::signed_in;
use crate::error::Result;
use crate::export::export_user;
use crate::settings::{load_settings, shellexpand_path};

pub fn run(output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let (conn, user) = signed_in(&settings)?;
    let dir = match output {
        Some(dir) => PathBuf::from(shellexpand_path(&dir)),
        None => PathBuf::from(&settings.data_dir).join("exports"),
    };
    let paths = export_user(&conn, user.id, &dir)?;
    println!("Wrote {}", paths.incomes.display());
    println!("Wrote {}", paths.expenses.display());
    Ok(())
}
