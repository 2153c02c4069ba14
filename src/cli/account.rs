use colored::Colorize;
use zeroize::Zeroize;

use crate::auth::{self, SignUp};
use crate::cli::session;
use crate::clock::system_clock;
use crate::db;
use crate::error::{FinError, Result};
use crate::settings::load_settings;

fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => rpassword::prompt_password(prompt).map_err(FinError::from),
    }
}

pub struct SignupArgs {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub username: String,
    pub email: String,
    pub password: Option<String>,
}

pub fn signup(args: SignupArgs) -> Result<()> {
    let settings = load_settings();
    let conn = db::open(&settings.db_path())?;

    let mut password = password_or_prompt(args.password, "Password: ")?;
    if password.is_empty() {
        password.zeroize();
        return Err(FinError::InvalidInput("password cannot be empty".to_string()));
    }
    let new_user = SignUp {
        first_name: args.first_name,
        last_name: args.last_name,
        date_of_birth: args.date_of_birth,
        username: args.username,
        email: args.email,
        password,
    };
    auth::sign_up(&conn, &new_user)?;
    println!("{} {}", "Created user".green(), new_user.username.bold());
    Ok(())
}

pub fn signin(login: &str, password: Option<String>) -> Result<()> {
    let settings = load_settings();
    let secret = settings.secret()?;
    let conn = db::open(&settings.db_path())?;

    let mut password = password_or_prompt(password, "Password: ")?;
    let result = auth::sign_in(&conn, login, &password);
    password.zeroize();
    let user = result?;

    let ttl = chrono::Duration::minutes(settings.token_ttl_minutes);
    let token = auth::issue_token(secret, &user.username, system_clock().utc(), ttl)?;
    session::save_token(&settings.session_path(), &token)?;
    println!("Signed in as {} (session valid for {} minutes)", user.username.bold(), settings.token_ttl_minutes);
    Ok(())
}

pub fn signout() -> Result<()> {
    let settings = load_settings();
    if session::clear(&settings.session_path())? {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}
