use std::env;

use anyhow::{Context, Result, bail};

const DEFAULT_USERS_FILE: &str = "users.json";
const DEFAULT_WEBAPP_URL: &str = "https://your-webapp-url.com";
const DEFAULT_PORT: u16 = 3000;

// Loads .env (if present) and checks the variables the bot cannot run
// without. Optional variables are read lazily by the accessors below.
pub fn load_environment() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("TELOXIDE_TOKEN").unwrap_or_default().trim().is_empty() {
        bail!("TELOXIDE_TOKEN must be set");
    }
    if admin_id().is_empty() {
        bail!("ADMIN_ID must be set");
    }

    Ok(())
}

pub fn admin_id() -> String {
    env::var("ADMIN_ID").unwrap_or_default().trim().to_string()
}

pub fn users_file() -> String {
    match env::var("USERS_FILE") {
        Ok(path) if !path.trim().is_empty() => path,
        _ => DEFAULT_USERS_FILE.to_string(),
    }
}

pub fn webapp_url() -> String {
    match env::var("WEBAPP_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_WEBAPP_URL.to_string(),
    }
}

// None selects long polling.
pub fn webhook_url() -> Option<String> {
    match env::var("WEBHOOK_URL") {
        Ok(url) if !url.trim().is_empty() => {
            Some(url.trim().trim_end_matches('/').to_string())
        }
        _ => None,
    }
}

pub fn port() -> Result<u16> {
    match env::var("PORT") {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u16>()
            .with_context(|| format!("invalid PORT value: {value}")),
        _ => Ok(DEFAULT_PORT),
    }
}
