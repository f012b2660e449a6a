//! Keyring integration for the inference API token
//! Falls back to file storage if keyring is unavailable

use anyhow::{Result, Context};
use std::path::PathBuf;
use std::fs;

const SERVICE_NAME: &str = "mani";
const HF_TOKEN_USERNAME: &str = "huggingface-api-token";
const HF_TOKEN_FILE: &str = "hf_token.txt";

/// Environment variable that overrides stored tokens
pub const HF_TOKEN_ENV: &str = "HF_API_TOKEN";

/// Get the path for the fallback token file
fn token_file_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "mani", "mani")
        .context("Failed to get project directories")?;
    let dir = base.config_dir();
    fs::create_dir_all(dir).context("Failed to create config directory")?;
    Ok(dir.join(HF_TOKEN_FILE))
}

/// Store the token - tries keyring first, falls back to file
pub fn set_hf_token(token: &str) -> Result<()> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, HF_TOKEN_USERNAME) {
        if entry.set_password(token).is_ok() {
            return Ok(());
        }
    }

    save_to_file(token)?;
    println!("Note: Using file-based storage (keyring unavailable)");
    Ok(())
}

fn save_to_file(token: &str) -> Result<()> {
    let path = token_file_path()?;
    fs::write(&path, token).context("Failed to write token file")?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }

    Ok(())
}

/// Get the token - environment, then keyring, then file
pub fn get_hf_token() -> Result<String> {
    if let Ok(token) = std::env::var(HF_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, HF_TOKEN_USERNAME) {
        if let Ok(token) = entry.get_password() {
            return Ok(token);
        }
    }

    let path = token_file_path()?;
    let token = fs::read_to_string(&path)
        .context("Failed to read API token. Run 'mani config --set-hf-token YOUR_TOKEN' first.")?;
    Ok(token.trim().to_string())
}

/// Delete the token from both keyring and file
pub fn delete_hf_token() -> Result<()> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, HF_TOKEN_USERNAME) {
        let _ = entry.delete_credential();
    }

    let path = token_file_path()?;
    if path.exists() {
        fs::remove_file(&path).context("Failed to delete token file")?;
    }

    Ok(())
}

/// Check if a token is available from any source
pub fn has_hf_token() -> bool {
    get_hf_token().map(|t| !t.is_empty()).unwrap_or(false)
}
