// Plex account authentication
// Stored token first, then username/password (optionally with a 2FA code)

use super::traits::MediaAccount;
use super::{client_identifier, with_plex_headers, PlexServer, Resource, PLEX_TV};
use crate::config::PlexConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    auth_token: String,
    #[serde(default)]
    username: String,
}

/// An authenticated plex.tv account
pub struct PlexAccount {
    token: String,
    client_id: String,
    username: String,
}

impl PlexAccount {
    /// Log in, preferring the token stored at `token_file`.
    ///
    /// Only a failed credential login is an error. A bad stored token falls
    /// back to credentials and a failed token save is just logged.
    pub fn login(config: &PlexConfig, token_file: &Path) -> Result<Self> {
        let client_id = client_identifier(&config.username);

        let account = match Self::stored(token_file, &client_id) {
            Some(a) => a,
            None => {
                let password = password_with_code(&config.password, config.two_factor)?;
                Self::sign_in(&config.username, &password, &client_id)
                    .context("Failed to authenticate with Plex")?
            }
        };

        log::info!("Authenticated with Plex as {}", account.username);

        account.persist_token(token_file);

        Ok(account)
    }

    /// The account behind a stored token, or `None` to fall back to credentials
    fn stored(token_file: &Path, client_id: &str) -> Option<Self> {
        if !token_file.is_file() {
            return None;
        }

        match Self::from_token_file(token_file, client_id) {
            Ok(account) => Some(account),
            Err(e) => {
                log::error!("Failed to authenticate with Plex using token, {:#}", e);
                None
            }
        }
    }

    fn from_token_file(path: &Path, client_id: &str) -> Result<Self> {
        let token = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("token file {} is empty", path.display());
        }

        let user: UserResponse = with_plex_headers(
            attohttpc::get(format!("{}/api/v2/user", PLEX_TV)),
            client_id,
        )
        .header("X-Plex-Token", token)
        .send()
        .context("Failed to reach plex.tv")?
        .error_for_status()
        .context("plex.tv rejected the stored token")?
        .json()
        .context("Failed to parse plex.tv user")?;

        Ok(Self {
            token: token.to_string(),
            client_id: client_id.to_string(),
            username: user.username,
        })
    }

    fn sign_in(username: &str, password: &str, client_id: &str) -> Result<Self> {
        let request = attohttpc::post(format!("{}/api/v2/users/signin", PLEX_TV))
            .form(&[("login", username), ("password", password)])
            .context("Failed to encode sign-in form")?;

        let user: UserResponse = with_plex_headers(request, client_id)
            .send()
            .context("Failed to reach plex.tv")?
            .error_for_status()
            .context("plex.tv rejected the credentials")?
            .json()
            .context("Failed to parse plex.tv sign-in response")?;

        Ok(Self {
            token: user.auth_token,
            client_id: client_id.to_string(),
            username: if user.username.is_empty() {
                username.to_string()
            } else {
                user.username
            },
        })
    }

    /// Save the token for the next run; failure only costs a login next time
    fn persist_token(&self, path: &Path) -> bool {
        match self.save_token(path) {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "Failed to save Plex authentication token for future logins, {:#}",
                    e
                );
                false
            }
        }
    }

    fn save_token(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create token directory")?;
        }

        fs::write(path, &self.token)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }
}

impl MediaAccount for PlexAccount {
    type Server = PlexServer;

    fn resources(&self) -> Result<Vec<Resource>> {
        with_plex_headers(
            attohttpc::get(format!("{}/api/v2/resources", PLEX_TV)),
            &self.client_id,
        )
        .param("includeHttps", "1")
        .param("includeRelay", "1")
        .header("X-Plex-Token", &self.token)
        .send()
        .context("Failed to reach plex.tv")?
        .error_for_status()
        .context("plex.tv refused the resource list")?
        .json()
        .context("Failed to parse plex.tv resources")
    }

    fn connect(&self, resource: &Resource) -> Result<PlexServer> {
        let token = resource.access_token.as_deref().unwrap_or(&self.token);

        for connection in resource.preferred_connections() {
            match PlexServer::connect(&resource.name, &connection.uri, token, &self.client_id) {
                Ok(server) => return Ok(server),
                Err(e) => log::debug!("{} unreachable via {}: {:#}", resource.name, connection.uri, e),
            }
        }

        anyhow::bail!("no connection to {} answered", resource.name)
    }
}

/// Ask for a verification code when two-factor is on and append it
fn password_with_code(password: &str, two_factor: bool) -> Result<String> {
    if !two_factor {
        return Ok(password.to_string());
    }

    print!("Enter Verification Code: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;

    Ok(append_code(password, &code))
}

fn append_code(password: &str, code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        log::warn!("Two-Factor Authentication is enabled but code was not supplied");
        password.to_string()
    } else {
        format!("{}{}", password, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(token: &str) -> PlexAccount {
        PlexAccount {
            token: token.to_string(),
            client_id: client_identifier("alice"),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn persists_token_creating_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plex-presence").join("auth.txt");

        assert!(account("tok").persist_token(&path));
        assert_eq!(fs::read_to_string(&path).unwrap(), "tok");
    }

    #[test]
    fn unwritable_token_file_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        assert!(!account("tok").persist_token(&blocker.join("auth.txt")));
    }

    #[test]
    fn empty_token_file_falls_back_to_credentials() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("auth.txt");
        fs::write(&path, "  \n").unwrap();

        let client_id = client_identifier("alice");
        assert!(PlexAccount::from_token_file(&path, &client_id).is_err());
        assert!(PlexAccount::stored(&path, &client_id).is_none());
    }

    #[test]
    fn missing_token_file_falls_back_to_credentials() {
        let tmp = TempDir::new().unwrap();
        let client_id = client_identifier("alice");

        assert!(PlexAccount::stored(&tmp.path().join("auth.txt"), &client_id).is_none());
    }

    #[test]
    fn appends_verification_code() {
        assert_eq!(append_code("secret", "123456\n"), "secret123456");
    }

    #[test]
    fn blank_code_leaves_password() {
        assert_eq!(append_code("secret", "   \n"), "secret");
    }

    #[test]
    fn no_prompt_without_two_factor() {
        assert_eq!(password_with_code("secret", false).unwrap(), "secret");
    }

    #[test]
    fn parses_sign_in_response() {
        let user: UserResponse =
            serde_json::from_str(r#"{"id": 1, "username": "alice", "authToken": "tok"}"#).unwrap();
        assert_eq!(user.auth_token, "tok");
        assert_eq!(user.username, "alice");
    }
}
