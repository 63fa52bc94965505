use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub addr: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub secret: String,
    pub secure: bool,
}

#[derive(Debug, Deserialize)]
pub struct Google {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// An empty `url` selects in-memory storage.
#[derive(Debug, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub privileged_role: String,
    pub default_role: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub session: Session,
    pub google: Google,
    pub database: Database,
    pub auth: Auth,
}

impl Settings {
    /// Defaults, then `config.toml`, then `APP__SECTION__KEY` variables, then
    /// the conventional plain variables (`SESSION_SECRET`, `DATABASE_URL`, ...).
    pub fn new() -> Result<Self, ConfigError> {
        let builder = defaults()?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            );
        with_plain_env(builder, |name| std::env::var(name).ok())?
            .build()?
            .try_deserialize()
    }

    pub fn persistent(&self) -> bool {
        !self.database.url.trim().is_empty()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.addr", "127.0.0.1:8080")?
        .set_default("session.secret", "")?
        .set_default("session.secure", false)?
        .set_default("google.client_id", "")?
        .set_default("google.client_secret", "")?
        .set_default("google.redirect_url", auth::DEFAULT_REDIRECT_URL)?
        .set_default("database.url", "")?
        .set_default("auth.privileged_role", "admin")?
        .set_default("auth.default_role", "user")
}

const PLAIN_ENV: [(&str, &str); 5] = [
    ("session.secret", "SESSION_SECRET"),
    ("google.client_id", "GOOGLE_CLIENT_ID"),
    ("google.client_secret", "GOOGLE_CLIENT_SECRET"),
    ("google.redirect_url", "OAUTH_REDIRECT_URL"),
    ("database.url", "DATABASE_URL"),
];

fn with_plain_env(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (key, name) in PLAIN_ENV {
        builder = builder.set_override_option(key, lookup(name))?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
        [server]
        addr = "0.0.0.0:3000"

        [google]
        client_id = "from-file"
        client_secret = "file-secret"
    "#;

    fn from_file(lookup: impl Fn(&str) -> Option<String>) -> Settings {
        let builder = defaults()
            .unwrap()
            .add_source(File::from_str(TOML, FileFormat::Toml));
        with_plain_env(builder, lookup)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_settings_defaults_and_file() {
        let settings = from_file(|_| None);
        assert_eq!(settings.server.addr, "0.0.0.0:3000");
        assert_eq!(settings.google.client_id, "from-file");
        assert_eq!(settings.google.redirect_url, auth::DEFAULT_REDIRECT_URL);
        assert_eq!(settings.auth.privileged_role, "admin");
        assert_eq!(settings.auth.default_role, "user");
        assert!(!settings.session.secure);
        assert!(!settings.persistent());
    }

    #[test]
    fn test_plain_env_overrides_file() {
        let settings = from_file(|name| match name {
            "GOOGLE_CLIENT_ID" => Some("from-env".to_string()),
            "DATABASE_URL" => Some("postgres://auth@localhost/auth".to_string()),
            _ => None,
        });
        assert_eq!(settings.google.client_id, "from-env");
        assert_eq!(settings.google.client_secret, "file-secret");
        assert!(settings.persistent());
    }
}
