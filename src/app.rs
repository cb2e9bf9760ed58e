use directories::BaseDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::client::RestTransport;
use crate::error::{ConfigError, Result};
use crate::model::Conversation;
use crate::observer::Observer;
use crate::session::Session;

const CONFIG_FILE: &str = "siggo.toml";

fn default_user_name() -> String {
    "me".to_string()
}

fn default_rest_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Shown as the sender of our own messages.
    #[serde(default = "default_user_name")]
    pub user_name: String,
    /// The account registered with signal-cli.
    #[serde(default)]
    pub user_number: String,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            user_number: String::new(),
            rest_url: default_rest_url(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join(CONFIG_FILE))
    }

    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_number.trim().is_empty() {
            return Err(ConfigError::Missing("user_number"));
        }
        Ok(())
    }
}

/// Prints the whole conversation whenever it gains a message or a status changes.
struct ConsoleObserver<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleObserver<W> {
    fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn print(&self, conversation: &Conversation) {
        if let Err(e) = self.write(conversation) {
            warn!("could not print conversation: {e}");
        }
    }

    fn write(&self, conversation: &Conversation) -> std::io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "--- {}", conversation.contact().display_name())?;
        write!(out, "{conversation}")?;
        out.flush()
    }
}

impl<W: Write + Send> Observer for ConsoleObserver<W> {
    fn new_info(&self, conversation: &Conversation) {
        self.print(conversation);
    }

    fn status_changed(&self, conversation: &Conversation) {
        self.print(conversation);
    }
}

/// Bootstraps the client: config, transport, session, then pumps stdin
/// lines of the form `<number> <text>` into `Session::send`.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from(&path)?,
        None => AppConfig::load()?,
    };
    config.validate()?;
    info!("starting session for {}", config.user_number);

    let transport = Arc::new(RestTransport::new(&config.rest_url, &config.user_number));
    let session = Arc::new(Session::new(transport, config));
    session.subscribe(Arc::new(ConsoleObserver::new(std::io::stdout())));

    let receiver = Arc::clone(&session);
    tokio::spawn(async move {
        if let Err(e) = receiver.receive().await {
            warn!("receive loop stopped: {e}");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some((number, text)) = line.trim().split_once(' ') else {
            continue;
        };
        let contact = session.contact(number);
        if let Err(e) = session.send(text.trim(), &contact).await {
            eprintln!("{e}");
        }
    }
    Ok(())
}
