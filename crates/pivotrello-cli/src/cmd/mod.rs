pub mod boards;
pub mod completions;
pub mod duplicates;
pub mod import;
pub mod wipe;

use anyhow::Result;
use pivotrello_core::config::{Config, MissingCredential, require_secret};
use pivotrello_core::retry::RetryExecutor;

use crate::api::pivotal::PivotalClient;
use crate::api::trello::TrelloClient;
use crate::output::OutputMode;

/// Credential values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CredentialFlags {
    pub pivotal_token: Option<String>,
    pub trello_key: Option<String>,
    pub trello_token: Option<String>,
}

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub output: OutputMode,
    pub credentials: CredentialFlags,
}

impl Context {
    pub fn retry(&self) -> RetryExecutor {
        RetryExecutor::new(self.config.retry_policy())
    }

    /// Progress bars are drawn for humans only.
    pub const fn show_progress(&self) -> bool {
        !self.output.is_json()
    }

    pub fn pivotal(&self) -> Result<PivotalClient> {
        let token = require_secret(
            self.credentials.pivotal_token.as_deref(),
            self.config.pivotal.token.as_deref(),
            MissingCredential {
                name: "Pivotal Tracker token",
                flag: "--pivotal-token",
                env: "PIVOTAL_TOKEN",
            },
        )?;
        Ok(PivotalClient::new(token))
    }

    pub fn trello(&self) -> Result<TrelloClient> {
        let key = require_secret(
            self.credentials.trello_key.as_deref(),
            self.config.trello.key.as_deref(),
            MissingCredential {
                name: "Trello API key",
                flag: "--trello-key",
                env: "TRELLO_KEY",
            },
        )?;
        let token = require_secret(
            self.credentials.trello_token.as_deref(),
            self.config.trello.token.as_deref(),
            MissingCredential {
                name: "Trello token",
                flag: "--trello-token",
                env: "TRELLO_TOKEN",
            },
        )?;
        Ok(TrelloClient::new(key, token))
    }
}
