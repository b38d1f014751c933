//! Action dispatch.
//!
//! The [`Executor`] turns the action named on the command line into either
//! a local command or a remote one:
//!
//! | Action | Effect |
//! |--------|--------|
//! | `login` | Renew the token, or ask for credentials |
//! | `help`, `-h`, `--help` | Banner, then the remote `list` |
//! | `info` | Banner, then the remote `info` |
//! | `createlink <ns>...` | Install namespace links (local namespace only) |
//! | `do <action> <args>...` | Run a fully qualified action (local namespace only) |
//! | anything else | Run `<namespace><action>` remotely |

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::{Invocation, Linker};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::SharedSink;
use crate::protocol::Descriptor;
use crate::transport::{Session, SessionOptions};

use super::banner::banner;
use super::http::{ApiClient, AuthGrant};

// ============================================================================
// Types
// ============================================================================

/// How remote actions reach the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// WebSocket session with streamed output.
    #[default]
    Stream,
    /// One `POST /action/<action>` request.
    Http,
}

/// Supplies a username and password for `login`.
pub trait CredentialSource: Send {
    /// Returns `(username, password)`.
    fn credentials(&mut self) -> Result<(String, String)>;
}

/// Asks on the terminal, without echoing the password.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CredentialSource for TerminalPrompt {
    fn credentials(&mut self) -> Result<(String, String)> {
        println!("Existing Auth-token (if existent) is expired\nEnter Username:");
        io::stdout().flush()?;

        let mut username = String::new();
        io::stdin().lock().read_line(&mut username)?;

        println!("Password:");
        io::stdout().flush()?;
        let password = rpassword::read_password().map_err(|e| {
            eprintln!(
                "\n\nReading password failed. If you use MSYS2/MINGW/Cygwin/Git-Bash, \
                 please prefix the command with 'winpty'."
            );
            Error::Io(e)
        })?;
        println!();

        Ok((username, password))
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Runs one command-line action.
pub struct Executor {
    config: Config,
    config_path: PathBuf,
    invocation: Invocation,
    api: ApiClient,
    sink: SharedSink,
    transport: Transport,
    session_options: SessionOptions,
    credentials: Box<dyn CredentialSource>,
}

impl Executor {
    /// Creates an executor for the given config and invocation.
    pub fn new(
        config: Config,
        config_path: impl Into<PathBuf>,
        invocation: Invocation,
        sink: SharedSink,
    ) -> Result<Self> {
        let api = ApiClient::new(&config.url, config.auth_token.clone())?;

        Ok(Self {
            config,
            config_path: config_path.into(),
            invocation,
            api,
            sink,
            transport: Transport::default(),
            session_options: SessionOptions::default(),
            credentials: Box::new(TerminalPrompt),
        })
    }

    /// Selects how remote actions are sent.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Overrides the streaming session options.
    #[must_use]
    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }

    /// Replaces the terminal prompt used by `login`.
    #[must_use]
    pub fn with_credentials(mut self, source: impl CredentialSource + 'static) -> Self {
        self.credentials = Box::new(source);
        self
    }

    /// The current config, including any token stored during this run.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `action` and returns the exit code.
    pub async fn execute(&mut self, action: &str, params: &[String]) -> Result<u8> {
        let action = action.trim_matches(['\r', '\n', ' ']).to_lowercase();
        debug!(%action, params = params.len(), namespace = %self.invocation.namespace, "Executing");

        match action.as_str() {
            "login" => {
                self.login().await?;
                Ok(0)
            }
            "-h" | "--help" | "help" => {
                self.sink.write(Descriptor::Stdout, &banner());
                self.exec_remote("list", &[]).await
            }
            "info" => {
                self.sink.write(Descriptor::Stdout, &banner());
                self.exec_remote("info", &[]).await
            }
            _ if self.invocation.is_internal() => self.exec_internal(&action, params).await,
            _ => {
                let qualified = self.invocation.qualify(&action);
                self.exec_remote(&qualified, params).await
            }
        }
    }

    async fn exec_internal(&mut self, action: &str, params: &[String]) -> Result<u8> {
        match action {
            "createlink" => {
                if params.is_empty() {
                    return Err(Error::invalid_argument(
                        "createlink needs at least one namespace",
                    ));
                }
                let failures = Linker::for_executable(&self.invocation)?.link_all(params);
                Ok(u8::try_from(failures).unwrap_or(u8::MAX))
            }
            "do" | "action" => {
                let (remote, args) = params.split_first().ok_or_else(|| {
                    Error::invalid_argument(format!("{action} needs a namespaced action"))
                })?;
                self.exec_remote(remote, args).await
            }
            _ => Err(Error::unknown_command(action)),
        }
    }

    async fn exec_remote(&mut self, action: &str, params: &[String]) -> Result<u8> {
        if let Err(e) = self.renew().await {
            warn!(error = %e, "Token renewal failed");
        }

        match self.transport {
            Transport::Stream => {
                let mut session = Session::open(
                    &self.config.url,
                    Arc::clone(&self.sink),
                    self.session_options.clone(),
                )
                .await?;

                let result = session
                    .run_command(&self.config.auth_token, action, params)
                    .await;
                let state = session.close().await;

                if let Err(e) = &result {
                    if e.is_session_error() {
                        debug!(error = %e, ?state, "Streaming session failed");
                    }
                    if e.is_timeout() {
                        self.sink.write(Descriptor::Stderr, &self.renew_hint());
                    }
                }
                result
            }
            Transport::Http => {
                let (status, response) = self.api.execute(action, params).await?;
                response.render(self.sink.as_ref());
                Ok(response.exit_code(status))
            }
        }
    }

    /// Shown when the server never acknowledged the token.
    fn renew_hint(&self) -> String {
        format!(
            "The server did not accept the token in time. Please renew with '{} login'.\n",
            self.invocation.binary_name
        )
    }

    async fn renew(&mut self) -> Result<()> {
        let grant = self.api.renew().await?;
        self.store_grant(grant)
    }

    async fn login(&mut self) -> Result<()> {
        if self.renew().await.is_ok() {
            info!("Token renewed");
            return Ok(());
        }

        let (username, password) = self.credentials.credentials()?;
        let username = username.trim_matches(['\r', '\n', ' ']);
        if username.is_empty() || password.is_empty() {
            return Err(Error::CredentialsBlank);
        }

        self.sink.write(
            Descriptor::Stdout,
            &format!("User: '{username}' Pass: <given>\n"),
        );

        let grant = self.api.login(username, &password).await?;
        self.store_grant(grant)
    }

    fn store_grant(&mut self, grant: AuthGrant) -> Result<()> {
        debug!(validity = grant.validity, "Storing token");
        self.api.set_token(grant.token.clone());
        self.config.set_token(grant.token, grant.validity);
        self.config.save(&self.config_path)
    }
}

// ============================================================================
// Tests
// ============================================================================
