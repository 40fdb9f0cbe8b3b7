use crate::config::ImapConfig;
use crate::error::{PlungerError, Result};
use crate::traits::{Email, MailSource};
use async_imap::Session;
use async_native_tls::{TlsConnector, TlsStream};
use async_trait::async_trait;
use futures::{StreamExt, pin_mut};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

/// A logged-in IMAP session with the configured folder selected.
pub struct ImapMailbox {
    session: ImapSession,
}

impl ImapMailbox {
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        if config.username.is_empty() || config.password.is_empty() {
            return Err(PlungerError::Auth(
                "missing credentials, set EMAIL_ADDRESS and PASSWORD".to_string(),
            ));
        }

        let addr = format!("{}:{}", config.host, config.port);
        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| PlungerError::Auth(format!("Failed to connect to {}: {}", addr, e)))?;

        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(&config.host, tcp_stream.compat())
            .await
            .map_err(|e| PlungerError::Auth(format!("TLS connection failed: {}", e)))?;

        let client = async_imap::Client::new(tls_stream);

        info!("Logging in to {} ...", config.username);
        let mut session = client
            .login(&config.username, &config.password)
            .await
            .map_err(|e| PlungerError::Auth(format!("Login failed: {:?}", e.0)))?;
        info!("Logged in successfully.");

        session.select(&config.folder).await.map_err(|e| {
            PlungerError::Auth(format!("Failed to select mailbox {}: {}", config.folder, e))
        })?;

        Ok(Self { session })
    }
}

#[async_trait]
impl MailSource for ImapMailbox {
    async fn search(&mut self, query: &str) -> Result<Vec<String>> {
        let search_result = self
            .session
            .search(query)
            .await
            .map_err(|e| PlungerError::Search(format!("Search failed: {}", e)))?;

        // The server hands back an unordered set
        let mut seq_nums: Vec<u32> = search_result.into_iter().collect();
        seq_nums.sort_unstable();

        debug!("Search {:?} matched {} messages", query, seq_nums.len());
        Ok(seq_nums.into_iter().map(|n| n.to_string()).collect())
    }

    async fn fetch(&mut self, id: &str) -> Result<Email> {
        // A dead connection fails every later message too, so it is not a per-message fault
        let fetch_error = |context: &str, e: async_imap::error::Error| match e {
            async_imap::error::Error::ConnectionLost | async_imap::error::Error::Io(_) => {
                PlungerError::Disconnected(format!("{} for message {}: {}", context, id, e))
            }
            e => PlungerError::Fetch {
                id: id.to_string(),
                reason: format!("{}: {}", context, e),
            },
        };

        let fetch_stream = self
            .session
            .fetch(id, "RFC822")
            .await
            .map_err(|e| fetch_error("Fetch failed", e))?;
        pin_mut!(fetch_stream);

        let mut content = None;
        while let Some(fetch_result) = fetch_stream.next().await {
            let message =
                fetch_result.map_err(|e| fetch_error("Error reading fetch result", e))?;

            // Keep draining so the session is ready for the next command
            if content.is_none() {
                content = message.body().map(|body| body.to_vec());
            }
        }

        let content = content.ok_or_else(|| PlungerError::Fetch {
            id: id.to_string(),
            reason: "response carried no body".to_string(),
        })?;
        Ok(Email {
            id: id.to_string(),
            content,
        })
    }

    async fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| PlungerError::Auth(format!("Logout failed: {}", e)))
    }
}
