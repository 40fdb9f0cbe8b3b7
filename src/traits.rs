use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Email {
    pub id: String,
    pub content: Vec<u8>,
}

/// What the operator decided for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

/// Result of handling one unsubscribe link. The run continues after every variant.
#[derive(Debug)]
pub enum LinkOutcome {
    Declined,
    /// The server answered 200.
    Visited(u16),
    /// The server answered with anything other than 200.
    Rejected(u16),
    Failed(crate::error::PlungerError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSource: Send {
    /// Runs a server-side search and returns matching message ids
    async fn search(&mut self, query: &str) -> Result<Vec<String>>;

    /// Fetches the full raw message for one id
    async fn fetch(&mut self, id: &str) -> Result<Email>;

    /// Ends the server session
    async fn logout(&mut self) -> Result<()>;
}

pub trait DecisionSource {
    fn decide(&mut self, link: &str) -> Result<Decision>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkVisitor: Send + Sync {
    /// Visits a confirmed link and classifies the response
    async fn visit(&self, link: &str) -> LinkOutcome;
}
