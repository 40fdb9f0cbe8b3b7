/*!
 * Copyright (c) 2026 The plunger authors
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: requester.rs
 */

use crate::config::RequesterConfig;
use crate::error::{PlungerError, Result};
use crate::links::{check_host, is_public_ip, parse_link};
use crate::traits::{LinkOutcome, LinkVisitor};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, StatusCode, Url};
use std::net::SocketAddr;
use std::time::Duration;

// Same hop limit as reqwest's default policy
const MAX_REDIRECTS: usize = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Visits confirmed unsubscribe links with a single bounded GET.
pub struct UnsubscribeRequester {
    client: Client,
    allow_private_targets: bool,
}

impl UnsubscribeRequester {
    pub fn new(config: &RequesterConfig) -> anyhow::Result<Self> {
        Self::build(config, None)
    }

    #[cfg(test)]
    pub fn with_proxy(config: &RequesterConfig, proxy_url: &str) -> anyhow::Result<Self> {
        Self::build(config, Some(Proxy::http(proxy_url)?))
    }

    fn build(config: &RequesterConfig, proxy: Option<Proxy>) -> anyhow::Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        // Every hop and every connection gets the same check as the first URL
        if !config.allow_private_targets {
            builder = builder
                .redirect(public_redirect_policy())
                .dns_resolver(PublicOnlyResolver);
        }
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            allow_private_targets: config.allow_private_targets,
        })
    }

    /// Issue the GET and hand back whatever status the server answered with.
    pub async fn request(&self, link: &str) -> Result<StatusCode> {
        let url = parse_link(link)?;
        if !self.allow_private_targets {
            check_host(link, &url)?;
            check_resolved_addresses(link, &url).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PlungerError::Request {
                link: link.to_string(),
                source,
            })?;

        Ok(response.status())
    }
}

fn public_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let target = attempt.url().as_str().to_string();
        match parse_link(&target).and_then(|url| check_host(&target, &url)) {
            Ok(()) => {
                debug!("Following redirect to {}", target);
                attempt.follow()
            }
            Err(e) => attempt.error(e),
        }
    })
}

/// Resolves names for the HTTP client and refuses any that land on a non-public address.
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            // Port 0 is replaced by the scheme's port
            let resolved = tokio::net::lookup_host((host.as_str(), 0)).await?;
            let addrs = public_addrs(&host, resolved).map_err(std::io::Error::other)?;
            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}

/// All resolved addresses, or the reason the host must not be contacted.
fn public_addrs(
    host: &str,
    addrs: impl IntoIterator<Item = SocketAddr>,
) -> std::result::Result<Vec<SocketAddr>, String> {
    addrs
        .into_iter()
        .map(|addr| {
            if is_public_ip(&addr.ip()) {
                Ok(addr)
            } else {
                Err(format!("{} resolves to non-public address {}", host, addr.ip()))
            }
        })
        .collect()
}

// Gives a typed refusal before any connection is attempted. When resolution
// fails here the request still goes ahead and fails on its own.
async fn check_resolved_addresses(link: &str, url: &Url) -> Result<()> {
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return Ok(());
    };

    if let Ok(resolved) = tokio::net::lookup_host((host, port)).await {
        public_addrs(host, resolved).map_err(|reason| PlungerError::InvalidLink {
            link: link.to_string(),
            reason,
        })?;
    }

    Ok(())
}

#[async_trait]
impl LinkVisitor for UnsubscribeRequester {
    async fn visit(&self, link: &str) -> LinkOutcome {
        match self.request(link).await {
            Ok(status) if status == StatusCode::OK => {
                info!("Successfully visited {}", link);
                LinkOutcome::Visited(status.as_u16())
            }
            Ok(status) => {
                warn!("Failed to visit {} (Error code: {})", link, status.as_u16());
                LinkOutcome::Rejected(status.as_u16())
            }
            Err(e) => {
                error!("Error with {}: {}", link, e);
                LinkOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester(allow_private_targets: bool) -> UnsubscribeRequester {
        UnsubscribeRequester::new(&RequesterConfig {
            timeout_seconds: 2,
            allow_private_targets,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_visit_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/unsubscribe")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "42".into()))
            .with_status(200)
            .with_body("You have been unsubscribed")
            .create_async()
            .await;

        let link = format!("{}/unsubscribe?id=42", server.url());
        let outcome = requester(true).visit(&link).await;

        assert!(matches!(outcome, LinkOutcome::Visited(200)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_returns_literal_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/unsubscribe")
            .with_status(404)
            .create_async()
            .await;

        let link = format!("{}/unsubscribe", server.url());
        let status = requester(true).request(&link).await.unwrap();

        assert_eq!(status, StatusCode::NOT_FOUND);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_success_codes_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/unsubscribe")
            .with_status(204)
            .create_async()
            .await;

        let link = format!("{}/unsubscribe", server.url());
        let outcome = requester(true).visit(&link).await;

        assert!(matches!(outcome, LinkOutcome::Rejected(204)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/unsubscribe")
            .with_status(503)
            .create_async()
            .await;

        let link = format!("{}/unsubscribe", server.url());
        let outcome = requester(true).visit(&link).await;

        assert!(matches!(outcome, LinkOutcome::Rejected(503)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_without_panicking() {
        let outcome = requester(false)
            .visit("http://nonexistent-host.invalid/unsubscribe")
            .await;

        assert!(matches!(
            outcome,
            LinkOutcome::Failed(PlungerError::Request { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_server_is_refused_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/unsubscribe")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let link = format!("{}/unsubscribe", server.url());
        let outcome = requester(false).visit(&link).await;

        assert!(matches!(
            outcome,
            LinkOutcome::Failed(PlungerError::InvalidLink { .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_refused() {
        let outcome = requester(true)
            .visit("mailto:unsubscribe@example.com")
            .await;

        assert!(matches!(
            outcome,
            LinkOutcome::Failed(PlungerError::InvalidLink { .. })
        ));
    }

    fn proxied_requester(proxy_url: &str) -> UnsubscribeRequester {
        UnsubscribeRequester::with_proxy(
            &RequesterConfig {
                timeout_seconds: 2,
                allow_private_targets: false,
            },
            proxy_url,
        )
        .unwrap()
    }

    // The local server stands in for a public host through the proxy setting,
    // so the first URL passes the address check.
    #[tokio::test]
    async fn test_redirect_to_loopback_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let entry = server
            .mock("GET", "/unsubscribe")
            .with_status(302)
            .with_header("location", &format!("{}/internal-admin", server.url()))
            .create_async()
            .await;
        let internal = server
            .mock("GET", "/internal-admin")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let outcome = proxied_requester(&server.url())
            .visit("http://93.184.216.34/unsubscribe")
            .await;

        assert!(matches!(
            outcome,
            LinkOutcome::Failed(PlungerError::Request { .. })
        ));
        entry.assert_async().await;
        internal.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_to_metadata_address_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let entry = server
            .mock("GET", "/unsubscribe")
            .with_status(301)
            .with_header("location", "http://169.254.169.254/latest/meta-data/")
            .create_async()
            .await;
        let metadata = server
            .mock("GET", "/latest/meta-data/")
            .expect(0)
            .create_async()
            .await;

        let outcome = proxied_requester(&server.url())
            .visit("http://93.184.216.34/unsubscribe")
            .await;

        assert!(matches!(outcome, LinkOutcome::Failed(_)));
        entry.assert_async().await;
        metadata.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_to_public_host_is_followed() {
        let mut server = mockito::Server::new_async().await;
        let entry = server
            .mock("GET", "/unsubscribe")
            .with_status(302)
            .with_header("location", "http://93.184.216.35/unsubscribed")
            .create_async()
            .await;
        let done = server
            .mock("GET", "/unsubscribed")
            .with_status(200)
            .create_async()
            .await;

        let outcome = proxied_requester(&server.url())
            .visit("http://93.184.216.34/unsubscribe")
            .await;

        assert!(matches!(outcome, LinkOutcome::Visited(200)));
        entry.assert_async().await;
        done.assert_async().await;
    }

    #[test]
    fn test_public_addrs_refuses_any_private_answer() {
        let public: SocketAddr = "93.184.216.34:80".parse().unwrap();
        let loopback: SocketAddr = "127.0.0.1:80".parse().unwrap();
        let internal: SocketAddr = "10.0.0.7:443".parse().unwrap();

        assert_eq!(public_addrs("shop.example", [public]).unwrap(), vec![public]);
        assert!(public_addrs("shop.example", [public, loopback]).is_err());
        assert!(
            public_addrs("shop.example", [internal])
                .unwrap_err()
                .contains("10.0.0.7")
        );
    }

    #[tokio::test]
    async fn test_name_resolving_to_loopback_is_invalid_link() {
        // check_host refuses "localhost" by name, so go straight to resolution
        let url = Url::parse("http://localhost/unsubscribe").unwrap();
        let err = check_resolved_addresses("http://localhost/unsubscribe", &url)
            .await
            .unwrap_err();

        assert!(matches!(err, PlungerError::InvalidLink { .. }));
    }

    #[tokio::test]
    async fn test_resolver_refuses_loopback_names() {
        let name: Name = "localhost".parse().unwrap();
        assert!(PublicOnlyResolver.resolve(name).await.is_err());
    }
}
