use crate::error::{PlungerError, Result};
use crate::extractor::extract_from_message;
use crate::traits::MailSource;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

const READING_EMAILS_MESSAGE: &str = "Hold it right there, we're looking for unsub links in your inbox";

/// What one pass over the mailbox turned up.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Every link found, in discovery order, duplicates included.
    pub links: Vec<String>,
    pub matched: usize,
    pub faulted: Vec<PlungerError>,
}

/// Search the mailbox and extract links from each match.
///
/// A message that cannot be fetched or decoded is recorded in
/// [`ScanReport::faulted`] and the scan moves on to the next one. A lost
/// connection ends the scan.
pub async fn scan(source: &mut dyn MailSource, query: &str, show_progress: bool) -> Result<ScanReport> {
    info!("Searching for unsubscribe links....");
    let ids = source.search(query).await?;

    let mut report = ScanReport {
        matched: ids.len(),
        ..Default::default()
    };

    let pb = if show_progress {
        ProgressBar::new(ids.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(READING_EMAILS_MESSAGE);

    for id in &ids {
        let extracted = match source.fetch(id).await {
            Ok(email) => extract_from_message(&email),
            Err(e) => Err(e),
        };

        match extracted {
            Ok(links) => {
                debug!("Message {} carried {} unsubscribe links", id, links.len());
                report.links.extend(links);
            }
            Err(e) if e.is_fatal() => {
                pb.abandon();
                return Err(e);
            }
            Err(e) => {
                pb.suspend(|| warn!("Skipping message {}: {}", id, e));
                report.faulted.push(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Scanned {} messages, found {} links ({} messages skipped)",
        report.matched,
        report.links.len(),
        report.faulted.len()
    );
    Ok(report)
}
