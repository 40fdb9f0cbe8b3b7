/*!
 * Copyright (c) 2026 The plunger authors
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: pipeline.rs
 */

use crate::error::Result;
use crate::links::dedupe;
use crate::recorder;
use crate::scanner::scan;
use crate::traits::{Decision, DecisionSource, LinkOutcome, LinkVisitor, MailSource};
use log::{debug, info, warn};
use std::path::PathBuf;

#[cfg(test)]
#[path = "./pipeline_tests.rs"]
mod pipeline_tests;

pub struct RunOptions {
    pub search_query: String,
    pub output_path: PathBuf,
    pub show_progress: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub matched: usize,
    pub faulted: usize,
    /// The deduplicated links, exactly as written to the artifact.
    pub links: Vec<String>,
    pub visited: usize,
    pub rejected: usize,
    pub failed: usize,
    pub declined: usize,
}

/// One full pass: scan, log out, dedupe, confirm and visit each link, save.
///
/// Every link found during the scan is saved whatever its outcome.
pub async fn run(
    source: &mut dyn MailSource,
    decisions: &mut dyn DecisionSource,
    visitor: &dyn LinkVisitor,
    options: &RunOptions,
) -> Result<RunSummary> {
    let scanned = scan(source, &options.search_query, options.show_progress).await;

    // Nothing else needs the mailbox, release it before prompting
    if let Err(e) = source.logout().await {
        warn!("Logout failed: {}", e);
    }
    let report = scanned?;

    let mut summary = RunSummary {
        matched: report.matched,
        faulted: report.faulted.len(),
        links: dedupe(report.links),
        ..Default::default()
    };
    info!("Found {} unique unsubscribe links", summary.links.len());

    for link in &summary.links {
        let decision = match decisions.decide(link) {
            Ok(decision) => decision,
            Err(e) => {
                // The discovered set is saved even when the prompt dies
                recorder::save(&options.output_path, &summary.links).await?;
                return Err(e);
            }
        };

        let outcome = match decision {
            Decision::Decline => LinkOutcome::Declined,
            Decision::Accept => visitor.visit(link).await,
        };

        match outcome {
            LinkOutcome::Declined => summary.declined += 1,
            LinkOutcome::Visited(status) => {
                debug!("{} answered {}", link, status);
                summary.visited += 1;
            }
            LinkOutcome::Rejected(status) => {
                debug!("{} answered {}", link, status);
                summary.rejected += 1;
            }
            LinkOutcome::Failed(e) => {
                debug!("{} failed: {:?}", link, e);
                summary.failed += 1;
            }
        }
    }

    recorder::save(&options.output_path, &summary.links).await?;
    Ok(summary)
}
