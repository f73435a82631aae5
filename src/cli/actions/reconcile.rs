//! Runs the visibility pass over a document snapshot stored as JSON.

use crate::{
    auth::{AuthClient, RecordingNavigator},
    bootstrap::Bootstrapper,
    dom::MemoryDocument,
    reconcile::VisibilityReconciler,
    session::SessionStore,
    Error,
};
use anyhow::{Context, Result};
use std::{fs, io::Write, path::Path};
use tracing::{debug, info};

/// Reconciles `document` and writes the result to `output`, or to `out` when
/// no output path is given.
///
/// # Errors
/// Returns an error if the document cannot be read or written, or if the
/// session is rejected. A rejected session leaves the output untouched.
pub async fn execute<S: SessionStore>(
    client: &AuthClient<S, RecordingNavigator>,
    concurrency: usize,
    document: &Path,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let json = fs::read_to_string(document)
        .with_context(|| format!("failed to read {}", document.display()))?;
    let page = MemoryDocument::from_json(&json)
        .with_context(|| format!("invalid document {}", document.display()))?;

    // A snapshot on disk is already fully parsed.
    let reconciler = VisibilityReconciler::new(&page, client).with_concurrency(concurrency);
    let report = match Bootstrapper::new(reconciler).run().await {
        Ok(report) => report,
        Err(err @ Error::InvalidSession(_)) => {
            if let Some(route) = client.navigator().last() {
                writeln!(out, "redirect: {route}")?;
            }
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    for phase in &report.phases {
        debug!(
            "{}: {} matched, {} hidden, {} failed",
            phase.reason, phase.matched, phase.hidden, phase.failed
        );
    }

    let rendered = page.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("reconciled document written to {}", path.display());
        }
        None => writeln!(out, "{rendered}")?,
    }

    Ok(())
}
