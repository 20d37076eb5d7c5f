//! The run driver: select a label, search it, and feed every message to
//! the extractor, one at a time and in identifier order.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extract::Extractor;
use crate::mailbox::{Mailbox, MessageId};
use crate::model::outcome::{Outcome, RunSummary};

/// Callback invoked after every handled attachment.
pub type OutcomeSink<'a> = &'a mut dyn FnMut(MessageId, &Outcome);

/// What to read from the mailbox.
#[derive(Debug, Clone, Copy)]
pub struct HarvestRequest<'a> {
    /// Folder or label to select.
    pub label: &'a str,
    /// Search criteria run against the selected folder.
    pub query: &'a str,
}

/// Download the attachments of every message matching `request`.
///
/// Selection and search failures end the run; a message that cannot be
/// fetched or parsed is logged, counted and skipped. The session is
/// logged out before returning, whatever the result.
///
/// The progress callback receives `(current, total)`.
pub fn harvest<M: Mailbox + ?Sized>(
    mailbox: &mut M,
    extractor: &mut Extractor,
    request: HarvestRequest<'_>,
    progress: &dyn Fn(usize, usize),
    on_outcome: OutcomeSink<'_>,
) -> Result<RunSummary> {
    let result = harvest_selected(mailbox, extractor, request, progress, on_outcome);
    if let Err(e) = mailbox.logout() {
        warn!(error = %e, "Could not release mailbox session");
    }
    result
}

fn harvest_selected<M: Mailbox + ?Sized>(
    mailbox: &mut M,
    extractor: &mut Extractor,
    request: HarvestRequest<'_>,
    progress: &dyn Fn(usize, usize),
    on_outcome: OutcomeSink<'_>,
) -> Result<RunSummary> {
    let exists = mailbox.select(request.label)?;
    debug!(label = request.label, exists, "Folder selected");

    let ids = mailbox.search(request.query)?;
    info!(
        label = request.label,
        count = ids.len(),
        "Found messages containing attachments"
    );

    let mut summary = RunSummary {
        messages_found: ids.len(),
        ..RunSummary::default()
    };
    process_messages(mailbox, extractor, &ids, &mut summary, progress, on_outcome);
    Ok(summary)
}

/// Fetch and extract each message in `ids`, in order, never stopping early.
pub fn process_messages<M: Mailbox + ?Sized>(
    mailbox: &mut M,
    extractor: &mut Extractor,
    ids: &[MessageId],
    summary: &mut RunSummary,
    progress: &dyn Fn(usize, usize),
    on_outcome: OutcomeSink<'_>,
) {
    let total = ids.len();

    for (i, &id) in ids.iter().enumerate() {
        progress(i, total);

        let raw = match mailbox.fetch_raw(id) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(id, error = %e, "Error fetching mail, skipping");
                summary.messages_failed += 1;
                continue;
            }
        };

        let outcomes = match extractor.process_message(&raw) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(id, error = %e, "Could not parse message, skipping");
                summary.messages_failed += 1;
                continue;
            }
        };

        summary.messages_processed += 1;
        for outcome in &outcomes {
            summary.record(outcome);
            on_outcome(id, outcome);
        }
    }
    progress(total, total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrabError;
    use crate::parser::filename::ExtensionFilter;

    struct Unreachable;

    impl Mailbox for Unreachable {
        fn list_folders(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn select(&mut self, label: &str) -> Result<u32> {
            Err(GrabError::FolderSelection {
                label: label.to_string(),
                reason: "NO such mailbox".into(),
            })
        }
        fn search(&mut self, _query: &str) -> Result<Vec<MessageId>> {
            panic!("search after failed select");
        }
        fn fetch_raw(&mut self, _id: MessageId) -> Result<Vec<u8>> {
            panic!("fetch after failed select");
        }
        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_selection_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = Extractor::new(dir.path(), ExtensionFilter::accept_all()).unwrap();
        let err = harvest(
            &mut Unreachable,
            &mut ex,
            HarvestRequest {
                label: "Nope",
                query: "ALL",
            },
            &|_, _| {},
            &mut |_, _| {},
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
