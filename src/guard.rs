//! Precondition guards for cleanup
//!
//! Deleting something that was never there looks exactly like a successful
//! deletion once you only watch for absence. [`guarded_delete`] therefore
//! confirms the target exists with a single read before it deletes anything.

use tracing::{debug, info, warn};

use crate::assertions::wait_until_absent;
use crate::classify::{classify, Observation};
use crate::client::{describe, ObjectClient, ObjectRef};
use crate::poller::{poll_until, Outcome, PollReport};
use crate::policy::PollPolicy;
use crate::Error;

/// Fetch the target once and fail fast unless it exists
///
/// No polling: a 404 or a transient failure both become
/// [`Error::Precondition`], a fatal client error stays [`Error::Fatal`].
pub async fn ensure_exists<C: ObjectClient>(
    client: &C,
    target: &ObjectRef,
) -> Result<C::Object, Error> {
    let label = describe(client, target);
    match classify(client.fetch(target).await) {
        Observation::Found(object) => Ok(object),
        Observation::ConfirmedAbsent(_) => {
            warn!(object = %label, "Expected object does not exist");
            Err(Error::precondition(label, "object does not exist"))
        }
        Observation::TransientError(e) => Err(Error::precondition(
            label,
            format!("could not confirm existence: {e}"),
        )),
        Observation::FatalError(e) => Err(Error::fatal(label, e)),
    }
}

/// Issue a delete, retrying transient failures
///
/// A 404 or 410 on any attempt counts as success: an earlier attempt may have gone
/// through before its response was lost.
pub async fn delete_with_retry<C: ObjectClient>(
    client: &C,
    target: &ObjectRef,
    policy: &PollPolicy,
) -> Result<PollReport, Error> {
    let label = describe(client, target);
    let log_label = label.as_str();
    poll_until(policy, &label, move || async move {
        match classify(client.delete(target).await) {
            Observation::Found(()) => Outcome::Done,
            Observation::ConfirmedAbsent(_) => {
                debug!(object = %log_label, "Already deleted");
                Outcome::Done
            }
            Observation::TransientError(e) => {
                warn!(object = %log_label, error = %e, "Deletion failed, retrying");
                Outcome::retry(format!("delete failed: {e}"))
            }
            Observation::FatalError(e) => Outcome::Fatal(e),
        }
    })
    .await
}

/// Confirm the target exists, delete it, and wait for it to disappear
///
/// Returns the report of the final absence wait.
pub async fn guarded_delete<C: ObjectClient>(
    client: &C,
    target: &ObjectRef,
    policy: &PollPolicy,
) -> Result<PollReport, Error> {
    ensure_exists(client, target).await?;
    delete_with_retry(client, target, policy).await?;
    let report = wait_until_absent(client, target, policy).await?;
    info!(
        object = %describe(client, target),
        waits = report.waits,
        "Guarded deletion confirmed"
    );
    Ok(report)
}
