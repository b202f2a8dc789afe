//! Convergence assertions
//!
//! Each assertion turns a piece of test intent ("the controller deployment
//! comes up", "the CR is gone") into a probe over an injected
//! [`ObjectClient`] and hands it to [`poll_until`]. Every retry is logged as
//! "still waiting" by the poller, with what the probe observed.

use tracing::info;

use crate::classify::{classify, Observation};
use crate::client::{describe, ObjectClient, ObjectRef, Scalable};
use crate::poller::{poll_until, Outcome, PollReport};
use crate::policy::PollPolicy;
use crate::Error;

/// What the caller already knows about the target's existence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Existence {
    /// The object may not have been created yet; absence means "keep waiting"
    #[default]
    Unknown,
    /// The object was seen before; absence means it was deleted underneath us
    Confirmed,
}

/// Wait until the target can be fetched
///
/// A 404 means the object has not been created yet and is retried, as is any
/// transient failure. Fatal client errors stop immediately.
pub async fn wait_until_visible<C: ObjectClient>(
    client: &C,
    target: &ObjectRef,
    policy: &PollPolicy,
) -> Result<PollReport, Error> {
    let label = describe(client, target);
    let report = poll_until(policy, &label, move || async move {
        match classify(client.fetch(target).await) {
            Observation::Found(_) => Outcome::Done,
            Observation::ConfirmedAbsent(_) => Outcome::retry("not found yet"),
            Observation::TransientError(e) => Outcome::retry(format!("fetch failed: {e}")),
            Observation::FatalError(e) => Outcome::Fatal(e),
        }
    })
    .await?;
    info!(object = %label, attempts = report.attempts, "Object is visible");
    Ok(report)
}

/// Wait until the server reports the target does not exist
///
/// Succeeds on the first probe when the object is already gone.
pub async fn wait_until_absent<C: ObjectClient>(
    client: &C,
    target: &ObjectRef,
    policy: &PollPolicy,
) -> Result<PollReport, Error> {
    let label = describe(client, target);
    let report = poll_until(policy, &label, move || async move {
        match classify(client.fetch(target).await) {
            Observation::ConfirmedAbsent(_) => Outcome::Done,
            Observation::Found(_) => Outcome::retry("still present"),
            Observation::TransientError(e) => Outcome::retry(format!("fetch failed: {e}")),
            Observation::FatalError(e) => Outcome::Fatal(e),
        }
    })
    .await?;
    info!(object = %label, attempts = report.attempts, "Object deleted");
    Ok(report)
}

/// Wait until at least `required` replicas of the target report ready
///
/// While `existence` is [`Existence::Unknown`] a 404 is retried; once the
/// caller has confirmed the object exists, a 404 means it was deleted and
/// fails immediately.
pub async fn wait_for_ready_replicas<C>(
    client: &C,
    target: &ObjectRef,
    required: i32,
    existence: Existence,
    policy: &PollPolicy,
) -> Result<PollReport, Error>
where
    C: ObjectClient,
    C::Object: Scalable,
{
    let label = describe(client, target);
    let report = poll_until(policy, &label, move || async move {
        match classify(client.fetch(target).await) {
            Observation::Found(object) => {
                let ready = object.ready_replicas();
                if ready >= required {
                    Outcome::Done
                } else {
                    Outcome::retry(ready_summary(ready, required, object.desired_replicas()))
                }
            }
            Observation::ConfirmedAbsent(e) => match existence {
                Existence::Unknown => Outcome::retry("not found yet"),
                Existence::Confirmed => Outcome::Fatal(e),
            },
            Observation::TransientError(e) => Outcome::retry(format!("fetch failed: {e}")),
            Observation::FatalError(e) => Outcome::Fatal(e),
        }
    })
    .await?;
    info!(
        object = %label,
        required,
        attempts = report.attempts,
        "Replicas ready"
    );
    Ok(report)
}

fn ready_summary(ready: i32, required: i32, desired: Option<i32>) -> String {
    match desired {
        Some(desired) => format!("{ready}/{required} replicas ready ({desired} desired)"),
        None => format!("{ready}/{required} replicas ready"),
    }
}

/// Wait for every target to reach `required` ready replicas
///
/// Targets are checked in order, each with a fresh budget; the first failure
/// is returned.
pub async fn wait_until_all_ready<C>(
    client: &C,
    targets: &[ObjectRef],
    required: i32,
    policy: &PollPolicy,
) -> Result<Vec<PollReport>, Error>
where
    C: ObjectClient,
    C::Object: Scalable,
{
    let mut reports = Vec::with_capacity(targets.len());
    for target in targets {
        reports.push(
            wait_for_ready_replicas(client, target, required, Existence::Unknown, policy).await?,
        );
    }
    Ok(reports)
}

/// Wait for every target to be deleted, in order
pub async fn wait_until_all_absent<C: ObjectClient>(
    client: &C,
    targets: &[ObjectRef],
    policy: &PollPolicy,
) -> Result<Vec<PollReport>, Error> {
    let mut reports = Vec::with_capacity(targets.len());
    for target in targets {
        reports.push(wait_until_absent(client, target, policy).await?);
    }
    Ok(reports)
}
