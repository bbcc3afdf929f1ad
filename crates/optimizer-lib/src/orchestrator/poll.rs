//! Job task: submit, poll on a fixed interval, fetch results
//!
//! Each step ends by applying its outcome through [`Shared`]; when the
//! generation has moved on the task stops without touching state.

use super::{PollConfig, Shared};
use crate::client::JobClient;
use crate::error::OrchestrationFailure;
use crate::models::{JobParameters, RemoteState};
use std::sync::Arc;
use tokio::time::{sleep, Instant};

/// Run one job to a settled state
pub(super) async fn run_job(
    shared: Arc<Shared>,
    client: Arc<dyn JobClient>,
    config: PollConfig,
    parameters: JobParameters,
    generation: u64,
) {
    let started = Instant::now();

    let ack = match client.submit(&parameters).await {
        Ok(ack) => ack,
        Err(e) => {
            shared.fail(generation, 0, OrchestrationFailure::Submission(e));
            return;
        }
    };
    drop(parameters);

    if !shared.processing(generation, ack.message) {
        return;
    }

    if !poll_until_completed(&shared, client.as_ref(), &config, generation, started).await {
        return;
    }

    match client.fetch_results().await {
        Ok(result) => {
            shared.store_result(generation, result);
        }
        Err(e) => {
            shared.result_unavailable(generation, OrchestrationFailure::ResultFetch(e));
        }
    }
}

/// Poll the status endpoint until the backend reports `completed`
///
/// Returns true once the job was moved to `Completed`; false when it failed
/// or was superseded.
async fn poll_until_completed(
    shared: &Shared,
    client: &dyn JobClient,
    config: &PollConfig,
    generation: u64,
    started: Instant,
) -> bool {
    let mut polls: u32 = 0;

    loop {
        if poll_limit_reached(config, polls) {
            shared.fail(
                generation,
                polls,
                OrchestrationFailure::PollLimitExceeded { polls },
            );
            return false;
        }
        if let Some(deadline) = config.deadline {
            if started.elapsed() >= deadline {
                shared.fail(
                    generation,
                    polls,
                    OrchestrationFailure::DeadlineExceeded { deadline },
                );
                return false;
            }
        }

        polls += 1;
        shared.metrics.inc_status_polls();

        let status = match client.fetch_status().await {
            Ok(status) => status,
            Err(e) => {
                // A transient blip and a real outage look the same here; no retry
                shared.fail(generation, polls, OrchestrationFailure::StatusCheck(e));
                return false;
            }
        };
        shared
            .logger
            .log_status_polled(generation, polls, status.state.as_str());

        match status.state {
            RemoteState::Processing => {
                if !shared.progress(generation, polls, status.message) {
                    return false;
                }
                if poll_limit_reached(config, polls) {
                    shared.fail(
                        generation,
                        polls,
                        OrchestrationFailure::PollLimitExceeded { polls },
                    );
                    return false;
                }
                sleep(next_delay(config, started)).await;
            }
            RemoteState::Completed => {
                return shared.complete(generation, polls, status.message);
            }
            RemoteState::Error | RemoteState::Other(_) => {
                let failure = OrchestrationFailure::Backend {
                    status: status.state.as_str().to_string(),
                    message: status.message,
                };
                shared.fail(generation, polls, failure);
                return false;
            }
        }
    }
}

fn poll_limit_reached(config: &PollConfig, polls: u32) -> bool {
    config.max_polls.is_some_and(|max_polls| polls >= max_polls)
}

/// Delay before the next status check
///
/// Never longer than the time left before the deadline, so an expired
/// deadline is noticed without issuing an extra poll.
fn next_delay(config: &PollConfig, started: Instant) -> std::time::Duration {
    match config.deadline {
        Some(deadline) => {
            let remaining = deadline.saturating_sub(started.elapsed());
            config.interval.min(remaining)
        }
        None => config.interval,
    }
}
