//! The redeploy sequence: pull the new image, retire the old instance, start
//! a fresh one.
//!
//! Steps run strictly one after another and the sequence never stops early.
//! `stop` and `rm` legitimately fail when no previous instance exists, so
//! their failures are warnings. `pull` and `run` failures are logged as
//! errors and mark the returned report as failed, but the remaining steps
//! still run.

use tracing::{error, info, instrument, warn};

use super::runtime::ContainerRuntime;
use super::types::{ContainerSpec, RedeployReport, Step, StepOutcome};

#[instrument(skip(runtime, spec), fields(container = %spec.name, image = %image))]
pub async fn redeploy(
    runtime: &dyn ContainerRuntime,
    spec: &ContainerSpec,
    image: &str,
) -> RedeployReport {
    let mut steps = Vec::with_capacity(Step::SEQUENCE.len());

    for step in Step::SEQUENCE {
        info!(step = %step, "Executing step");
        let result = match step {
            Step::Pull => runtime.pull(image).await,
            Step::Stop => runtime.stop(&spec.name).await,
            Step::Remove => runtime.remove(&spec.name).await,
            Step::Run => runtime.run(spec, image).await,
        };

        match &result {
            Ok(_) => info!(step = %step, "Step succeeded"),
            Err(e) if step.is_cleanup() => {
                warn!(step = %step, error = %e, "Cleanup step failed, continuing")
            }
            Err(e) => error!(step = %step, error = %e, "Step failed, continuing"),
        }

        steps.push(StepOutcome { step, result });
    }

    let report = RedeployReport {
        image: image.to_string(),
        container: spec.name.clone(),
        steps,
    };

    if report.failed() {
        error!("Redeploy finished with failures, container may not be running the new image");
    } else {
        info!("Redeploy completed");
    }

    report
}
