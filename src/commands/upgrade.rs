// ABOUTME: Upgrade command implementation.
// ABOUTME: Loads the template, takes the container lock, and drives the controller.

use crate::cli::Cli;
use rollover::adapter::{AdapterCapabilities, TemplateAdapter};
use rollover::diagnostics::{Diagnostics, Warning};
use rollover::error::Result;
use rollover::notify::{self, EmailSettings, Notifier};
use rollover::output::Output;
use rollover::runtime::{RuntimeGateway, connect_local};
use rollover::template::{DEFAULT_TIMEOUT, Template, TemplateError, TemplateStore};
use rollover::upgrade::{
    UpgradeController, UpgradeError, UpgradeLock, UpgradeOutcome, UpgradeRequest,
    default_state_dir,
};

/// Upgrade the container named on the command line.
///
/// Template and hook problems come back as outcomes so they map onto their
/// own exit codes; only runtime and lock failures are errors.
pub async fn upgrade(cli: &Cli, output: &mut Output) -> Result<UpgradeOutcome> {
    output.start_timer();

    let store = TemplateStore::new(&cli.templates_dir);
    let template = match store.load(&cli.template) {
        Ok(template) => template,
        Err(TemplateError::NotFound { .. }) => {
            return Ok(UpgradeOutcome::TemplateNotFound {
                template: cli.template.clone(),
            });
        }
        Err(e) => {
            return Ok(UpgradeOutcome::ConfigurationError {
                reason: e.to_string(),
            });
        }
    };

    if let Err(e) = AdapterCapabilities::detect(template.hook_slots()) {
        return Ok(UpgradeOutcome::ConfigurationError {
            reason: format!("template '{}': {}", cli.template, e),
        });
    }
    if let Err(e) = template.validate_run(&cli.container) {
        return Ok(UpgradeOutcome::ConfigurationError {
            reason: format!("template '{}': {}", cli.template, e),
        });
    }

    let timeout = cli.timeout.or(template.timeout).unwrap_or(DEFAULT_TIMEOUT);
    let request = UpgradeRequest::new(
        cli.template.as_str(),
        cli.container.clone(),
        template.image.clone(),
        timeout,
    )
    .with_poll_interval(template.poll_interval)
    .with_check_timeout(template.check_timeout);

    let notifier = notify::from_settings(EmailSettings::from_args(
        cli.email_sender_name.as_deref(),
        cli.email_sender_address.as_deref(),
        cli.email_recipients.as_deref(),
    ));

    let state_dir = default_state_dir().map_err(UpgradeError::from)?;
    let lock = UpgradeLock::acquire(&state_dir, &cli.container, cli.force_unlock)
        .map_err(UpgradeError::from)?;

    let result = run_locked(&template, &request, &*notifier, output).await;

    let mut diag = Diagnostics::default();
    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(format!(
            "failed to release upgrade lock: {}",
            e
        )));
    }

    let (warnings, outcome) = settle(result, diag);
    for warning in &warnings {
        output.warning(warning);
    }
    outcome
}

/// Warnings to print for a finished run. Lock warnings survive a failed run.
fn settle(
    result: Result<(UpgradeOutcome, Diagnostics)>,
    lock_diag: Diagnostics,
) -> (Vec<Warning>, Result<UpgradeOutcome>) {
    match result {
        Ok((outcome, run_diag)) => {
            let warnings = run_diag
                .warnings()
                .iter()
                .chain(lock_diag.warnings())
                .cloned()
                .collect();
            (warnings, Ok(outcome))
        }
        Err(e) => (lock_diag.warnings().to_vec(), Err(e)),
    }
}

/// Everything that happens while the container lock is held.
async fn run_locked(
    template: &Template,
    request: &UpgradeRequest,
    notifier: &dyn Notifier,
    output: &Output,
) -> Result<(UpgradeOutcome, Diagnostics)> {
    let runtime = connect_local(Some(&template.runtime_config()))?;
    let gateway = RuntimeGateway::new(&runtime, template.stop_timeout());
    let adapter = TemplateAdapter::new(&runtime, template);

    let controller = match UpgradeController::new(request, gateway, &adapter, notifier) {
        Ok(controller) => controller,
        Err(e) => {
            return Ok((
                UpgradeOutcome::ConfigurationError {
                    reason: e.to_string(),
                },
                Diagnostics::default(),
            ));
        }
    };

    output.progress(&format!(
        "Upgrading {} ({}) with template '{}', {} health attempt(s)",
        request.container(),
        request.image(),
        request.template(),
        request.timeout()
    ));

    let report = controller.run().await?;
    Ok((report.outcome, report.diagnostics))
}
