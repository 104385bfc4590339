//! Drives a set of cases against the selected backend.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Context;
use ctcheck_common::config::CheckConfig;
use ctcheck_common::types::PortMapping;
use ctcheck_runtime::backend::ContainerCli;
use ctcheck_runtime::backend::docker::DockerCli;
use ctcheck_runtime::backend::process::ProcessCli;
use ctcheck_verify::cases::{SignalCase, SkipList};
use ctcheck_verify::kill::KillVerifier;
use ctcheck_verify::port::PortVerifier;
use ctcheck_verify::readiness::PollPolicy;
use ctcheck_verify::report::SuiteReport;
use ctcheck_verify::suite::Suite;

use crate::commands::{Backend, Settings};
use crate::output;

/// What a subcommand wants run.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Signal cases, in order.
    pub cases: Vec<SignalCase>,
    /// Port case, run after the signal cases.
    pub port: Option<PortMapping>,
    /// Attempts per case.
    pub repeat: u32,
}

/// Runs `plan`, prints the report and fails if any case failed.
///
/// # Errors
///
/// Returns an error if the backend cannot be set up, the run was
/// interrupted, or a case failed.
pub fn run(settings: &Settings, plan: &Plan) -> anyhow::Result<()> {
    let skips = settings.skip_list()?;
    let suite = Suite::new().repeat(plan.repeat);

    let flag = suite.interrupt_flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let report = runtime.block_on(async {
        match settings.backend {
            Backend::Docker => {
                let cli = DockerCli::locate(&settings.config.runtime)?;
                Ok::<_, anyhow::Error>(
                    execute_plan(Arc::new(cli), &settings.config, skips, plan, &suite).await,
                )
            }
            Backend::Process => {
                let scratch = tempfile::Builder::new()
                    .prefix("ctcheck-")
                    .tempdir()
                    .context("failed to create a scratch directory")?;
                let cli = Arc::new(ProcessCli::new(scratch.path()));
                Ok(execute_plan(cli, &settings.config, skips, plan, &suite).await)
            }
        }
    })?;

    if settings.json {
        let json = report.to_json()?;
        #[allow(clippy::print_stdout)]
        {
            println!("{json}");
        }
    } else {
        #[allow(clippy::print_stdout)]
        {
            println!("{}", output::summary(&report));
        }
    }

    if report.interrupted {
        anyhow::bail!("run interrupted after {} case(s)", report.cases.len());
    }
    let failed = report.failed();
    if failed > 0 {
        anyhow::bail!("{failed} case(s) failed");
    }
    Ok(())
}

async fn execute_plan<C: ContainerCli>(
    cli: Arc<C>,
    config: &CheckConfig,
    skips: SkipList,
    plan: &Plan,
    suite: &Suite,
) -> SuiteReport {
    let driver = cli.driver();
    let mut report = SuiteReport::default();

    if !plan.cases.is_empty() {
        let policy = PollPolicy {
            interval: config.poll_interval(),
            timeout: config.timeout(),
        };
        let verifier = KillVerifier::new(Arc::clone(&cli), config.image.clone(), policy, skips);
        suite.run_kill(&verifier, &plan.cases, &mut report).await;
    }

    if let Some(mapping) = plan.port {
        let verifier = PortVerifier::new(cli, config.image.clone(), mapping);
        suite.run_port(&verifier, &mut report).await;
    }

    tracing::info!(
        driver,
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "run finished"
    );
    report
}
