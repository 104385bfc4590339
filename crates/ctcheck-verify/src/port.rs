//! Port publishing verification.

use std::sync::Arc;
use std::time::Instant;

use ctcheck_common::error::Result;
use ctcheck_common::types::{ContainerId, PortMapping};
use ctcheck_runtime::backend::{ContainerCli, RunSpec};
use tracing::Instrument;

use crate::cleanup;
use crate::report::{CaseReport, Verdict};

/// Publishes a port and reads it back through port introspection.
pub struct PortVerifier<C> {
    cli: Arc<C>,
    image: String,
    mapping: PortMapping,
}

impl<C: ContainerCli> PortVerifier<C> {
    /// Creates a verifier publishing `mapping` on containers of `image`.
    #[must_use]
    pub fn new(cli: Arc<C>, image: impl Into<String>, mapping: PortMapping) -> Self {
        Self {
            cli,
            image: image.into(),
            mapping,
        }
    }

    /// Human-readable case name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("publish {}", self.mapping.publish_arg())
    }

    /// Runs the case in a fresh container, labelled as attempt `attempt`.
    pub async fn verify_attempt(&self, attempt: u32) -> CaseReport {
        let started_at = chrono::Utc::now();
        let clock = Instant::now();
        let id = ContainerId::generate();
        let span = tracing::info_span!("port", mapping = %self.mapping.publish_arg(), id = %id);

        let verdict = async {
            let outcome = self.exercise(&id).await;
            let cleaned = cleanup::remove_and_confirm(self.cli.as_ref(), &id).await;
            Verdict::settle(outcome, cleaned)
        }
        .instrument(span)
        .await;

        CaseReport {
            name: self.name(),
            attempt,
            container: Some(id),
            verdict,
            started_at,
            elapsed: clock.elapsed(),
        }
    }

    /// Runs the case once.
    pub async fn verify(&self) -> CaseReport {
        self.verify_attempt(1).await
    }

    async fn exercise(&self, id: &ContainerId) -> Result<Verdict> {
        let spec = RunSpec::new(id.clone(), self.image.clone()).publish(self.mapping);
        let _ = self.cli.run(&spec).await?;

        let key = self.mapping.container_key();
        let printed = self.cli.port(id, &key).await?;
        let wanted = self.mapping.host_port.to_string();
        tracing::debug!(key, printed = printed.trim(), "port introspection");

        if printed.contains(&wanted) {
            Ok(Verdict::Passed)
        } else {
            Ok(Verdict::failed(format!(
                "port {key} printed {:?}, expected it to mention {wanted}",
                printed.trim()
            )))
        }
    }
}
