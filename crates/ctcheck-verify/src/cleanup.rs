//! Post-case teardown.

use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::ContainerId;
use ctcheck_runtime::backend::ContainerCli;

/// Removes `id` and checks that it is gone.
///
/// Absence is what counts: a removal that fails because the container was
/// never created (the case died in `run`) is fine.
///
/// # Errors
///
/// Returns [`CheckError::Leaked`] if the container is still listed
/// afterwards.
pub async fn remove_and_confirm<C: ContainerCli>(cli: &C, id: &ContainerId) -> Result<()> {
    let removed = cli.remove(id).await;
    let still_there = cli.exists(id).await;
    tracing::debug!(id = %id, removed, still_there, "cleanup");

    if still_there {
        return Err(CheckError::Leaked {
            id: id.to_string(),
            removed,
        });
    }
    if !removed {
        tracing::debug!(id = %id, "nothing to remove");
    }
    Ok(())
}
