//! `ctcheck signals`: Print the signal table.

use ctcheck_verify::cases;

use super::Settings;
use crate::output;

/// Executes the `signals` command.
///
/// Lists every case of the default table with its expected exit code and
/// whether the current skip list excludes it.
///
/// # Errors
///
/// Returns an error if the skip list is invalid or JSON output fails.
pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let skips = settings.skip_list()?;
    let table = cases::default_cases();

    let rendered = if settings.json {
        output::case_table_json(&table, &skips)?
    } else {
        output::case_table(&table, &skips)
    };
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
