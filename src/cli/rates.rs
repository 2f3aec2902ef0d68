use super::ui;
use crate::core::{
    Asset, QueryOutcome, RateQueryRequest, ResolutionResult, TaskExecutor, TaskState,
};
use anyhow::{Result, bail};
use clap::ValueEnum;
use comfy_table::Cell;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn display_as_table(result: &ResolutionResult, reference: &Asset, requested: usize) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate ({})", reference.identifier)),
    ]);

    for (identifier, rate) in result {
        table.add_row(vec![Cell::new(identifier), ui::number_cell(rate.to_string())]);
    }

    let mut output = format!(
        "Exchange rates in {}\n\n",
        ui::style_text(&reference.name, ui::StyleType::Title)
    );
    output.push_str(&table.to_string());

    if result.is_empty() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text("No rates could be resolved", ui::StyleType::Error)
        ));
    } else if result.len() < requested {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("Resolved {} of {} requested currencies", result.len(), requested),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

/// Polls a dispatched task until it finishes.
async fn poll_until_done(
    executor: &TaskExecutor,
    outcome: QueryOutcome,
) -> Result<ResolutionResult> {
    let handle = match outcome {
        QueryOutcome::Result(result) => return Ok(result),
        QueryOutcome::Task(handle) => handle,
    };

    let pb = ui::new_spinner(&format!("Waiting for task {}...", handle.id()));
    let state = loop {
        let state = executor.status(handle.id())?;
        if state.is_terminal() {
            break executor.take(handle.id())?;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };
    pb.finish_and_clear();

    match state {
        TaskState::Completed(result) => Ok(result),
        TaskState::Failed(message) => bail!("Task {} failed: {}", handle.id(), message),
        TaskState::Pending => bail!("Task {} is still pending", handle.id()),
    }
}

pub async fn run(
    executor: &TaskExecutor,
    request: RateQueryRequest,
    format: OutputFormat,
) -> Result<()> {
    let identifiers = request.identifiers();
    let requested = identifiers.len();
    debug!(requested, mode = ?request.mode(), "Running rate query");

    let outcome = executor.query(identifiers, request.mode()).await?;
    let result = poll_until_done(executor, outcome).await?;

    match format {
        OutputFormat::Table => println!(
            "{}",
            display_as_table(&result, executor.engine().reference(), requested)
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetKind, Rate};

    #[test]
    fn test_display_as_table_lists_rates() {
        let reference = Asset::new("USD", "United States Dollar", AssetKind::Fiat);
        let mut result = ResolutionResult::new();
        result.insert("EUR".to_string(), Rate::new(1.08).unwrap());
        result.insert("ETH".to_string(), Rate::new(3150.5).unwrap());

        let output = display_as_table(&result, &reference, 2);
        assert!(output.contains("Rate (USD)"));
        assert!(output.contains("EUR"));
        assert!(output.contains("3150.5"));
        assert!(!output.contains("Resolved"));
    }

    #[test]
    fn test_display_as_table_notes_omissions() {
        let reference = Asset::new("USD", "United States Dollar", AssetKind::Fiat);
        let mut result = ResolutionResult::new();
        result.insert("EUR".to_string(), Rate::new(1.08).unwrap());

        let output = display_as_table(&result, &reference, 2);
        assert!(output.contains("Resolved 1 of 2 requested currencies"));
    }
}
