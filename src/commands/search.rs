//! Search command implementation.

use crate::commands::QueryOptions;
use crate::config::Config;
use crate::ecs::{Operation, Params, Request};
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Runs an `ItemSearch` within one search index.
pub struct SearchCommand {
    config: Config,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the search and returns formatted output.
    pub async fn execute(
        &self,
        index: &str,
        keywords: &[String],
        criteria: &[(String, String)],
        options: &QueryOptions,
    ) -> Result<String> {
        let mut request = Request::new(&self.config).context("Failed to create request")?;

        self.execute_with_request(&mut request, index, keywords, criteria, options).await
    }

    /// Executes the search with a provided request (for testing).
    pub async fn execute_with_request(
        &self,
        request: &mut Request,
        index: &str,
        keywords: &[String],
        criteria: &[(String, String)],
        options: &QueryOptions,
    ) -> Result<String> {
        let mut search: Params = criteria.iter().cloned().collect();
        if !keywords.is_empty() {
            search.insert("Keywords".to_string(), keywords.join(" "));
        }
        if search.is_empty() {
            anyhow::bail!("Nothing to search for. Give keywords or --param Key=Value.");
        }

        info!("Searching {} for: {:?}", index, search);
        let operation = Operation::item_search(index, search)?;

        let result = request.search(&operation, &options.response_group, options.pages).await?;
        debug!("Received {} page(s)", result.len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_result(&result, options.kernel)?)
    }
}
