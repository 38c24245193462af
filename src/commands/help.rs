//! Help command implementation.

use crate::commands::QueryOptions;
use crate::config::Config;
use crate::ecs::{Operation, Params, Request};
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Asks the service to describe an operation or response group.
pub struct HelpCommand {
    config: Config,
}

impl HelpCommand {
    /// Creates a new help command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(
        &self,
        help_type: &str,
        about: &str,
        options: &QueryOptions,
    ) -> Result<String> {
        let mut request = Request::new(&self.config).context("Failed to create request")?;

        self.execute_with_request(&mut request, help_type, about, options).await
    }

    /// Runs the help operation with a provided request (for testing).
    pub async fn execute_with_request(
        &self,
        request: &mut Request,
        help_type: &str,
        about: &str,
        options: &QueryOptions,
    ) -> Result<String> {
        info!("Help on {} {}", help_type, about);

        let operation = Operation::help(help_type, about, Params::new());
        let result = request.search(&operation, &options.response_group, options.pages).await?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_result(&result, options.kernel)?)
    }
}
