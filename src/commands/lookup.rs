//! Item lookup command implementation.

use crate::commands::QueryOptions;
use crate::config::Config;
use crate::ecs::{params, Operation, Params, Request};
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Item ids the service accepts in one look-up.
const IDS_PER_LOOKUP: usize = 10;

/// Batched look-ups the service accepts in one request.
const LOOKUPS_PER_REQUEST: usize = 2;

/// Looks up items by ASIN.
pub struct LookupCommand {
    config: Config,
}

impl LookupCommand {
    /// Creates a new lookup command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Looks up `asins` and returns formatted output.
    pub async fn execute(&self, asins: &[String], options: &QueryOptions) -> Result<String> {
        let mut request = Request::new(&self.config).context("Failed to create request")?;

        self.execute_with_request(&mut request, asins, options).await
    }

    /// Looks up `asins` with a provided request (for testing).
    ///
    /// More than ten ids are split into batched look-ups of ten, at most
    /// two of them.
    pub async fn execute_with_request(
        &self,
        request: &mut Request,
        asins: &[String],
        options: &QueryOptions,
    ) -> Result<String> {
        let mut valid = Vec::with_capacity(asins.len());
        for asin in asins {
            // 10 alphanumeric characters
            let asin = asin.trim().to_uppercase();
            if asin.len() != 10 || !asin.chars().all(|c| c.is_ascii_alphanumeric()) {
                anyhow::bail!(
                    "Invalid ASIN format: '{}'. ASIN should be 10 alphanumeric characters.",
                    asin
                );
            }
            valid.push(asin);
        }
        if valid.is_empty() {
            anyhow::bail!("No ASINs given");
        }
        if valid.len() > IDS_PER_LOOKUP * LOOKUPS_PER_REQUEST {
            anyhow::bail!(
                "Too many ASINs: {}. At most {} can be looked up at once.",
                valid.len(),
                IDS_PER_LOOKUP * LOOKUPS_PER_REQUEST
            );
        }

        info!("Looking up {} item(s)", valid.len());

        let mut sets: Vec<Params> =
            valid.chunks(IDS_PER_LOOKUP).map(|chunk| params([("ItemId", chunk.join(","))])).collect();
        let first = sets.remove(0);
        let operation = Operation::item_lookup("ASIN", first, sets);

        let result = request.search(&operation, &options.response_group, options.pages).await?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_result(&result, options.kernel)?)
    }
}
