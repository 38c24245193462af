//! Cart command implementation.

use crate::config::Config;
use crate::ecs::{Cart, Request};
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Shows the contents of an existing remote cart.
pub struct CartCommand {
    config: Config,
}

impl CartCommand {
    /// Creates a new cart command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fetches the cart identified by `cart_id` and `hmac`.
    pub async fn execute(&self, cart_id: &str, hmac: &str) -> Result<String> {
        let request = Request::new(&self.config).context("Failed to create request")?;

        self.execute_with_request(request, cart_id, hmac).await
    }

    /// Fetches the cart with a provided request (for testing).
    pub async fn execute_with_request(
        &self,
        request: Request,
        cart_id: &str,
        hmac: &str,
    ) -> Result<String> {
        info!("Fetching cart {}", cart_id);

        let mut cart = Cart::new(request);
        cart.get(cart_id, hmac)
            .await
            .with_context(|| format!("Failed to fetch cart {}", cart_id))?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_cart(&cart))
    }
}
