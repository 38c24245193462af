//! CLI command implementations.

pub mod cache;
pub mod cart;
pub mod help;
pub mod lookup;
pub mod search;

pub use cache::CacheCommand;
pub use cart::CartCommand;
pub use help::HelpCommand;
pub use lookup::LookupCommand;
pub use search::SearchCommand;

use crate::ecs::{PageCount, ResponseGroup};

/// Options shared by every querying command.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub response_group: ResponseGroup,
    pub pages: PageCount,
    /// Print only the records the response is about.
    pub kernel: bool,
}

/// Parses a `Key=Value` command-line parameter.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid parameter: '{}'. Use Key=Value", s)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::Config;
    use crate::ecs::{Endpoint, Transport};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Answers every fetch with the same body and records the queries.
    pub struct CannedTransport {
        body: String,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl CannedTransport {
        pub fn new(body: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
            let queries = Arc::new(Mutex::new(Vec::new()));
            (Self { body: body.to_string(), queries: Arc::clone(&queries) }, queries)
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn fetch(
            &mut self,
            _endpoint: &Endpoint,
            query: &str,
            _user_agent: &str,
        ) -> crate::error::Result<Vec<u8>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.body.clone().into_bytes())
        }

        fn disconnect(&mut self) {}
    }

    pub fn test_config() -> Config {
        Config { key_id: Some("KEY".to_string()), cache: false, ..Config::default() }
    }
}
