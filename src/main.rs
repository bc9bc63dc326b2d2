//! Member API server
//!
//! ```text
//! member-rs [config.yaml]
//! ```
//!
//! Without an argument the configuration is read from `MEMBER_CONFIG`, or the
//! defaults are used. Environment variables override the file either way.

use anyhow::Result;
use member::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MEMBER_CONFIG").ok());
    let config = match path {
        Some(path) => ServiceConfig::from_yaml_file(&path)?,
        None => ServiceConfig::default(),
    }
    .with_env_overrides();
    config.logging.init();

    #[cfg(feature = "dynamodb")]
    let host = ServiceHost::with_dynamodb(config).await?;
    #[cfg(not(feature = "dynamodb"))]
    let host = {
        tracing::warn!("dynamodb feature disabled, members are kept in memory");
        ServiceHost::in_memory(config)?
    };

    #[cfg(feature = "s3")]
    let host = host.with_s3_photo_storage().await?;
    #[cfg(not(feature = "s3"))]
    let host = host.with_photo_storage(Arc::new(InMemoryObjectStorage::new()))?;

    serve(Arc::new(host)).await
}
