//! Service host holding the shared state of the member service
//!
//! The host is built once at startup and shared as `Arc<ServiceHost>` with
//! every handler. Besides the configuration and the entity stores it owns the
//! two lazily constructed clients:
//!
//! - the search index client, connected on first use
//! - the bus publisher, created on first use from the bus configuration
//!
//! Both sit in a `tokio::sync::OnceCell`, so concurrent first calls still
//! construct a single instance. Tests inject ready-made collaborators through
//! the `with_*` methods instead.

use crate::config::ServiceConfig;
use crate::core::auth::AdminRoles;
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::events::EventPublisher;
use crate::core::service::EntityStore;
use crate::entities::{Member, MemberTrait};
use crate::services::bus::BusClient;
use crate::services::object_storage::{ObjectStorage, PhotoUploader};
use crate::services::search::SearchClient;
use crate::storage::InMemoryStore;
use axum::extract::FromRef;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Host context containing all service state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServiceHost::in_memory(config)?
///     .with_event_publisher(Arc::new(LocalEventBus::default()))
///     .with_photo_storage(Arc::new(InMemoryObjectStorage::new()))?;
///
/// let app = build_router(Arc::new(host));
/// ```
pub struct ServiceHost {
    config: Arc<ServiceConfig>,
    admin_roles: AdminRoles,
    members: Arc<dyn EntityStore<Member>>,
    traits: Arc<dyn EntityStore<MemberTrait>>,
    publisher: OnceCell<Arc<dyn EventPublisher>>,
    search: OnceCell<SearchClient>,
    photos: Option<PhotoUploader>,
}

impl ServiceHost {
    /// Build the host over the given stores
    ///
    /// Fails with `ServiceError::Config` when the configuration is invalid.
    pub fn new(
        config: ServiceConfig,
        members: Arc<dyn EntityStore<Member>>,
        traits: Arc<dyn EntityStore<MemberTrait>>,
    ) -> ServiceResult<Self> {
        config.validate()?;
        let admin_roles = config.auth.admin_roles();

        Ok(Self {
            config: Arc::new(config),
            admin_roles,
            members,
            traits,
            publisher: OnceCell::new(),
            search: OnceCell::new(),
            photos: None,
        })
    }

    /// Build the host over empty in-memory stores
    pub fn in_memory(config: ServiceConfig) -> ServiceResult<Self> {
        Self::new(
            config,
            Arc::new(InMemoryStore::<Member>::new()),
            Arc::new(InMemoryStore::<MemberTrait>::new()),
        )
    }

    /// Build the host over the DynamoDB tables named in the configuration
    #[cfg(feature = "dynamodb")]
    pub async fn with_dynamodb(config: ServiceConfig) -> ServiceResult<Self> {
        use crate::storage::DynamoDBStore;

        let client = crate::storage::dynamodb::connect(&config.store).await;
        let members = DynamoDBStore::<Member>::new(client.clone(), &config.store.member_table);
        let traits =
            DynamoDBStore::<MemberTrait>::new(client, &config.store.member_trait_table);
        tracing::info!(
            members = %config.store.member_table,
            traits = %config.store.member_trait_table,
            "using DynamoDB tables"
        );
        Self::new(config, Arc::new(members), Arc::new(traits))
    }

    /// Use a pre-built publisher instead of the lazily created bus client
    pub fn with_event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = OnceCell::new_with(Some(publisher));
        self
    }

    /// Use a pre-built search client instead of connecting on first use
    pub fn with_search_client(mut self, client: SearchClient) -> Self {
        self.search = OnceCell::new_with(Some(client));
        self
    }

    /// Enable photo uploads to `storage`
    pub fn with_photo_storage(mut self, storage: Arc<dyn ObjectStorage>) -> ServiceResult<Self> {
        self.photos = Some(PhotoUploader::new(storage, &self.config.storage)?);
        Ok(self)
    }

    /// Enable photo uploads to S3 with the ambient AWS configuration
    #[cfg(feature = "s3")]
    pub async fn with_s3_photo_storage(self) -> ServiceResult<Self> {
        let storage = crate::services::object_storage::S3ObjectStorage::from_env().await;
        self.with_photo_storage(Arc::new(storage))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn admin_roles(&self) -> &AdminRoles {
        &self.admin_roles
    }

    pub fn members(&self) -> &Arc<dyn EntityStore<Member>> {
        &self.members
    }

    pub fn traits(&self) -> &Arc<dyn EntityStore<MemberTrait>> {
        &self.traits
    }

    /// The search client, connected on first call
    pub async fn search_client(&self) -> ServiceResult<&SearchClient> {
        self.search
            .get_or_try_init(|| SearchClient::connect(&self.config.search))
            .await
    }

    /// The bus publisher, created on first call
    pub async fn event_publisher(&self) -> &Arc<dyn EventPublisher> {
        self.publisher
            .get_or_init(|| async {
                tracing::info!(bus = %self.config.bus.bus_api_url, "creating bus client");
                Arc::new(BusClient::new(self.config.bus.clone())) as Arc<dyn EventPublisher>
            })
            .await
    }

    /// The photo uploader, if photo storage is enabled
    pub fn photo_uploader(&self) -> ServiceResult<&PhotoUploader> {
        self.photos
            .as_ref()
            .ok_or_else(|| ServiceError::Config("photo storage is not configured".to_string()))
    }
}

impl FromRef<Arc<ServiceHost>> for AdminRoles {
    fn from_ref(host: &Arc<ServiceHost>) -> Self {
        host.admin_roles.clone()
    }
}
