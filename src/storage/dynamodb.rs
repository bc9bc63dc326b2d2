//! DynamoDB implementation of EntityStore

use crate::config::StoreConfig;
use crate::core::entity::Entity;
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::field::FieldValue;
use crate::core::service::EntityStore;
use crate::core::store::{Condition, QueryDescriptor, ScanParams};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client as DynamoDBClient;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::marker::PhantomData;

type Item = HashMap<String, AttributeValue>;

/// Build a DynamoDB client from the store configuration
///
/// A configured endpoint (e.g. DynamoDB Local) overrides the regional one.
pub async fn connect(config: &StoreConfig) -> DynamoDBClient {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    DynamoDBClient::from_conf(builder.build())
}

/// DynamoDB implementation of EntityStore
///
/// Records are mapped to items with `serde_dynamo`, so attribute names are
/// the serialized names of the entity.
#[derive(Clone)]
pub struct DynamoDBStore<T: Entity> {
    client: DynamoDBClient,
    table_name: String,
    _phantom: PhantomData<T>,
}

/// Filter and key-condition expression with its placeholder bindings
#[derive(Debug, Default)]
struct Expression {
    names: HashMap<String, String>,
    values: Item,
}

impl Expression {
    fn name(&mut self, field: &str) -> String {
        let placeholder = format!("#f{}", self.names.len());
        self.names.insert(placeholder.clone(), field.to_string());
        placeholder
    }

    fn value(&mut self, value: &FieldValue) -> ServiceResult<String> {
        let placeholder = format!(":v{}", self.values.len());
        let attribute: AttributeValue = serde_dynamo::to_attribute_value(value)
            .map_err(|e| ServiceError::BadRequest(format!("unsupported filter value: {}", e)))?;
        self.values.insert(placeholder.clone(), attribute);
        Ok(placeholder)
    }

    fn condition(&mut self, condition: &Condition) -> ServiceResult<String> {
        let name = self.name(condition.field());
        Ok(match condition {
            Condition::Eq(_, value) => format!("{} = {}", name, self.value(value)?),
            Condition::In(_, values) => {
                let placeholders = values
                    .iter()
                    .map(|v| self.value(v))
                    .collect::<ServiceResult<Vec<_>>>()?;
                format!("{} IN ({})", name, placeholders.join(", "))
            }
            Condition::Contains(_, needle) => {
                format!("contains({}, {})", name, self.value(&FieldValue::from(needle.as_str()))?)
            }
        })
    }

    fn filter(&mut self, conditions: &[Condition]) -> ServiceResult<Option<String>> {
        if conditions.is_empty() {
            return Ok(None);
        }
        let parts = conditions
            .iter()
            .map(|c| self.condition(c))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Some(parts.join(" AND ")))
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    fn values(&self) -> Option<Item> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

impl<T: Entity> DynamoDBStore<T> {
    pub fn new(client: DynamoDBClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            _phantom: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn to_item(&self, entity: &T) -> ServiceResult<Item> {
        serde_dynamo::to_item(entity).map_err(|e| ServiceError::store_write(T::collection(), e))
    }

    fn from_items(&self, items: Vec<Item>) -> ServiceResult<Vec<T>> {
        serde_dynamo::from_items(items).map_err(|e| ServiceError::store_read(T::collection(), e))
    }

    async fn put(&self, entity: &T, conditional: bool) -> ServiceResult<()> {
        let item = self.to_item(entity)?;
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item));

        if conditional {
            request = request
                .condition_expression("attribute_not_exists(#hk)")
                .expression_attribute_names("#hk", T::hash_key());
        }

        request.send().await.map_err(|err| {
            let duplicate = err
                .as_service_error()
                .is_some_and(|e| e.is_conditional_check_failed_exception());
            if duplicate {
                ServiceError::store_write(
                    T::collection(),
                    format!("record with key '{}' already exists", entity.storage_key()),
                )
            } else {
                ServiceError::store_write(T::collection(), DisplayErrorContext(&err))
            }
        })?;
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for DynamoDBStore<T> {
    async fn query(&self, descriptor: &QueryDescriptor) -> ServiceResult<Vec<T>> {
        let mut expression = Expression::default();
        let key_condition = format!(
            "{} = {}",
            expression.name(&descriptor.key),
            expression.value(&descriptor.value)?
        );
        let filter = expression.filter(&descriptor.conditions)?;

        let mut results = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .set_index_name(descriptor.index.clone())
                .key_condition_expression(&key_condition)
                .set_filter_expression(filter.clone())
                .set_expression_attribute_names(expression.names())
                .set_expression_attribute_values(expression.values())
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| ServiceError::store_read(T::collection(), DisplayErrorContext(&e)))?;

            results.extend(self.from_items(output.items.unwrap_or_default())?);
            if descriptor.limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        if let Some(limit) = descriptor.limit {
            results.truncate(limit);
        }
        tracing::debug!(
            table = %self.table_name,
            index = ?descriptor.index,
            count = results.len(),
            "query completed"
        );
        Ok(results)
    }

    async fn scan(&self, params: &ScanParams) -> ServiceResult<Vec<T>> {
        let mut expression = Expression::default();
        let filter = expression.filter(&params.conditions)?;

        let mut results = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_filter_expression(filter.clone())
                .set_expression_attribute_names(expression.names())
                .set_expression_attribute_values(expression.values())
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| ServiceError::store_read(T::collection(), DisplayErrorContext(&e)))?;

            results.extend(self.from_items(output.items.unwrap_or_default())?);
            if params.limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        if let Some(limit) = params.limit {
            results.truncate(limit);
        }
        tracing::debug!(table = %self.table_name, count = results.len(), "scan completed");
        Ok(results)
    }

    async fn insert(&self, entity: &T) -> ServiceResult<()> {
        self.put(entity, true).await
    }

    async fn save(&self, entity: &T) -> ServiceResult<()> {
        self.put(entity, false).await
    }
}
