//! Durable mutation queue
//!
//! Captures user writes while the client is offline and holds them until a
//! draining pass delivers them. Records are immutable after creation except
//! for the retry count; removal happens on successful delivery or poison
//! eviction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, PaginatorTrait,
	QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::infra::db::entities::pending_mutation;
use crate::infra::db::Db;
use crate::sync::clock::Clock;

/// Domain tag a mutation belongs to
///
/// Selects which delivery triggers a record participates in and supports
/// filtered retrieval.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	Serialize,
	Deserialize,
	strum::Display,
	strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MutationCategory {
	GenericMutation,
	Goal,
	Transaction,
	Budget,
}

/// Type of write captured by a mutation
///
/// Determines the HTTP verb used on delivery: create maps to POST, update
/// to PATCH, delete to DELETE.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Serialize,
	Deserialize,
	strum::Display,
	strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MutationAction {
	Create,
	Update,
	Delete,
}

/// A durably queued write awaiting delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
	/// Stable identifier, assigned at enqueue time
	pub id: Uuid,
	pub category: MutationCategory,
	pub action: MutationAction,
	/// Target resource locator
	pub endpoint: String,
	/// Opaque JSON body to submit (ignored for delete)
	pub payload: serde_json::Value,
	/// Capture time; FIFO sort key for draining passes
	pub enqueued_at: DateTime<Utc>,
	/// Failed delivery attempts so far
	pub retry_count: i32,
}

impl MutationRecord {
	fn from_model(model: pending_mutation::Model) -> Result<Self, QueueError> {
		Ok(Self {
			id: model.uuid,
			category: model.category.parse()?,
			action: model.action.parse()?,
			endpoint: model.endpoint,
			payload: serde_json::from_str(&model.payload)?,
			enqueued_at: model.enqueued_at,
			retry_count: model.retry_count,
		})
	}
}

/// Inputs for capturing a new mutation
#[derive(Debug, Clone)]
pub struct NewMutation {
	pub category: MutationCategory,
	pub action: MutationAction,
	pub endpoint: String,
	pub payload: serde_json::Value,
}

/// Mutation queue errors
///
/// Every variant is storage-fatal from the processor's point of view: a
/// draining pass that hits one aborts with the fatal sentinel.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("database error: {0}")]
	Database(#[from] DbErr),

	#[error("payload serialization error: {0}")]
	Payload(#[from] serde_json::Error),

	#[error("corrupt stored record: {0}")]
	Corrupt(#[from] strum::ParseError),

	#[error("mutation not found: {0}")]
	NotFound(Uuid),
}

/// Store API over the pending mutation table
///
/// All operations either succeed or surface a [`QueueError`]; the queue has
/// no network access and no side effects beyond persisted state.
pub struct MutationQueue {
	db: Arc<Db>,
	clock: Arc<dyn Clock>,
}

impl MutationQueue {
	pub fn new(db: Arc<Db>, clock: Arc<dyn Clock>) -> Self {
		Self { db, clock }
	}

	/// Durably capture a mutation
	///
	/// Once this returns `Ok`, the record survives process termination and
	/// will eventually be attempted. Callers must not assume durability on
	/// error.
	pub async fn enqueue(&self, mutation: NewMutation) -> Result<MutationRecord, QueueError> {
		let record = MutationRecord {
			id: Uuid::new_v4(),
			category: mutation.category,
			action: mutation.action,
			endpoint: mutation.endpoint,
			payload: mutation.payload,
			enqueued_at: self.clock.now(),
			retry_count: 0,
		};

		pending_mutation::Model::insert_values(
			record.id,
			&record.category.to_string(),
			&record.action.to_string(),
			&record.endpoint,
			&serde_json::to_string(&record.payload)?,
			record.enqueued_at,
		)
		.insert(self.db.conn())
		.await?;

		debug!(
			id = %record.id,
			category = %record.category,
			action = %record.action,
			"Mutation enqueued"
		);

		Ok(record)
	}

	/// All pending records, oldest first
	pub async fn pending(&self) -> Result<Vec<MutationRecord>, QueueError> {
		pending_mutation::Entity::find()
			.order_by_asc(pending_mutation::Column::EnqueuedAt)
			.order_by_asc(pending_mutation::Column::Id)
			.all(self.db.conn())
			.await?
			.into_iter()
			.map(MutationRecord::from_model)
			.collect()
	}

	/// Pending records for one category, oldest first
	pub async fn pending_by_category(
		&self,
		category: MutationCategory,
	) -> Result<Vec<MutationRecord>, QueueError> {
		pending_mutation::Entity::find()
			.filter(pending_mutation::Column::Category.eq(category.to_string()))
			.order_by_asc(pending_mutation::Column::EnqueuedAt)
			.order_by_asc(pending_mutation::Column::Id)
			.all(self.db.conn())
			.await?
			.into_iter()
			.map(MutationRecord::from_model)
			.collect()
	}

	/// Look up a single record by id
	pub async fn find(&self, id: Uuid) -> Result<Option<MutationRecord>, QueueError> {
		pending_mutation::Entity::find()
			.filter(pending_mutation::Column::Uuid.eq(id))
			.one(self.db.conn())
			.await?
			.map(MutationRecord::from_model)
			.transpose()
	}

	/// Number of records currently pending
	pub async fn pending_count(&self) -> Result<u64, QueueError> {
		Ok(pending_mutation::Entity::find()
			.count(self.db.conn())
			.await?)
	}

	/// Delete a record (successful delivery or poison eviction)
	pub async fn remove(&self, id: Uuid) -> Result<(), QueueError> {
		let result = pending_mutation::Entity::delete_many()
			.filter(pending_mutation::Column::Uuid.eq(id))
			.exec(self.db.conn())
			.await?;

		if result.rows_affected == 0 {
			return Err(QueueError::NotFound(id));
		}

		Ok(())
	}

	/// Record one more failed delivery attempt, returning the new count
	///
	/// The retry count is the only mutable field of a stored record.
	pub async fn bump_retry(&self, id: Uuid) -> Result<i32, QueueError> {
		let model = pending_mutation::Entity::find()
			.filter(pending_mutation::Column::Uuid.eq(id))
			.one(self.db.conn())
			.await?
			.ok_or(QueueError::NotFound(id))?;

		let retry_count = model.retry_count + 1;

		let mut active: pending_mutation::ActiveModel = model.into();
		active.retry_count = Set(retry_count);
		active.update(self.db.conn()).await?;

		Ok(retry_count)
	}
}
