//! Pending mutation entity
//!
//! The pending mutation table is the durable queue of user writes captured
//! while the client is offline. Records survive process restarts and are
//! drained FIFO by `enqueued_at` (insertion id breaks ties so the order is
//! total).

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};

/// Pending mutation model (SeaORM entity)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_mutation")]
pub struct Model {
	/// Internal database ID (auto-increment); FIFO tie-breaker
	#[sea_orm(primary_key)]
	pub id: i32,

	/// Stable mutation identifier, assigned at enqueue time
	#[sea_orm(unique)]
	pub uuid: Uuid,

	/// Domain tag ("generic-mutation", "goal", "transaction", "budget")
	pub category: String,

	/// Type of write ("create", "update", "delete")
	pub action: String,

	/// Target resource locator for this mutation
	pub endpoint: String,

	/// Opaque JSON body to submit on delivery (empty object for delete)
	#[sea_orm(column_type = "Text")]
	pub payload: String,

	/// When the mutation was captured; FIFO sort key, never modified
	pub enqueued_at: DateTimeUtc,

	/// Failed delivery attempts so far
	pub retry_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Active model for inserting a fresh record
	pub fn insert_values(
		uuid: Uuid,
		category: &str,
		action: &str,
		endpoint: &str,
		payload: &str,
		enqueued_at: DateTimeUtc,
	) -> ActiveModel {
		ActiveModel {
			id: ActiveValue::NotSet,
			uuid: ActiveValue::Set(uuid),
			category: ActiveValue::Set(category.to_string()),
			action: ActiveValue::Set(action.to_string()),
			endpoint: ActiveValue::Set(endpoint.to_string()),
			payload: ActiveValue::Set(payload.to_string()),
			enqueued_at: ActiveValue::Set(enqueued_at),
			retry_count: ActiveValue::Set(0),
		}
	}
}
