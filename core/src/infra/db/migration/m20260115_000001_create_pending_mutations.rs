//! Migration to create the pending mutation queue table
//!
//! Creates the durable store for offline-captured writes, with secondary
//! indexes for category-filtered retrieval and FIFO draining by enqueue
//! time.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(PendingMutation::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(PendingMutation::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(PendingMutation::Uuid)
							.uuid()
							.not_null()
							.unique_key(),
					)
					.col(
						ColumnDef::new(PendingMutation::Category)
							.string()
							.not_null(),
					)
					.col(ColumnDef::new(PendingMutation::Action).string().not_null())
					.col(
						ColumnDef::new(PendingMutation::Endpoint)
							.string()
							.not_null(),
					)
					.col(ColumnDef::new(PendingMutation::Payload).text().not_null())
					.col(
						ColumnDef::new(PendingMutation::EnqueuedAt)
							.timestamp()
							.not_null(),
					)
					.col(
						ColumnDef::new(PendingMutation::RetryCount)
							.integer()
							.not_null()
							.default(0),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.if_not_exists()
					.name("idx_pending_mutation_category")
					.table(PendingMutation::Table)
					.col(PendingMutation::Category)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.if_not_exists()
					.name("idx_pending_mutation_enqueued_at")
					.table(PendingMutation::Table)
					.col(PendingMutation::EnqueuedAt)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(PendingMutation::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
enum PendingMutation {
	Table,
	Id,
	Uuid,
	Category,
	Action,
	Endpoint,
	Payload,
	EnqueuedAt,
	RetryCount,
}
