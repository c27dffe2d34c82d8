//! Durable storage for the mutation queue
//!
//! One SQLite file per engine instance, opened lazily and migrated on open.
//! The connection pool is released when the handle is dropped, so store
//! cleanup runs on every exit path.

pub mod entities;
pub mod migration;

use std::path::Path;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use migration::Migrator;

/// Handle to the engine's SQLite database
pub struct Db {
	conn: DatabaseConnection,
}

impl Db {
	/// Open (creating if needed) the database at `path` and run pending
	/// migrations
	pub async fn open(path: impl AsRef<Path>) -> Result<Self, DbErr> {
		let path = path.as_ref();
		let url = format!("sqlite://{}?mode=rwc", path.display());

		let conn = Database::connect(&url).await?;
		Migrator::up(&conn, None).await?;

		debug!(path = %path.display(), "Opened mutation queue database");

		Ok(Self { conn })
	}

	/// The underlying SeaORM connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}
