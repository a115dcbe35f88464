//! SurrealDB repository implementations.

mod cycle;
mod history;
mod margin;
mod plant;
mod strain;
mod target;
mod tent;

pub use cycle::SurrealCycleRepository;
pub use history::SurrealPlantHistoryRepository;
pub use margin::SurrealAlertMarginRepository;
pub use plant::SurrealPlantRepository;
pub use strain::SurrealStrainRepository;
pub use target::SurrealWeeklyTargetRepository;
pub use tent::SurrealTentRepository;

use uuid::Uuid;

use crate::error::DbError;

/// Parse a UUID stored as a string column.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {what} UUID: {e}")))
}

/// Parse an enum stored as a string column.
pub(crate) fn parse_enum<T>(value: &str, what: &str) -> Result<T, DbError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| DbError::Corrupt(format!("invalid {what}: {e}")))
}
