use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Entry in the shared site directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: i64,
    pub domain: String,
    pub name: String,
}
