use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message entity - the single model of the guestbook app.
/// Listed newest first on the board.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Short preview of the message text, as shown in listings.
    pub fn preview(&self) -> String {
        const LIMIT: usize = 50;
        if self.text.chars().count() > LIMIT {
            let head: String = self.text.chars().take(LIMIT).collect();
            format!("{head}...")
        } else {
            self.text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(text: &str) -> Model {
        Model {
            id: 1,
            text: text.to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(60);
        assert_eq!(message(&long).preview(), format!("{}...", "x".repeat(50)));
        assert_eq!(message("short").preview(), "short");
    }
}
