pub mod auth;
pub mod categories;
pub mod comments;
pub mod messages;
pub mod posts;
pub mod students;
pub mod tags;

use sea_orm::{DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, Select};

use crate::config::Config;
use crate::error::BylineError;
use crate::response::Paginated;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
}

/// Run `select` through the paginator with Django `get_page` semantics:
/// the 1-based page number is clamped to `[1, total_pages]`, and an empty
/// result set reads as page 1 of 1.
pub async fn paginate<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: u64,
    page_size: u64,
) -> Result<Paginated<E::Model>, BylineError>
where
    E: EntityTrait,
    E::Model: FromQueryResult + serde::Serialize + Send + Sync,
{
    let paginator = select.paginate(db, page_size);
    let totals = paginator.num_items_and_pages().await?;
    let total_pages = totals.number_of_pages.max(1);
    let page = page.clamp(1, total_pages);
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Paginated {
        items,
        page,
        page_size,
        total_items: totals.number_of_items,
        total_pages,
    })
}
