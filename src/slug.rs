//! URL-safe slug derivation.
//!
//! Slugs are derived from human-readable titles and kept globally unique per
//! table by walking the candidate sequence `base`, `base-1`, `base-2`, …
//! until a free one is found. Callers perform the existence check (they own
//! the table and the "exclude myself on re-save" rule); this module owns the
//! deterministic string mangling.

/// Derive a lowercase, hyphenated, URL-safe identifier from `input`.
///
/// Alphanumerics are kept (lowercased); every run of other characters
/// collapses to a single hyphen. Leading and trailing hyphens are trimmed.
/// The result may be empty when the input contains no alphanumerics; use
/// [`slugify_or`] where a non-empty identifier is required.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Like [`slugify`], but substitutes `fallback` when the derived base is
/// empty, so degenerate titles ("???", "", "!!!") still get an identifier.
pub fn slugify_or(input: &str, fallback: &str) -> String {
    let slug = slugify(input);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Derive a unique slug for an entity with a `slug` column.
///
/// Walks the [`candidates`] sequence and returns the first value with no
/// existing row. `exclude_id` skips the record being re-saved, which makes
/// re-deriving from an unchanged title idempotent. Run this on the same
/// connection (or transaction) as the subsequent insert so the check sees
/// uncommitted rows.
pub async fn unique<E, C>(
    db: &C,
    title: &str,
    fallback: &str,
    slug_col: E::Column,
    id_col: E::Column,
    exclude_id: Option<i32>,
) -> Result<String, crate::error::BylineError>
where
    E: sea_orm::EntityTrait,
    E::Model: sea_orm::FromQueryResult + Send + Sync,
    C: sea_orm::ConnectionTrait,
{
    use sea_orm::{ColumnTrait, PaginatorTrait, QueryFilter};

    let base = slugify_or(title, fallback);
    for candidate in candidates(&base) {
        let mut select = E::find().filter(slug_col.eq(candidate.clone()));
        if let Some(id) = exclude_id {
            select = select.filter(id_col.ne(id));
        }
        if select.count(db).await? == 0 {
            return Ok(candidate);
        }
    }

    // The candidate sequence is infinite.
    Err(crate::error::BylineError::Internal(
        "slug candidate space exhausted".to_string(),
    ))
}

/// The candidate sequence for uniquification: `base`, `base-1`, `base-2`, …
///
/// The search is sequential and never gap-fills: callers must check existence
/// of every candidate in order and take the first free one.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let mut counter: u64 = 0;
    std::iter::from_fn(move || {
        let candidate = if counter == 0 {
            base.to_string()
        } else {
            format!("{base}-{counter}")
        };
        counter += 1;
        Some(candidate)
    })
}
