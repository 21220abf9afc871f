//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut SqliteConnection` (a pooled connection or an open transaction)
//! and returns the records defined in [`crate::db::models`]. Entities with the usual
//! create/read/update/delete lifecycle implement the [`Repository`] trait; the rest expose the
//! handful of operations the API needs.
//!
//! - [`Users`]: accounts, role assignment and permission lookup
//! - [`Roles`]: seeded roles with their permissions (read-only)
//! - [`Locations`], [`LocationImages`]: venues and their picture
//! - [`Meetups`], [`Participants`], [`Topics`]: scheduled meetups and who attends them
//!
//! ```ignore
//! use tinymeets::db::handlers::{Repository, Users};
//!
//! let mut conn = pool.acquire().await?;
//! let user = Users::new(&mut conn).get_user_by_email("user@example.com").await?;
//! ```

pub mod location_images;
pub mod locations;
pub mod meetups;
pub mod participants;
pub mod repository;
pub mod roles;
pub mod topics;
pub mod users;

pub use location_images::LocationImages;
pub use locations::Locations;
pub use meetups::Meetups;
pub use participants::Participants;
pub use repository::Repository;
pub use roles::Roles;
pub use topics::Topics;
pub use users::Users;

/// Lowercased `LIKE` pattern matching `search` as a literal substring. Pair with `ESCAPE '\\'`.
pub(crate) fn substring_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::substring_pattern;

    #[test]
    fn test_substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("  Grind "), "%grind%");
        assert_eq!(substring_pattern("100%"), "%100\\%%");
        assert_eq!(substring_pattern("a_b"), "%a\\_b%");
        assert_eq!(substring_pattern("c:\\temp"), "%c:\\\\temp%");
    }
}
