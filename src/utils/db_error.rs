//! Classification of PostgreSQL errors.

/// Name of the unique constraint on `url_mappings.short_code`.
pub const SHORT_CODE_CONSTRAINT: &str = "url_mappings_short_code_key";

/// True if `e` is a unique violation on the short code column.
///
/// Any other unique violation is a different bug and must not trigger a code
/// regeneration.
pub fn is_unique_violation_on_code(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some(SHORT_CODE_CONSTRAINT))
}
