//! Concrete provider builders and handles, one per backend kind.

mod database;
mod disk;
mod r2;
mod s3;

pub use database::{DatabaseBuilder, DatabaseProvider};
pub use disk::{DEFAULT_DISK_BASE_PATH, DiskBuilder, DiskProvider};
pub use r2::{R2_REGION, R2Builder, R2Provider, r2_endpoint};
pub use s3::{EnvLookup, S3Builder, S3Provider};

/// First non-empty value, trimmed.
fn first_non_empty<'a>(values: &[&'a str]) -> Option<&'a str> {
    values.iter().map(|v| v.trim()).find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(&["", "  ", "b", "c"]), Some("b"));
        assert_eq!(first_non_empty(&["", ""]), None);
    }
}
