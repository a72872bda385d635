//! Debug utilities

/// Snapshot testing
///
/// Checks that the given struct matches the provided snapshot.
pub(crate) fn snap<T: core::fmt::Display>(snap: &str, obj: T) {
    assert_eq!(snap, &format!("{}", obj));
}
