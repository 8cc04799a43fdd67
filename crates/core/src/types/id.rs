//! Newtype IDs for type-safe entity references.
//!
//! The Parcsal backend issues opaque string identifiers. Use the `define_id!`
//! macro to wrap them so a company ID can never be passed where a user ID is
//! expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use parcsal_core::define_id;
/// define_id!(BookingId);
/// define_id!(SlotId);
///
/// let booking = BookingId::new("bk_1");
/// let slot = SlotId::new("bk_1");
///
/// assert_eq!(booking.as_str(), slot.as_str());
/// // These are different types, so this won't compile:
/// // let _: BookingId = slot;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id!(UserId);
define_id!(CompanyId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = UserId::new("usr_42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"usr_42\"");

        let parsed: UserId = serde_json::from_str("\"usr_42\"").expect("deserialize");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CompanyId::from("cmp_7").to_string(), "cmp_7");
    }
}
