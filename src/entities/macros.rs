//! Macros for reducing boilerplate when declaring stored entities

/// Implement [`Entity`](crate::core::entity::Entity) from a declarative schema
///
/// ```rust,ignore
/// impl_entity!(Member {
///     collection: "Member",
///     hash_key: "userId",
///     indexes: { "handleLower" => "handleLower-index", "email" => "email-index" },
///     identifiable: ["email", "firstName", "lastName", "addresses"],
///     normalize: Member::derive_handle_lower,
/// });
///
/// impl_entity!(MemberTrait {
///     collection: "MemberTrait",
///     hash_key: "userId",
///     range_key: "traitId",
/// });
/// ```
///
/// Every indexed attribute is also declared unique. `normalize` names a
/// `fn(&mut Self)` run after construction from raw data and after merges.
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident {
            collection: $collection:literal,
            hash_key: $hash_key:literal
            $(, range_key: $range_key:literal)?
            $(, indexes: { $($key:literal => $index:literal),* $(,)? })?
            $(, identifiable: [$($field:literal),* $(,)?])?
            $(, normalize: $normalize:path)?
            $(,)?
        }
    ) => {
        impl $crate::core::entity::Entity for $type {
            fn collection() -> &'static str {
                $collection
            }

            fn hash_key() -> &'static str {
                $hash_key
            }

            fn range_key() -> Option<&'static str> {
                None $(.or(Some($range_key)))?
            }

            fn unique_keys() -> &'static [&'static str] {
                &[$($($key),*)?]
            }

            fn index_for(key: &str) -> Option<&'static str> {
                match key {
                    $($($key => Some($index),)*)?
                    _ => None,
                }
            }

            fn identifiable_fields() -> &'static [&'static str] {
                &[$($($field),*)?]
            }

            fn normalize(&mut self) {
                $($normalize(self);)?
            }
        }
    };
}
