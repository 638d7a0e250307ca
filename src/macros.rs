//! Macros to reduce boilerplate in the codebase

/// Macro to generate Display and FromStr implementations for wire-form enums
///
/// Parsing is ASCII case-insensitive; Display always emits the canonical form.
///
/// # Usage
///
/// ```rust,ignore
/// use crate::error::FeedError;
///
/// enum_display_fromstr!(
///     MyEnum,
///     FeedError::InvalidMyEnum,
///     {
///         Variant1 => "VARIANT1",
///         Variant2 => "VARIANT_2",
///     }
/// );
/// ```
#[macro_export]
macro_rules! enum_display_fromstr {
    (
        $enum_name:ident,
        $error_variant:path,
        { $($variant:ident => $str:expr),+ $(,)? }
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($enum_name::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::FeedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok($enum_name::$variant);
                    }
                )+
                Err($error_variant(s.to_string()))
            }
        }
    };
}
