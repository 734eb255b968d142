use std::{any::type_name, fmt::Debug, str::FromStr};

/// A value a config parameter can hold.
///
/// Implemented for the primitive numbers, `bool`, `char` and `String`.
/// Overrides are always supplied as strings and coerced through [ConfigValue::parse_override].
pub trait ConfigValue: Clone + Debug + Send + Sync + 'static {
    /// Parses an override string into the declared type
    ///
    /// Returns a human readable reason on failure
    fn parse_override(raw: &str) -> Result<Self, String>;

    /// Name of the declared type, used in error messages
    fn target_name() -> &'static str {
        type_name::<Self>()
    }
}

macro_rules! impl_from_str_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ConfigValue for $ty {
                fn parse_override(raw: &str) -> Result<Self, String> {
                    <$ty as FromStr>::from_str(raw.trim()).map_err(|e| e.to_string())
                }
            }
        )*
    };
}

impl_from_str_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl ConfigValue for bool {
    fn parse_override(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(format!("'{other}' is not a boolean")),
        }
    }
}

impl ConfigValue for String {
    fn parse_override(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}
