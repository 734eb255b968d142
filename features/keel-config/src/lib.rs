//! Keel Config resolves the configuration parameters components declare.
//!
//! Every parameter has a name and a typed default written next to the component.
//! Overrides are plain strings supplied from the outside, and are coerced into the
//! declared type when the parameter is resolved.
//!
//! Keel Config is split into three parts:
//! 1. ConfigValue: the types a parameter may hold, and how override strings are coerced
//! 2. ParamOverrides: the registry of string overrides, filled programmatically or from the environment
//! 3. Errors: coercion failures
//!
//! # Examples
//!
//! ```rust
//! use keel_config::ParamOverrides;
//!
//! let mut overrides = ParamOverrides::new();
//! overrides.insert("value", "999");
//!
//! assert_eq!(overrides.resolve("value", &1000_u32).unwrap(), 999);
//! assert_eq!(overrides.resolve("other", &1000_u32).unwrap(), 1000);
//! ```

pub mod errors;
pub mod overrides;
pub mod value;

pub use errors::ConfigError;
pub use overrides::ParamOverrides;
pub use value::ConfigValue;
