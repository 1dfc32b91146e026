//! JSON for flatrec
//!
//! Flattened records are plain trees, so JSON carries them without any
//! extra metadata. This layer adds:
//! - `JsonCodec`: Value <-> JSON bytes, plus record-level helpers
//! - Value <-> serde_json conversions
//! - Value <-> serde types, for reading flat records into plain structs
//!
//! # Example
//!
//! ```rust
//! use flatrec_core::{DeclaredType, SchemaType};
//! use flatrec_json::{from_json_str, to_json_string};
//!
//! let region = SchemaType::builder("Region")
//!     .field("name", DeclaredType::Str)
//!     .build();
//! let styria = region.instantiate([("name", "styria")]).unwrap();
//!
//! let json = to_json_string(&styria).unwrap();
//! assert_eq!(from_json_str(&region, &json).unwrap(), styria);
//! ```

pub use bytes::Bytes;

mod codec;
mod convert;
mod error;

pub use codec::{from_json_str, to_json_string, JsonCodec};
pub use convert::{from_value, json_to_value, to_value, value_to_json};
pub use error::Error;
