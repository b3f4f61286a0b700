#![forbid(unsafe_code)]

//! Core data model for tether.
//!
//! - [`Value`]: dynamically-typed property values with reference-aware
//!   identity ([`Value::identical`]).
//! - [`PropertyAccess`]: the capability bindable objects implement.
//! - [`Record`]: the stock observable object.
//! - [`PropertyPath`] / [`Endpoint`]: parsed paths and their resolution to a
//!   `(target, key)` pair.
//!
//! Everything here is single-threaded (`Rc`, `RefCell`). The propagation
//! engine built on top lives in `tether-runtime`.

pub mod object;
pub mod path;
pub mod value;

pub use object::{
    CONTENTS_KEY, KeyCallback, KeyObserverId, ObjectRef, PropertyAccess, Record, global_root,
    global_root_ref,
};
pub use path::{Endpoint, PathError, PropertyPath, resolve_segments};
pub use value::{Value, same_object};
