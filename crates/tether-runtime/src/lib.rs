#![forbid(unsafe_code)]

//! Runtime half of tether: the observer registry, bindings, and the tick
//! scheduler that batches propagation.
//!
//! # Example
//!
//! ```
//! use tether_core::{PropertyAccess, Record, Value};
//! use tether_runtime::reactive::{Scheduler, bind};
//!
//! let a = Record::shared();
//! let b = Record::with_values([("title", "hi")]);
//!
//! let scheduler = Scheduler::global();
//! let binding = scheduler.run(|| {
//!     bind(tether_core::Endpoint::rooted(b.clone(), "title"))
//!         .to_root(a.clone(), "value")
//!         .connect()
//! });
//! assert!(a.get("value").identical(&Value::from("hi")));
//!
//! // Two-way by default.
//! scheduler.run(|| a.set("value", Value::from("edited")));
//! assert!(b.get("title").identical(&Value::from("edited")));
//! binding.destroy();
//! ```

pub mod reactive;
pub mod settings;

pub use reactive::{
    Binding, BindingId, BindingScope, BindingState, BindingTemplate, ObserverRegistry,
    RegistrationId, Scheduler, bind,
};
pub use settings::{BindingSettings, SettingsError};
