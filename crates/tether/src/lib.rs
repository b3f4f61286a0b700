#![forbid(unsafe_code)]

//! tether: keep properties on different objects in sync.
//!
//! This crate re-exports [`tether_core`] (values, observable records, paths)
//! and [`tether_runtime`] (registry, bindings, scheduler). Most code only
//! needs the [`prelude`].
//!
//! ```
//! use tether::prelude::*;
//!
//! let a = Record::shared();
//! let b = Record::with_values([("x", true), ("y", true)]);
//! global_root().set("facadeDoc", Value::Object(b.clone()));
//!
//! let scheduler = Scheduler::global();
//! let enabled = scheduler.run(|| {
//!     BindingTemplate::new()
//!         .and(["facadeDoc.x", "facadeDoc.y"])
//!         .to_root(a.clone(), "enabled")
//!         .connect()
//! });
//! assert!(a.get("enabled").identical(&Value::from(true)));
//!
//! scheduler.run(|| b.set("y", Value::from(false)));
//! assert!(a.get("enabled").identical(&Value::from(false)));
//! enabled.destroy();
//! ```

pub use tether_core as core;
pub use tether_runtime as runtime;

pub use tether_core::{
    CONTENTS_KEY, Endpoint, ObjectRef, PathError, PropertyAccess, PropertyPath, Record, Value,
    global_root,
};
pub use tether_runtime::reactive::{
    Binding, BindingId, BindingScope, BindingState, BindingTemplate, ObserverRegistry, Scheduler,
    TickGuard,
};
pub use tether_runtime::settings::{self, BindingSettings, SettingsError};
pub use tether_runtime::{bind, reactive};

/// Everything needed to declare and run bindings.
pub mod prelude {
    pub use tether_core::{
        CONTENTS_KEY, Endpoint, ObjectRef, PropertyAccess, PropertyPath, Record, Value,
        global_root,
    };
    pub use tether_runtime::bind;
    pub use tether_runtime::reactive::{
        Binding, BindingScope, BindingState, BindingTemplate, Scheduler,
    };
}
