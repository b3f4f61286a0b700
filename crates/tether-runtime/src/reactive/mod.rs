#![forbid(unsafe_code)]

//! Property bindings and change propagation.
//!
//! - [`ObserverRegistry`]: watches dotted property paths and repairs the
//!   observation chain when an intermediate object is replaced.
//! - [`Binding`] / [`BindingTemplate`]: keep two endpoints in step, one-way
//!   or two-way, through an optional transform chain.
//! - [`Scheduler`]: batches every connection and change into one ordered
//!   flush at the end of a tick.
//! - [`BindingScope`]: destroys the bindings it holds when dropped.
//!
//! # Architecture
//!
//! Everything is single-threaded and shared through `Rc<RefCell<..>>`. The
//! registry and scheduler are thread-local singletons, as is the global root
//! object absolute paths resolve against.
//!
//! A property write fires the object's key observers, the registry forwards
//! (or, during a flush, defers) the notification, and the binding records
//! its source and joins the change queue. Nothing moves until the tick
//! ends.
//!
//! # Invariants
//!
//! 1. A binding is applied at most once per drain pass.
//! 2. Changes raised while a pass runs are applied in a later pass.
//! 3. Writing an identical value never notifies, so a two-way binding
//!    settles after one round trip.
//! 4. Ending the outermost tick returns only once the queues are empty.

pub mod binding;
pub mod mix;
pub mod registry;
pub mod scheduler;
pub mod transforms;

pub use binding::{Binding, BindingId, BindingScope, BindingState, BindingTemplate, TransformFn, bind};
pub use mix::{AggregateFn, MixRecipe};
pub use registry::{ObserverCallback, ObserverRegistry, RegistrationId};
pub use scheduler::{DeferredTrigger, Scheduler, TickGuard};
pub use transforms::{
    and_values, coerce_bool, coerce_integer, coerce_is_null, coerce_multiple, coerce_not,
    coerce_not_empty, coerce_not_null, coerce_single, coerce_string, or_values, parse_int,
};
