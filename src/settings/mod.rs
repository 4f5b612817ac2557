//! Settings module: key bindings, the shared binding store and persistence

mod bindings;
pub mod persistence;
mod store;

pub use bindings::{KeyBindings, SlotId};
pub use persistence::Settings;
pub use store::BindingStore;
