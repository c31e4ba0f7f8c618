//! `#[derive(Persist)]` for parcel records.
//!
//! The derive implements `parcel::Persist` and `parcel::Record` for a
//! non-generic struct with named fields. Only `pub` fields are walked;
//! private fields keep their `Default` value across a save/load cycle.
//!
//! Attributes:
//!
//! - `#[parcel(skip)]` on a field leaves it off the wire
//! - `#[parcel(post_construct = "method")]` on the struct calls
//!   `self.method()` after a registered factory builds the value
//! - `#[parcel(post_load = "method")]` on the struct calls `self.method()`
//!   once a loaded document has been fully decoded

mod persist;
mod utils;

use proc_macro::TokenStream;

#[proc_macro_derive(Persist, attributes(parcel))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    persist::derive_persist(input)
}
