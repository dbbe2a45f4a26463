//! Pure data structures: wire envelopes, connection state and the projections
//! derived from the event stream.

pub mod connection;
pub mod driver;
pub mod envelope;
pub mod geo;
pub mod inventory;
pub mod order;

pub use connection::*;
pub use driver::*;
pub use envelope::*;
pub use geo::*;
pub use inventory::*;
pub use order::*;
