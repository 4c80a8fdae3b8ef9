//! Backend integration tests: every storage strategy through the public
//! model / record surface.

mod common;

mod blank_writes;
mod cache;
mod column;
mod key_value;
mod round_trip;
mod table;
