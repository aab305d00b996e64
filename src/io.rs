//! # Hdf5 output of boundary snapshots
pub mod hdf5_writer;
pub mod read_write_hdf5;
pub use hdf5::{H5Type, Result};
pub use hdf5_writer::{read_snapshot, Hdf5Writer};
