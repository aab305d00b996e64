//! Communication context of a run
//!
//! Every rank runs the same control flow on its own mesh partition. This
//! layer only needs the rank (for logging and file names), the group size,
//! one barrier before the time loop and a sum over ranks for marker averages.
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Rank, size and barrier of the process group
pub trait Communication {
    /// Rank of this process
    fn rank(&self) -> usize;
    /// Number of processes
    fn size(&self) -> usize;
    /// Block until every rank reached this point
    fn barrier(&self);
    /// Element-wise sum of `local` over all ranks, written to `global` on
    /// every rank. Collective, both slices must have the same length.
    fn all_gather_sum(&self, local: &[f64], global: &mut [f64]);
    /// True on rank 0
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Single process context
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communication for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_gather_sum(&self, local: &[f64], global: &mut [f64]) {
        global.copy_from_slice(local);
    }
}

#[cfg(feature = "mpi")]
mod mpi_comm {
    use super::Communication;
    use crate::error::{DriverError, Result};
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::traits::{Communicator, CommunicatorCollectives};

    /// Mpi world communicator
    pub struct MpiComm {
        universe: Universe,
    }

    impl MpiComm {
        /// Initialize mpi. Fails if mpi was initialized before.
        ///
        /// # Errors
        /// Mpi already initialized
        pub fn initialize() -> Result<Self> {
            let universe = mpi::initialize()
                .ok_or_else(|| DriverError::Config("mpi is already initialized".to_owned()))?;
            Ok(Self { universe })
        }
    }

    impl Communication for MpiComm {
        #[allow(clippy::cast_sign_loss)]
        fn rank(&self) -> usize {
            self.universe.world().rank() as usize
        }

        #[allow(clippy::cast_sign_loss)]
        fn size(&self) -> usize {
            self.universe.world().size() as usize
        }

        fn barrier(&self) {
            self.universe.world().barrier();
        }

        fn all_gather_sum(&self, local: &[f64], global: &mut [f64]) {
            self.universe
                .world()
                .all_reduce_into(local, global, SystemOperation::sum());
        }
    }
}
