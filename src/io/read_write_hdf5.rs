//! `Hdf5` functions to read and write ndarrays
use super::H5Type;
use super::Result;
use ndarray::{Array, ArrayBase, ArrayD, Dimension};
use std::path::Path;

/// Read scalar from hdf5
///
/// # Errors
/// When file or variable does not exists, or when the
/// variable is not of dimensionality 1 (i.e. not a scalar).
pub fn read_scalar_from_hdf5<T, P>(filename: P, name: &str) -> Result<T>
where
    T: H5Type + Clone + Copy,
    P: AsRef<Path>,
{
    let file = hdf5::File::open(filename)?;
    let dset = file.dataset(name)?;

    if dset.shape().len() != 1 {
        return Err(hdf5::Error::Internal(format!(
            "{}: dimension must be of size 1, but is of size {}",
            name,
            dset.shape().len()
        )));
    }

    let scalar: ndarray::Array1<T> = dset.read()?;
    scalar
        .first()
        .copied()
        .ok_or_else(|| hdf5::Error::Internal(format!("{}: empty dataset", name)))
}

/// Interface to write scalar to hdf5 file
///
/// # Errors
/// When file cannot be created.
pub fn write_scalar_to_hdf5<T, P>(filename: P, name: &str, scalar: T) -> Result<()>
where
    T: H5Type + Copy,
    P: AsRef<Path>,
{
    use ndarray::Array1;
    let x = Array1::<T>::from_elem(1, scalar);
    write_to_hdf5(filename, name, &x)?;
    Ok(())
}

/// Read ndarray from hdf5 file
///
/// # Errors
/// Errors when file/variable does not exist or when
/// the stored dimensionality does not match `D`.
pub fn read_from_hdf5<A, D, P>(filename: P, varname: &str) -> Result<Array<A, D>>
where
    A: H5Type,
    D: Dimension,
    P: AsRef<Path>,
{
    // Open file
    let file = hdf5::File::open(filename)?;

    //Read dataset
    let data = file.dataset(varname)?;
    let y: ArrayD<A> = data.read_dyn::<A>()?;

    // Dyn to static
    y.into_dimensionality::<D>()
        .map_err(|e| hdf5::Error::Internal(format!("{}: {}", varname, e)))
}

/// Write ndarray to hdf5 file
///
/// # Errors
/// When file cannot be created or when file and
/// variable exists, but variable has different
/// shape than input array (assign new value will fail).
pub fn write_to_hdf5<A, S, D, P>(filename: P, varname: &str, array: &ArrayBase<S, D>) -> Result<()>
where
    A: H5Type,
    S: ndarray::Data<Elem = A>,
    D: ndarray::Dimension,
    P: AsRef<Path>,
{
    // Open file
    let filename = filename.as_ref();
    let file = if filename.exists() {
        hdf5::File::append(filename)?
    } else {
        hdf5::File::create(filename)?
    };

    //Write dataset
    let dset = match file.dataset(varname) {
        Ok(dset) => {
            // Overwrite
            dset
        }
        Err(..) => {
            // Create new dataset
            file.new_dataset::<A>()
                .no_chunk()
                .shape(array.shape())
                .create(varname)?
        }
    };
    dset.write(&array.view())?;
    Ok(())
}
