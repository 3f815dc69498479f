pub mod draw_map;
pub mod parse_osm;
pub mod semantic_map;

use std::{fs::File, io::Write, path::Path};

use log::{error, info};
use rkyv::{
    de::deserializers::SharedDeserializeMap, ser::serializers::AllocSerializer, AlignedVec,
    Archive, Deserialize, Serialize,
};

use crate::errors::Result;


pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        info!(etl_name = self.etl_name(); "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = self.etl_name(); "Using cached value");
        } else {
            info!(etl_name = self.etl_name(); "Extracting");
            let input = match self.extract(dir) {
                Ok(input) => Ok(input),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Extraction failed with error");
                    Err(err)
                },
            }?;

            info!(etl_name = self.etl_name(); "Transforming");
            let output = match self.transform(input) {
                Ok(output) => Ok(output),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Transformation failed with error");
                    Err(err)
                },
            }?;

            info!(etl_name = self.etl_name(); "Loading");
            match self.load(dir, output) {
                Ok(_) => Ok(()),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Loading failed with error");
                    // Drop partial output.
                    if let Err(clean_err) = self.clean(dir) {
                        error!(etl_name = self.etl_name(), err = clean_err.message.as_str(); "Cleanup failed with error");
                    }
                    Err(err)
                },
            }?;
        }
        info!(etl_name = self.etl_name(); "Process finished");
        Ok(())
    }
}

/// Read a stage output written by [`write_archive`].
pub fn read_archive<T>(path: &Path) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>,
{
    let mut file = File::open(path)?;
    let mut bytes = AlignedVec::new();
    bytes.extend_from_reader(&mut file)?;

    // Only files produced by `write_archive` for the same type are read here.
    let value = unsafe { rkyv::from_bytes_unchecked::<T>(&bytes) }
        .map_err(|err| format!("Could not deserialize {}: {:?}", path.display(), err))?;
    Ok(value)
}

pub fn write_archive<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize<AllocSerializer<256>>,
{
    let bytes = rkyv::to_bytes::<_, 256>(value)
        .map_err(|err| format!("Could not serialize {}: {:?}", path.display(), err))?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}
