use std::any::TypeId;
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

use csv::Writer;

use crate::context::Context;
use crate::error::SimError;
use crate::{define_data_plugin, HashMap};

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), SimError>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::SimError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use define_report;

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
    }
);

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful. Called by `add_report`
fn generate_validate_filepath(path: &Path) -> Result<File, SimError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(SimError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        )),
    }
}

pub trait ContextReportExt {
    /// Call `add_report` with each report type, passing the path the report
    /// is written to. Registering a type again replaces its file.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the path is not a CSV file or cannot be created.
    fn add_report<T: Report + 'static>(&mut self, path: &Path) -> Result<(), SimError>;

    /// Whether a file has been registered for the report type.
    fn has_report<T: Report + 'static>(&self) -> bool;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if no file was registered for the type or the row cannot be
    /// written.
    fn send_report<T: Report>(&self, report: T) -> Result<(), SimError>;
}

impl ContextReportExt for Context {
    fn add_report<T: Report + 'static>(&mut self, path: &Path) -> Result<(), SimError> {
        let file = generate_validate_filepath(path)?;

        let data_container = self.get_data_container_mut(ReportPlugin);
        let writer = Writer::from_writer(file);
        data_container
            .file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), writer);
        Ok(())
    }

    fn has_report<T: Report + 'static>(&self) -> bool {
        self.get_data_container(ReportPlugin)
            .is_some_and(|data| data.file_writers.borrow().contains_key(&TypeId::of::<T>()))
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), SimError> {
        // No data container will exist if no reports have been added
        let data_container = self
            .get_data_container(ReportPlugin)
            .ok_or_else(|| SimError::ReportError("No writer found for the report type".to_string()))?;
        let mut writers = data_container
            .file_writers
            .try_borrow_mut()
            .map_err(|_| SimError::ReportError("report writers are already in use".to_string()))?;
        let writer = writers
            .get_mut(&report.type_id())
            .ok_or_else(|| SimError::ReportError("No writer found for the report type".to_string()))?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}
