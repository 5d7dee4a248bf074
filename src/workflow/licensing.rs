use super::Workflow;
use crate::error::{DocError, Result};
use crate::models::{CreatePackageInput, LicensingPackage};

impl Workflow {
    /// Bundle every completed document into a new licensing package.
    ///
    /// The bundle directory is written before the transaction commits, so a
    /// failed write leaves every document `completed` and no package row.
    pub fn create_package(&self, input: CreatePackageInput) -> Result<LicensingPackage> {
        self.db.create_package_with(input, |package, documents| {
            let dir = self.files.write_bundle(package, documents)?;
            Ok(Some(dir.display().to_string()))
        })
    }

    pub fn package(&self, id: i64) -> Result<LicensingPackage> {
        self.db.get_package(id)?.ok_or(DocError::NotFound {
            entity: "package",
            id,
        })
    }

    pub fn list_packages(&self) -> Result<Vec<LicensingPackage>> {
        self.db.list_packages()
    }
}
