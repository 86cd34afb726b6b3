use std::path::Path;

use anyhow::Result;

use crate::model::{CareerContext, CvData};
use crate::store;

pub mod chart;
pub mod counts;
pub mod indices;
pub mod refresh;
pub mod summary;

/// Loads a record file and resolves it under the file's career context
/// merged with any stage overrides from the command line. Overrides can
/// only raise a stage, never lower one the file already declares.
fn load_resolved(records: &Path, post_appointment: bool, post_tenure: bool) -> Result<CvData> {
    let file = store::load(records)?;
    let context = CareerContext {
        post_appointment: file.context.post_appointment || post_appointment,
        post_tenure: file.context.post_tenure || post_tenure,
    };
    file.resolve(context)
}
