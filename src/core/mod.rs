mod cancel;
mod errors;
pub mod models;

pub use cancel::CancelToken;
pub use errors::{AppError, AppResult, ResultExt};
