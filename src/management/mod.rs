mod auth;
mod failures;
mod file;
mod state;

pub use auth::TOKEN_FILE;
pub use auth::TokenManager;
pub use failures::FAILED_UPLOADS_FILE;
pub use failures::FailureStore;
pub use state::UPLOAD_STATE_FILE;
pub use state::UploadStateStore;
