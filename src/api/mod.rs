pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use response::{ApiResponse, Pagination};
pub use routes::create_api_router;
