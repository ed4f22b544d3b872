//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP 请求委托给应用层的聊天室用例。

mod error;
mod extract;
mod routes;
mod state;

pub use error::{ApiError, ErrorBody};
pub use extract::{JsonBody, RequestUser, USER_HEADER};
pub use routes::{cors_layer, router};
pub use state::AppState;
