use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

use crate::error::ApiError;

pub const USER_HEADER: &str = "user";

/// 请求方身份，取自 `User` 请求头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUser(pub String);

impl<S> FromRequestParts<S> for RequestUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::unprocessable("missing User header"))?;

        let user = value
            .to_str()
            .map_err(|_| ApiError::unprocessable("User header is not valid text"))?
            .trim();

        if user.is_empty() {
            return Err(ApiError::unprocessable("User header is empty"));
        }
        Ok(Self(user.to_string()))
    }
}

/// `Json` 的包装，解析失败按校验错误返回 422
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
