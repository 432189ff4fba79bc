use crate::error::{ApiError, ApiResult};

const HASH_COST: u32 = 10;

/// bcrypt is CPU bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_round_trip() {
        let hash = hash_password("Secret1!".into()).await.unwrap();
        assert!(verify_password("Secret1!".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("secret1!".into(), hash).await.unwrap());
    }
}
