//! Running the HTTP server.

use axum::Router;

use nextgisweb_core::{NgwError, NgwResult};

/// Binds `addr` and serves `router` until the process is stopped.
pub async fn serve(router: Router, addr: &str) -> NgwResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        NgwError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
    })?;

    tracing::info!("Serving nextgisweb at http://{addr}/");

    axum::serve(listener, router)
        .await
        .map_err(|e| NgwError::InternalServerError(format!("Server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_address() {
        let result = serve(Router::new(), "not an address").await;
        assert!(matches!(result, Err(NgwError::ImproperlyConfigured(_))));
    }
}
