//! HTTP client that talks to the balancer like any ordinary caller

use reqwest::Client;

use crate::types::ProxyResponse;

/// Build an HTTP client (no connection pooling for test isolation)
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(0)
        .build()
        .expect("Failed to build reqwest client")
}

/// Send a GET to the balancer
pub async fn send_get(client: &Client, proxy_addr: &str, path: &str) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{path}");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", path, e))?;
    read_response(resp).await
}

/// Send `count` GETs to `/` and return which backend answered each one
pub async fn collect_backends(client: &Client, proxy_addr: &str, count: usize) -> anyhow::Result<Vec<String>> {
    let mut seen = Vec::with_capacity(count);
    for i in 0..count {
        let resp = send_get(client, proxy_addr, "/").await?;
        if resp.status != 200 {
            return Err(anyhow::anyhow!(
                "Request {} got status {}: {}",
                i,
                resp.status,
                resp.body
            ));
        }
        let backend = resp
            .backend
            .ok_or_else(|| anyhow::anyhow!("Request {} has no x-backend header", i))?;
        seen.push(backend);
    }
    Ok(seen)
}

/// Collect status, backend tag and body from a balancer response
pub async fn read_response(resp: reqwest::Response) -> anyhow::Result<ProxyResponse> {
    let status = resp.status().as_u16();
    let backend = resp
        .headers()
        .get("x-backend")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read balancer response: {}", e))?;

    Ok(ProxyResponse { status, backend, body })
}
