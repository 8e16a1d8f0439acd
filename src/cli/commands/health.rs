use std::time::Duration;

use serde_json::{json, Value};

use crate::cli::utils::*;
use crate::cli::OutputFormat;

fn health_url(base: Option<String>) -> String {
    let base = base.unwrap_or_else(|| format!("http://localhost:{}", crate::config::config().api.port));
    format!("{}/health", base.trim_end_matches('/'))
}

pub async fn handle(url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = health_url(url);
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            output_error(&output_format, &format!("{} is unreachable: {}", url, e), Some("UNREACHABLE"))?;
            anyhow::bail!("health check failed");
        }
    };

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(
            &output_format,
            &format!("{} is healthy", url),
            Some(json!({ "status_code": status.as_u16(), "health": body.get("data").cloned().unwrap_or(body) })),
        )
    } else {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unhealthy")
            .to_string();
        output_error(&output_format, &format!("{} returned {}: {}", url, status, message), Some("UNHEALTHY"))?;
        anyhow::bail!("health check failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_health_path_once() {
        assert_eq!(health_url(Some("http://crm.local:9000/".to_string())), "http://crm.local:9000/health");
        assert_eq!(health_url(Some("http://crm.local".to_string())), "http://crm.local/health");
    }

    #[test]
    fn defaults_to_configured_port() {
        let expected = format!("http://localhost:{}/health", crate::config::config().api.port);
        assert_eq!(health_url(None), expected);
    }
}
