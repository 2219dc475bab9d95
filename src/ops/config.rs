//! Config commands for the admin CLI
//!
//! Thin wrappers over the `/pd/api/v1/config` endpoints: read the current
//! section, overlay one option, post the whole section back.

use crate::common::{Error, Result};
use serde_json::{Map, Value};

pub const CONFIG_PREFIX: &str = "pd/api/v1/config";
pub const SCHEDULE_PREFIX: &str = "pd/api/v1/config/schedule";
pub const REPLICATE_PREFIX: &str = "pd/api/v1/config/replicate";

fn url(pd_addr: &str, prefix: &str) -> String {
    format!("{}/{}", pd_addr.trim_end_matches('/'), prefix)
}

/// Interpret a CLI option value: integers and floats become JSON numbers,
/// anything else a string. With `allow_list`, a non-numeric value containing
/// commas becomes a list of strings.
pub fn parse_option_value(raw: &str, allow_list: bool) -> Value {
    if let Ok(n) = raw.parse::<u64>() {
        return Value::from(n);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    if allow_list && raw.contains(',') {
        return Value::Array(raw.split(',').map(|s| Value::from(s.to_string())).collect());
    }
    Value::from(raw.to_string())
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Http(format!("[{}] {}", status, body)));
    }
    Ok(body)
}

async fn get_object(client: &reqwest::Client, url: &str) -> Result<Map<String, Value>> {
    let body = get_text(client, url).await?;
    serde_json::from_str(&body).map_err(|e| Error::Http(format!("malformed config: {}", e)))
}

async fn post_object(client: &reqwest::Client, url: &str, data: &Map<String, Value>) -> Result<()> {
    let resp = client.post(url).json(data).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http(format!("[{}] {}", status, body)));
    }
    Ok(())
}

/// Schedule config as returned by the server
pub async fn show_config(pd_addr: &str) -> Result<String> {
    get_text(&reqwest::Client::new(), &url(pd_addr, SCHEDULE_PREFIX)).await
}

/// Whole config as returned by the server
pub async fn show_all_config(pd_addr: &str) -> Result<String> {
    get_text(&reqwest::Client::new(), &url(pd_addr, CONFIG_PREFIX)).await
}

pub async fn set_config(pd_addr: &str, option: &str, value: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let mut data = get_object(&client, &url(pd_addr, SCHEDULE_PREFIX)).await?;
    data.insert(option.to_string(), parse_option_value(value, false));
    tracing::debug!("Posting schedule config: {:?}", data);
    post_object(&client, &url(pd_addr, CONFIG_PREFIX), &data).await
}

pub async fn set_replicate_config(pd_addr: &str, option: &str, value: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let mut data = get_object(&client, &url(pd_addr, REPLICATE_PREFIX)).await?;
    data.insert(option.to_string(), parse_option_value(value, true));
    tracing::debug!("Posting replication config: {:?}", data);
    post_object(&client, &url(pd_addr, REPLICATE_PREFIX), &data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_option_value() {
        assert_eq!(parse_option_value("16", false), json!(16));
        assert_eq!(parse_option_value("-1", false), json!(-1));
        assert_eq!(parse_option_value("0.5", false), json!(0.5));
        assert_eq!(parse_option_value("30m", false), json!("30m"));
        assert_eq!(parse_option_value("zone,rack", false), json!("zone,rack"));
        assert_eq!(parse_option_value("zone,rack", true), json!(["zone", "rack"]));
        assert_eq!(parse_option_value("zone", true), json!("zone"));
    }

    #[test]
    fn test_url_join() {
        assert_eq!(
            url("http://127.0.0.1:2379/", SCHEDULE_PREFIX),
            "http://127.0.0.1:2379/pd/api/v1/config/schedule"
        );
        assert_eq!(
            url("http://127.0.0.1:2379", CONFIG_PREFIX),
            "http://127.0.0.1:2379/pd/api/v1/config"
        );
    }
}
