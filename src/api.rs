use anyhow::bail;
use log::{debug, info};
use reqwest::IntoUrl;
use scraper::Html;

pub const EMISSIONS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_countries_by_carbon_dioxide_emissions";

/// Wikipedia refuses requests that do not identify themselves, so the client sends the crate name.
pub fn reqwest_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}

pub async fn fetch_document(client: &reqwest::Client, url: impl IntoUrl) -> anyhow::Result<Html> {
    let url = url.into_url()?;
    info!("Fetching {url}");
    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        bail!(
            "Failed to fetch {url}: server returned {:?}",
            response.status()
        );
    }
    let text = response.text().await?;
    debug!("Received {} bytes", text.len());
    Ok(Html::parse_document(&text))
}

#[cfg(test)]
mod tests {
    use super::{reqwest_client, EMISSIONS_URL};

    #[test]
    fn client_builds() {
        reqwest_client().unwrap();
    }

    #[test]
    fn default_url_is_valid() {
        let url = url::Url::parse(EMISSIONS_URL).unwrap();
        assert_eq!(url.host_str(), Some("en.wikipedia.org"));
    }
}
