use super::print_json;
use crate::clients::kwik::KwikResolver;
use crate::config::Config;
use crate::models::episode::PaheLink;
use serde_json::json;

/// Resolves a redirector URL directly, or a mirror URL through its second hop.
pub async fn cmd_resolve(config: &Config, url: &str) -> anyhow::Result<()> {
    let resolver = KwikResolver::new(&config.resolver, &config.pahe)?;
    let mirror_prefix = config.pahe.mirror_prefix.trim_end_matches('/');

    if !mirror_prefix.is_empty() && url.starts_with(mirror_prefix) {
        let mirror = PaheLink {
            url: url.to_string(),
            text: String::new(),
        };
        let link = resolver.resolve_mirror(&mirror).await?;
        return print_json(&link);
    }

    let direct = resolver.resolve(url).await?;
    print_json(&json!({ "url": url, "direct_url": direct }))
}
