//! `gitdrop provider <url>`.

use anyhow::Result;
use gitdrop_upload::Provider;

/// Print the provider detected for `url`.
pub(crate) fn run(url: &str, json: bool) -> Result<()> {
    let provider = Provider::detect(url);
    if json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({ "provider": provider }))?
        );
    } else {
        println!("{provider}");
    }
    Ok(())
}
