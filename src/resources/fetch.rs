//! Fetching raw asset bytes.
//!
//! Asset urls are relative (`assets/cube.glb`). Native builds read them from the
//! working directory; the web build resolves them against the page url and
//! fetches them.

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window available"))?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("cannot read page location: {e:?}"))?;
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join(file_name);
        tokio::fs::read_to_string(path).await?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}

/// Resolve `relative` (e.g. an .mtl or .bin reference) against the file that mentions it.
pub fn sibling_path(file_name: &str, relative: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}/{}", &file_name[..idx], relative),
        None => relative.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_paths_stay_in_the_asset_folder() {
        assert_eq!(sibling_path("assets/Osiris.obj", "Osiris.mtl"), "assets/Osiris.mtl");
        assert_eq!(sibling_path("cube.glb", "cube.bin"), "cube.bin");
    }
}
