use super::{json_pretty, load_catalog, load_manifest, make_host, resolve_item, EXIT_SUCCESS};
use std::path::Path;

pub fn run(manifest_path: &Path, id: &str, backend: Option<&str>, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let catalog = load_catalog(&manifest)?;
    let item = resolve_item(&catalog, id)?;
    let host = make_host(&manifest, backend)?;

    host.launch(&item.target_package)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "id": item.id.as_str(),
            "package": item.target_package.as_str(),
            "launched": true,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("launched {}", item.target_package);
    }
    Ok(EXIT_SUCCESS)
}
