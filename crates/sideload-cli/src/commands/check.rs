use super::{
    json_pretty, load_catalog, load_manifest, make_host, resolve_item, EXIT_FAILURE,
    EXIT_SUCCESS,
};
use std::path::Path;

/// Exits 0 when the item's package is installed, 1 when it is not.
pub fn run(manifest_path: &Path, id: &str, backend: Option<&str>, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let catalog = load_catalog(&manifest)?;
    let item = resolve_item(&catalog, id)?;
    let host = make_host(&manifest, backend)?;

    let installed = host
        .is_installed(&item.target_package)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "id": item.id.as_str(),
            "package": item.target_package.as_str(),
            "installed": installed,
        });
        println!("{}", json_pretty(&payload)?);
    } else if installed {
        println!("{} is installed", item.target_package);
    } else {
        println!("{} is not installed", item.target_package);
    }
    Ok(if installed { EXIT_SUCCESS } else { EXIT_FAILURE })
}
