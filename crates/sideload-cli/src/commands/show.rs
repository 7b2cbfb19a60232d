use super::{json_pretty, load_catalog, load_manifest, resolve_item, EXIT_SUCCESS};
use sideload_core::EngineSettings;
use std::path::Path;

pub fn run(manifest_path: &Path, id: &str, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let catalog = load_catalog(&manifest)?;
    let item = resolve_item(&catalog, id)?;
    let destination = EngineSettings::from_section(&manifest.settings).destination_for(&item);

    if json {
        let payload = serde_json::json!({
            "item": &*item,
            "destination": destination,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("id:           {}", item.id);
        println!("title:        {}", item.title);
        if !item.description.is_empty() {
            println!("description:  {}", item.description);
        }
        println!("package:      {}", item.target_package);
        println!("source:       {}", item.source_url);
        println!("destination:  {}", destination.display());
        println!("icon:         {}", item.icon.as_deref().unwrap_or("(none)"));
    }
    Ok(EXIT_SUCCESS)
}
