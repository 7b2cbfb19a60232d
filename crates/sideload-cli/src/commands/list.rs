use super::{json_pretty, load_catalog, load_manifest, EXIT_SUCCESS};
use serde::Serialize;
use sideload_core::EngineSettings;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ListRow<'a> {
    id: &'a str,
    title: &'a str,
    package: &'a str,
    file: String,
}

pub fn run(manifest_path: &Path, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let catalog = load_catalog(&manifest)?;
    let settings = EngineSettings::from_section(&manifest.settings);

    let rows: Vec<ListRow<'_>> = catalog
        .items()
        .iter()
        .map(|item| ListRow {
            id: item.id.as_str(),
            title: &item.title,
            package: item.target_package.as_str(),
            file: sideload_schema::destination_file_name(&item.title, &settings.package_extension),
        })
        .collect();

    if json {
        println!("{}", json_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("no catalog items in {}", manifest_path.display());
    } else {
        println!("{:<16} {:<24} {:<28} FILE", "ID", "TITLE", "PACKAGE");
        for row in &rows {
            println!(
                "{:<16} {:<24} {:<28} {}",
                row.id, row.title, row.package, row.file
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
