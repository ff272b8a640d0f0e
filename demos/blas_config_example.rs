use priorsgd::build_config::{configuration, BlasInfo, PackageMetadata, Platform};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let meta = PackageMetadata::current();
    println!("=== {} {} native targets ===\n", meta.name, meta.version);

    let info = BlasInfo::from_env();
    if info.is_empty() {
        println!("No BLAS_* variables set; using the generic cblas fallback.\n");
    }

    let config = configuration(info, Platform::current());
    for extension in &config.extensions {
        println!("[{}]", extension.name);
        println!("  sources:   {:?}", extension.sources);
        println!("  libraries: {:?}", extension.libraries);
        for directive in extension.link_directives() {
            println!("  {}", directive);
        }
    }

    println!("\n{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
