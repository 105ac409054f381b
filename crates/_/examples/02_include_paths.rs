use sherpa::{
    error::LoadError,
    loader::Loader,
    options::LoadOptions,
    protocol::memory::MemoryProtocol,
};
use std::{error::Error, sync::Arc};

fn main() -> Result<(), Box<dyn Error>> {
    // Content lives under nested base paths; call sites keep using bare names.
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(|_| {
                Box::new(
                    MemoryProtocol::default()
                        .with_asset("textures/stone.png", vec![1, 2, 3])
                        .with_asset("fallback/grass.png", vec![4, 5, 6]),
                )
            })
            .with_include_path("textures")
            .with_include_path("fallback")
            .with_store_data_if_not_parsed(),
    );

    let mut loader = Loader::new(options.clone());
    loader.errors.bind(|error: LoadError| {
        println!("* Error for `{}`: {}", error.filename(), error);
    });

    loader.queue("stone.png")?;
    loader.queue("grass.png")?;
    loader.queue("missing.png")?;
    loader.load()?;
    while loader.is_loading() {
        loader.maintain()?;
    }

    let library = options.asset_library().read().unwrap();
    for name in library.assets() {
        println!("Loaded: `{}` = {:?}", name, library.blob(name).unwrap());
    }
    Ok(())
}
