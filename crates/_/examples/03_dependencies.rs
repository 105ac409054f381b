use sherpa::{
    loader::{Loader, LoaderEvent},
    options::LoadOptions,
    parser::closure::ClosureParser,
    protocol::memory::MemoryProtocol,
};
use std::{error::Error, sync::Arc};

/// Parsed effect with the texture names it pulls into the batch.
#[derive(Debug)]
struct Effect {
    #[allow(dead_code)]
    textures: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(|_| {
                Box::new(
                    MemoryProtocol::default()
                        .with_asset("fire.effect", b"diffuse.png\nnormal.png".to_vec())
                        .with_asset("diffuse.png", vec![1])
                        .with_asset("normal.png", vec![2]),
                )
            })
            .with_parser("effect", || {
                Box::new(ClosureParser::new(|file, library| {
                    let source = String::from_utf8(file.data.clone())?;
                    let textures = source.lines().map(|line| line.to_owned()).collect::<Vec<_>>();
                    library.store(&file.filename, Effect { textures: textures.clone() })?;
                    Ok(textures)
                }))
            })
            .with_parser("png", || {
                Box::new(ClosureParser::new(|file, library| {
                    library.store(&file.filename, file.data.clone())?;
                    Ok(vec![])
                }))
            }),
    );

    let mut loader = Loader::new(options.clone());
    loader.events.bind(|event: LoaderEvent| {
        if event == LoaderEvent::Complete {
            println!("* Effect and its textures all arrived");
        }
    });

    // Only the effect is queued; its parser discovers the textures.
    loader.queue("fire.effect")?;
    loader.load()?;
    while loader.is_loading() {
        loader.maintain()?;
    }

    let library = options.asset_library().read().unwrap();
    println!("Effect: {:?}", library.get::<Effect>("fire.effect").unwrap());
    println!("Diffuse: {:?}", library.get::<Vec<u8>>("diffuse.png").unwrap());
    println!("Normal: {:?}", library.get::<Vec<u8>>("normal.png").unwrap());
    Ok(())
}
