use sherpa::{
    loader::{Loader, LoaderEvent},
    options::LoadOptions,
    parser::closure::ClosureParser,
    protocol::memory::MemoryProtocol,
};
use std::{error::Error, sync::Arc};

fn main() -> Result<(), Box<dyn Error>> {
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(|_| {
                Box::new(
                    MemoryProtocol::default()
                        .with_asset("lorem.txt", b"Lorem ipsum dolor sit amet".to_vec())
                        .with_asset("trash.bin", vec![0, 1, 2, 3]),
                )
            })
            .with_parser("txt", || {
                Box::new(ClosureParser::new(|file, library| {
                    let text = String::from_utf8(file.data.clone())?;
                    library.store(&file.filename, text)?;
                    Ok(vec![])
                }))
            })
            .with_store_data_if_not_parsed(),
    );

    let mut loader = Loader::new(options.clone());
    loader.events.bind(|event: LoaderEvent| match event {
        LoaderEvent::Progress(fraction) => println!("* Progress: {:.0}%", fraction * 100.0),
        LoaderEvent::Complete => println!("* Batch complete!"),
        _ => {}
    });

    loader.queue("lorem.txt")?;
    loader.queue("trash.bin")?;
    loader.load()?;
    while loader.is_loading() {
        loader.maintain()?;
    }

    let library = options.asset_library().read().unwrap();
    println!("Lorem Ipsum: {}", library.get::<String>("lorem.txt").unwrap());
    println!("Bytes: {:?}", library.blob("trash.bin").unwrap());
    Ok(())
}
