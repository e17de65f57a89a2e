use twelvefactor_core::NameCodec;

pub fn encode(app: &str, process: &str, delimiter: &str) -> anyhow::Result<()> {
    println!("{}", NameCodec::new(delimiter).encode(app, process));
    Ok(())
}

pub fn decode(name: &str, delimiter: &str) -> anyhow::Result<()> {
    match NameCodec::new(delimiter).decode(name) {
        Some((app, process)) => {
            println!("app:     {app}");
            println!("process: {process}");
            Ok(())
        }
        None => anyhow::bail!("{name:?} does not contain {delimiter:?}; not an app service"),
    }
}
