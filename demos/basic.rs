//! Walks through the factory API. Run with `RUST_LOG=tmpgen=debug` to see
//! what gets created and deleted.

use anyhow::Result;
use tmpgen::{Factory, FactoryOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Default timestamp generator.
    let mut tmp = Factory::new("a/*/b-*")?;

    // <tmp>/a/1453821919917/b-1453821919918
    println!("{}", tmp.make()?.display());
    // <tmp>/a/1453821919917/b-1453821919921
    println!("{}", tmp.make()?.display());

    // Sub-factory with random names.
    let mut sub = tmp.sub_with("beep-*", FactoryOptions::new().gen_alias("hat")?)?;

    // <tmp>/a/1453821919917/b-1453821919923/beep-eae732..
    println!("{}", sub.make()?.display());
    println!("{}", sub.make()?.display());

    // Everything `sub` created.
    sub.del_all()?;

    let p1 = sub.make()?;
    let p2 = sub.make_with("even/deeper")?;
    println!("{}", p1.display());
    println!("{}", p2.display());

    sub.del(&p1)?;
    sub.del(&p2)?;

    // `sub` never created /home or an ancestor of it.
    if let Err(e) = sub.del("/home") {
        eprintln!("{e}");
    }

    // Everything `tmp` created, which includes the root of `sub`.
    tmp.del_all()?;
    Ok(())
}
