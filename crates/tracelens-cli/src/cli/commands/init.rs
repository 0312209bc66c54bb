use super::Ctx;
use crate::exit_codes;
use tracelens_store::TraceStore;

pub fn run(ctx: &Ctx) -> anyhow::Result<i32> {
    let store = TraceStore::init(&ctx.home)?;
    println!("Initialized trace store at {}", store.home().display());
    Ok(exit_codes::PASS)
}
