fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(bitchat_client::run());
    // A pending stdin read never returns on its own; don't wait for it.
    runtime.shutdown_background();
    result
}
