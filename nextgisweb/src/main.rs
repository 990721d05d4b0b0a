#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nextgisweb::cli::execute_from_args(std::env::args_os(), nextgisweb::default_components).await?;
    Ok(())
}
