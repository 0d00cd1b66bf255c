#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wlankeep_daemon::run().await
}
