use wlankeep::{TargetConfig, WifiKeeper};

#[tokio::main]
async fn main() -> wlankeep::Result<()> {
    let keeper = WifiKeeper::netsh(TargetConfig::default());

    for adapter in keeper.list_adapters().await? {
        println!("Adapter {:20} {}", adapter.name, adapter.state);
    }

    println!("Scanning for WiFi networks...");
    let networks = keeper.list_networks("").await?;
    for net in networks {
        println!("  {}", net.ssid);
    }

    Ok(())
}
